//! Lexicon-based sentiment scorers.
//!
//! Two independent scorers are provided:
//!
//! - [`CompoundScorer`] sums word valences with negation, booster-word,
//!   capitalisation and exclamation adjustments, then squashes the sum into
//!   `[-1, 1]`. This is the score that gets persisted.
//! - [`PolarityScorer`] averages per-word polarities with intensifier and
//!   negation handling. It is only logged alongside the compound score.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use unicode_normalization::UnicodeNormalization;

/// Anything that maps a piece of text to a score in `[-1, 1]`.
pub trait SentimentScorer {
    /// Short name used in log output.
    fn name(&self) -> &'static str;

    /// Score `text`; negative is unfavourable, positive favourable.
    fn score(&self, text: &str) -> f64;
}

impl<S: SentimentScorer + ?Sized> SentimentScorer for &S {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn score(&self, text: &str) -> f64 {
        (**self).score(text)
    }
}

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\p{L}\p{N}_']+|!+|:\)|:\(|:D|<3").expect("static token regex is valid")
});

/// A token with its original casing.
#[derive(Debug)]
struct Token<'a> {
    raw: &'a str,
    lower: String,
}

fn tokenize(text: &str) -> (String, Vec<(usize, usize)>) {
    let normalized: String = text.nfkc().collect();
    let spans = TOKEN_RE
        .find_iter(&normalized)
        .map(|m| (m.start(), m.end()))
        .collect();
    (normalized, spans)
}

fn tokens<'a>(normalized: &'a str, spans: &[(usize, usize)]) -> Vec<Token<'a>> {
    spans
        .iter()
        .map(|&(start, end)| {
            let raw = &normalized[start..end];
            Token {
                raw,
                lower: raw.to_lowercase(),
            }
        })
        .collect()
}

const NEGATIONS: &[&str] = &[
    "not", "no", "never", "neither", "nor", "nobody", "nothing", "nowhere", "none", "cannot",
    "cant", "can't", "dont", "don't", "doesnt", "doesn't", "didnt", "didn't", "wont", "won't",
    "wouldnt", "wouldn't", "shouldnt", "shouldn't", "couldnt", "couldn't", "isnt", "isn't",
    "arent", "aren't", "wasnt", "wasn't", "werent", "weren't", "aint", "ain't", "hardly",
    "barely", "scarcely", "without",
];

fn is_negation(word: &str) -> bool {
    NEGATIONS.contains(&word) || word.ends_with("n't")
}

// =============================================================================
// Compound scorer
// =============================================================================

/// Valences on a -4..=4 scale.
static VALENCE: Lazy<HashMap<&'static str, f64>> = Lazy::new(|| {
    [
        // positive
        ("good", 1.9),
        ("great", 3.1),
        ("excellent", 2.7),
        ("amazing", 2.8),
        ("awesome", 3.1),
        ("love", 3.2),
        ("loved", 2.9),
        ("loves", 2.7),
        ("like", 1.5),
        ("likes", 1.5),
        ("nice", 1.8),
        ("happy", 2.7),
        ("glad", 2.0),
        ("best", 3.2),
        ("better", 1.9),
        ("fantastic", 2.6),
        ("wonderful", 2.7),
        ("beautiful", 2.9),
        ("perfect", 2.7),
        ("fun", 2.3),
        ("cool", 1.3),
        ("win", 2.8),
        ("winning", 2.4),
        ("won", 2.7),
        ("success", 2.7),
        ("successful", 2.8),
        ("thanks", 1.9),
        ("thank", 1.5),
        ("grateful", 2.0),
        ("excited", 1.4),
        ("exciting", 2.2),
        ("enjoy", 2.2),
        ("enjoyed", 2.3),
        ("recommend", 1.5),
        ("impressive", 2.3),
        ("strong", 2.3),
        ("support", 1.7),
        ("safe", 1.9),
        ("comfortable", 1.5),
        ("favorite", 2.0),
        ("favourite", 2.0),
        ("smile", 1.5),
        ("lol", 1.8),
        ("yes", 1.7),
        ("wow", 2.8),
        ("hope", 1.9),
        ("helpful", 1.8),
        ("proud", 2.1),
        (":)", 2.0),
        (":d", 2.3),
        ("<3", 1.9),
        // negative
        ("bad", -2.5),
        ("worse", -2.1),
        ("worst", -3.1),
        ("terrible", -2.1),
        ("awful", -2.0),
        ("horrible", -2.5),
        ("hate", -2.7),
        ("hated", -3.2),
        ("hates", -1.9),
        ("sad", -2.1),
        ("angry", -2.3),
        ("annoying", -1.7),
        ("annoyed", -1.6),
        ("disappointed", -1.9),
        ("disappointing", -2.2),
        ("poor", -2.1),
        ("fail", -2.5),
        ("failed", -2.3),
        ("failure", -2.3),
        ("broken", -2.1),
        ("problem", -1.7),
        ("problems", -1.7),
        ("wrong", -2.1),
        ("sucks", -1.5),
        ("ugly", -2.3),
        ("stupid", -2.4),
        ("boring", -1.3),
        ("scam", -2.2),
        ("fraud", -2.8),
        ("crash", -1.7),
        ("lost", -1.3),
        ("lose", -1.7),
        ("loss", -1.3),
        ("pain", -2.3),
        ("hurt", -2.4),
        ("sick", -2.3),
        ("scared", -1.9),
        ("fear", -2.2),
        ("worried", -1.2),
        ("cry", -2.1),
        ("kill", -3.7),
        ("dead", -3.3),
        ("no", -1.2),
        ("rude", -2.0),
        ("slow", -0.8),
        ("expensive", -0.9),
        (":(", -1.9),
    ]
    .into_iter()
    .collect()
});

/// Booster words and their scalar adjustment (same sign as the boosted word).
static BOOSTERS: Lazy<HashMap<&'static str, f64>> = Lazy::new(|| {
    const INCR: f64 = 0.293;
    const DECR: f64 = -0.293;
    [
        ("absolutely", INCR),
        ("completely", INCR),
        ("extremely", INCR),
        ("incredibly", INCR),
        ("really", INCR),
        ("so", INCR),
        ("totally", INCR),
        ("very", INCR),
        ("super", INCR),
        ("most", INCR),
        ("more", INCR),
        ("hugely", INCR),
        ("barely", DECR),
        ("kinda", DECR),
        ("slightly", DECR),
        ("somewhat", DECR),
        ("sort", DECR),
        ("little", DECR),
        ("marginally", DECR),
    ]
    .into_iter()
    .collect()
});

/// Primary scorer: valence sum normalised to `[-1, 1]`.
#[derive(Debug, Clone)]
pub struct CompoundScorer {
    alpha: f64,
}

impl Default for CompoundScorer {
    fn default() -> Self {
        Self { alpha: 15.0 }
    }
}

impl CompoundScorer {
    const NEGATION_SCALAR: f64 = -0.74;
    const CAPS_INCREMENT: f64 = 0.733;
    const EXCLAMATION_INCREMENT: f64 = 0.292;
    const MAX_EXCLAMATIONS: usize = 4;

    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Squash an unbounded valence sum into `[-1, 1]`.
    #[must_use]
    pub fn normalize(&self, sum: f64) -> f64 {
        let score = sum / (sum * sum + self.alpha).sqrt();
        score.clamp(-1.0, 1.0)
    }

    fn is_shouting(raw: &str) -> bool {
        raw.chars().any(char::is_alphabetic)
            && raw.chars().filter(|c| c.is_alphabetic()).all(char::is_uppercase)
    }
}

impl SentimentScorer for CompoundScorer {
    fn name(&self) -> &'static str {
        "compound"
    }

    fn score(&self, text: &str) -> f64 {
        let (normalized, spans) = tokenize(text);
        let toks = tokens(&normalized, &spans);

        // Caps emphasis only counts when the text is not entirely upper case.
        let words: Vec<&Token<'_>> = toks.iter().filter(|t| !t.raw.starts_with('!')).collect();
        let shouting = words.iter().filter(|t| Self::is_shouting(t.raw)).count();
        let mixed_case = shouting > 0 && shouting < words.len();

        let mut sum = 0.0;
        let mut matched = false;
        for (i, tok) in toks.iter().enumerate() {
            let Some(&base) = VALENCE.get(tok.lower.as_str()) else {
                continue;
            };
            // "no" as a modifier of a following word is handled as negation
            if tok.lower == "no"
                && toks
                    .get(i + 1)
                    .is_some_and(|next| VALENCE.contains_key(next.lower.as_str()))
            {
                continue;
            }
            matched = true;
            let mut valence = base;

            if mixed_case && Self::is_shouting(tok.raw) {
                valence += Self::CAPS_INCREMENT.copysign(valence);
            }

            // Look back up to three tokens for boosters and negations.
            for back in 1..=3 {
                let Some(prev) = i.checked_sub(back).and_then(|j| toks.get(j)) else {
                    break;
                };
                if let Some(&boost) = BOOSTERS.get(prev.lower.as_str()) {
                    let damp = match back {
                        1 => 1.0,
                        2 => 0.95,
                        _ => 0.9,
                    };
                    valence += boost.copysign(valence) * damp;
                }
                if is_negation(&prev.lower) {
                    valence *= Self::NEGATION_SCALAR;
                }
            }

            sum += valence;
        }

        if !matched {
            return 0.0;
        }

        let exclamations: usize = toks
            .iter()
            .filter(|t| t.raw.starts_with('!'))
            .map(|t| t.raw.len())
            .sum::<usize>()
            .min(Self::MAX_EXCLAMATIONS);
        #[allow(clippy::cast_precision_loss)]
        let emphasis = exclamations as f64 * Self::EXCLAMATION_INCREMENT;
        if sum > 0.0 {
            sum += emphasis;
        } else if sum < 0.0 {
            sum -= emphasis;
        }

        self.normalize(sum)
    }
}

// =============================================================================
// Polarity scorer
// =============================================================================

/// Polarities on a -1..=1 scale.
static POLARITY: Lazy<HashMap<&'static str, f64>> = Lazy::new(|| {
    [
        ("good", 0.7),
        ("great", 0.8),
        ("excellent", 1.0),
        ("amazing", 0.6),
        ("awesome", 1.0),
        ("love", 0.5),
        ("nice", 0.6),
        ("happy", 0.8),
        ("best", 1.0),
        ("better", 0.5),
        ("wonderful", 1.0),
        ("beautiful", 0.85),
        ("perfect", 1.0),
        ("fun", 0.3),
        ("cool", 0.35),
        ("successful", 0.75),
        ("exciting", 0.3),
        ("impressive", 1.0),
        ("strong", 0.43),
        ("safe", 0.5),
        ("favorite", 0.5),
        ("proud", 0.8),
        ("glad", 0.5),
        ("helpful", 0.5),
        ("new", 0.14),
        ("free", 0.4),
        ("bad", -0.7),
        ("worse", -0.4),
        ("worst", -1.0),
        ("terrible", -1.0),
        ("awful", -1.0),
        ("horrible", -1.0),
        ("sad", -0.5),
        ("angry", -0.5),
        ("annoying", -0.8),
        ("disappointed", -0.75),
        ("disappointing", -0.6),
        ("poor", -0.4),
        ("broken", -0.4),
        ("wrong", -0.5),
        ("ugly", -0.7),
        ("stupid", -0.8),
        ("boring", -1.0),
        ("sick", -0.71),
        ("dead", -0.2),
        ("rude", -0.3),
        ("slow", -0.3),
        ("expensive", -0.5),
        ("hate", -0.8),
        ("scared", -0.6),
    ]
    .into_iter()
    .collect()
});

static INTENSIFIERS: Lazy<HashMap<&'static str, f64>> = Lazy::new(|| {
    [
        ("very", 1.3),
        ("really", 1.2),
        ("extremely", 1.5),
        ("so", 1.3),
        ("super", 1.4),
        ("incredibly", 1.5),
        ("too", 1.2),
        ("slightly", 0.5),
        ("somewhat", 0.7),
        ("kinda", 0.7),
        ("pretty", 0.9),
    ]
    .into_iter()
    .collect()
});

/// Secondary scorer: mean of matched word polarities.
#[derive(Debug, Clone, Default)]
pub struct PolarityScorer;

impl PolarityScorer {
    const NEGATION_SCALAR: f64 = -0.5;

    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl SentimentScorer for PolarityScorer {
    fn name(&self) -> &'static str {
        "polarity"
    }

    fn score(&self, text: &str) -> f64 {
        let (normalized, spans) = tokenize(text);
        let toks = tokens(&normalized, &spans);

        let mut scores: Vec<f64> = Vec::new();
        let mut negate = false;
        let mut intensity = 1.0;

        for tok in &toks {
            let word = tok.lower.as_str();
            if is_negation(word) {
                negate = true;
                continue;
            }
            if let Some(&mult) = INTENSIFIERS.get(word) {
                intensity = mult;
                continue;
            }
            if let Some(&polarity) = POLARITY.get(word) {
                let mut value = polarity * intensity;
                if negate {
                    value *= Self::NEGATION_SCALAR;
                }
                scores.push(value.clamp(-1.0, 1.0));
            }
            negate = false;
            intensity = 1.0;
        }

        if scores.is_empty() {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let mean = scores.iter().sum::<f64>() / scores.len() as f64;
        mean.clamp(-1.0, 1.0)
    }
}
