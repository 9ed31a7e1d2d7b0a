//! Data models for fetched posts and the fetch cursor.
//!
//! `SearchPost` is the shape the search endpoint hands back; `PostRecord` is
//! the scored, persisted row. Everything downstream of the fetch loop works
//! on `PostRecord`s only.

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Text prefix that marks a reshare (retweet).
pub const RESHARE_MARKER: &str = "RT";

/// Maximum number of posts the search endpoint returns per page.
pub const PAGE_SIZE: u32 = 100;

/// A post as returned by the search endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchPost {
    pub id: u64,
    pub created_at: DateTime<Utc>,
    pub full_text: String,
    pub favorite_count: i64,
    pub retweet_count: i64,
}

impl SearchPost {
    /// Whether this post re-publishes someone else's post.
    #[must_use]
    pub fn is_reshare(&self) -> bool {
        self.full_text.starts_with(RESHARE_MARKER)
    }
}

/// A scored post, one row of the result set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PostRecord {
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub id: u64,
    pub favorite_count: i64,
    pub retweet_count: i64,
    pub sentiment_compound: f64,
}

impl PostRecord {
    /// Build a record from an endpoint post and its primary sentiment score.
    #[must_use]
    pub fn from_post(post: &SearchPost, sentiment_compound: f64) -> Self {
        Self {
            text: post.full_text.clone(),
            created_at: post.created_at,
            id: post.id,
            favorite_count: post.favorite_count,
            retweet_count: post.retweet_count,
            sentiment_compound,
        }
    }

    /// Calendar date (UTC) the post was created on.
    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.created_at.date_naive()
    }

    /// Sentiment bucket for this record's compound score.
    #[must_use]
    pub fn bucket(&self) -> SentimentBucket {
        SentimentBucket::classify(self.sentiment_compound)
    }
}

/// How many stored posts to collect per day before stepping back a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Quota {
    /// Never roll back on count; walk until the endpoint runs dry.
    Unlimited,
    /// Roll back one day once this many posts were stored for the current day.
    PerDay(u32),
}

impl Quota {
    /// Sentinel used in configuration files for [`Quota::Unlimited`].
    pub const UNLIMITED_SENTINEL: i64 = -1;

    /// Whether `daily_count` has reached the quota.
    #[must_use]
    pub const fn is_reached(self, daily_count: u32) -> bool {
        match self {
            Self::Unlimited => false,
            Self::PerDay(limit) => daily_count >= limit,
        }
    }
}

impl Default for Quota {
    fn default() -> Self {
        Self::PerDay(PAGE_SIZE)
    }
}

impl TryFrom<i64> for Quota {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            Self::UNLIMITED_SENTINEL => Ok(Self::Unlimited),
            n if n > 0 => u32::try_from(n)
                .map(Self::PerDay)
                .map_err(|_| format!("quota {n} is too large")),
            n => Err(format!(
                "quota must be a positive count or {} for unlimited, got {n}",
                Self::UNLIMITED_SENTINEL
            )),
        }
    }
}

impl From<Quota> for i64 {
    fn from(quota: Quota) -> Self {
        match quota {
            Quota::Unlimited => Quota::UNLIMITED_SENTINEL,
            Quota::PerDay(n) => Self::from(n),
        }
    }
}

impl std::fmt::Display for Quota {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unlimited => write!(f, "unlimited"),
            Self::PerDay(n) => write!(f, "{n}/day"),
        }
    }
}

/// Pagination state of the fetch loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorState {
    /// Upper date bound for the search (`until=`).
    pub until_day: NaiveDate,
    /// Upper id bound for the search (`max_id=`); `None` means unbounded.
    pub maximum_id: Option<u64>,
    /// Posts stored since the last rollover.
    pub daily_count: u32,
}

impl CursorState {
    #[must_use]
    pub const fn new(until_day: NaiveDate) -> Self {
        Self {
            until_day,
            maximum_id: None,
            daily_count: 0,
        }
    }

    /// Step the date window back one calendar day and zero the daily counter.
    pub fn roll_back_day(&mut self) {
        self.until_day = self
            .until_day
            .checked_sub_days(Days::new(1))
            .unwrap_or(NaiveDate::MIN);
        self.daily_count = 0;
    }
}

/// Three-way sentiment classification of a compound score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentBucket {
    Neg,
    Neutral,
    Pos,
}

impl SentimentBucket {
    /// All buckets, in chart stacking order (bottom to top).
    pub const ALL: [Self; 3] = [Self::Neg, Self::Neutral, Self::Pos];

    /// Classify by sign with no tolerance band: exactly 0.0 is neutral.
    #[must_use]
    pub fn classify(compound: f64) -> Self {
        if compound > 0.0 {
            Self::Pos
        } else if compound < 0.0 {
            Self::Neg
        } else {
            Self::Neutral
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pos => "pos",
            Self::Neg => "neg",
            Self::Neutral => "neutral",
        }
    }
}

impl std::fmt::Display for SentimentBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome of one fetch run.
#[derive(Debug, Clone, Serialize)]
pub struct FetchSummary {
    pub records: usize,
    pub reshares_skipped: usize,
    pub pages: usize,
    pub checkpoints: usize,
    pub final_cursor: CursorState,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn post(id: u64, text: &str) -> SearchPost {
        SearchPost {
            id,
            created_at: Utc.with_ymd_and_hms(2025, 3, 4, 10, 0, 0).single().unwrap(),
            full_text: text.to_string(),
            favorite_count: 1,
            retweet_count: 2,
        }
    }

    #[test]
    fn reshare_detection_uses_prefix_only() {
        assert!(post(1, "RT @someone: hello").is_reshare());
        assert!(!post(2, "hello RT @someone").is_reshare());
        assert!(!post(3, "rt lowercase is not a reshare").is_reshare());
    }

    #[test]
    fn quota_sentinel_parses_to_unlimited() {
        assert_eq!(Quota::try_from(-1).unwrap(), Quota::Unlimited);
        assert_eq!(Quota::try_from(250).unwrap(), Quota::PerDay(250));
        assert!(Quota::try_from(0).is_err());
        assert!(Quota::try_from(-5).is_err());
        assert_eq!(i64::from(Quota::Unlimited), -1);
    }

    #[test]
    fn quota_is_reached_at_or_above_limit() {
        assert!(!Quota::PerDay(2).is_reached(1));
        assert!(Quota::PerDay(2).is_reached(2));
        assert!(Quota::PerDay(2).is_reached(3));
        assert!(!Quota::Unlimited.is_reached(u32::MAX));
    }

    #[test]
    fn roll_back_day_steps_one_day_and_resets_count() {
        let day = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let mut cursor = CursorState::new(day);
        cursor.daily_count = 42;
        cursor.maximum_id = Some(9);
        cursor.roll_back_day();
        assert_eq!(cursor.until_day, NaiveDate::from_ymd_opt(2025, 2, 28).unwrap());
        assert_eq!(cursor.daily_count, 0);
        assert_eq!(cursor.maximum_id, Some(9));
    }

    #[test]
    fn bucket_partition_is_strict() {
        assert_eq!(SentimentBucket::classify(0.0), SentimentBucket::Neutral);
        assert_eq!(SentimentBucket::classify(-0.0), SentimentBucket::Neutral);
        assert_eq!(SentimentBucket::classify(1e-12), SentimentBucket::Pos);
        assert_eq!(SentimentBucket::classify(-1e-12), SentimentBucket::Neg);
        assert_eq!(SentimentBucket::classify(1.0), SentimentBucket::Pos);
        assert_eq!(SentimentBucket::classify(-1.0), SentimentBucket::Neg);
    }

    #[test]
    fn record_date_is_utc_calendar_day() {
        let record = PostRecord::from_post(&post(5, "hi"), 0.3);
        assert_eq!(record.date(), NaiveDate::from_ymd_opt(2025, 3, 4).unwrap());
        assert_eq!(record.bucket(), SentimentBucket::Pos);
    }
}
