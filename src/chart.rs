//! Stacked bar chart of daily sentiment buckets, rendered to PNG.
//!
//! One bar per day (oldest on the left). Each bar stacks the day's negative,
//! neutral and positive post counts from the bottom up. Text is drawn with a
//! built-in 5x7 bitmap font so no font files are needed.

use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage};
use tracing::info;

use crate::error::{Result, XsError};
use crate::model::SentimentBucket;
use crate::report::SentimentReport;

/// Common color definitions
pub mod colors {
    use image::Rgb;

    pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
    pub const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
    pub const DARK_GRAY: Rgb<u8> = Rgb([60, 60, 60]);
    pub const LIGHT_GRAY: Rgb<u8> = Rgb([220, 220, 220]);
    pub const GREEN: Rgb<u8> = Rgb([44, 160, 44]);
    pub const RED: Rgb<u8> = Rgb([214, 39, 40]);
    pub const BLUE: Rgb<u8> = Rgb([31, 119, 180]);
}

/// Image size and palette.
#[derive(Debug, Clone)]
pub struct ChartStyle {
    pub min_width: u32,
    pub height: u32,
    pub background: Rgb<u8>,
    pub axis: Rgb<u8>,
    pub grid: Rgb<u8>,
    pub text: Rgb<u8>,
    pub pos: Rgb<u8>,
    pub neg: Rgb<u8>,
    pub neutral: Rgb<u8>,
}

impl Default for ChartStyle {
    fn default() -> Self {
        Self {
            min_width: 640,
            height: 480,
            background: colors::WHITE,
            axis: colors::BLACK,
            grid: colors::LIGHT_GRAY,
            text: colors::DARK_GRAY,
            pos: colors::GREEN,
            neg: colors::RED,
            neutral: colors::BLUE,
        }
    }
}

impl ChartStyle {
    #[must_use]
    pub const fn bucket_color(&self, bucket: SentimentBucket) -> Rgb<u8> {
        match bucket {
            SentimentBucket::Pos => self.pos,
            SentimentBucket::Neg => self.neg,
            SentimentBucket::Neutral => self.neutral,
        }
    }
}

const MARGIN_TOP: u32 = 44;
const MARGIN_BOTTOM: u32 = 40;
const MARGIN_LEFT: u32 = 56;
const MARGIN_RIGHT: u32 = 110;
const MIN_SLOT: u32 = 14;
/// Side length of a legend color swatch.
pub const SWATCH: u32 = 12;

/// File name for a chart: title with spaces replaced by underscores, `.png`.
#[must_use]
pub fn chart_file_name(title: &str) -> String {
    format!("{}.png", title.replace(' ', "_"))
}

/// Draw the chart for `report`.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn render(report: &SentimentReport, title: &str, style: &ChartStyle) -> RgbImage {
    let n_days = u32::try_from(report.days.len()).unwrap_or(u32::MAX).max(1);
    let width = style
        .min_width
        .max(MARGIN_LEFT + MARGIN_RIGHT + n_days.saturating_mul(MIN_SLOT));
    let height = style.height;
    let mut img = RgbImage::from_pixel(width, height, style.background);

    let plot_x = MARGIN_LEFT;
    let plot_y = MARGIN_TOP;
    let plot_w = width - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_h = height - MARGIN_TOP - MARGIN_BOTTOM;
    let baseline = plot_y + plot_h;

    // Title, centred, double size.
    let title_w = text_width(title, 2);
    let title_x = width.saturating_sub(title_w) / 2;
    draw_text(&mut img, title_x, 12, title, 2, style.text);

    let max_count = report.max_day_count().max(1);

    // Horizontal grid lines with count labels at 0, 1/4, ... , max.
    for step in 0..=4u64 {
        let value = max_count * step / 4;
        let y = baseline - scale(value, max_count, plot_h);
        fill_rect(&mut img, plot_x, y, plot_w, 1, style.grid);
        let label = value.to_string();
        let lx = plot_x.saturating_sub(text_width(&label, 1) + 6);
        draw_text(&mut img, lx, y.saturating_sub(3), &label, 1, style.text);
    }

    // Bars.
    let slot = plot_w / n_days;
    let bar_w = (slot * 3 / 5).max(1);
    let label_every = label_stride(slot, text_width("00-00", 1) + 4);
    for (i, day) in report.days.iter().enumerate() {
        let i = i as u32;
        let x = plot_x + i * slot + (slot - bar_w) / 2;
        let mut top = baseline;
        for bucket in SentimentBucket::ALL {
            let h = scale(day.bucket_count(bucket), max_count, plot_h);
            if h == 0 {
                continue;
            }
            top -= h;
            fill_rect(&mut img, x, top, bar_w, h, style.bucket_color(bucket));
        }

        if i % label_every == 0 {
            let label = day.date.format("%m-%d").to_string();
            let center = plot_x + i * slot + slot / 2;
            let lx = center.saturating_sub(text_width(&label, 1) / 2);
            draw_text(&mut img, lx, baseline + 8, &label, 1, style.text);
        }
    }

    // Axes.
    fill_rect(&mut img, plot_x, plot_y, 1, plot_h + 1, style.axis);
    fill_rect(&mut img, plot_x, baseline, plot_w, 1, style.axis);

    // Legend, top to bottom in reverse stacking order so it reads like the bars.
    let legend_x = plot_x + plot_w + 16;
    for (row, bucket) in SentimentBucket::ALL.iter().rev().enumerate() {
        let y = plot_y + 8 + row as u32 * (SWATCH + 8);
        fill_rect(&mut img, legend_x, y, SWATCH, SWATCH, style.bucket_color(*bucket));
        draw_text(&mut img, legend_x + SWATCH + 6, y + 3, bucket.label(), 1, style.text);
    }

    img
}

/// Render and write the chart into `dir`, returning the written path.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or the PNG cannot be
/// encoded or written.
pub fn save_chart(
    report: &SentimentReport,
    title: &str,
    dir: &Path,
    style: &ChartStyle,
) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).map_err(|e| XsError::path_error("create directory", dir, e))?;
    let path = dir.join(chart_file_name(title));
    let img = render(report, title, style);
    img.save(&path)?;
    info!(path = %path.display(), days = report.days.len(), "Saved chart");
    Ok(path)
}

#[allow(clippy::cast_possible_truncation)]
fn scale(value: u64, max: u64, span: u32) -> u32 {
    (value.min(max) * u64::from(span) / max.max(1)) as u32
}

fn label_stride(slot: u32, label_w: u32) -> u32 {
    if slot >= label_w {
        1
    } else {
        label_w.div_ceil(slot.max(1))
    }
}

fn fill_rect(img: &mut RgbImage, x: u32, y: u32, w: u32, h: u32, color: Rgb<u8>) {
    let x_end = x.saturating_add(w).min(img.width());
    let y_end = y.saturating_add(h).min(img.height());
    for py in y..y_end {
        for px in x..x_end {
            img.put_pixel(px, py, color);
        }
    }
}

// =============================================================================
// Bitmap font
// =============================================================================

const GLYPH_W: u32 = 5;
const GLYPH_H: u32 = 7;
const ADVANCE: u32 = GLYPH_W + 1;

/// Width in pixels of `text` drawn at `scale`.
#[must_use]
pub fn text_width(text: &str, scale: u32) -> u32 {
    let n = u32::try_from(text.chars().count()).unwrap_or(u32::MAX);
    if n == 0 {
        return 0;
    }
    (n * ADVANCE - 1) * scale
}

fn draw_text(img: &mut RgbImage, x: u32, y: u32, text: &str, scale: u32, color: Rgb<u8>) {
    let mut cx = x;
    for ch in text.chars() {
        if let Some(rows) = glyph(ch) {
            for (ry, bits) in (0u32..).zip(rows.iter()) {
                for rx in 0..GLYPH_W {
                    if bits & (1 << (GLYPH_W - 1 - rx)) != 0 {
                        fill_rect(img, cx + rx * scale, y + ry * scale, scale, scale, color);
                    }
                }
            }
        }
        cx += ADVANCE * scale;
    }
}

/// 5x7 glyph rows, most significant of the low five bits is the left column.
/// Lower-case letters use the upper-case shapes; unknown characters are blank.
#[allow(clippy::unreadable_literal)]
const fn glyph(ch: char) -> Option<[u8; GLYPH_H as usize]> {
    let rows = match ch.to_ascii_uppercase() {
        'A' => [0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'B' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10001, 0b10001, 0b11110],
        'C' => [0b01110, 0b10001, 0b10000, 0b10000, 0b10000, 0b10001, 0b01110],
        'D' => [0b11110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b11110],
        'E' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b11111],
        'F' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000],
        'G' => [0b01110, 0b10001, 0b10000, 0b10111, 0b10001, 0b10001, 0b01111],
        'H' => [0b10001, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'I' => [0b01110, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        'J' => [0b00111, 0b00010, 0b00010, 0b00010, 0b00010, 0b10010, 0b01100],
        'K' => [0b10001, 0b10010, 0b10100, 0b11000, 0b10100, 0b10010, 0b10001],
        'L' => [0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b11111],
        'M' => [0b10001, 0b11011, 0b10101, 0b10101, 0b10001, 0b10001, 0b10001],
        'N' => [0b10001, 0b10001, 0b11001, 0b10101, 0b10011, 0b10001, 0b10001],
        'O' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'P' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10000, 0b10000, 0b10000],
        'Q' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10101, 0b10010, 0b01101],
        'R' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10100, 0b10010, 0b10001],
        'S' => [0b01111, 0b10000, 0b10000, 0b01110, 0b00001, 0b00001, 0b11110],
        'T' => [0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100],
        'U' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'V' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01010, 0b00100],
        'W' => [0b10001, 0b10001, 0b10001, 0b10101, 0b10101, 0b10101, 0b01010],
        'X' => [0b10001, 0b10001, 0b01010, 0b00100, 0b01010, 0b10001, 0b10001],
        'Y' => [0b10001, 0b10001, 0b10001, 0b01010, 0b00100, 0b00100, 0b00100],
        'Z' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b10000, 0b11111],
        '0' => [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
        '1' => [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        '2' => [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111],
        '3' => [0b11111, 0b00010, 0b00100, 0b00010, 0b00001, 0b10001, 0b01110],
        '4' => [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
        '5' => [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
        '6' => [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
        '7' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000],
        '8' => [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
        '9' => [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100],
        '-' => [0, 0, 0, 0b11111, 0, 0, 0],
        '_' => [0, 0, 0, 0, 0, 0, 0b11111],
        '.' => [0, 0, 0, 0, 0, 0b01100, 0b01100],
        ':' => [0, 0b01100, 0b01100, 0, 0b01100, 0b01100, 0],
        '/' => [0b00001, 0b00001, 0b00010, 0b00100, 0b01000, 0b10000, 0b10000],
        '!' => [0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0, 0b00100],
        '(' => [0b00010, 0b00100, 0b01000, 0b01000, 0b01000, 0b00100, 0b00010],
        ')' => [0b01000, 0b00100, 0b00010, 0b00010, 0b00010, 0b00100, 0b01000],
        '\'' => [0b00100, 0b00100, 0, 0, 0, 0, 0],
        '#' => [0b01010, 0b01010, 0b11111, 0b01010, 0b11111, 0b01010, 0b01010],
        '@' => [0b01110, 0b10001, 0b10111, 0b10101, 0b10111, 0b10000, 0b01110],
        _ => return None,
    };
    Some(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PostRecord;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn report(scores: &[(u32, f64)]) -> SentimentReport {
        let records: Vec<PostRecord> = scores
            .iter()
            .enumerate()
            .map(|(i, &(day, compound))| PostRecord {
                text: String::new(),
                created_at: Utc.with_ymd_and_hms(2025, 6, day, 12, 0, 0).single().unwrap(),
                id: i as u64,
                favorite_count: 0,
                retweet_count: 0,
                sentiment_compound: compound,
            })
            .collect();
        SentimentReport::compute(&records).unwrap()
    }

    fn count_color(img: &RgbImage, color: Rgb<u8>) -> usize {
        img.pixels().filter(|p| **p == color).count()
    }

    #[test]
    fn file_name_replaces_spaces() {
        assert_eq!(chart_file_name("Lululemon Sentiment"), "Lululemon_Sentiment.png");
        assert_eq!(chart_file_name("one"), "one.png");
        assert_eq!(chart_file_name("a  b"), "a__b.png");
    }

    #[test]
    fn render_uses_default_size() {
        let style = ChartStyle::default();
        let img = render(&report(&[(1, 0.5)]), "Test", &style);
        assert_eq!(img.width(), 640);
        assert_eq!(img.height(), 480);
    }

    #[test]
    fn render_widens_for_many_days() {
        let days: Vec<(u32, f64)> = (1..=30).map(|d| (d, 0.1)).collect();
        let mut style = ChartStyle::default();
        style.min_width = 100;
        let img = render(&report(&days), "Month", &style);
        assert_eq!(img.width(), MARGIN_LEFT + MARGIN_RIGHT + 30 * MIN_SLOT);
    }

    #[test]
    fn absent_buckets_only_appear_in_legend() {
        let style = ChartStyle::default();
        let img = render(&report(&[(1, 0.5), (1, 0.2), (2, 0.9)]), "Only positive", &style);
        let swatch = (SWATCH * SWATCH) as usize;
        assert_eq!(count_color(&img, style.neg), swatch);
        assert_eq!(count_color(&img, style.neutral), swatch);
        assert!(count_color(&img, style.pos) > swatch * 10);
    }

    #[test]
    fn every_bucket_gets_drawn() {
        let style = ChartStyle::default();
        let img = render(&report(&[(1, 0.5), (1, -0.5), (1, 0.0)]), "Mixed", &style);
        let swatch = (SWATCH * SWATCH) as usize;
        for bucket in SentimentBucket::ALL {
            assert!(count_color(&img, style.bucket_color(bucket)) > swatch);
        }
    }

    #[test]
    fn save_chart_writes_png_named_after_title() {
        let dir = TempDir::new().unwrap();
        let figures = dir.path().join("figures");
        let path = save_chart(
            &report(&[(3, -0.2), (4, 0.4)]),
            "Daily Mood",
            &figures,
            &ChartStyle::default(),
        )
        .unwrap();
        assert_eq!(path, figures.join("Daily_Mood.png"));
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn text_width_accounts_for_scale() {
        assert_eq!(text_width("", 2), 0);
        assert_eq!(text_width("A", 1), 5);
        assert_eq!(text_width("AB", 2), 22);
        assert!(glyph('a').is_some());
        assert!(glyph('~').is_none());
    }
}
