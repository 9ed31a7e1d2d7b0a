//! Daily sentiment reporting.
//!
//! Turns a result set into per-day mean sentiment, an overall mean, and
//! per-day counts of positive / negative / neutral posts. Days are always
//! ordered oldest first.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::{Result, XsError};
use crate::model::{PostRecord, SentimentBucket};

/// Sentiment figures for one calendar day.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DailySentiment {
    pub date: NaiveDate,
    /// Mean compound score over the day's posts.
    pub mean: f64,
    pub count: u64,
    pub pos: u64,
    pub neg: u64,
    pub neutral: u64,
}

impl DailySentiment {
    /// Post count for one bucket.
    #[must_use]
    pub const fn bucket_count(&self, bucket: SentimentBucket) -> u64 {
        match bucket {
            SentimentBucket::Pos => self.pos,
            SentimentBucket::Neg => self.neg,
            SentimentBucket::Neutral => self.neutral,
        }
    }
}

/// The full report over a result set.
#[derive(Debug, Clone, Serialize)]
pub struct SentimentReport {
    pub days: Vec<DailySentiment>,
    /// Mean compound score over all posts (not a mean of daily means).
    pub overall_mean: f64,
    pub total: u64,
}

#[derive(Default)]
struct DayAccumulator {
    sum: f64,
    count: u64,
    buckets: [u64; 3],
}

impl SentimentReport {
    /// Compute the report.
    ///
    /// # Errors
    ///
    /// Returns [`XsError::EmptyResultSet`] when `records` is empty, since no
    /// mean is defined.
    #[allow(clippy::cast_precision_loss)]
    pub fn compute(records: &[PostRecord]) -> Result<Self> {
        if records.is_empty() {
            return Err(XsError::EmptyResultSet);
        }

        let mut by_day: BTreeMap<NaiveDate, DayAccumulator> = BTreeMap::new();
        for record in records {
            let acc = by_day.entry(record.date()).or_default();
            acc.sum += record.sentiment_compound;
            acc.count += 1;
            acc.buckets[bucket_index(record.bucket())] += 1;
        }

        let days: Vec<DailySentiment> = by_day
            .into_iter()
            .map(|(date, acc)| DailySentiment {
                date,
                mean: acc.sum / acc.count as f64,
                count: acc.count,
                neg: acc.buckets[bucket_index(SentimentBucket::Neg)],
                neutral: acc.buckets[bucket_index(SentimentBucket::Neutral)],
                pos: acc.buckets[bucket_index(SentimentBucket::Pos)],
            })
            .collect();

        let total = records.len() as u64;
        let overall_mean =
            records.iter().map(|r| r.sentiment_compound).sum::<f64>() / total as f64;

        Ok(Self {
            days,
            overall_mean,
            total,
        })
    }

    /// Largest single-day post count.
    #[must_use]
    pub fn max_day_count(&self) -> u64 {
        self.days.iter().map(|d| d.count).max().unwrap_or(0)
    }
}

const fn bucket_index(bucket: SentimentBucket) -> usize {
    match bucket {
        SentimentBucket::Neg => 0,
        SentimentBucket::Neutral => 1,
        SentimentBucket::Pos => 2,
    }
}

/// Render the per-day table printed to the console.
#[must_use]
pub fn format_daily_table(report: &SentimentReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<12} {:>9} {:>7} {:>6} {:>6} {:>8}",
        "date", "mean", "posts", "pos", "neg", "neutral"
    );
    for day in &report.days {
        let _ = writeln!(
            out,
            "{:<12} {:>9.4} {:>7} {:>6} {:>6} {:>8}",
            day.date.format("%Y-%m-%d"),
            day.mean,
            day.count,
            day.pos,
            day.neg,
            day.neutral
        );
    }
    out
}

/// Generate a sparkline (using Unicode block characters).
///
/// # Arguments
/// * `values` - The values to visualize
/// * `width` - Maximum width of the sparkline
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn sparkline(values: &[u64], width: usize) -> String {
    if values.is_empty() || width == 0 {
        return String::new();
    }

    let blocks = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

    // Bucket values if we have more than width
    let bucketed: Vec<u64> = if values.len() <= width {
        values.to_vec()
    } else {
        let bucket_size = values.len().div_ceil(width);
        values
            .chunks(bucket_size)
            .map(|chunk| chunk.iter().sum::<u64>() / chunk.len() as u64)
            .collect()
    };

    let max = *bucketed.iter().max().unwrap_or(&1);
    if max == 0 {
        return "▁".repeat(bucketed.len().min(width));
    }

    bucketed
        .iter()
        .take(width)
        .map(|&v| {
            let idx = ((v as f64 / max as f64) * 7.0) as usize;
            blocks[idx.min(7)]
        })
        .collect()
}

/// Sparkline of posts per day, oldest first.
#[must_use]
pub fn volume_sparkline(report: &SentimentReport, width: usize) -> String {
    let values: Vec<u64> = report.days.iter().map(|d| d.count).collect();
    sparkline(&values, width)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn record(day: u32, hour: u32, compound: f64) -> PostRecord {
        PostRecord {
            text: String::new(),
            created_at: Utc.with_ymd_and_hms(2025, 6, day, hour, 0, 0).single().unwrap(),
            id: u64::from(day * 100 + hour),
            favorite_count: 0,
            retweet_count: 0,
            sentiment_compound: compound,
        }
    }

    #[test]
    fn empty_result_set_is_an_error() {
        assert!(matches!(
            SentimentReport::compute(&[]),
            Err(XsError::EmptyResultSet)
        ));
    }

    #[test]
    fn groups_by_day_in_ascending_order() {
        // newest-first, like the fetch loop produces
        let records = vec![
            record(3, 10, 0.5),
            record(3, 9, -0.5),
            record(2, 23, 0.0),
            record(1, 1, 0.9),
        ];
        let report = SentimentReport::compute(&records).unwrap();

        let dates: Vec<u32> = report.days.iter().map(|d| chrono::Datelike::day(&d.date)).collect();
        assert_eq!(dates, vec![1, 2, 3]);
        assert!((report.days[2].mean - 0.0).abs() < 1e-12);
        assert_eq!(report.days[2].count, 2);
        assert!((report.days[0].mean - 0.9).abs() < 1e-12);
        assert_eq!(report.total, 4);
        assert!((report.overall_mean - 0.225).abs() < 1e-12);
    }

    #[test]
    fn bucket_counts_partition_each_day() {
        let records = vec![
            record(5, 1, 0.0),
            record(5, 2, 0.0001),
            record(5, 3, -0.0001),
            record(5, 4, 0.7),
            record(5, 5, 0.0),
        ];
        let report = SentimentReport::compute(&records).unwrap();
        let day = &report.days[0];
        assert_eq!(day.pos, 2);
        assert_eq!(day.neg, 1);
        assert_eq!(day.neutral, 2);
        assert_eq!(day.pos + day.neg + day.neutral, day.count);
        assert_eq!(day.bucket_count(SentimentBucket::Neutral), 2);
    }

    #[test]
    fn max_day_count_picks_busiest_day() {
        let records = vec![record(1, 1, 0.1), record(2, 1, 0.1), record(2, 2, 0.1)];
        let report = SentimentReport::compute(&records).unwrap();
        assert_eq!(report.max_day_count(), 2);
    }

    #[test]
    fn daily_table_lists_every_day() {
        let records = vec![record(1, 1, 0.25), record(2, 1, -0.5)];
        let table = format_daily_table(&SentimentReport::compute(&records).unwrap());
        assert!(table.starts_with("date"));
        assert!(table.contains("2025-06-01"));
        assert!(table.contains("0.2500"));
        assert!(table.contains("-0.5000"));
        assert_eq!(table.lines().count(), 3);
    }

    #[test]
    fn test_sparkline_empty() {
        assert_eq!(sparkline(&[], 10), "");
    }

    #[test]
    fn test_sparkline_values() {
        let values = vec![1, 5, 10, 8, 3, 1];
        let result = sparkline(&values, 6);
        assert_eq!(result.chars().count(), 6);
        assert!(result.contains('█'));
        assert!(result.contains('▁'));
    }

    #[test]
    fn test_sparkline_all_zeros() {
        assert_eq!(sparkline(&[0, 0, 0, 0], 4), "▁▁▁▁");
    }

    #[test]
    fn test_sparkline_bucketing() {
        let values: Vec<u64> = (1..=12).collect();
        assert_eq!(sparkline(&values, 6).chars().count(), 6);
    }
}
