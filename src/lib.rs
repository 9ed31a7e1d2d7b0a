//! xsent - daily sentiment of public posts matching a search query
//!
//! This library walks a post-search endpoint backwards in time, scores each
//! post's text, checkpoints the result set to CSV and summarises it per
//! calendar day as a table and a stacked bar chart.
//!
//! # Modules
//!
//! - [`cli`] - Command-line interface definitions
//! - [`config`] - Layered configuration (file, environment, flags)
//! - [`error`] - Custom error types with rich context
//! - [`model`] - Posts, records, cursor state and quota
//! - [`client`] - Search endpoint client
//! - [`sentiment`] - Lexicon-based sentiment scorers
//! - [`fetch`] - Backward-paginating fetch loop
//! - [`storage`] - CSV result set persistence
//! - [`report`] - Per-day aggregation
//! - [`chart`] - PNG stacked bar chart

pub mod chart;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod fetch;
pub mod logging;
pub mod model;
pub mod report;
pub mod sentiment;
pub mod storage;

pub use cli::*;
pub use client::{SearchClient, SearchRequest, TwitterClient};
pub use config::Config;
pub use error::{EXIT_USAGE, Result, XsError, format_error};
pub use fetch::{Checkpoint, FetchLoop, FetchPlan, PageEvent};
pub use model::*;
pub use report::SentimentReport;
pub use sentiment::{CompoundScorer, PolarityScorer, SentimentScorer};
pub use storage::CsvCheckpoint;

/// Default CSV file name inside the data directory
pub const DEFAULT_CSV_NAME: &str = "tweets.csv";

/// Default directory for CSV output
pub const DEFAULT_DATA_DIR: &str = "data";

/// Default directory for chart output
pub const DEFAULT_FIGURES_DIR: &str = "figures";

/// Standard width for content dividers in CLI output
pub const CONTENT_DIVIDER_WIDTH: usize = 60;

/// Format an unsigned integer with thousands separators.
#[must_use]
pub fn format_number(value: u64) -> String {
    let mut out = String::with_capacity(24);

    for (idx, ch) in value.to_string().chars().rev().enumerate() {
        if idx > 0 && idx % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }

    out.chars().rev().collect()
}

/// Format a usize with thousands separators.
#[must_use]
pub fn format_count(value: usize) -> String {
    format_number(u64::try_from(value).unwrap_or(u64::MAX))
}

/// Format a compound score with an explicit sign, e.g. `+0.2500`.
#[must_use]
pub fn format_score(score: f64) -> String {
    format!("{score:+.4}")
}
