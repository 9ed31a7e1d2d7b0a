//! CLI definitions for xsent.
//!
//! Uses clap for argument parsing with derive macros.

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::Config;
use crate::error::{Result, XsError};
use crate::model::Quota;

/// xsent - daily sentiment of posts matching a search query
#[derive(Parser, Debug)]
#[command(name = "xsent")]
#[command(version)]
#[command(about = "Fetch posts matching a query and chart their daily sentiment")]
#[command(long_about = r#"
xsent walks a post-search endpoint backwards from today, scores every
original post (reshares are skipped), saves the results to CSV and
draws a stacked bar chart of positive / neutral / negative posts per day.

Quick start:
  1. export XSENT_API_KEY=... XSENT_API_SECRET=...
  2. xsent fetch --query "@lululemon,lululemon" --tweets-per-day 500
  3. xsent report data/tweets.csv --title "Lululemon Sentiment"
"#)]
pub struct Cli {
    /// Path to a config file (overrides ~/.config/xsent/config.toml)
    #[arg(long, short = 'c', env = "XSENT_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format for summaries
    #[arg(long, short = 'f', default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(long, short = 'v', action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Be quiet (suppress non-error output)
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch matching posts, score them and save CSV + chart
    Fetch(FetchArgs),

    /// Summarise an existing CSV and draw its chart
    Report(ReportArgs),

    /// Show config locations and output paths, or initialise a config file
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args, Debug, Default)]
pub struct FetchArgs {
    /// Search terms, comma-separated; combined with OR
    #[arg(long, short = 'Q', value_delimiter = ',')]
    pub query: Option<Vec<String>>,

    /// Posts to keep per day before stepping back a day (-1 for unlimited)
    #[arg(long, short = 'n', allow_hyphen_values = true)]
    pub tweets_per_day: Option<i64>,

    /// Stop after this many pages
    #[arg(long)]
    pub max_pages: Option<usize>,

    /// Language filter, e.g. "en"
    #[arg(long)]
    pub lang: Option<String>,

    /// CSV file name inside the data directory
    #[arg(long, short = 'o')]
    pub output: Option<String>,

    /// Chart title (also names the chart file)
    #[arg(long, short = 't')]
    pub title: Option<String>,

    /// Skip drawing the chart
    #[arg(long)]
    pub no_chart: bool,
}

#[derive(Args, Debug, Default)]
pub struct ReportArgs {
    /// CSV to summarise (defaults to the configured output CSV)
    pub csv: Option<PathBuf>,

    /// Chart title (also names the chart file)
    #[arg(long, short = 't')]
    pub title: Option<String>,

    /// Directory to write the chart into
    #[arg(long)]
    pub figures_dir: Option<PathBuf>,

    /// Skip drawing the chart
    #[arg(long)]
    pub no_chart: bool,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Also print the full effective configuration (credentials masked)
    #[arg(long)]
    pub show: bool,

    /// Write a default config file to the user config path
    #[arg(long)]
    pub init: bool,

    /// Overwrite an existing file with --init
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl FetchArgs {
    /// Apply these flags on top of `config`; flags always win.
    ///
    /// # Errors
    ///
    /// Returns [`XsError::InvalidArgument`] for an invalid `--tweets-per-day`.
    pub fn apply_to(&self, config: &mut Config) -> Result<()> {
        if let Some(terms) = &self.query {
            config.query.terms.clone_from(terms);
        }
        if let Some(n) = self.tweets_per_day {
            config.fetch.tweets_per_day = Quota::try_from(n)
                .map_err(|reason| XsError::invalid_argument(format!("--tweets-per-day: {reason}")))?;
        }
        if self.max_pages.is_some() {
            config.fetch.max_pages = self.max_pages;
        }
        if self.lang.is_some() {
            config.query.lang.clone_from(&self.lang);
        }
        if let Some(output) = &self.output {
            config.output.csv.clone_from(output);
        }
        if let Some(title) = &self.title {
            config.output.chart_title.clone_from(title);
        }
        Ok(())
    }
}

impl ReportArgs {
    /// Apply these flags on top of `config`.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(title) = &self.title {
            config.output.chart_title.clone_from(title);
        }
        if let Some(dir) = &self.figures_dir {
            config.output.figures_dir.clone_from(dir);
        }
    }
}
