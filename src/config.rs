//! Configuration system for xsent.
//!
//! Provides layered configuration from multiple sources:
//!
//! 1. **Compiled defaults** - Sensible defaults built into the binary
//! 2. **User config file** - `~/.config/xsent/config.toml`
//! 3. **Explicit config file** - `--config <path>`
//! 4. **Environment variables** - `XSENT_*` prefix
//! 5. **CLI arguments** - Highest priority, always wins
//!
//! Files are merged key by key: a key set in the explicit file overrides the
//! same key from the user file, and every key it leaves out keeps the user
//! file's value.
//!
//! The resulting [`Config`] is built once at startup and passed by reference
//! into the fetch and report stages.
//!
//! # Example Configuration File
//!
//! ```toml
//! [query]
//! terms = ["@lululemon", "lululemon"]
//! lang = "en"
//!
//! [fetch]
//! tweets_per_day = 500   # -1 for unlimited
//!
//! [output]
//! csv = "lululemon.csv"
//! chart_title = "Lululemon Sentiment"
//!
//! [api]
//! key = "..."
//! secret = "..."
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{Result, XsError};
use crate::model::Quota;

/// Placeholder shown instead of credentials.
const REDACTED: &str = "<redacted>";

/// Main configuration structure for xsent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// What to search for.
    pub query: QueryConfig,
    /// Pagination and quota behaviour.
    pub fetch: FetchConfig,
    /// Where results and charts go.
    pub output: OutputConfig,
    /// Search endpoint credentials and transport settings.
    pub api: ApiConfig,
}

/// Search predicate. Opaque to the fetch loop beyond being passed along.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Query terms, combined with OR.
    /// Environment variable: `XSENT_QUERY` (comma-separated)
    pub terms: Vec<String>,

    /// Restrict to a language code, e.g. `en`.
    pub lang: Option<String>,

    /// Geofilter as `lat,long,radius`, e.g. `37.78,-122.39,1mi`.
    pub geocode: Option<String>,

    /// `recent`, `popular` or `mixed`.
    pub result_type: Option<String>,
}

/// Fetch loop behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Posts per day before stepping back a day; `-1` means unlimited.
    /// Environment variable: `XSENT_TWEETS_PER_DAY`
    pub tweets_per_day: Quota,

    /// Stop after this many pages even if the endpoint has more.
    pub max_pages: Option<usize>,
}

/// Output locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// CSV file name, relative to `data_dir`.
    /// Environment variable: `XSENT_OUTPUT_CSV`
    pub csv: String,

    /// Directory the CSV is written into.
    /// Environment variable: `XSENT_DATA_DIR`
    pub data_dir: PathBuf,

    /// Directory charts are written into.
    /// Environment variable: `XSENT_FIGURES_DIR`
    pub figures_dir: PathBuf,

    /// Chart title; also determines the chart file name.
    /// Environment variable: `XSENT_CHART_TITLE`
    pub chart_title: String,

    /// Enable colored output.
    pub colors: bool,
}

/// Search endpoint settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Consumer key. Environment variable: `XSENT_API_KEY`
    pub key: Option<String>,

    /// Consumer secret. Environment variable: `XSENT_API_SECRET`
    pub secret: Option<String>,

    /// Endpoint root, without trailing slash.
    pub base_url: String,

    /// Per-request timeout. A rate-limit wait is not counted against it.
    pub timeout_secs: u64,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("key", &self.key.as_ref().map(|_| REDACTED))
            .field("secret", &self.secret.as_ref().map(|_| REDACTED))
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            tweets_per_day: Quota::default(),
            max_pages: None,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            csv: crate::DEFAULT_CSV_NAME.to_string(),
            data_dir: PathBuf::from(crate::DEFAULT_DATA_DIR),
            figures_dir: PathBuf::from(crate::DEFAULT_FIGURES_DIR),
            chart_title: "Daily Sentiment".to_string(),
            colors: true,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            key: None,
            secret: None,
            base_url: "https://api.twitter.com".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables
    /// 2. `explicit` config file, if given
    /// 3. User config file (~/.config/xsent/config.toml)
    /// 4. Compiled defaults
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly named file is missing or any config
    /// file or environment variable fails to parse.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut layers: Vec<PathBuf> = Self::user_config_path()
            .filter(|path| path.exists())
            .into_iter()
            .collect();

        if let Some(path) = explicit {
            if !path.exists() {
                return Err(XsError::ConfigError {
                    path: path.to_path_buf(),
                    reason: "file not found".to_string(),
                });
            }
            layers.push(path.to_path_buf());
        }

        let mut config = Self::load_layers(&layers)?;
        config.apply_env_overrides()?;

        debug!("Configuration loaded: {:?}", config);
        Ok(config)
    }

    /// Load config files in order, each overriding the keys it sets.
    ///
    /// An empty list yields the compiled defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a file cannot be read, is not valid TOML, or holds
    /// a value of the wrong type.
    pub fn load_layers(paths: &[PathBuf]) -> Result<Self> {
        let mut merged = toml::Table::new();
        for path in paths {
            merge_tables(&mut merged, Self::read_layer(path)?);
        }
        toml::Value::Table(merged)
            .try_into::<Self>()
            .map_err(|e| XsError::ConfigError {
                path: paths.last().cloned().unwrap_or_default(),
                reason: e.to_string(),
            })
    }

    /// Read one config file as a raw table, checked against the schema on its
    /// own so errors name the file they come from.
    fn read_layer(path: &Path) -> Result<toml::Table> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| XsError::path_error("read", path, e))?;
        let config_error = |reason: String| XsError::ConfigError {
            path: path.to_path_buf(),
            reason,
        };
        let table: toml::Table = content
            .parse()
            .map_err(|e: toml::de::Error| config_error(e.to_string()))?;
        toml::Value::Table(table.clone())
            .try_into::<Self>()
            .map_err(|e| config_error(e.to_string()))?;
        info!("Loaded config from: {}", path.display());
        Ok(table)
    }

    /// Get the path to the user configuration file.
    #[must_use]
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("xsent").join("config.toml"))
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|var| std::env::var(var).ok())
    }

    /// Apply overrides from a variable lookup; split out so tests need not
    /// touch the process environment.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(key) = lookup("XSENT_API_KEY") {
            self.api.key = Some(key);
        }
        if let Some(secret) = lookup("XSENT_API_SECRET") {
            self.api.secret = Some(secret);
        }
        if let Some(query) = lookup("XSENT_QUERY") {
            self.query.terms = query
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(quota) = lookup("XSENT_TWEETS_PER_DAY") {
            let n: i64 = quota.trim().parse().map_err(|_| XsError::EnvVarError {
                var: "XSENT_TWEETS_PER_DAY".to_string(),
                reason: format!("'{quota}' is not an integer"),
            })?;
            self.fetch.tweets_per_day =
                Quota::try_from(n).map_err(|reason| XsError::EnvVarError {
                    var: "XSENT_TWEETS_PER_DAY".to_string(),
                    reason,
                })?;
        }
        if let Some(csv) = lookup("XSENT_OUTPUT_CSV") {
            self.output.csv = csv;
        }
        if let Some(title) = lookup("XSENT_CHART_TITLE") {
            self.output.chart_title = title;
        }
        if let Some(dir) = lookup("XSENT_DATA_DIR") {
            self.output.data_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("XSENT_FIGURES_DIR") {
            self.output.figures_dir = PathBuf::from(dir);
        }
        if lookup("XSENT_NO_COLOR").is_some() || lookup("NO_COLOR").is_some() {
            self.output.colors = false;
        }
        Ok(())
    }

    /// Check that everything a fetch run needs is present and sane.
    ///
    /// # Errors
    ///
    /// Returns [`XsError::InvalidConfigValue`] naming the first bad key.
    pub fn validate_for_fetch(&self) -> Result<()> {
        if self.query.terms.iter().all(|t| t.trim().is_empty()) {
            return Err(XsError::invalid_config(
                "query.terms",
                "at least one search term is required",
            ));
        }
        if self.fetch.max_pages == Some(0) {
            return Err(XsError::invalid_config(
                "fetch.max_pages",
                "must be at least 1 when set",
            ));
        }
        self.validate_output()?;
        if self.api.key.as_deref().is_none_or(str::is_empty)
            || self.api.secret.as_deref().is_none_or(str::is_empty)
        {
            return Err(XsError::auth(
                "api.key and api.secret (or XSENT_API_KEY / XSENT_API_SECRET) are required",
            ));
        }
        Ok(())
    }

    /// Check the output section; used by both `fetch` and `report`.
    ///
    /// # Errors
    ///
    /// Returns [`XsError::InvalidConfigValue`] naming the first bad key.
    pub fn validate_output(&self) -> Result<()> {
        if self.output.csv.trim().is_empty() {
            return Err(XsError::invalid_config("output.csv", "file name is empty"));
        }
        if self.output.chart_title.trim().is_empty() {
            return Err(XsError::invalid_config("output.chart_title", "title is empty"));
        }
        Ok(())
    }

    /// The search query string: terms joined with ` OR `.
    #[must_use]
    pub fn query_string(&self) -> String {
        self.query
            .terms
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" OR ")
    }

    /// Full path of the output CSV.
    #[must_use]
    pub fn csv_path(&self) -> PathBuf {
        self.output.data_dir.join(&self.output.csv)
    }

    /// Full path of the chart image.
    #[must_use]
    pub fn chart_path(&self) -> PathBuf {
        self.output
            .figures_dir
            .join(crate::chart::chart_file_name(&self.output.chart_title))
    }

    /// Save the current configuration to `path`, credentials excluded.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory cannot be created or the file
    /// cannot be written.
    pub fn save_template(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| XsError::path_error("create directory", parent, e))?;
        }
        std::fs::write(path, Self::default_config_content())
            .map_err(|e| XsError::path_error("write", path, e))?;
        info!("Saved config to: {}", path.display());
        Ok(())
    }

    /// Generate a default configuration file content.
    #[must_use]
    pub fn default_config_content() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }

    /// A copy with the API key and secret masked, for display.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut shown = self.clone();
        shown.api.key = shown.api.key.as_ref().map(|_| REDACTED.to_string());
        shown.api.secret = shown.api.secret.as_ref().map(|_| REDACTED.to_string());
        shown
    }

    /// Render the effective configuration as TOML with secrets masked.
    #[must_use]
    pub fn redacted_toml(&self) -> String {
        toml::to_string_pretty(&self.redacted()).unwrap_or_default()
    }
}

/// Overlay `layer` onto `base`: nested tables merge, other values replace.
fn merge_tables(base: &mut toml::Table, layer: toml::Table) {
    for (key, value) in layer {
        match value {
            toml::Value::Table(incoming) => {
                if let Some(toml::Value::Table(existing)) = base.get_mut(&key) {
                    merge_tables(existing, incoming);
                } else {
                    base.insert(key, toml::Value::Table(incoming));
                }
            }
            other => {
                base.insert(key, other);
            }
        }
    }
}
