//! Custom error types for xsent.
//!
//! Provides structured error handling with detailed context for better
//! diagnostics and user experience.

use std::path::PathBuf;
use thiserror::Error;

/// Primary error type for xsent operations.
///
/// Each variant provides specific context about what went wrong,
/// enabling better error messages and programmatic error handling.
#[derive(Error, Debug)]
pub enum XsError {
    // =========================================================================
    // Search Endpoint Errors
    // =========================================================================
    /// The endpoint rejected the credentials or the token exchange failed.
    #[error("Authentication failed: {reason}")]
    Auth { reason: String },

    /// The endpoint answered with a non-success status.
    #[error("Search API returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The endpoint answered with a body we could not understand.
    #[error("Unexpected search API response: {reason}")]
    InvalidResponse { reason: String },

    /// Transport-level failure (DNS, TLS, timeout, ...).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // =========================================================================
    // Result Set Errors
    // =========================================================================
    /// A CSV file could not be parsed back into records.
    #[error("Malformed CSV '{path}' at line {line}: {reason}")]
    Csv {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    /// No records to report on.
    #[error("Result set is empty, nothing to report")]
    EmptyResultSet,

    /// Chart rendering or encoding failed.
    #[error("Failed to render chart: {0}")]
    Chart(#[from] image::ImageError),

    // =========================================================================
    // IO Errors
    // =========================================================================
    /// Path-specific IO error with context.
    #[error("Failed to {operation} '{path}': {source}")]
    PathError {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Configuration file parsing error.
    #[error("Invalid configuration in '{path}': {reason}")]
    ConfigError { path: PathBuf, reason: String },

    /// A configuration value is missing or out of range.
    #[error("Invalid configuration value for {key}: {reason}")]
    InvalidConfigValue { key: &'static str, reason: String },

    /// Environment variable error.
    #[error("Invalid environment variable {var}: {reason}")]
    EnvVarError { var: String, reason: String },

    // =========================================================================
    // CLI Errors
    // =========================================================================
    /// Invalid command-line argument.
    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },
}

/// Result type alias for xsent operations.
pub type Result<T> = std::result::Result<T, XsError>;

/// Process exit code for errors the user can fix by changing input or config.
pub const EXIT_USAGE: u8 = 2;

impl XsError {
    /// Create an authentication error.
    pub fn auth(reason: impl Into<String>) -> Self {
        Self::Auth {
            reason: reason.into(),
        }
    }

    /// Create an API status error.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create an invalid response error.
    pub fn invalid_response(reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            reason: reason.into(),
        }
    }

    /// Create a CSV parse error.
    pub fn csv(path: impl Into<PathBuf>, line: usize, reason: impl Into<String>) -> Self {
        Self::Csv {
            path: path.into(),
            line,
            reason: reason.into(),
        }
    }

    /// Create an invalid configuration value error.
    pub fn invalid_config(key: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            key,
            reason: reason.into(),
        }
    }

    /// Create an invalid argument error.
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Create a path error with context.
    pub fn path_error(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::PathError {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Check if this error is recoverable (user can fix it).
    ///
    /// The binary exits with [`EXIT_USAGE`] for these and with 1 otherwise.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Auth { .. }
                | Self::ConfigError { .. }
                | Self::InvalidConfigValue { .. }
                | Self::EnvVarError { .. }
                | Self::InvalidArgument { .. }
                | Self::EmptyResultSet
        )
    }

    /// Get a suggestion for how to fix this error, if applicable.
    #[must_use]
    pub const fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::Auth { .. } => Some(
                "Check XSENT_API_KEY / XSENT_API_SECRET or the [api] section of your config.",
            ),
            Self::InvalidConfigValue { .. } | Self::ConfigError { .. } => {
                Some("Run 'xsent config --show' to inspect the effective configuration.")
            }
            Self::EmptyResultSet => {
                Some("Run 'xsent fetch' first, or point 'xsent report' at a non-empty CSV.")
            }
            Self::Csv { .. } => Some("Re-run 'xsent fetch' to regenerate the CSV file."),
            _ => None,
        }
    }
}

// =============================================================================
// CLI Error Formatting Utilities
// =============================================================================

use colored::Colorize;

/// Format a structured CLI error with explanation and suggestions.
///
/// # Arguments
/// * `title` - Brief error title (e.g., "Fetch aborted")
/// * `explanation` - What went wrong and why
/// * `suggestions` - List of actionable suggestions
#[must_use]
pub fn format_error(title: &str, explanation: &str, suggestions: &[&str]) -> String {
    use std::fmt::Write;

    let mut output = format!("{} {}", "✗".red().bold(), title.bold());

    if !explanation.is_empty() {
        let _ = write!(output, "\n\n   {explanation}");
    }

    if !suggestions.is_empty() {
        output.push_str("\n\n   ");
        if suggestions.len() == 1 {
            let _ = write!(output, "{} {}", "Hint:".cyan(), suggestions[0]);
        } else {
            let _ = write!(output, "{}:", "Try".cyan());
            for suggestion in suggestions {
                let _ = write!(output, "\n     {} {}", "•".dimmed(), suggestion);
            }
        }
    }

    output
}
