//! Logging setup for xsent.
//!
//! Structured logging via `tracing`. Logs always go to stderr so that
//! `--format json` output on stdout stays machine-readable.
//!
//! # Usage
//!
//! ```rust
//! use xsent::logging::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::default());
//! tracing::info!("Application started");
//! ```

use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Minimum log level to display.
    pub level: LogLevel,
    /// Output format for log messages.
    pub format: LogFormat,
    /// Include timestamps in log output.
    pub timestamps: bool,
    /// Include target (module path) in log output.
    pub target: bool,
    /// Emit span close events with timings.
    pub spans: bool,
    /// Enable ANSI colors in output.
    pub colors: bool,
}

/// Log level configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line, human-readable.
    Pretty,
    /// Single line per event.
    Compact,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Warn,
            format: LogFormat::Compact,
            timestamps: false,
            target: false,
            spans: false,
            colors: true,
        }
    }
}

impl LogConfig {
    /// Pick a preset from the CLI flags: `-q` wins over `-v`, `-v` shows
    /// info, `-vv` debug (including per-post scores), `-vvv` trace.
    #[must_use]
    pub fn from_verbosity(quiet: bool, verbose: u8, colors: bool) -> Self {
        let base = Self {
            colors,
            ..Self::default()
        };
        if quiet {
            return Self {
                level: LogLevel::Error,
                ..base
            };
        }
        match verbose {
            0 => base,
            1 => Self {
                level: LogLevel::Info,
                timestamps: true,
                ..base
            },
            2 => Self {
                level: LogLevel::Debug,
                timestamps: true,
                target: true,
                ..base
            },
            _ => Self {
                level: LogLevel::Trace,
                format: LogFormat::Pretty,
                timestamps: true,
                target: true,
                spans: true,
                ..base
            },
        }
    }
}

impl LogLevel {
    /// Convert to env filter directive string.
    const fn to_filter_string(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

/// Build the filter: `RUST_LOG` if set, else `xsent=<level>`.
fn env_filter(level: LogLevel) -> EnvFilter {
    if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new(format!("xsent={}", level.to_filter_string()))
    }
}

/// Initialize the logging system with the given configuration.
///
/// Subsequent calls are ignored.
pub fn init_logging(config: &LogConfig) {
    let span_events = if config.spans {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(config.colors)
        .with_target(config.target)
        .with_span_events(span_events);

    let registry = tracing_subscriber::registry().with(env_filter(config.level));

    match (config.format, config.timestamps) {
        (LogFormat::Pretty, true) => registry.with(layer.pretty()).try_init().ok(),
        (LogFormat::Pretty, false) => registry.with(layer.pretty().without_time()).try_init().ok(),
        (LogFormat::Compact, true) => registry.with(layer.compact()).try_init().ok(),
        (LogFormat::Compact, false) => {
            registry.with(layer.compact().without_time()).try_init().ok()
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert_eq!(config.level, LogLevel::Warn);
        assert_eq!(config.format, LogFormat::Compact);
        assert!(config.colors);
    }

    #[test]
    fn test_verbosity_presets() {
        assert_eq!(LogConfig::from_verbosity(false, 0, true).level, LogLevel::Warn);
        assert_eq!(LogConfig::from_verbosity(false, 1, true).level, LogLevel::Info);
        assert_eq!(LogConfig::from_verbosity(false, 2, true).level, LogLevel::Debug);
        let trace = LogConfig::from_verbosity(false, 5, false);
        assert_eq!(trace.level, LogLevel::Trace);
        assert_eq!(trace.format, LogFormat::Pretty);
        assert!(!trace.colors);
    }

    #[test]
    fn test_quiet_wins_over_verbose() {
        assert_eq!(LogConfig::from_verbosity(true, 3, true).level, LogLevel::Error);
    }

    #[test]
    fn test_init_twice_is_harmless() {
        let quiet = LogConfig::from_verbosity(true, 0, false);
        init_logging(&quiet);
        init_logging(&quiet);
    }

    #[test]
    fn test_level_filter_strings() {
        assert_eq!(LogLevel::Debug.to_filter_string(), "debug");
        assert_eq!(LogLevel::Error.to_filter_string(), "error");
    }
}
