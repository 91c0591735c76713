//! Logging setup for the postsweep binary
//!
//! Everything the scheduler reports goes through `tracing` to stderr, so
//! stdout stays free for command output. The format is chosen once here:
//! - Text (default), JSON, or pretty-printed output
//! - `RUST_LOG` overrides the configured level
//!
//! # Examples
//!
//! ```no_run
//! use libpostsweep::logging::{LoggingConfig, LogFormat};
//!
//! let config = LoggingConfig::new(LogFormat::Json, "info".to_string(), false);
//! config.init();
//! ```

use std::fmt;
use std::str::FromStr;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

pub const LOG_FORMAT_VAR: &str = "POSTSWEEP_LOG_FORMAT";
pub const LOG_LEVEL_VAR: &str = "POSTSWEEP_LOG_LEVEL";

const DEFAULT_LEVEL: &str = "info";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One plain line per event, no colors
    #[default]
    Text,
    /// One JSON object per line
    Json,
    /// Multi-line, colored, with source locations
    Pretty,
}

impl LogFormat {
    const ALL: [LogFormat; 3] = [LogFormat::Text, LogFormat::Json, LogFormat::Pretty];

    fn as_str(self) -> &'static str {
        match self {
            LogFormat::Text => "text",
            LogFormat::Json => "json",
            LogFormat::Pretty => "pretty",
        }
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|format| format.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                format!(
                    "Invalid log format: '{}'. Valid options: text, json, pretty",
                    s
                )
            })
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the binary wants its log output
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,
    pub level: String,
    pub verbose: bool,
    /// Why the format from the environment was ignored, reported once logging is up
    rejected_format: Option<String>,
}

impl LoggingConfig {
    /// `verbose` forces the debug level regardless of `level`
    pub fn new(format: LogFormat, level: String, verbose: bool) -> Self {
        Self {
            format,
            level,
            verbose,
            rejected_format: None,
        }
    }

    /// Build a configuration from `POSTSWEEP_LOG_FORMAT` / `POSTSWEEP_LOG_LEVEL`
    ///
    /// Missing values fall back to text at info level. An unrecognized
    /// format also falls back to text, and [`init`](Self::init) warns about it.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let level = lookup(LOG_LEVEL_VAR).unwrap_or_else(|| DEFAULT_LEVEL.to_string());
        let mut config = Self::new(LogFormat::default(), level, false);

        if let Some(raw) = lookup(LOG_FORMAT_VAR) {
            match raw.parse() {
                Ok(format) => config.format = format,
                Err(e) => {
                    config.rejected_format = Some(format!("{} (from {})", e, LOG_FORMAT_VAR))
                }
            }
        }

        config
    }

    /// Use `format`, superseding whatever the environment asked for
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self.rejected_format = None;
        self
    }

    /// The environment's format value, if it was ignored
    pub fn rejected_format(&self) -> Option<&str> {
        self.rejected_format.as_deref()
    }

    /// The filter directive this configuration asks for
    pub fn directive(&self) -> &str {
        if self.verbose {
            "debug"
        } else {
            &self.level
        }
    }

    /// Install the global subscriber
    ///
    /// # Panics
    ///
    /// Panics if a global subscriber is already installed.
    pub fn init(&self) {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.directive()));

        let layer: Box<dyn Layer<Registry> + Send + Sync> = match self.format {
            LogFormat::Json => tracing_subscriber::fmt::layer()
                .json()
                .flatten_event(true)
                .with_current_span(true)
                .with_span_list(true)
                .with_writer(std::io::stderr)
                .with_filter(filter)
                .boxed(),
            LogFormat::Pretty => tracing_subscriber::fmt::layer()
                .pretty()
                .with_file(true)
                .with_line_number(true)
                .with_writer(std::io::stderr)
                .with_filter(filter)
                .boxed(),
            LogFormat::Text => tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(std::io::stderr)
                .with_filter(filter)
                .boxed(),
        };

        tracing_subscriber::registry().with(layer).init();

        if let Some(reason) = &self.rejected_format {
            tracing::warn!("{}; using {} output", reason, self.format);
        }
    }
}
