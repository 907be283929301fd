//! Structured logging using the tracing crate
//!
//! Logs always go to stderr so that hosts printing responses on stdout (the
//! CLI does) keep a clean, parseable output stream.
//!
//! ## Environment Variables
//!
//! - `LOG_LEVEL`: ERROR, WARN, INFO, DEBUG, TRACE (default INFO)
//! - `LOG_FORMAT`: json, pretty, compact (default json)
//! - `LOG_SPANS`: emit span open/close events when `true` (default false)
//! - `RUST_LOG`: full filter override
//!
//! ```bash
//! LOG_FORMAT=pretty LOG_LEVEL=DEBUG agent-triage route "I need help resetting my password"
//! ```

use std::env;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Machine-readable JSON lines
    Json,
    /// Multi-line, colored, for development
    Pretty,
    /// Single-line, colored, for terminals
    Compact,
}

impl LogFormat {
    /// Unknown values fall back to JSON
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            "compact" => LogFormat::Compact,
            _ => LogFormat::Json,
        }
    }
}

/// Parse a level name; unknown values fall back to INFO
pub fn parse_level(s: &str) -> Level {
    match s.trim().to_uppercase().as_str() {
        "ERROR" => Level::ERROR,
        "WARN" | "WARNING" => Level::WARN,
        "DEBUG" => Level::DEBUG,
        "TRACE" => Level::TRACE,
        _ => Level::INFO,
    }
}

/// Resolved logging options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogSettings {
    pub level: Level,
    pub format: LogFormat,
    pub include_spans: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::Json,
            include_spans: false,
        }
    }
}

impl LogSettings {
    /// Read `LOG_LEVEL`, `LOG_FORMAT` and `LOG_SPANS`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            level: lookup("LOG_LEVEL")
                .map(|v| parse_level(&v))
                .unwrap_or(defaults.level),
            format: lookup("LOG_FORMAT")
                .map(|v| LogFormat::parse(&v))
                .unwrap_or(defaults.format),
            include_spans: lookup("LOG_SPANS")
                .map(|v| v.trim().eq_ignore_ascii_case("true"))
                .unwrap_or(defaults.include_spans),
        }
    }

    /// Raise the level by `verbosity` steps (e.g. from repeated `-v` flags)
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        for _ in 0..verbosity {
            self.level = match self.level {
                Level::ERROR => Level::WARN,
                Level::WARN => Level::INFO,
                Level::INFO => Level::DEBUG,
                _ => Level::TRACE,
            };
        }
        self
    }

    fn span_events(&self) -> FmtSpan {
        if self.include_spans {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        }
    }

    fn filter(&self) -> EnvFilter {
        if let Ok(rust_log) = env::var("RUST_LOG") {
            return EnvFilter::new(rust_log);
        }

        let mut filter = EnvFilter::new(self.level.to_string());
        // Runtime internals are noisy at debug and below
        if let Ok(directive) = "tokio=warn".parse() {
            filter = filter.add_directive(directive);
        }
        filter
    }
}

/// Install the global subscriber
pub fn init_logging(settings: LogSettings) {
    let subscriber = tracing_subscriber::registry().with(settings.filter());
    let base = fmt::layer()
        .with_writer(std::io::stderr)
        .with_span_events(settings.span_events());

    match settings.format {
        LogFormat::Json => subscriber.with(base.json()).init(),
        LogFormat::Pretty => subscriber.with(base.pretty().with_ansi(true)).init(),
        LogFormat::Compact => subscriber
            .with(base.compact().with_ansi(true).with_target(false))
            .init(),
    }
}

/// Install the global subscriber from environment variables
pub fn init_default_logging() {
    init_logging(LogSettings::from_env());
}

/// Create a span covering one request's trip through the pipeline
#[macro_export]
macro_rules! request_span {
    ($($field:tt)*) => {
        tracing::info_span!("request", $($field)*)
    };
}

/// Create a triage span (classification, routing, dispatch)
#[macro_export]
macro_rules! triage_span {
    ($($field:tt)*) => {
        tracing::info_span!("triage", $($field)*)
    };
}

/// Create a span for a host-defined middleware stage
#[macro_export]
macro_rules! middleware_span {
    ($($field:tt)*) => {
        tracing::debug_span!("middleware", $($field)*)
    };
}

pub use {middleware_span, request_span, triage_span};
