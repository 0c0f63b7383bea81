// Logging module for structured logging using the tracing crate

use crate::constants::DEFAULT_LOG_FILTER;
use crate::error::IntakeError;
use std::sync::OnceLock;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

static INITIALIZED: OnceLock<()> = OnceLock::new();

/// Output options for the tracing subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogOptions {
    /// Level for this crate when `RUST_LOG` is not set (e.g. "info", "debug")
    pub level: String,
    /// Emit one JSON object per event instead of human-readable lines
    pub json: bool,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl LogOptions {
    /// Filter directive used when `RUST_LOG` is unset.
    pub fn default_directive(&self) -> String {
        if self.level.eq_ignore_ascii_case("info") {
            DEFAULT_LOG_FILTER.to_string()
        } else {
            format!("highline_watermark={}", self.level.to_ascii_lowercase())
        }
    }
}

/// Initialize the tracing subscriber with default options.
///
/// Logs go to stderr so stdout stays free for the manifest. `RUST_LOG`
/// overrides the default `highline_watermark=info` filter.
///
/// # Examples
///
/// ```
/// use highline_watermark::logging::init_subscriber;
///
/// init_subscriber().expect("Failed to initialize logging");
/// tracing::info!("Application started");
/// ```
pub fn init_subscriber() -> Result<(), IntakeError> {
    init_subscriber_with(&LogOptions::default())
}

/// Initialize the tracing subscriber.
///
/// Only the first call installs a subscriber; later calls are no-ops, so
/// tests can call this freely.
pub fn init_subscriber_with(options: &LogOptions) -> Result<(), IntakeError> {
    if INITIALIZED.get().is_some() {
        return Ok(());
    }

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(options.default_directive()))
        .map_err(|e| IntakeError::Logging(format!("invalid log filter: {}", e)))?;

    let registry = tracing_subscriber::registry().with(filter);
    let result = if options.json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()
    };

    match result {
        Ok(()) => {
            let _ = INITIALIZED.set(());
            Ok(())
        }
        // Another subscriber is already the global default
        Err(_) if tracing::dispatcher::has_been_set() => {
            let _ = INITIALIZED.set(());
            Ok(())
        }
        Err(e) => Err(IntakeError::Logging(e.to_string())),
    }
}
