// Logging for the observe binary, powered by tracing-subscriber.
//
// The link crate logs through the `log` facade; `tracing_log::LogTracer`
// routes those records into the subscriber installed here. Output goes to
// stderr so stdout carries only query state.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::error::{CLIError, Result};

/// Log format type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Compact text format: timestamp LEVEL target - message
    Compact,
    /// JSON Lines format for structured logging
    Json,
}

impl LogFormat {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" | "jsonl" => LogFormat::Json,
            _ => LogFormat::Compact,
        }
    }
}

/// Build the `EnvFilter` from the base level plus noisy-crate overrides.
pub fn build_env_filter(level: &str) -> Result<EnvFilter> {
    let mut directives = vec![level.to_string()];

    let noisy: &[(&str, &str)] = &[
        ("tungstenite", "warn"),
        ("tokio_tungstenite", "warn"),
        ("mio", "warn"),
    ];
    for (target, lvl) in noisy {
        directives.push(format!("{}={}", target, lvl));
    }

    let filter_str = directives.join(",");
    EnvFilter::try_new(&filter_str)
        .map_err(|e| CLIError::LoggingError(format!("Invalid tracing filter '{}': {}", filter_str, e)))
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(level: &str, format: &str) -> Result<()> {
    let filter = build_env_filter(level)?;

    // Bridge `log` records (observable-link) into tracing
    tracing_log::LogTracer::init().ok();

    let layer = match LogFormat::parse(format) {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_filter(filter)
            .boxed(),
        LogFormat::Compact => tracing_subscriber::fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_filter(filter)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(layer)
        .try_init()
        .map_err(|e| CLIError::LoggingError(e.to_string()))?;

    tracing::trace!("Logging initialized: level={}, format={}", level, format);
    Ok(())
}
