//! `tracing-subscriber` setup for binaries embedding the applier.

use std::str::FromStr;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Output format of the installed subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// `timestamp LEVEL target: message fields`
    #[default]
    Compact,
    /// One JSON object per event.
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "compact" | "text" => Ok(LogFormat::Compact),
            "json" | "jsonl" => Ok(LogFormat::Json),
            other => anyhow::bail!("unknown log format '{other}'"),
        }
    }
}

/// Third-party targets that are only interesting when something breaks.
const NOISY_TARGETS: &[(&str, &str)] = &[("sqlx", "warn"), ("hyper", "warn"), ("rustls", "warn")];

/// Builds the event filter.
///
/// `RUST_LOG` wins when set; otherwise `level` applies to everything except
/// the noisy targets above.
///
/// # Errors
///
/// Returns an error if the resulting directive string does not parse.
pub fn build_env_filter(level: &str) -> anyhow::Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    let mut directives = vec![level.to_string()];
    directives.extend(
        NOISY_TARGETS
            .iter()
            .map(|(target, lvl)| format!("{target}={lvl}")),
    );
    let filter = directives.join(",");
    EnvFilter::try_new(&filter).map_err(|e| anyhow::anyhow!("invalid tracing filter '{filter}': {e}"))
}

/// Installs the global subscriber.
///
/// # Errors
///
/// Returns an error if the filter is invalid or a global subscriber has
/// already been installed.
pub fn init_logging(level: &str, format: LogFormat) -> anyhow::Result<()> {
    let filter = build_env_filter(level)?;
    let layer = match format {
        LogFormat::Compact => tracing_subscriber::fmt::layer()
            .compact()
            .with_target(true)
            .with_filter(filter)
            .boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(true)
            .with_filter(filter)
            .boxed(),
    };

    tracing_subscriber::registry().with(layer).try_init()?;
    tracing::debug!(level, ?format, "logging initialized");
    Ok(())
}
