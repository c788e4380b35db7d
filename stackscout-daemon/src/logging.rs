//! Logging initialization for stackscout-daemon.
//!
//! The `[general]` section picks the level and the line format. The
//! configured level applies to the stackscout crates; the HTTP stack used
//! by the registry collectors is capped at `warn` so per-request connection
//! chatter does not drown out collection events.

use std::str::FromStr;

use anyhow::Result;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use stackscout_core::config::GeneralConfig;

/// Crates whose log output is capped at `warn`.
const HTTP_STACK: [&str; 4] = ["hyper", "hyper_util", "reqwest", "h2"];

/// Log line format from `general.log_format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per line
    Json,
    /// Multi-line human-readable output
    Pretty,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            other => Err(anyhow::anyhow!(
                "unknown log format '{}', expected 'json' or 'pretty'",
                other
            )),
        }
    }
}

/// Filter directives for the configured level.
///
/// `RUST_LOG` replaces these entirely when set.
pub fn filter_directives(log_level: &str) -> String {
    let mut directives = vec![log_level.to_owned()];
    directives.extend(HTTP_STACK.iter().map(|krate| format!("{krate}=warn")));
    directives.join(",")
}

/// Initialize the global tracing subscriber.
///
/// Must be called exactly once, before any tracing macros are used.
pub fn init_tracing(config: &GeneralConfig) -> Result<()> {
    let format: LogFormat = config.log_format.parse()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter_directives(&config.log_level)))
        .map_err(|e| anyhow::anyhow!("invalid log level '{}': {}", config.log_level, e))?;

    let registry = tracing_subscriber::registry().with(env_filter);
    let installed = match format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true),
            )
            .try_init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init(),
    };
    installed.map_err(|e| anyhow::anyhow!("failed to initialize tracing subscriber: {}", e))
}
