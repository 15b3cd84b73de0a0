//! Structured-logging setup for the metrics engine and its service front
//! ends. Output is compact plain text; `RUST_LOG` overrides the configured
//! level when set.

use crate::config::TelemetryConfig;
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("unusable log directive {directive:?}")]
    Directive {
        directive: String,
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },
    #[error("log subscriber already installed")]
    AlreadyInstalled(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// The configured level applies to this workspace; the HTTP stack underneath
/// the upstream client stays at warn so retry loops do not flood the log.
fn default_directives(level: &str) -> String {
    format!("{level},hyper=warn,reqwest=warn")
}

pub fn init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let directives = default_directives(&config.log_level);
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => {
            EnvFilter::try_new(&directives).map_err(|source| TelemetryError::Directive {
                directive: directives.clone(),
                source,
            })?
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .compact()
        .try_init()
        .map_err(TelemetryError::AlreadyInstalled)
}
