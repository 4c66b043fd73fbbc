//! tracing-subscriber setup for hosts embedding the archive engine

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogConfig;
use crate::error::{AegisError, AegisResult};

/// Install a global subscriber according to `config`.
///
/// `RUST_LOG` takes precedence over `config.level`. Returns an error (rather
/// than panicking) if a global subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> AegisResult<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let result = match config.format.as_str() {
        "json" => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init(),
        "text" => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .try_init(),
        other => {
            return Err(AegisError::Config(format!(
                "unknown log format '{other}' (expected json or text)"
            )))
        }
    };

    result.map_err(|e| AegisError::Config(format!("installing tracing subscriber: {e}")))
}
