use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::config::LoggingConfig;
use crate::error::{RenderError, Result};

/// Install a global tracing subscriber using the provided logging settings.
///
/// `RUST_LOG` still wins over the configured base level when set.
pub fn init(logging: &LoggingConfig) -> Result<()> {
    let level: LevelFilter = logging
        .level
        .parse()
        .map_err(|_| RenderError::Config(format!("invalid log level `{}`", logging.level)))?;

    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let fmt_layer = if logging.json {
        fmt::layer().json().with_target(true).boxed()
    } else {
        fmt::layer().compact().with_target(true).boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            RenderError::Config(format!("failed to install tracing subscriber: {err}"))
        })
}
