use crate::core::config::{LogFormat, LoggingConfig};
use anyhow::{Context, Result};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    EnvFilter, filter::Targets, fmt, prelude::__tracing_subscriber_SubscriberExt,
    util::SubscriberInitExt,
};

/// Targets logged at the configured level; every other crate only logs warnings.
const APP_TARGETS: [&str; 2] = ["xconv", "tower_http"];

/// Filter used when `RUST_LOG` is unset.
///
/// A bare level such as `info` applies to [`APP_TARGETS`]; anything else is
/// read as a full `target=level` directive list.
fn app_filter(verbose: bool, config: &LoggingConfig) -> Result<Targets> {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        match config.level.trim().parse::<LevelFilter>() {
            Ok(level) => level,
            Err(_) => {
                return config
                    .level
                    .parse::<Targets>()
                    .with_context(|| format!("Invalid log level: {:?}", config.level));
            }
        }
    };

    Ok(APP_TARGETS
        .iter()
        .fold(Targets::new(), |targets, target| targets.with_target(*target, level))
        .with_default(LevelFilter::WARN))
}

pub fn init_logging(verbose: bool, config: &LoggingConfig) -> Result<()> {
    let (env_filter, app_filter) = match EnvFilter::try_from_default_env() {
        Ok(env_filter) => (Some(env_filter), None),
        Err(_) => (None, Some(app_filter(verbose, config)?)),
    };

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(app_filter);
    match config.format {
        LogFormat::Pretty => registry.with(fmt::layer().pretty().without_time()).init(),
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
    }
    Ok(())
}
