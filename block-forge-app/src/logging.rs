//! Logging setup for the application.

use crate::config::GlobalLogLevel;
use env_logger::{Builder, Env};
use log::LevelFilter;

impl From<GlobalLogLevel> for LevelFilter {
    fn from(level: GlobalLogLevel) -> Self {
        match level {
            GlobalLogLevel::Trace => LevelFilter::Trace,
            GlobalLogLevel::Debug => LevelFilter::Debug,
            GlobalLogLevel::Info => LevelFilter::Info,
            GlobalLogLevel::Warn => LevelFilter::Warn,
            GlobalLogLevel::Error => LevelFilter::Error,
        }
    }
}

/// Initializes `env_logger` with `level` as the global filter.
///
/// Module directives in `RUST_LOG` still apply on top, so
/// `RUST_LOG=wfc_solver::propagator=trace` narrows in on one component.
/// Calling it twice keeps the first logger.
pub fn init_logger(level: GlobalLogLevel) {
    let env = Env::default().filter_or("RUST_LOG", "info");
    let mut builder = Builder::from_env(env);
    builder.filter_level(level.into());
    if let Ok(directives) = std::env::var("RUST_LOG") {
        builder.parse_filters(&directives);
    }

    if builder.try_init().is_err() {
        log::debug!("Logger already initialized");
        return;
    }
    log::debug!("Logger initialized with global log level: {level:?}");
}
