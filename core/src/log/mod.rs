//!
//! Logging facade for the nested-set workspace.
//!
//! Library code logs through the re-exported macros (`nestedset_core::{debug, trace, ...}`).
//! Binaries and test harnesses configure the sink once via [`init_logger`] or [`try_init_logger`].
//!

mod appender;
mod consts;
mod logger;

pub use consts::DEFAULT_LOGGER_ENV;
pub use logger::LogError;

use appender::AppenderSpec;
use consts::{ERR_LOG_FILE_NAME, LOG_FILE_NAME};
use log::{Level, LevelFilter};
use log4rs::config::{Config, Root};
use logger::Builder;
use std::sync::OnceLock;

#[doc(hidden)]
pub use log as __log;

#[macro_export]
macro_rules! trace {
    ($($t:tt)*) => ( $crate::log::__log::trace!($($t)*) )
}

#[macro_export]
macro_rules! debug {
    ($($t:tt)*) => ( $crate::log::__log::debug!($($t)*) )
}

#[macro_export]
macro_rules! info {
    ($($t:tt)*) => ( $crate::log::__log::info!($($t)*) )
}

#[macro_export]
macro_rules! warn {
    ($($t:tt)*) => ( $crate::log::__log::warn!($($t)*) )
}

#[macro_export]
macro_rules! error {
    ($($t:tt)*) => ( $crate::log::__log::error!($($t)*) )
}

const CONSOLE_APPENDER: &str = "stdout";
const LOG_FILE_APPENDER: &str = "log_file";
const ERR_LOG_FILE_APPENDER: &str = "err_log_file";

static LOGGER_INIT: OnceLock<Result<(), LogError>> = OnceLock::new();

/// Configures the global logger.
///
/// `filters` is a `RUST_LOG`-like expression, e.g. `info,nestedset::processes=trace`.
/// When `log_dir` is provided, two size-rolled files are written next to the console output:
/// one with every record passing the filters and one restricted to warnings and errors.
pub fn init_logger(log_dir: Option<&str>, filters: &str) -> Result<(), LogError> {
    let mut appenders = vec![AppenderSpec::console(CONSOLE_APPENDER, None)];
    if let Some(log_dir) = log_dir {
        appenders.push(AppenderSpec::roller(LOG_FILE_APPENDER, None, log_dir, LOG_FILE_NAME)?);
        appenders.push(AppenderSpec::roller(ERR_LOG_FILE_APPENDER, Some(LevelFilter::Warn), log_dir, ERR_LOG_FILE_NAME)?);
    }
    let appender_names = appenders.iter().map(|x| x.name).collect::<Vec<_>>();

    let mut builder = Builder::new();
    builder.appenders(appender_names.iter().copied()).root_level(LevelFilter::Info).parse_expression(filters);
    let rejected = builder.take_rejected();
    let loggers = builder.build();

    let config = Config::builder()
        .appenders(appenders.into_iter().map(|x| x.appender()))
        .loggers(loggers.items())
        .build(Root::builder().appenders(appender_names).build(loggers.root_level()))
        .map_err(|err| LogError::Config(err.to_string()))?;

    log4rs::init_config(config).map_err(|err| LogError::Config(err.to_string()))?;

    for err in rejected {
        log::log!(Level::Warn, "Ignoring invalid logging spec '{}'", err);
    }
    Ok(())
}

/// Initializes a console-only logger exactly once for the whole process.
///
/// Meant for tests: every test may call it, only the first call configures the sink
/// and all calls observe the same outcome.
pub fn try_init_logger(filters: &str) -> Result<(), LogError> {
    LOGGER_INIT.get_or_init(|| init_logger(None, filters)).clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_init_logger_is_idempotent() {
        try_init_logger("info,nestedset_core=trace").unwrap();
        try_init_logger("error").unwrap();
        crate::trace!("logger initialized for {}", "tests");
        assert!(log::log_enabled!(target: "nestedset_core", Level::Trace));
    }
}
