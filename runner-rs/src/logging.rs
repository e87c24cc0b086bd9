//! Console logging for model binaries.
//!
//! Records go to stderr so that CSV output written to stdout stays clean.

use std::sync::Mutex;

use log::LevelFilter;
use log4rs::Config;
use log4rs::Handle;
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::config::{Appender, Root};
use log4rs::encode::pattern::PatternEncoder;

use crate::error::{Result, RunnerError};

/// Environment variable holding the global log level.
pub const LOG_LEVEL_ENV: &str = "PATHFLOW_LOG";

// ISO 8601 timestamp and color coded level tag
const DEFAULT_LOG_PATTERN: &str = "{d(%Y-%m-%dT%H:%M:%SZ)} {h({l})} {t} - {m}{n}";

static ROOT_HANDLE: Mutex<Option<Handle>> = Mutex::new(None);

/// Parses a level name, falling back to `Info` for anything unrecognised.
pub fn parse_level(value: &str) -> LevelFilter {
    match value.trim().to_ascii_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" | "warning" => LevelFilter::Warn,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}

/// Installs the console logger with the level named by [`LOG_LEVEL_ENV`].
pub fn init() -> Result<()> {
    let level = std::env::var(LOG_LEVEL_ENV)
        .map(|v| parse_level(&v))
        .unwrap_or(LevelFilter::Info);
    init_with_level(level)
}

/// Installs the console logger, or reconfigures it if one is already set.
pub fn init_with_level(level: LevelFilter) -> Result<()> {
    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(DEFAULT_LOG_PATTERN)))
        .build();
    let config = Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(Root::builder().appender("stderr").build(level))
        .map_err(|e| RunnerError::Logging(e.to_string()))?;

    let mut handle = ROOT_HANDLE
        .lock()
        .map_err(|e| RunnerError::Logging(e.to_string()))?;
    match handle.as_ref() {
        Some(existing) => existing.set_config(config),
        None => {
            let new_handle =
                log4rs::init_config(config).map_err(|e| RunnerError::Logging(e.to_string()))?;
            *handle = Some(new_handle);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug"), LevelFilter::Debug);
        assert_eq!(parse_level(" WARN "), LevelFilter::Warn);
        assert_eq!(parse_level("off"), LevelFilter::Off);
        assert_eq!(parse_level("nonsense"), LevelFilter::Info);
    }

    #[test]
    fn test_init_twice_reconfigures() {
        init_with_level(LevelFilter::Warn).unwrap();
        init_with_level(LevelFilter::Debug).unwrap();
        assert_eq!(log::max_level(), LevelFilter::Debug);
    }
}
