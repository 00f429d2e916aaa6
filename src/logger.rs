//! Client-side logger support.
//!
//! MQTT client libraries for small devices often carry their own logger with a
//! settable severity. The session writes its handler traces there and lets the
//! application change the severity by name through
//! [`Session::set_logger_level`](crate::Session::set_logger_level).
//!
//! Severities are expressed with the [`log`] crate's [`LevelFilter`], and
//! [`FacadeLogger`] is a ready-made [`Logger`] that forwards to the `log`
//! facade.

use core::fmt;
use core::str::FromStr;

use log::{Level, LevelFilter};

use crate::error::ConfigurationError;

/// A logger owned by the MQTT client.
pub trait Logger {
    /// Change the most verbose severity this logger emits.
    fn set_level(&mut self, level: LevelFilter);

    /// The current severity threshold.
    fn level(&self) -> LevelFilter;

    /// Emit `message` at `level`, subject to the threshold.
    fn log(&mut self, level: Level, message: &str);
}

/// A log level name accepted by [`Session::set_logger_level`](crate::Session::set_logger_level).
///
/// Names are upper case and matched exactly.
///
/// # Examples
///
/// ```rust
/// use homeassistant_mqtt::logger::LogLevel;
/// use log::LevelFilter;
///
/// let level: LogLevel = "WARNING".parse().unwrap();
/// assert_eq!(LevelFilter::from(level), LevelFilter::Warn);
/// assert!("TRACE".parse::<LogLevel>().is_err());
/// ```
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum LogLevel {
    /// `DEBUG`
    Debug,
    /// `INFO`
    Info,
    /// `WARNING`
    Warning,
    /// `ERROR`
    Error,
}

impl LogLevel {
    /// The name this level is parsed from.
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
        }
    }
}

impl FromStr for LogLevel {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARNING" => Ok(LogLevel::Warning),
            "ERROR" => Ok(LogLevel::Error),
            _ => Err(ConfigurationError::UnknownLogLevel),
        }
    }
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Warning => LevelFilter::Warn,
            LogLevel::Error => LevelFilter::Error,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A [`Logger`] that forwards to the [`log`] facade under a fixed target.
#[derive(Debug, Clone, Copy)]
pub struct FacadeLogger {
    target: &'static str,
    level: LevelFilter,
}

impl FacadeLogger {
    /// Creates a logger emitting under `target` at `level` and above.
    pub const fn new(target: &'static str, level: LevelFilter) -> Self {
        Self { target, level }
    }

    /// The `log` target records are emitted under.
    pub fn target(&self) -> &'static str {
        self.target
    }
}

impl Default for FacadeLogger {
    fn default() -> Self {
        Self::new("homeassistant_mqtt::client", LevelFilter::Info)
    }
}

impl Logger for FacadeLogger {
    fn set_level(&mut self, level: LevelFilter) {
        self.level = level;
    }

    fn level(&self) -> LevelFilter {
        self.level
    }

    fn log(&mut self, level: Level, message: &str) {
        if level <= self.level {
            log::log!(target: self.target, level, "{}", message);
        }
    }
}
