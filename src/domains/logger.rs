use chrono::Utc;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }

    pub fn level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
        }
    }

    /// Directive understood by `tracing_subscriber::EnvFilter`.
    pub fn directive(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    /// Accepts the config spellings (`INFO`, `WARNING`, `CRITICAL`, ...) in any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEBUG" | "TRACE" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARN" | "WARNING" => Ok(LogLevel::Warn),
            "ERROR" | "CRITICAL" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level: {}", other)),
        }
    }
}

/// Domain-level logging port (Hexagonal port).
/// Non-fallible from the caller's perspective; adapters decide what to drop.
pub trait DomainLogger: Send + Sync + 'static {
    fn log(&self, level: LogLevel, msg: &str);

    fn debug(&self, msg: &str) {
        self.log(LogLevel::Debug, msg);
    }

    fn info(&self, msg: &str) {
        self.log(LogLevel::Info, msg);
    }

    fn warn(&self, msg: &str) {
        self.log(LogLevel::Warn, msg);
    }

    fn error(&self, msg: &str) {
        self.log(LogLevel::Error, msg);
    }
}

pub type DynLogger = Arc<dyn DomainLogger>;

/// File sink using `fast_log` for writing; messages reach it through the `log` facade.
pub struct FileLogger {
    min_level: LogLevel,
}

impl FileLogger {
    /// Initializes the global fast_log file appender. Only the first call per process succeeds.
    pub fn init(path: &str, min_level: LogLevel) -> Result<Self, Box<dyn std::error::Error>> {
        fast_log::init(
            fast_log::config::Config::new()
                .file(path)
                .level(min_level.level_filter()),
        )?;
        Ok(Self { min_level })
    }
}

impl DomainLogger for FileLogger {
    fn log(&self, level: LogLevel, msg: &str) {
        if level < self.min_level {
            return;
        }
        let stamped = format!("{} - {}", Utc::now().to_rfc3339(), msg);
        match level {
            LogLevel::Debug => log::debug!("{}", stamped),
            LogLevel::Info => log::info!("{}", stamped),
            LogLevel::Warn => log::warn!("{}", stamped),
            LogLevel::Error => log::error!("{}", stamped),
        }
    }
}
