use crate::domains::logger::{DomainLogger, LogLevel};
use std::sync::Arc;
use tracing::warn;

/// Forwards every message to each of its sinks, in order.
pub struct MultiLogger {
    sinks: Vec<Arc<dyn DomainLogger>>,
}

impl MultiLogger {
    pub fn new(sinks: Vec<Arc<dyn DomainLogger>>) -> Self {
        Self { sinks }
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl DomainLogger for MultiLogger {
    fn log(&self, level: LogLevel, msg: &str) {
        for sink in &self.sinks {
            sink.log(level, msg);
        }
    }
}

/// File sink when `path` is given and fast_log starts, plus the console bridge when
/// `console` is set. Binaries that already print tracing events pass `console = false`
/// so each message reaches the terminal once.
pub fn build_combined_logger(path: Option<&str>, min_level: LogLevel, console: bool) -> MultiLogger {
    let mut sinks = Vec::new();
    if let Some(path) = path {
        match crate::adapters::outbound::init_file_logger(path, min_level) {
            Ok(file_logger) => sinks.push(file_logger),
            Err(e) => warn!(path, error = %e, "file logger unavailable"),
        }
    }
    if console {
        sinks.push(crate::adapters::outbound::init_console_logger(min_level));
    }
    MultiLogger::new(sinks)
}

pub fn init_combined_logger(path: Option<&str>, min_level: LogLevel, console: bool) -> Arc<dyn DomainLogger> {
    Arc::new(build_combined_logger(path, min_level, console))
}
