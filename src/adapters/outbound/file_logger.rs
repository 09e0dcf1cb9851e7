use crate::domains::logger::{DomainLogger, FileLogger, LogLevel};
use std::sync::Arc;

/// Initialize the fast_log file sink and return a logger the application can inject.
pub fn init_file_logger(path: &str, min_level: LogLevel) -> Result<Arc<dyn DomainLogger>, String> {
    let logger = FileLogger::init(path, min_level)
        .map_err(|e| format!("Failed to initialize fast_log at {}: {}", path, e))?;
    Ok(Arc::new(logger))
}
