use crate::domains::logger::{DomainLogger, LogLevel};
use std::sync::Arc;

struct NoOp;

impl DomainLogger for NoOp {
    fn log(&self, _level: LogLevel, _msg: &str) {}
}

/// No-op logger, the default in unit tests
pub fn init_noop_logger() -> Arc<dyn DomainLogger> {
    Arc::new(NoOp)
}
