use crate::domains::logger::{DomainLogger, LogLevel};
use std::sync::Arc;

struct ConsoleBridge {
    min_level: LogLevel,
}

impl DomainLogger for ConsoleBridge {
    fn log(&self, level: LogLevel, msg: &str) {
        if level < self.min_level {
            return;
        }
        match level {
            LogLevel::Debug | LogLevel::Info => println!("{}", msg),
            LogLevel::Warn => eprintln!("WARN: {}", msg),
            LogLevel::Error => eprintln!("ERROR: {}", msg),
        }
    }
}

/// Console-backed DomainLogger; also the fallback when the file sink cannot start.
pub fn init_console_logger(min_level: LogLevel) -> Arc<dyn DomainLogger> {
    Arc::new(ConsoleBridge { min_level })
}
