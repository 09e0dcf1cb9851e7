use thiserror::Error;

/// Fault raised by one of the platform surfaces (services, registry, logging, ...).
#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("Not authenticated: {0}")]
    CredentialsUnavailable(String),

    #[error("{surface} API error: {message}")]
    Api {
        surface: &'static str,
        message: String,
    },

    #[error("Failed to decode {surface} response: {source}")]
    Decode {
        surface: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Command(#[from] CommandError),
}

impl PlatformError {
    pub fn api(surface: &'static str, message: impl Into<String>) -> Self {
        PlatformError::Api {
            surface,
            message: message.into(),
        }
    }
}

/// Failure to run an external executable at all. A non-zero exit is not an error here.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("{program} command not found")]
    NotFound { program: String },

    #[error("Command timed out after {seconds}s")]
    TimedOut { seconds: u64 },

    #[error("Failed to run {program}: {message}")]
    Io { program: String, message: String },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unknown setting: {0}")]
    UnknownKey(String),

    #[error("Invalid value for {key}: {source}")]
    InvalidValue {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Backup I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Backup format error: {0}")]
    Format(#[from] serde_json::Error),
}

/// Faults raised inside a dispatch unit before or around the gateway call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    #[error("Invalid parameter {key}: {reason}")]
    InvalidParameter { key: String, reason: String },

    #[error("Worker panicked: {0}")]
    WorkerPanicked(String),
}

pub type PlatformResult<T> = Result<T, PlatformError>;
pub type DispatchResult<T> = Result<T, DispatchError>;
