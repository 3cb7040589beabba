use std::time::Duration;
use thiserror::Error;

/// Failure of a single fetch. None of these stop the polling loop.
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out after {} ms", .0.as_millis())]
    Timeout(Duration),

    #[error("Protocol error: endpoint answered HTTP {status}")]
    Protocol { status: u16 },

    #[error("Decode error: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    Protocol,
    Decode,
}

impl TelemetryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TelemetryError::Network(_) | TelemetryError::Timeout(_) => ErrorKind::Network,
            TelemetryError::Protocol { .. } => ErrorKind::Protocol,
            TelemetryError::Decode(_) => ErrorKind::Decode,
        }
    }

    pub fn error_code(&self) -> u32 {
        match self {
            TelemetryError::Network(_) => 2001,
            TelemetryError::Timeout(_) => 2002,
            TelemetryError::Protocol { .. } => 2003,
            TelemetryError::Decode(_) => 2004,
        }
    }

    /// Fetch errors only ever degrade to last-known-good display.
    pub fn is_fatal(&self) -> bool {
        false
    }
}

impl From<serde_json::Error> for TelemetryError {
    fn from(e: serde_json::Error) -> Self {
        TelemetryError::Decode(e.to_string())
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}
