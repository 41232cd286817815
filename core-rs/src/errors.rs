//! Error types for Portclaim Core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PortClaimError {
    #[error("Invalid port: {0}")]
    InvalidPort(String),

    #[error("Invalid port range: {0}")]
    InvalidRange(String),

    #[error("Port already allocated: {0}")]
    PortConflict(u32),

    #[error("No free port in range {min}-{max}")]
    RangeExhausted { min: u16, max: u16 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Watch error: {0}")]
    WatchError(String),
}

impl From<regex::Error> for PortClaimError {
    fn from(err: regex::Error) -> Self {
        PortClaimError::ParseError(err.to_string())
    }
}

impl From<notify::Error> for PortClaimError {
    fn from(err: notify::Error) -> Self {
        PortClaimError::WatchError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PortClaimError>;
