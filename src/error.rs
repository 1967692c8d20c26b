use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the evasion engine.
///
/// Technique failures have no variant here: a transform that faults is
/// caught by the assembler and reported as an empty outcome.
#[derive(Error, Debug)]
pub enum EvasionError {
    #[error("Unknown attack type: {0}")]
    UnknownAttackType(String),

    #[error("Unknown evasion level: {0}. Valid options: basic, medium, advanced")]
    UnknownLevel(String),

    #[error("Unknown technique: {0}")]
    UnknownTechnique(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid target URL {url}: {reason}")]
    InvalidTarget { url: String, reason: String },

    /// The control request failed, so nothing can be compared against it.
    #[error("Baseline request to {url} failed: {reason}")]
    BaselineFailed { url: String, reason: String },

    #[error("Request to {url} failed: {reason}")]
    Request { url: String, reason: String },

    #[error("Failed to build HTTP client: {0}")]
    Client(String),

    #[error("Failed to read payload file {path}: {source}")]
    PayloadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read config file {path}: {source}")]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EvasionError {
    /// Configuration errors are surfaced immediately and never retried.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            EvasionError::UnknownAttackType(_)
                | EvasionError::UnknownLevel(_)
                | EvasionError::UnknownTechnique(_)
                | EvasionError::InvalidConfig(_)
                | EvasionError::InvalidTarget { .. }
                | EvasionError::ConfigFile { .. }
        )
    }

    /// Network failures that abort a fingerprint run.
    pub fn is_fatal_network(&self) -> bool {
        matches!(self, EvasionError::BaselineFailed { .. })
    }
}

pub type Result<T> = std::result::Result<T, EvasionError>;
