//! Error taxonomy shared by the core components.

use std::time::Duration;

use thiserror::Error;

/// Failure of a single acquisition source. Always recoverable: the chain
/// moves on to the next source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("location permission denied")]
    PermissionDenied,

    #[error("source unavailable: {0}")]
    Unavailable(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

impl From<anyhow::Error> for SourceError {
    fn from(err: anyhow::Error) -> Self {
        SourceError::Unavailable(format!("{err:#}"))
    }
}

/// Terminal failure of one `acquire_current` call.
#[derive(Debug, Error)]
pub enum AcquisitionError {
    #[error("no weather source available: {reason}")]
    AllSourcesExhausted { reason: String },

    #[error(transparent)]
    InvalidInput(#[from] InputError),
}

/// Malformed caller input. Reported immediately, never triggers a fallback.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("invalid postal code '{0}': expected exactly 5 digits")]
    InvalidPostalCode(String),

    #[error("'{0}' is not a valid temperature")]
    Unparsable(String),

    #[error("no paw check is in progress")]
    NoActiveCheck,
}

/// Failure of the key-value settings backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("settings I/O failed for {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("settings file is not valid JSON: {0}")]
    Format(#[from] serde_json::Error),
}
