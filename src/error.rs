use std::path::PathBuf;
use thiserror::Error;

/// Configuration problems surfaced to the caller; scoring cannot proceed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown scoring profile: {0}")]
    UnknownProfile(String),

    #[error("scoring profile '{profile}' has invalid weight {weight} for '{factor}'")]
    InvalidWeight {
        profile: String,
        factor: String,
        weight: f64,
    },

    #[error("no scoring profiles configured")]
    NoProfiles,

    #[error("num_pages must be at least 1, got {0}")]
    InvalidPages(u32),

    #[error("failed to read settings from {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings from {path:?}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("email size {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: usize, limit: usize },
}
