//! Error types for Lattice Storage.
//!
//! Editing the storage tree never fails with an error: lookups return
//! sentinels and rejected writes return `false`. The variants here cover
//! the I/O-bound edges of the crate, such as loading platform profiles and
//! validating configuration snapshots.

use std::path::PathBuf;

/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading or validating storage configuration.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// File I/O error.
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// TOML parsing error.
    #[error("Invalid TOML in '{path}': {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// JSON parsing error.
    #[error("Invalid JSON in '{path}': {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The profile parsed but is not self-consistent.
    #[error("Invalid platform profile: {0}")]
    InvalidProfile(String),

    /// A configuration snapshot violates a storage invariant.
    #[error("Invalid storage snapshot for controller '{controller}': {message}")]
    InvalidSnapshot { controller: String, message: String },
}

impl Error {
    /// Create an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a snapshot validation error.
    pub fn invalid_snapshot(controller: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidSnapshot {
            controller: controller.into(),
            message: message.into(),
        }
    }
}
