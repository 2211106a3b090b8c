//! Error types.
//!
//! Only collaborator failures are errors. Lifecycle misuse (appending to a
//! linked entity, registering a component twice) panics, and a missing
//! component is an `Option`.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Failure to load or watch a model file.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Only Wavefront `.obj` meshes are understood.
    #[error("unsupported model format `{extension}` ({path})")]
    UnsupportedFormat { path: PathBuf, extension: String },

    #[error("malformed model {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },

    #[error("asset watcher failure: {0}")]
    Watch(#[from] notify::Error),
}

/// Failure to read or validate a [`WorldConfig`](crate::config::WorldConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config value `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}
