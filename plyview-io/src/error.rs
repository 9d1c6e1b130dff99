//! Error types for mesh loading

use thiserror::Error;

/// Errors that can occur while loading the single viewer asset
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("File not found: {path}")]
    NotFound { path: String },

    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Unsupported mesh format: {extension}")]
    UnsupportedFormat { extension: String },

    #[error("Parser task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
