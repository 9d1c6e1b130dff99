//! Error types for the viewer crate

use std::path::PathBuf;
use thiserror::Error;

/// Failure to obtain the settings document
///
/// Both variants are fatal at startup: the viewer is never constructed
/// without a settings document.
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to read settings from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed settings document {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: serde_json::Error,
    },
}
