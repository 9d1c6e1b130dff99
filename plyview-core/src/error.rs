//! Error types for plyview

use thiserror::Error;

/// Main error type for plyview operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// The bounding volume has no usable extent, so no finite scale exists
    #[error("Degenerate geometry: {0}")]
    DegenerateGeometry(String),
    
    #[error("Algorithm error: {0}")]
    Algorithm(String),
    
    #[error("Visualization error: {0}")]
    Visualization(String),
    
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
    
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Result type alias for plyview operations
pub type Result<T> = std::result::Result<T, Error>;
