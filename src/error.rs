//! Error types for annotation session operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while editing, segmenting, importing or exporting.
#[derive(Error, Debug)]
pub enum Error {
    /// No image is currently active
    #[error("No active image")]
    NoActiveImage,

    /// Commit attempted without a candidate mask
    #[error("No active segmentation to commit")]
    NoActiveSegmentation,

    /// Segmentation requested without any prompt point
    #[error("At least one point is required before segmenting")]
    NoPrompts,

    /// Degenerate or empty region (crop, mask extent, index)
    #[error("Invalid region: {message}")]
    InvalidRegion {
        /// Description of the region problem
        message: String,
    },

    /// Class rename collides with another existing class
    #[error("Class '{name}' already exists")]
    AlreadyExists {
        /// The name that is already taken
        name: String,
    },

    /// Class name was blank after trimming
    #[error("Class name must not be empty")]
    EmptyClassName,

    /// Class name is not registered
    #[error("Class not found: '{name}'")]
    ClassNotFound {
        /// The missing class name
        name: String,
    },

    /// Folder contains no supported image files
    #[error("No image files found in {path:?}")]
    EmptyFolder {
        /// The folder that was listed
        path: PathBuf,
    },

    /// No segmentation oracle has been configured
    #[error("Segmentation oracle is not available")]
    OracleUnavailable,

    /// Oracle call failed or returned malformed output
    #[error("Segmentation failed: {message}")]
    OracleFailure {
        /// Description of the failure
        message: String,
    },

    /// Label line could not be parsed under either format
    #[error("Label parse error in {path:?} line {line}: {message}")]
    ImportParse {
        /// Label file being read
        path: PathBuf,
        /// 1-based line number
        line: usize,
        /// Parser message
        message: String,
    },

    /// Writing labels for one image failed
    #[error("Failed to export {path:?}: {source}")]
    ExportIo {
        /// File that could not be written
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// I/O error during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing or serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Image decoding or encoding error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

impl Error {
    /// Create an invalid region error with a message.
    pub fn invalid_region(message: impl Into<String>) -> Self {
        Self::InvalidRegion {
            message: message.into(),
        }
    }

    /// Create an oracle failure error with a message.
    pub fn oracle(message: impl Into<String>) -> Self {
        Self::OracleFailure {
            message: message.into(),
        }
    }

    /// Create an export error for a specific file.
    pub fn export_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ExportIo {
            path: path.into(),
            source,
        }
    }
}
