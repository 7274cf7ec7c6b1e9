//! Error types for the try-on pose pipeline.

use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// File I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input parameters provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Face mesh larger than the preallocated mask buffer
    #[error(
        "Face mesh exceeds mask capacity: {vertices} vertices / {indices} indices \
         (max {max_vertices} / {max_indices})"
    )]
    MeshCapacity {
        /// Vertex count supplied by the tracker
        vertices: usize,
        /// Index count supplied by the tracker
        indices: usize,
        /// Vertex capacity of the mask buffer
        max_vertices: usize,
        /// Index capacity of the mask buffer
        max_indices: usize,
    },

    /// Face mesh topology is inconsistent (dangling index, partial triangle)
    #[error("Malformed face mesh: {0}")]
    MalformedMesh(String),

    /// Model could not be fetched or decoded
    #[error("Failed to load model {url}: {reason}")]
    AssetLoad {
        /// Requested model identifier
        url: String,
        /// Human readable cause
        reason: String,
    },

    /// The same model is already being loaded
    #[error("Model is already loading: {0}")]
    LoadInProgress(String),

    /// The loader worker could not be started
    #[error("Model loader unavailable: {0}")]
    LoaderUnavailable(String),
}

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;
