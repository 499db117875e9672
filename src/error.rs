//! Error types for whittle.
//!
//! This module defines all error types used throughout the library.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using [`SimplifyError`].
pub type Result<T> = std::result::Result<T, SimplifyError>;

/// Errors that can occur during mesh simplification and I/O.
#[derive(Error, Debug)]
pub enum SimplifyError {
    /// An argument failed validation at an API boundary.
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// Why the argument was rejected.
        reason: String,
    },

    /// An index references an element that does not exist.
    #[error("index {index} is out of range (limit {limit})")]
    IndexOutOfRange {
        /// The offending index.
        index: usize,
        /// The exclusive upper bound that was violated.
        limit: usize,
    },

    /// A supplied attribute array does not match the vertex count.
    #[error("{attribute} array has {actual} entries but the mesh has {expected} vertices")]
    AttributeLengthMismatch {
        /// Name of the attribute array.
        attribute: &'static str,
        /// Length of the supplied array.
        actual: usize,
        /// Expected length (the vertex count).
        expected: usize,
    },

    /// An algorithm selector was not recognised.
    #[error("unsupported simplification algorithm: {name}")]
    UnsupportedAlgorithm {
        /// The unrecognised selector.
        name: String,
    },

    /// An internal invariant was violated.
    ///
    /// Reserved for consistency checks in debug builds; not expected on
    /// release paths.
    #[error("internal invariant violated: {details}")]
    Internal {
        /// Description of the violated invariant.
        details: String,
    },

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error loading a mesh from a file.
    #[error("failed to load mesh from {path}: {message}")]
    LoadError {
        /// The file path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Error saving a mesh to a file.
    #[error("failed to save mesh to {path}: {message}")]
    SaveError {
        /// The file path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Unsupported file format.
    #[error("unsupported file format: {extension}")]
    UnsupportedFormat {
        /// The file extension.
        extension: String,
    },
}

impl SimplifyError {
    /// Create an invalid argument error.
    pub fn invalid_argument<S: Into<String>>(reason: S) -> Self {
        SimplifyError::InvalidArgument {
            reason: reason.into(),
        }
    }
}
