// src/error.rs

use std::path::PathBuf;
use thiserror::Error;

/// Core error types for jresolve
#[derive(Error, Debug)]
pub enum Error {
    /// A coordinate notation string could not be parsed
    #[error("malformed notation '{notation}': {reason}")]
    MalformedNotation { notation: String, reason: String },

    /// A remote repository URL could not be parsed
    #[error("invalid repository URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// No repository could supply a descriptor for a required dependency
    #[error("dependency collection failed: {0}")]
    Collection(String),

    /// Downloading or verifying a resolved artifact failed
    #[error("dependency resolution failed: {0}")]
    Resolution(String),

    /// Downloaded or cached bytes do not match the published checksum
    #[error("checksum mismatch for {path}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    /// The local repository root is unusable
    #[error("local repository unusable at {path}: {reason}")]
    RepositoryInit { path: PathBuf, reason: String },

    /// Installing an artifact into the local repository failed
    #[error("install failed: {0}")]
    Install(String),

    /// Deploying an artifact to a remote repository failed
    #[error("deploy failed: {0}")]
    Deploy(String),

    /// Resolution was aborted through its cancel token
    #[error("resolution cancelled")]
    Cancelled,

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using jresolve's Error type
pub type Result<T> = std::result::Result<T, Error>;
