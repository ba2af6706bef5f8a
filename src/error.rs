//! Error types for the batch compiler

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for batch compiler operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the batch compiler
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read {path}: {message}")]
    Discovery { path: PathBuf, message: String },

    #[error("Failed to patch {path}: {source}")]
    Patch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to compile {path}: {message}")]
    Compile { path: PathBuf, message: String },

    #[error("Failed to replace original {path}: {source}")]
    Promote {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to clean up {path}: {source}")]
    Cleanup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create staging directory {path}: {source}")]
    StagingSetup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Report compiler '{program}' not found. Please install it and ensure it is in PATH")]
    CompilerNotFound { program: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
}
