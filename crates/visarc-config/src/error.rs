//! Error types for configuration assembly.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while assembling a pipeline configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    ReadFile {
        /// Path of the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to resolve a path to absolute form
    #[error("failed to resolve path '{path}': {source}")]
    ResolvePath {
        /// Path that could not be resolved.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Failed to serialize the configuration to JSON
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] serde_json::Error),

    /// A chunk dimension or element count is zero
    #[error("'{dimension}' must be a positive integer")]
    InvalidGeometry {
        /// Name of the offending dimension.
        dimension: &'static str,
    },

    /// A truncation parameter is out of range
    #[error("truncation parameter '{param}' must be positive and finite, got {value}")]
    InvalidPrecision {
        /// Name of the offending parameter.
        param: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// A buffer name was declared twice
    #[error("buffer '{0}' is already declared")]
    DuplicateBuffer(String),

    /// A stage name was declared twice
    #[error("stage '{0}' is already declared")]
    DuplicateStage(String),

    /// A buffer handle from a different builder was used
    #[error("buffer handle {0} does not belong to this pipeline")]
    ForeignHandle(usize),

    /// The stage graph violates the one-producer/one-consumer invariant
    #[error("invalid pipeline graph at buffer '{buffer}': {reason}")]
    InvalidGraph {
        /// Name of the buffer at which the invariant fails.
        buffer: String,
        /// Description of the violation.
        reason: String,
    },

    /// A size expression referenced a symbol with no binding
    #[error("size expression references unbound symbol '{0}'")]
    UnboundSymbol(String),
}

impl ConfigError {
    /// Create a read file error.
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::ReadFile {
            path: path.into(),
            source,
        }
    }

    /// Create a path resolution error.
    pub fn resolve_path(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::ResolvePath {
            path: path.into(),
            source,
        }
    }

    /// Create a graph invariant error.
    pub fn invalid_graph(buffer: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::InvalidGraph {
            buffer: buffer.into(),
            reason: reason.into(),
        }
    }
}
