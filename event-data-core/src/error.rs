//! Error types for event data pipelines

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for event data pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for event data pipeline operations
#[derive(Error, Debug)]
pub enum Error {
    /// IO error during file operations
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Invalid or contradictory transform/cache configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Index out of bounds
    #[error("Index {index} out of bounds for length {len}")]
    IndexOutOfBounds {
        /// Requested index
        index: usize,
        /// Number of addressable items
        len: usize,
    },

    /// An event lies outside the sensor grid of a dense builder
    #[error("Event at x={x}, y={y}, p={p} lies outside the sensor grid")]
    EventOutOfBounds {
        /// Column of the offending event
        x: i64,
        /// Row of the offending event
        y: i64,
        /// Polarity of the offending event
        p: i64,
    },

    /// A transform was handed a representation it cannot operate on
    #[error("{transform} cannot be applied to {input}")]
    UnsupportedInput {
        /// Name of the transform
        transform: String,
        /// Kind of the rejected representation
        input: &'static str,
    },

    /// Dense array shape mismatch
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Path that cannot name a persisted file
    #[error("Invalid path: {}", .0.display())]
    InvalidPath(PathBuf),

    /// Malformed persisted container
    #[error("Format error: {0}")]
    Format(String),

    /// Error raised by an upstream dataset implementation
    #[error("Source error: {0}")]
    Source(String),
}

impl Error {
    /// Shorthand for a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Configuration(msg.into())
    }

    /// Whether this error was caused by invalid configuration
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration(_))
    }
}
