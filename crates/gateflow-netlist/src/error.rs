//! Error types for loading circuit snapshots

use thiserror::Error;

/// Result type for netlist operations
pub type Result<T> = std::result::Result<T, NetlistError>;

/// Errors that can occur while reading a circuit snapshot
#[derive(Debug, Error)]
pub enum NetlistError {
    /// I/O error reading a snapshot file
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// JSON parsing error
    #[error("Failed to parse circuit snapshot: {0}")]
    Parse(#[from] serde_json::Error),
}
