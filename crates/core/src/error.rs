//! Error types for the Lexiscope domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each failure class has its own error enum; none of them is fatal to a
//! conversational turn; callers degrade to "less context".

use thiserror::Error;

/// The top-level error type for all Lexiscope operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Bulk load errors ---
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    // --- Collaborator fetch errors ---
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    // --- Pattern compilation errors ---
    #[error("Pattern error: {0}")]
    Pattern(#[from] PatternError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Failure classes ---

/// The bulk loader (or a per-avatar source) could not deliver data.
#[derive(Debug, Clone, Error)]
pub enum LoadError {
    #[error("Knowledge source unavailable: {0}")]
    Unavailable(String),

    #[error("Corrupt payload from {source_name}: {reason}")]
    Corrupt { source_name: String, reason: String },

    #[error("I/O error: {0}")]
    Io(String),
}

/// A collaborator call (curriculum fetch, vector search) failed or timed out.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("{what} timed out after {timeout_ms}ms")]
    Timeout { what: String, timeout_ms: u64 },

    #[error("Collaborator unavailable: {0}")]
    Unavailable(String),
}

/// A trigger or mistake pattern failed to compile.
#[derive(Debug, Clone, Error)]
pub enum PatternError {
    #[error("Invalid pattern '{pattern}': {reason}")]
    Invalid { pattern: String, reason: String },
}
