//! Error types for the Loreweave domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.
//!
//! Only storage I/O is allowed to surface from the engine. Malformed stored
//! records, bad budget settings, stale indexes and budget overruns are all
//! recovered locally (see the knowledge and context crates).

use thiserror::Error;

/// The top-level error type for all Loreweave operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Store errors ---
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    // --- Knowledge base errors ---
    #[error("Knowledge base error: {0}")]
    Knowledge(#[from] KnowledgeError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O failed on '{path}': {reason}")]
    Io { path: String, reason: String },

    #[error("Path traversal blocked: '{0}'")]
    PathTraversal(String),

    #[error("Failed to serialize '{path}': {reason}")]
    Serialization { path: String, reason: String },
}

#[derive(Debug, Error)]
pub enum KnowledgeError {
    #[error("Unknown knowledge base: {0}")]
    UnknownKb(String),

    #[error("Unknown reindex target: {0}")]
    UnknownReindexTarget(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}
