//! Error types for the parley domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all parley operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Persistence errors ---
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    // --- External collaborator errors ---
    #[error("Collaborator error: {0}")]
    Collaborator(#[from] CollaboratorError),

    // --- Message log invariants ---
    #[error("Conversation state error: {0}")]
    State(#[from] StateError),

    // --- Streaming publisher ---
    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),

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
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Chat not found: {0}")]
    NotFound(String),

    #[error("Failed to encode chat {chat_id}: {reason}")]
    Serialization { chat_id: String, reason: String },

    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}

/// Failure of an external reasoning/retrieval collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CollaboratorError {
    /// Transient failure, worth another attempt.
    #[error("Collaborator unavailable: {0}")]
    Unavailable(String),

    /// The collaborator gave up; retrying will not help.
    #[error("Collaborator failed: {0}")]
    Failed(String),

    #[error("Collaborator timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Collaborator call cancelled")]
    Cancelled,
}

impl CollaboratorError {
    /// Whether another attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout { .. })
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("Turn id {0} already exists in conversation")]
    DuplicateTurnId(String),

    #[error("Cannot append to conversation {0}: it ends with an end sentinel")]
    AppendAfterEnd(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StreamError {
    #[error("Stream '{0}' is already finalized")]
    AlreadyFinalized(&'static str),
}
