//! Error types for minnow
//!
//! TigerStyle: Explicit error types with context, using thiserror.

use thiserror::Error;

/// Result type alias for minnow operations
pub type Result<T> = std::result::Result<T, Error>;

/// minnow error types
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Actor Errors
    // =========================================================================
    #[error("Actor not found: {id}")]
    ActorNotFound { id: String },

    #[error("Actor already exists: {id}")]
    ActorAlreadyExists { id: String },

    #[error("Handler failed: {id}, reason: {reason}")]
    HandlerFailed { id: String, reason: String },

    // =========================================================================
    // Validation Errors
    // =========================================================================
    #[error("Invalid actor ID: {id}, reason: {reason}")]
    InvalidActorId { id: String, reason: String },

    #[error("Actor ID too long: {length} bytes exceeds limit of {limit} bytes")]
    ActorIdTooLong { length: usize, limit: usize },

    #[error("Invalid configuration: {field}, reason: {reason}")]
    InvalidConfiguration { field: String, reason: String },

    // =========================================================================
    // Scheduler Errors
    // =========================================================================
    #[error("Scheduler is shutting down")]
    SchedulerShuttingDown,

    // =========================================================================
    // Storage Errors
    // =========================================================================
    #[error("Storage read failed: {id}, reason: {reason}")]
    StorageReadFailed { id: String, reason: String },

    #[error("Storage write failed: {id}, reason: {reason}")]
    StorageWriteFailed { id: String, reason: String },

    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Internal error: {reason}")]
    Internal { reason: String },

    #[error("Serialization failed: {reason}")]
    SerializationFailed { reason: String },

    #[error("Deserialization failed: {reason}")]
    DeserializationFailed { reason: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Create an actor not found error
    pub fn actor_not_found(id: impl Into<String>) -> Self {
        Self::ActorNotFound { id: id.into() }
    }

    /// Create a handler failed error
    pub fn handler_failed(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::HandlerFailed {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Create a storage write failed error
    pub fn storage_write_failed(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::StorageWriteFailed {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Create an internal error
    pub fn internal(reason: impl Into<String>) -> Self {
        Self::Internal {
            reason: reason.into(),
        }
    }
}
