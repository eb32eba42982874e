//! Structured error types for collection operations.

use serde::Serialize;
use thiserror::Error;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Rejected before any store call
    Validation,
    Duplicate,

    NotFound,

    // Anything the store reports
    Store,

    // Config, I/O and other failures outside a collection
    Internal,
}

/// Errors surfaced by stores, adapters and collection managers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CollectionError {
    /// A required field is empty, whitespace-only or otherwise unusable.
    #[error("{field} {reason}")]
    Validation {
        field: &'static str,
        reason: &'static str,
    },

    /// Case-insensitive collision with another record of the same kind.
    #[error("a {kind} with {field} \"{value}\" already exists")]
    Duplicate {
        kind: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Network, permission or transaction failure inside the store.
    #[error("store error: {0}")]
    Store(String),
}

impl CollectionError {
    pub fn validation(field: &'static str) -> Self {
        Self::Validation {
            field,
            reason: "is required",
        }
    }

    pub fn duplicate(kind: &'static str, field: &'static str, value: impl Into<String>) -> Self {
        Self::Duplicate {
            kind,
            field,
            value: value.into(),
        }
    }

    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn store(err: impl std::fmt::Display) -> Self {
        Self::Store(err.to_string())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Validation { .. } => ErrorCode::Validation,
            Self::Duplicate { .. } => ErrorCode::Duplicate,
            Self::NotFound { .. } => ErrorCode::NotFound,
            Self::Store(_) => ErrorCode::Store,
        }
    }

    /// The offending field, when the error is about one.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::Validation { field, .. } | Self::Duplicate { field, .. } => Some(*field),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for CollectionError {
    fn from(err: rusqlite::Error) -> Self {
        Self::store(err)
    }
}

// Store plumbing uses anyhow internally; keep typed errors intact on the way out.
impl From<anyhow::Error> for CollectionError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<CollectionError>() {
            Ok(typed) => typed,
            Err(err) => match err.downcast::<rusqlite::Error>() {
                Ok(sql) => Self::store(sql),
                Err(err) => Self::store(err),
            },
        }
    }
}

/// Result type for collection operations.
pub type CollectionResult<T> = std::result::Result<T, CollectionError>;
