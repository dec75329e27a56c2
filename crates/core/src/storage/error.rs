use thiserror::Error;

use crate::attribute::{MarshalError, UnmarshalError};

use super::types::StoreOperation;

/// Errors reported by a [`KeyValueStore`](super::KeyValueStore) backend.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Access denied to table {table}: {message}")]
    AccessDenied { table: String, message: String },
    #[error("Table not found: {0}")]
    TableNotFound(String),
    #[error("Request throttled: {0}")]
    Throttled(String),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    #[error("Store service error: {0}")]
    Service(String),
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl StoreError {
    /// Returns true when retrying the same call later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Throttled(_) | StoreError::Unavailable(_))
    }
}

/// Errors that can occur during repository operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("{entity_type} not found: {id}")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },
    #[error("Failed to marshal {entity_type} {id}: {source}")]
    Marshal {
        entity_type: &'static str,
        id: String,
        #[source]
        source: MarshalError,
    },
    #[error("Failed to unmarshal {entity_type} {id}: {source}")]
    Unmarshal {
        entity_type: &'static str,
        id: String,
        #[source]
        source: UnmarshalError,
    },
    #[error("{operation} {entity_type} {id} failed: {source}")]
    Store {
        entity_type: &'static str,
        operation: StoreOperation,
        id: String,
        #[source]
        source: StoreError,
    },
}

impl RepositoryError {
    /// The store error behind this failure, if any.
    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            RepositoryError::Store { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, RepositoryError>;
