//! Error types for the funnel store

use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in a funnel store
#[derive(Error, Debug)]
pub enum StoreError {
    /// No funnel with the requested id exists (or it was deleted)
    #[error("Funnel not found: {0}")]
    NotFound(uuid::Uuid),
}
