//! Shared error types for the services crate.

use thiserror::Error;

use srs_core::model::CardKey;
use srs_storage::repository::StorageError;

/// Errors emitted by `ReviewService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReviewServiceError {
    #[error("card belongs to {found:?}, not {expected:?}")]
    KeyMismatch { expected: CardKey, found: CardKey },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by review sessions.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("nothing is due for review")]
    Empty,
    #[error("session already completed")]
    Completed,
    #[error(transparent)]
    Review(#[from] ReviewServiceError),
}
