//! Shared error types for the services crate.

use thiserror::Error;

use drill_core::config::ConfigError;
use drill_core::model::SessionSummaryError;
use storage::repository::StorageError;

/// Errors emitted while picking the next question.
///
/// Question source failures are passed through untouched.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PickError<E> {
    #[error(transparent)]
    Source(E),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by practice sessions.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no question is waiting for an answer")]
    NoPendingQuestion,
    #[error(transparent)]
    Summary(#[from] SessionSummaryError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
