//! Error types for the search and indexing paths.

use thiserror::Error;

/// Failures reported by a [`SearchStore`](crate::store::SearchStore) backend.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// The backend could not be reached (connection refused, DNS, reset).
    #[error("search backend unreachable: {0}")]
    Unavailable(String),

    /// The request exceeded its deadline.
    #[error("search backend timed out")]
    Timeout,

    /// The backend answered with an error status.
    #[error("search backend rejected request ({status}): {message}")]
    Protocol { status: u16, message: String },

    /// The backend answered but the body could not be understood.
    #[error("could not decode search backend response: {0}")]
    Decode(String),
}

/// Errors surfaced to callers of the search path.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SearchError {
    /// Empty or whitespace-only query while empty queries are not allowed.
    #[error("query must not be empty")]
    EmptyQuery,

    /// The store call failed. Never retried here.
    #[error("search backend unavailable: {0}")]
    BackendUnavailable(#[source] StoreError),

    /// The caller's deadline elapsed before the store answered.
    #[error("search deadline exceeded")]
    DeadlineExceeded,
}

impl From<StoreError> for SearchError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Timeout => SearchError::DeadlineExceeded,
            other => SearchError::BackendUnavailable(other),
        }
    }
}

/// Errors from the indexing pipeline.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IndexError {
    #[error("index store error: {0}")]
    Store(#[from] StoreError),

    #[error("invalid product {id}: {reason}")]
    InvalidProduct { id: i64, reason: String },
}
