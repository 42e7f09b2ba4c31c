//! Error types for embedding providers, persistence, and grading.
//!
//! Provider and store errors are defined here so the grader can classify
//! them (conflict vs. hard failure) without string matching.

use thiserror::Error;

/// Errors that can occur when interacting with an embedding provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The API returned a 429 rate limit response.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Authentication failed (invalid API key).
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The requested model was not found.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// The API returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    NetworkError(String),

    /// The response body could not be turned into an embedding.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// Two vectors of different length were scored against each other.
///
/// In practice this means the stored reference embedding was produced by a
/// different model than the one that embedded the submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("dimension mismatch: {left} vs {right}")]
pub struct DimensionMismatch {
    pub left: usize,
    pub right: usize,
}

/// Errors returned by a [`QuizStore`](crate::traits::QuizStore).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("quiz item not found: {0}")]
    NotFound(String),

    #[error("quiz item already exists: {0}")]
    AlreadyExists(String),

    /// The compare-and-swap on `tries` lost a race with another writer.
    #[error("write conflict on {quiz_id}: expected tries={expected}, found {actual}")]
    Conflict {
        quiz_id: String,
        expected: u32,
        actual: u32,
    },

    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors surfaced by the grader. All are terminal for the current attempt.
#[derive(Debug, Error)]
pub enum GradingError {
    #[error("embedding provider failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("quiz item not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    DimensionMismatch(#[from] DimensionMismatch),

    /// The reference embedding was produced by another model and must be
    /// regenerated before the item can be graded.
    #[error("reference embedding was produced by '{reference}', grader is configured for '{configured}'")]
    StaleEmbedding {
        reference: String,
        configured: String,
    },

    #[error("persistence failed: {0}")]
    Persistence(StoreError),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("quiz item {0} has reached the maximum number of tries")]
    TriesExhausted(String),
}

impl From<StoreError> for GradingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => GradingError::NotFound(id),
            other => GradingError::Persistence(other),
        }
    }
}

impl ProviderError {
    /// Returns `true` if this error is permanent for the configured model.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            ProviderError::AuthenticationFailed(_) | ProviderError::ModelNotFound(_)
        )
    }

    /// Returns the retry-after delay in milliseconds, if applicable.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            ProviderError::RateLimited { retry_after_ms } => Some(*retry_after_ms),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_not_found_maps_to_grading_not_found() {
        let err: GradingError = StoreError::NotFound("q1".into()).into();
        assert!(matches!(err, GradingError::NotFound(id) if id == "q1"));
    }

    #[test]
    fn conflict_maps_to_persistence() {
        let err: GradingError = StoreError::Conflict {
            quiz_id: "q1".into(),
            expected: 0,
            actual: 1,
        }
        .into();
        assert!(matches!(err, GradingError::Persistence(StoreError::Conflict { .. })));
    }

    #[test]
    fn permanent_provider_errors() {
        assert!(ProviderError::AuthenticationFailed("bad key".into()).is_permanent());
        assert!(!ProviderError::Timeout(30).is_permanent());
        assert_eq!(
            ProviderError::RateLimited {
                retry_after_ms: 5000
            }
            .retry_after_ms(),
            Some(5000)
        );
    }
}
