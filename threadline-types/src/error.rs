//! Error types for all threadline crates.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A model identifier that is missing from the [`ModelRegistry`](crate::ModelRegistry).
///
/// Never retried: a silent default would corrupt every budget computed from it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown model: {0}")]
pub struct UnknownModelError(pub String);

/// Errors from LLM completion services.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    // Retryable errors
    /// Network-level error (connection reset, DNS failure, etc.).
    #[error("network error: {0}")]
    Network(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// Rate limited by the service.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimit {
        /// Suggested retry delay, if provided by the API.
        retry_after: Option<Duration>,
    },
    /// Request timed out.
    #[error("timeout after {0:?}")]
    Timeout(Duration),
    /// Service is temporarily unavailable.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    // Terminal errors
    /// Authentication/authorization failure.
    #[error("authentication failed: {0}")]
    Authentication(String),
    /// Malformed or invalid request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// Requested model does not exist on the service.
    #[error("model not found: {0}")]
    ModelNotFound(String),
    /// Every retry attempt failed with a retryable error.
    #[error("retries exhausted after {attempts} attempts: {last}")]
    RetryExhausted {
        /// Number of attempts made.
        attempts: usize,
        /// The error returned by the final attempt.
        #[source]
        last: Box<ProviderError>,
    },

    // Catch-all
    /// Any other service error.
    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

/// Fieldless classification of a [`ProviderError`], used to configure retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
    /// See [`ProviderError::Network`].
    Network,
    /// See [`ProviderError::RateLimit`].
    RateLimit,
    /// See [`ProviderError::Timeout`].
    Timeout,
    /// See [`ProviderError::ServiceUnavailable`].
    ServiceUnavailable,
    /// See [`ProviderError::Authentication`].
    Authentication,
    /// See [`ProviderError::InvalidRequest`].
    InvalidRequest,
    /// See [`ProviderError::ModelNotFound`].
    ModelNotFound,
    /// See [`ProviderError::RetryExhausted`].
    RetryExhausted,
    /// See [`ProviderError::Other`].
    Other,
}

impl ProviderError {
    /// The kind of this error.
    #[must_use]
    pub fn kind(&self) -> ProviderErrorKind {
        match self {
            Self::Network(_) => ProviderErrorKind::Network,
            Self::RateLimit { .. } => ProviderErrorKind::RateLimit,
            Self::Timeout(_) => ProviderErrorKind::Timeout,
            Self::ServiceUnavailable(_) => ProviderErrorKind::ServiceUnavailable,
            Self::Authentication(_) => ProviderErrorKind::Authentication,
            Self::InvalidRequest(_) => ProviderErrorKind::InvalidRequest,
            Self::ModelNotFound(_) => ProviderErrorKind::ModelNotFound,
            Self::RetryExhausted { .. } => ProviderErrorKind::RetryExhausted,
            Self::Other(_) => ProviderErrorKind::Other,
        }
    }

    /// Whether this error is likely transient and the request can be retried.
    ///
    /// An exhausted retry is terminal: it is never retried again further up.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::RateLimit { .. } | Self::Timeout(_) | Self::ServiceUnavailable(_)
        )
    }
}

/// Errors from context management operations.
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    /// The model is not in the registry.
    #[error(transparent)]
    UnknownModel(#[from] UnknownModelError),
    /// The remote call made while summarizing failed.
    #[error("provider error during summarization: {0}")]
    Summarization(#[from] ProviderError),
    /// The thread cannot be brought under the context budget.
    #[error("thread uses {tokens} tokens, budget is {budget}")]
    BudgetExceeded {
        /// Current thread cost.
        tokens: usize,
        /// Budget the thread must stay under.
        budget: usize,
    },
}

/// Errors from embedding provider operations.
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    /// Authentication/authorization failure.
    #[error("authentication failed: {0}")]
    Authentication(String),
    /// Rate limited by the provider.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimit {
        /// Suggested retry delay, if provided by the API.
        retry_after: Option<Duration>,
    },
    /// Malformed or invalid request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// The provider answered without the expected embedding.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    /// Network-level error (connection reset, DNS failure, etc.).
    #[error("network error: {0}")]
    Network(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// Any other embedding error.
    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

/// Errors from a chat session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The configured or requested model is not in the registry.
    #[error(transparent)]
    UnknownModel(#[from] UnknownModelError),
    /// The completion service failed with a non-retryable error.
    #[error("provider error: {0}")]
    Provider(ProviderError),
    /// The completion service kept failing with retryable errors.
    #[error("retries exhausted after {attempts} attempts: {last}")]
    RetryExhausted {
        /// Number of attempts made.
        attempts: usize,
        /// The error returned by the final attempt.
        #[source]
        last: Box<ProviderError>,
    },
    /// Context compaction failed.
    #[error("context error: {0}")]
    Context(#[from] ContextError),
}

impl From<ProviderError> for SessionError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::RetryExhausted { attempts, last } => {
                SessionError::RetryExhausted { attempts, last }
            }
            other => SessionError::Provider(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_variant() {
        assert_eq!(
            ProviderError::RateLimit { retry_after: None }.kind(),
            ProviderErrorKind::RateLimit
        );
        assert_eq!(
            ProviderError::Authentication("x".into()).kind(),
            ProviderErrorKind::Authentication
        );
    }

    #[test]
    fn exhausted_is_not_retryable() {
        let err = ProviderError::RetryExhausted {
            attempts: 5,
            last: Box::new(ProviderError::RateLimit { retry_after: None }),
        };
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("5 attempts"));
    }

    #[test]
    fn session_error_lifts_exhaustion() {
        let err: SessionError = ProviderError::RetryExhausted {
            attempts: 3,
            last: Box::new(ProviderError::RateLimit { retry_after: None }),
        }
        .into();
        assert!(matches!(err, SessionError::RetryExhausted { attempts: 3, .. }));

        let err: SessionError = ProviderError::InvalidRequest("bad".into()).into();
        assert!(matches!(err, SessionError::Provider(ProviderError::InvalidRequest(_))));
    }
}
