//! Core traits: Tokenizer, CompletionService, EmbeddingProvider.

use std::future::Future;
use std::sync::Arc;

use crate::error::{EmbeddingError, ProviderError};
use crate::types::{CompletionRequest, CompletionResponse, EmbeddingRequest, EmbeddingResponse};

/// Counts and truncates text in a model's tokens.
///
/// Implementations must be deterministic and must not fail on a model they
/// do not recognize: fall back to a default encoding instead. The trait is
/// object-safe so sessions can hold an `Arc<dyn Tokenizer>`.
pub trait Tokenizer: Send + Sync {
    /// Number of tokens `text` encodes to under `model`.
    fn count(&self, text: &str, model: &str) -> usize;

    /// Cuts `text` down to its first `max_tokens` tokens under `model`.
    fn truncate(&self, text: &str, max_tokens: usize, model: &str) -> String;
}

impl<T: Tokenizer + ?Sized> Tokenizer for Arc<T> {
    fn count(&self, text: &str, model: &str) -> usize {
        (**self).count(text, model)
    }

    fn truncate(&self, text: &str, max_tokens: usize, model: &str) -> String {
        (**self).truncate(text, max_tokens, model)
    }
}

/// Remote LLM completion endpoint.
///
/// Uses RPITIT (return position impl trait in trait) and is not object-safe;
/// compose with generics `<S: CompletionService>`.
///
/// # Example
///
/// ```
/// use std::future::Future;
/// use threadline_types::*;
///
/// struct Echo;
///
/// impl CompletionService for Echo {
///     fn complete(
///         &self,
///         request: CompletionRequest,
///     ) -> impl Future<Output = Result<CompletionResponse, ProviderError>> + Send {
///         async move {
///             let last = request.messages.last().map(|m| m.content.clone()).unwrap_or_default();
///             Ok(CompletionResponse {
///                 model: request.model,
///                 message: Message::assistant(last),
///                 usage: TokenUsage::default(),
///             })
///         }
///     }
/// }
/// ```
pub trait CompletionService: Send + Sync {
    /// Send the thread and get the assistant's reply.
    ///
    /// Rate limiting is reported as [`ProviderError::RateLimit`], distinct
    /// from every other failure.
    fn complete(
        &self,
        request: CompletionRequest,
    ) -> impl Future<Output = Result<CompletionResponse, ProviderError>> + Send;
}

impl<S: CompletionService> CompletionService for &S {
    fn complete(
        &self,
        request: CompletionRequest,
    ) -> impl Future<Output = Result<CompletionResponse, ProviderError>> + Send {
        (**self).complete(request)
    }
}

/// Remote embedding endpoint.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed every input string of the request.
    fn embed(
        &self,
        request: EmbeddingRequest,
    ) -> impl Future<Output = Result<EmbeddingResponse, EmbeddingError>> + Send;
}
