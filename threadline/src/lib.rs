#![deny(missing_docs)]
//! # threadline
//!
//! Keeps a conversation with a remote LLM inside the model's limits: no
//! message over the per-message token limit, no call over the context
//! window. Re-exports the member crates behind feature flags, plus a
//! `prelude` for the common path.

pub use threadline_types;
#[cfg(feature = "context")]
pub use threadline_context;
#[cfg(feature = "session")]
pub use threadline_session;

/// Common imports for building a session.
pub mod prelude {
    pub use threadline_types::{
        CompletionRequest, CompletionResponse, CompletionService, ContextError, EmbeddingProvider,
        Message, ModelProfile, ModelRegistry, ProviderError, Role, SessionError, Tokenizer,
        UnknownModelError,
    };

    #[cfg(feature = "context")]
    pub use threadline_context::{
        CompactionStrategy, ContentSplitter, EmbeddingAgent, TokenCounter, TokenMeter,
    };

    #[cfg(feature = "session")]
    pub use threadline_session::{
        ChatSession, ResponseMode, RetryConfig, Retrying, SessionConfig,
    };
}
