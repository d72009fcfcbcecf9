//! Core types for token-budgeted LLM conversations.
//!
//! Defines the [`Message`] thread model, per-model limits
//! ([`ModelProfile`], [`ModelRegistry`]), the error taxonomy, and the traits
//! for the collaborators a session talks to: [`Tokenizer`],
//! [`CompletionService`] and [`EmbeddingProvider`].

pub mod error;
pub mod model;
pub mod traits;
pub mod types;

pub use error::*;
pub use model::*;
pub use traits::*;
pub use types::*;
