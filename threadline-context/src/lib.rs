//! Content splitting, token accounting and compaction for LLM threads.
//!
//! - [`ContentSplitter`] breaks oversized text into chunks that fit a model's
//!   message limit, cutting on paragraph, line and sentence boundaries.
//! - [`TokenMeter`] prices messages and threads under any
//!   [`Tokenizer`](threadline_types::Tokenizer); [`TokenCounter`] is a
//!   model-agnostic heuristic tokenizer.
//! - [`CompactionStrategy`] and [`Compactor`] shrink a thread that no longer
//!   fits the context window.
//! - [`EmbeddingAgent`] reuses the splitter to chunk text for an embedding
//!   model and ranks candidates by [`cosine_similarity`].

pub mod counter;
pub mod embedding;
pub mod splitter;
pub mod strategies;

pub use counter::{DEFAULT_MESSAGE_PADDING, TokenCounter, TokenMeter};
pub use embedding::{EmbeddingAgent, cosine_similarity};
pub use splitter::{ContentSplitter, NATURAL_LANGUAGE_DELIMITERS};
pub use strategies::{
    CompactionStrategy, Compactor, SUMMARY_PREFIX, drop_to_system, slide_window,
};
