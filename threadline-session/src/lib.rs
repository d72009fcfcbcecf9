//! Token-budgeted chat sessions over any [`CompletionService`].
//!
//! [`ChatSession`] keeps a conversation within a model's limits: input is
//! split to the message limit, the thread is compacted before it outgrows
//! the context window, and rate-limited calls are retried after a random
//! wait ([`RetryScheduler`]).
//!
//! [`CompletionService`]: threadline_types::CompletionService

pub mod config;
pub mod retry;
pub mod session;

pub use config::{DEFAULT_SEED, ResponseMode, SessionConfig};
pub use retry::{RetryConfig, RetryScheduler, Retrying};
pub use session::ChatSession;
