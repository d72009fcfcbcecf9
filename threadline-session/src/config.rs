//! Configuration types for a chat session.

use serde::{Deserialize, Serialize};
use threadline_context::CompactionStrategy;
use threadline_types::ResponseFormat;

use crate::retry::RetryConfig;

/// Seed sent with every request unless configured otherwise, so replies
/// stay consistent across a conversation.
pub const DEFAULT_SEED: u64 = 10_000;

/// What shape the model's replies take.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseMode {
    /// Plain text.
    #[default]
    FreeText,
    /// A JSON object, optionally constrained by a JSON Schema.
    Json {
        /// JSON Schema the reply must follow.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        schema: Option<serde_json::Value>,
    },
}

impl ResponseMode {
    /// Sampling temperature used when the config does not set one: low for
    /// JSON so output stays consistent, higher for free text.
    #[must_use]
    pub fn default_temperature(&self) -> f32 {
        match self {
            ResponseMode::FreeText => 0.75,
            ResponseMode::Json { .. } => 0.1,
        }
    }

    /// The request-level format for this mode. Free text sends none.
    #[must_use]
    pub fn response_format(&self) -> Option<ResponseFormat> {
        match self {
            ResponseMode::FreeText => None,
            ResponseMode::Json { schema: None } => Some(ResponseFormat::JsonObject),
            ResponseMode::Json { schema: Some(schema) } => {
                Some(ResponseFormat::JsonSchema { schema: schema.clone() })
            }
        }
    }
}

/// Configuration for a [`ChatSession`](crate::ChatSession).
///
/// Every field has a default, so a config file only needs the fields it
/// changes:
///
/// ```
/// use threadline_session::SessionConfig;
///
/// let config: SessionConfig = serde_json::from_str(r#"{
///     "model": "gpt-4-1106-preview",
///     "instructions": ["Answer like a pirate."],
///     "pre_compaction": "summarize"
/// }"#).unwrap();
/// assert_eq!(config.seed, Some(10_000));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Model id, looked up in the session's registry.
    pub model: String,
    /// Instructions seeded into the thread as leading system messages.
    pub instructions: Vec<String>,
    /// Free text or JSON replies.
    pub response_mode: ResponseMode,
    /// Sampling temperature. `None` picks [`ResponseMode::default_temperature`].
    pub temperature: Option<f32>,
    /// Sampling seed.
    pub seed: Option<u64>,
    /// Temperature for summary requests made during compaction.
    pub summary_temperature: f32,
    /// Compaction applied before each call when the thread is over budget.
    pub pre_compaction: Option<CompactionStrategy>,
    /// Compaction applied after each reply.
    pub post_compaction: Option<CompactionStrategy>,
    /// Retry policy for every remote call, summaries included.
    pub retry: RetryConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            model: String::new(),
            instructions: Vec::new(),
            response_mode: ResponseMode::FreeText,
            temperature: None,
            seed: Some(DEFAULT_SEED),
            summary_temperature: 0.0,
            pre_compaction: None,
            post_compaction: None,
            retry: RetryConfig::default(),
        }
    }
}

impl SessionConfig {
    /// A free-text chat that summarizes old conversation when the window
    /// fills up.
    #[must_use]
    pub fn chat(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            pre_compaction: Some(CompactionStrategy::Summarize),
            ..Self::default()
        }
    }

    /// A JSON-mode session where every call stands alone: the conversation
    /// is dropped after each reply, keeping only the instructions.
    #[must_use]
    pub fn json(model: impl Into<String>, schema: Option<serde_json::Value>) -> Self {
        Self {
            model: model.into(),
            response_mode: ResponseMode::Json { schema },
            pre_compaction: Some(CompactionStrategy::Drop),
            post_compaction: Some(CompactionStrategy::Drop),
            ..Self::default()
        }
    }

    /// Adds an instruction.
    #[must_use]
    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instructions.push(instruction.into());
        self
    }

    /// Sets the pre-call compaction strategy.
    #[must_use]
    pub fn with_pre_compaction(mut self, strategy: Option<CompactionStrategy>) -> Self {
        self.pre_compaction = strategy;
        self
    }

    /// Sets the post-call compaction strategy.
    #[must_use]
    pub fn with_post_compaction(mut self, strategy: Option<CompactionStrategy>) -> Self {
        self.post_compaction = strategy;
        self
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// The temperature requests are sent with.
    #[must_use]
    pub fn effective_temperature(&self) -> f32 {
        self.temperature.unwrap_or_else(|| self.response_mode.default_temperature())
    }
}
