//! Token counting for text, messages and threads.

use std::sync::Arc;

use threadline_types::{Message, Role, Tokenizer};

/// Framing tokens a chat model reserves around every message.
pub const DEFAULT_MESSAGE_PADDING: usize = 3;

/// Estimates token counts from text using a configurable chars-per-token ratio.
///
/// This is a heuristic [`Tokenizer`]: real tokenization varies per model, so
/// it ignores the model identifier entirely and never fails on one it does
/// not know. The default ratio of 4.0 chars/token approximates GPT-family
/// models.
///
/// # Example
///
/// ```
/// use threadline_context::TokenCounter;
///
/// let counter = TokenCounter::new();
/// assert_eq!(counter.estimate_text("Hello, world!"), 4);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct TokenCounter {
    chars_per_token: f32,
}

impl Default for TokenCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenCounter {
    /// Creates a new `TokenCounter` with the default ratio of 4.0 chars/token.
    #[must_use]
    pub fn new() -> Self {
        Self { chars_per_token: 4.0 }
    }

    /// Creates a new `TokenCounter` with a custom chars-per-token ratio.
    #[must_use]
    pub fn with_ratio(chars_per_token: f32) -> Self {
        Self { chars_per_token }
    }

    /// Estimates the number of tokens in a text string.
    #[must_use]
    pub fn estimate_text(&self, text: &str) -> usize {
        (text.len() as f32 / self.chars_per_token).ceil() as usize
    }
}

impl Tokenizer for TokenCounter {
    fn count(&self, text: &str, _model: &str) -> usize {
        self.estimate_text(text)
    }

    fn truncate(&self, text: &str, max_tokens: usize, _model: &str) -> String {
        let mut end = ((max_tokens as f32) * self.chars_per_token).floor() as usize;
        if end >= text.len() {
            return text.to_string();
        }
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        text[..end].to_string()
    }
}

/// Measures the token cost of messages and threads under a [`Tokenizer`].
///
/// A message costs a fixed framing padding plus the tokens of every field it
/// puts on the wire: role, content and name. Costs are recomputed on every
/// call, nothing is cached.
///
/// # Example
///
/// ```
/// use threadline_context::{TokenCounter, TokenMeter};
/// use threadline_types::Message;
///
/// let meter = TokenMeter::new(TokenCounter::new());
/// // padding 3 + "user" 1 + "Hello, world!" 4
/// assert_eq!(meter.message_cost(&Message::user("Hello, world!"), "any-model"), 8);
/// ```
#[derive(Clone)]
pub struct TokenMeter {
    tokenizer: Arc<dyn Tokenizer>,
    padding: usize,
}

impl std::fmt::Debug for TokenMeter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenMeter").field("padding", &self.padding).finish_non_exhaustive()
    }
}

impl TokenMeter {
    /// Creates a meter over `tokenizer` with [`DEFAULT_MESSAGE_PADDING`].
    #[must_use]
    pub fn new(tokenizer: impl Tokenizer + 'static) -> Self {
        Self::from_arc(Arc::new(tokenizer))
    }

    /// Creates a meter over a shared tokenizer.
    #[must_use]
    pub fn from_arc(tokenizer: Arc<dyn Tokenizer>) -> Self {
        Self { tokenizer, padding: DEFAULT_MESSAGE_PADDING }
    }

    /// Overrides the per-message framing padding.
    #[must_use]
    pub fn with_padding(mut self, padding: usize) -> Self {
        self.padding = padding;
        self
    }

    /// The per-message framing padding.
    #[must_use]
    pub fn padding(&self) -> usize {
        self.padding
    }

    /// The underlying tokenizer.
    #[must_use]
    pub fn tokenizer(&self) -> &Arc<dyn Tokenizer> {
        &self.tokenizer
    }

    /// Tokens in `text` under `model`.
    #[must_use]
    pub fn text_cost(&self, text: &str, model: &str) -> usize {
        self.tokenizer.count(text, model)
    }

    /// Cuts `text` to at most `max_tokens` tokens under `model`.
    #[must_use]
    pub fn truncate(&self, text: &str, max_tokens: usize, model: &str) -> String {
        self.tokenizer.truncate(text, max_tokens, model)
    }

    /// Cost of everything in a message except its content.
    #[must_use]
    pub fn framing_cost(&self, role: Role, name: Option<&str>, model: &str) -> usize {
        let name_tokens = name.map_or(0, |n| self.text_cost(n, model));
        self.padding + self.text_cost(role.as_str(), model) + name_tokens
    }

    /// Full cost of one message.
    #[must_use]
    pub fn message_cost(&self, message: &Message, model: &str) -> usize {
        self.framing_cost(message.role, message.name.as_deref(), model)
            + self.text_cost(&message.content, model)
    }

    /// Sum of the costs of every message in the thread.
    #[must_use]
    pub fn thread_cost(&self, messages: &[Message], model: &str) -> usize {
        messages.iter().map(|m| self.message_cost(m, model)).sum()
    }

    /// How many content tokens a message with this role and name may carry
    /// when the whole message must fit in `message_limit`.
    #[must_use]
    pub fn content_budget(
        &self,
        role: Role,
        name: Option<&str>,
        model: &str,
        message_limit: usize,
    ) -> usize {
        message_limit.saturating_sub(self.framing_cost(role, name, model)).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        let counter = TokenCounter::with_ratio(1.0);
        // 'é' is two bytes; cutting at byte 2 would split it
        let out = counter.truncate("aé b", 2, "m");
        assert_eq!(out, "a");
    }

    #[test]
    fn truncate_keeps_short_text() {
        let counter = TokenCounter::new();
        assert_eq!(counter.truncate("short", 100, "m"), "short");
    }

    #[test]
    fn framing_counts_name() {
        let meter = TokenMeter::new(TokenCounter::new()).with_padding(0);
        let bare = meter.framing_cost(Role::User, None, "m");
        let named = meter.framing_cost(Role::User, Some("alexandra"), "m");
        assert_eq!(bare, 1);
        assert_eq!(named, 1 + 3);
    }

    #[test]
    fn content_budget_never_zero() {
        let meter = TokenMeter::new(TokenCounter::new());
        assert_eq!(meter.content_budget(Role::User, None, "m", 2), 1);
        assert_eq!(meter.content_budget(Role::User, None, "m", 100), 96);
    }
}
