//! Recursive splitting of oversized text into model-safe chunks.

use std::fmt;
use std::sync::Arc;

use threadline_types::ModelProfile;

use crate::counter::TokenMeter;

/// Natural-language boundaries in priority order: paragraph, line, then
/// sentence endings.
pub const NATURAL_LANGUAGE_DELIMITERS: [&str; 5] = ["\n\n", "\n", ". ", "? ", "! "];

type MetadataFn = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Breaks text into chunks that each fit a model's message limit.
///
/// Oversized text is cut in two halves of roughly equal token count along the
/// highest-priority delimiter that actually occurs in it, and each half is
/// split again until it fits. Balanced halves keep sibling chunks close in
/// size instead of leaving a tail of tiny fragments. Text with no delimiter
/// left to cut on is truncated, which loses content.
///
/// An optional metadata wrapper (e.g. a title header) is applied to every
/// chunk and counted against the limit, but never split itself.
///
/// # Example
///
/// ```
/// use threadline_context::{ContentSplitter, TokenCounter, TokenMeter};
/// use threadline_types::ModelProfile;
///
/// let splitter = ContentSplitter::new(TokenMeter::new(TokenCounter::new()));
/// let profile = ModelProfile::new("m", 64, 8);
///
/// let chunks = splitter.split("First sentence here. Second sentence here.", &profile);
/// assert_eq!(chunks, vec!["First sentence here", "Second sentence here."]);
/// ```
#[derive(Clone)]
pub struct ContentSplitter {
    meter: TokenMeter,
    delimiters: Vec<String>,
    metadata: Option<MetadataFn>,
}

impl fmt::Debug for ContentSplitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentSplitter")
            .field("delimiters", &self.delimiters)
            .field("metadata", &self.metadata.is_some())
            .finish()
    }
}

impl ContentSplitter {
    /// Creates a splitter using [`NATURAL_LANGUAGE_DELIMITERS`] and no metadata.
    #[must_use]
    pub fn new(meter: TokenMeter) -> Self {
        Self {
            meter,
            delimiters: NATURAL_LANGUAGE_DELIMITERS.iter().map(|d| d.to_string()).collect(),
            metadata: None,
        }
    }

    /// Replaces the delimiter priority list (e.g. for source code).
    #[must_use]
    pub fn with_delimiters<I, D>(mut self, delimiters: I) -> Self
    where
        I: IntoIterator<Item = D>,
        D: Into<String>,
    {
        self.delimiters =
            delimiters.into_iter().map(Into::into).filter(|d: &String| !d.is_empty()).collect();
        self
    }

    /// Wraps every chunk with `metadata`, counting the wrapped size.
    #[must_use]
    pub fn with_metadata<F>(mut self, metadata: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.metadata = Some(Arc::new(metadata));
        self
    }

    /// The delimiter priority list.
    #[must_use]
    pub fn delimiters(&self) -> &[String] {
        &self.delimiters
    }

    /// The meter used to measure chunks.
    #[must_use]
    pub fn meter(&self) -> &TokenMeter {
        &self.meter
    }

    /// Splits `text` so every wrapped chunk fits `profile.message_limit`.
    #[must_use]
    pub fn split(&self, text: &str, profile: &ModelProfile) -> Vec<String> {
        self.split_within(text, &profile.model_id, profile.message_limit)
    }

    /// Splits `text` so every wrapped chunk is at most `limit` tokens under `model`.
    ///
    /// Empty or whitespace-only text yields no chunks. Chunks come back in
    /// the order their content appears in `text`.
    #[must_use]
    pub fn split_within(&self, text: &str, model: &str, limit: usize) -> Vec<String> {
        let mut chunks = Vec::new();
        self.split_into(text, model, limit, &mut chunks);
        chunks
    }

    fn split_into(&self, text: &str, model: &str, limit: usize, out: &mut Vec<String>) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }

        let content = self.wrap(text);
        if self.meter.text_cost(&content, model) <= limit {
            out.push(content);
            return;
        }

        // Cut the bare text, never the wrapped content: every chunk gets its
        // own copy of the metadata.
        for delimiter in &self.delimiters {
            if let Some((left, right)) = self.split_in_half(text, model, delimiter) {
                self.split_into(&left, model, limit, out);
                self.split_into(&right, model, limit, out);
                return;
            }
        }

        tracing::warn!(
            model,
            limit,
            tokens = self.meter.text_cost(&content, model),
            "threadline.splitter.truncated"
        );
        out.push(self.meter.truncate(&content, limit, model));
    }

    fn wrap(&self, text: &str) -> String {
        match &self.metadata {
            Some(metadata) => metadata(text),
            None => text.to_string(),
        }
    }

    /// Cuts `text` on `delimiter` into two halves of roughly equal token
    /// count. Returns `None` when the delimiter yields fewer than two
    /// non-empty fragments.
    fn split_in_half(&self, text: &str, model: &str, delimiter: &str) -> Option<(String, String)> {
        let fragments: Vec<&str> = text.split(delimiter).filter(|f| !f.is_empty()).collect();
        if fragments.len() < 2 {
            return None;
        }

        let halfway = self.meter.text_cost(text, model) / 2;
        // Both sides always get at least one fragment; a heavy first fragment
        // degenerates the cut to index 1.
        let cut = (1..fragments.len())
            .find(|&i| self.meter.text_cost(&fragments[..i].join(delimiter), model) >= halfway)
            .unwrap_or(fragments.len() - 1);

        Some((fragments[..cut].join(delimiter), fragments[cut..].join(delimiter)))
    }
}
