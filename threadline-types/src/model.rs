//! Model limits: per-model context window and per-message token budgets.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::UnknownModelError;

/// Token limits of one model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelProfile {
    /// The model identifier, as sent to the service.
    pub model_id: String,
    /// Maximum tokens for the whole thread sent on one call.
    pub context_window: usize,
    /// Maximum tokens for a single message.
    pub message_limit: usize,
}

impl ModelProfile {
    /// Creates a new `ModelProfile`.
    #[must_use]
    pub fn new(model_id: impl Into<String>, context_window: usize, message_limit: usize) -> Self {
        Self { model_id: model_id.into(), context_window, message_limit }
    }

    /// Tokens the thread may use before a call, leaving one message worth of
    /// room for the reply.
    ///
    /// # Example
    ///
    /// ```
    /// use threadline_types::ModelProfile;
    ///
    /// let profile = ModelProfile::new("m", 4096, 1024);
    /// assert_eq!(profile.thread_budget(), 3072);
    /// ```
    #[must_use]
    pub fn thread_budget(&self) -> usize {
        self.context_window.saturating_sub(self.message_limit)
    }
}

/// Data-driven table of [`ModelProfile`]s keyed by model identifier.
///
/// Lookups fail with [`UnknownModelError`] instead of falling back to a
/// default. Serializes as a list of profiles, so the table can live in a
/// config file.
///
/// # Example
///
/// ```
/// use threadline_types::{ModelProfile, ModelRegistry};
///
/// let mut registry = ModelRegistry::new();
/// registry.insert(ModelProfile::new("local-llama", 8192, 1024));
/// assert_eq!(registry.get("local-llama").unwrap().message_limit, 1024);
/// assert!(registry.get("missing").is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<ModelProfile>", into = "Vec<ModelProfile>")]
pub struct ModelRegistry {
    profiles: HashMap<String, ModelProfile>,
}

impl ModelRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry preloaded with the chat and embedding models served by the
    /// OpenAI and Anyscale public endpoints.
    #[must_use]
    pub fn builtin() -> Self {
        [
            ("mistralai/Mixtral-8x7B-Instruct-v0.1", 32_768, 2_048),
            ("mistralai/Mistral-7B-Instruct-v0.1", 16_384, 2_048),
            ("HuggingFaceH4/zephyr-7b-beta", 16_384, 512),
            ("codellama/CodeLlama-34b-Instruct-hf", 16_384, 1_024),
            ("meta-llama/Llama-2-13b-chat-hf", 4_096, 512),
            ("gpt-4-1106-preview", 128_000, 4_096),
            ("gpt-3.5-turbo-1106", 16_385, 4_096),
            // embedding models
            ("thenlper/gte-large", 512, 512),
            // 8191 upstream; capped lower to keep chunks semantically tight
            ("text-embedding-ada-002", 8_192, 1_024),
        ]
        .into_iter()
        .map(|(id, window, limit)| ModelProfile::new(id, window, limit))
        .collect()
    }

    /// Adds or replaces a profile. Returns the profile previously registered
    /// under the same identifier, if any.
    pub fn insert(&mut self, profile: ModelProfile) -> Option<ModelProfile> {
        self.profiles.insert(profile.model_id.clone(), profile)
    }

    /// Looks up a model's profile.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownModelError`] when the model is not registered.
    pub fn get(&self, model_id: &str) -> Result<&ModelProfile, UnknownModelError> {
        self.profiles.get(model_id).ok_or_else(|| UnknownModelError(model_id.to_string()))
    }

    /// Whether the model is registered.
    #[must_use]
    pub fn contains(&self, model_id: &str) -> bool {
        self.profiles.contains_key(model_id)
    }

    /// Number of registered models.
    #[must_use]
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Iterates registered profiles in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = &ModelProfile> {
        self.profiles.values()
    }
}

impl FromIterator<ModelProfile> for ModelRegistry {
    fn from_iter<I: IntoIterator<Item = ModelProfile>>(iter: I) -> Self {
        let mut registry = Self::new();
        for profile in iter {
            registry.insert(profile);
        }
        registry
    }
}

impl From<Vec<ModelProfile>> for ModelRegistry {
    fn from(profiles: Vec<ModelProfile>) -> Self {
        profiles.into_iter().collect()
    }
}

impl From<ModelRegistry> for Vec<ModelProfile> {
    fn from(registry: ModelRegistry) -> Self {
        let mut profiles: Vec<ModelProfile> = registry.profiles.into_values().collect();
        profiles.sort_by(|a, b| a.model_id.cmp(&b.model_id));
        profiles
    }
}
