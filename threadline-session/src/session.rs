//! The chat session: a token-budgeted thread driven against one model.

use std::sync::Arc;

use threadline_context::{CompactionStrategy, Compactor, ContentSplitter, TokenMeter};
use threadline_types::{
    CompletionRequest, CompletionService, ContextError, Message, ModelProfile, ModelRegistry,
    ProviderError, Role, SessionError, Tokenizer,
};

use crate::config::SessionConfig;
use crate::retry::Retrying;

/// A conversation with a remote model that always fits its context window.
///
/// Oversized input is split on the way in, so no message ever exceeds the
/// model's message limit. Before each call the thread is checked against
/// [`ModelProfile::thread_budget`] and compacted with the configured
/// strategy when it no longer fits. Every remote call, summaries included,
/// goes through the session's retry policy.
///
/// A failed [`get_response`](Self::get_response) leaves the thread exactly
/// as it was.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use threadline_context::TokenCounter;
/// use threadline_session::{ChatSession, SessionConfig};
/// use threadline_types::{CompletionService, ModelRegistry, SessionError};
///
/// async fn ask<S: CompletionService>(service: S) -> Result<String, SessionError> {
///     let config = SessionConfig::chat("gpt-4-1106-preview")
///         .with_instruction("You are a patient tutor.");
///     let mut session =
///         ChatSession::new(service, ModelRegistry::builtin(), Arc::new(TokenCounter::new()), config)?;
///     session.send("Explain ownership in one paragraph.").await
/// }
/// ```
pub struct ChatSession<S> {
    service: Retrying<S>,
    registry: ModelRegistry,
    meter: TokenMeter,
    splitter: ContentSplitter,
    profile: ModelProfile,
    config: SessionConfig,
    thread: Vec<Message>,
}

impl<S: CompletionService> ChatSession<S> {
    /// Creates a session for `config.model`, seeding the thread with the
    /// configured instructions.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::UnknownModel`] when the model is not in
    /// `registry`.
    pub fn new(
        service: S,
        registry: ModelRegistry,
        tokenizer: Arc<dyn Tokenizer>,
        config: SessionConfig,
    ) -> Result<Self, SessionError> {
        let profile = registry.get(&config.model)?.clone();
        let meter = TokenMeter::from_arc(tokenizer);
        let mut session = Self {
            service: Retrying::new(service, config.retry.clone()),
            registry,
            splitter: ContentSplitter::new(meter.clone()),
            meter,
            profile,
            config,
            thread: Vec::new(),
        };
        session.reset();
        Ok(session)
    }

    /// The current thread.
    #[must_use]
    pub fn thread(&self) -> &[Message] {
        &self.thread
    }

    /// Limits of the current model.
    #[must_use]
    pub fn profile(&self) -> &ModelProfile {
        &self.profile
    }

    /// The session configuration.
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The meter pricing messages for this session.
    #[must_use]
    pub fn meter(&self) -> &TokenMeter {
        &self.meter
    }

    /// The underlying completion service.
    #[must_use]
    pub fn service(&self) -> &S {
        self.service.inner()
    }

    /// Token cost of the current thread under the current model.
    #[must_use]
    pub fn token_count(&self) -> usize {
        self.meter.thread_cost(&self.thread, &self.profile.model_id)
    }

    /// Drops the conversation, leaving only the instruction messages.
    pub fn reset(&mut self) {
        let instructions = std::mem::take(&mut self.config.instructions);
        self.thread = instructions
            .iter()
            .flat_map(|text| self.chunked(Message::system(text.as_str())))
            .collect();
        self.config.instructions = instructions;
    }

    /// Appends `content` as one or more user messages, each within the
    /// message limit. Every chunk carries `name`. Chunks are trimmed, so
    /// blank content adds nothing.
    ///
    /// A name whose framing would take more than half the message limit is
    /// truncated.
    ///
    /// Window fit is not checked here; that happens on the next call.
    pub fn add_message(&mut self, content: &str, name: Option<&str>) -> &[Message] {
        let name = name.and_then(|n| self.fitted_name(Role::User, n));
        let model = self.profile.model_id.as_str();
        let budget =
            self.meter.content_budget(Role::User, name.as_deref(), model, self.profile.message_limit);
        let chunks = self.splitter.split_within(content, model, budget);
        tracing::debug!(chunks = chunks.len(), model, "threadline.session.add_message");

        self.thread.extend(chunks.into_iter().map(|chunk| {
            let message = Message::user(chunk);
            match &name {
                Some(name) => message.with_name(name.clone()),
                None => message,
            }
        }));
        &self.thread
    }

    /// Switches to another model from the registry.
    ///
    /// When the new message limit is smaller, every message is split again
    /// to fit it, keeping role, name and order. Window compaction waits for
    /// the next call.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::UnknownModel`] and leaves the session
    /// unchanged when `model` is not in the registry.
    pub fn update_model(&mut self, model: &str) -> Result<(), SessionError> {
        let profile = self.registry.get(model)?.clone();
        let shrinking = profile.message_limit < self.profile.message_limit;
        tracing::info!(
            from = %self.profile.model_id,
            to = %profile.model_id,
            resplit = shrinking,
            "threadline.session.model_switch"
        );
        self.profile = profile;
        self.config.model = model.to_string();

        if shrinking {
            let thread = std::mem::take(&mut self.thread);
            self.thread = thread.into_iter().flat_map(|m| self.chunked(m)).collect();
        }
        Ok(())
    }

    /// Adds `content` as a user message and asks for a reply.
    ///
    /// # Errors
    ///
    /// See [`get_response`](Self::get_response).
    #[must_use = "this returns a Result that should be handled"]
    pub async fn send(&mut self, content: &str) -> Result<String, SessionError> {
        self.add_message(content, None);
        self.get_response().await
    }

    /// Sends the thread to the model and appends its reply.
    ///
    /// Runs the pre-call strategy while the thread is over budget, calls the
    /// service through the retry policy, appends the reply as an assistant
    /// message, then runs the post-call strategy. A post-call failure is
    /// logged and the reply kept.
    ///
    /// # Errors
    ///
    /// - [`ContextError::BudgetExceeded`] (as [`SessionError::Context`]) when
    ///   the thread is over budget and no strategy brings it under.
    ///   This includes system messages that alone use up the budget.
    /// - [`SessionError::Context`] when a pre-call summary fails.
    /// - [`SessionError::RetryExhausted`] when every attempt hit a retryable
    ///   error, the summary calls included. [`SessionError::Provider`] for
    ///   any other service failure.
    ///
    /// The thread is unchanged on error.
    #[must_use = "this returns a Result that should be handled"]
    pub async fn get_response(&mut self) -> Result<String, SessionError> {
        let model = self.profile.model_id.clone();
        let working = self.fit_to_budget(self.thread.clone()).await?;

        let request = CompletionRequest {
            model: model.clone(),
            messages: working.clone(),
            temperature: Some(self.config.effective_temperature()),
            response_format: self.config.response_mode.response_format(),
            seed: self.config.seed,
        };
        let response = self.service.complete(request).await?;
        tracing::debug!(
            model = %model,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "threadline.session.response"
        );

        let reply = response.message.content;
        let mut working = working;
        working.push(Message::assistant(reply.clone()));

        if let Some(strategy) = self.config.post_compaction {
            match self.compact(strategy, working.clone()).await {
                Ok(compacted) => working = compacted,
                Err(error) => tracing::warn!(
                    ?strategy,
                    error = %error,
                    "threadline.session.post_compaction_failed"
                ),
            }
        }

        self.thread = working;
        Ok(reply)
    }

    /// Compacts `thread` with the pre-call strategy until it is under
    /// budget, or fails when it cannot get there.
    async fn fit_to_budget(&self, mut thread: Vec<Message>) -> Result<Vec<Message>, SessionError> {
        let model = self.profile.model_id.as_str();
        let budget = self.profile.thread_budget();
        let mut tokens = self.meter.thread_cost(&thread, model);
        if tokens < budget {
            return Ok(thread);
        }

        // no strategy touches system messages
        let system_tokens: usize = thread
            .iter()
            .filter(|m| m.is_system())
            .map(|m| self.meter.message_cost(m, model))
            .sum();
        if system_tokens >= budget {
            return Err(ContextError::BudgetExceeded { tokens, budget }.into());
        }

        let Some(strategy) = self.config.pre_compaction else {
            return Err(ContextError::BudgetExceeded { tokens, budget }.into());
        };

        loop {
            thread = self.compact(strategy, thread).await.map_err(|error| match error {
                ContextError::Summarization(cause @ ProviderError::RetryExhausted { .. }) => {
                    SessionError::from(cause)
                }
                other => SessionError::from(other),
            })?;
            let after = self.meter.thread_cost(&thread, model);
            tracing::info!(
                ?strategy,
                before = tokens,
                after,
                budget,
                messages = thread.len(),
                "threadline.session.compaction"
            );
            let shrank = after < tokens;
            tokens = after;
            if tokens < budget {
                return Ok(thread);
            }
            if !shrank {
                return Err(ContextError::BudgetExceeded { tokens, budget }.into());
            }
        }
    }

    async fn compact(
        &self,
        strategy: CompactionStrategy,
        thread: Vec<Message>,
    ) -> Result<Vec<Message>, ContextError> {
        Compactor::new(&self.meter, &self.profile, &self.service)
            .with_temperature(self.config.summary_temperature)
            .with_seed(self.config.seed)
            .compact(strategy, thread)
            .await
    }

    /// Splits `message` into copies that each fit the current message limit,
    /// preserving role and name. A message that already fits comes back as is.
    fn chunked(&self, message: Message) -> Vec<Message> {
        let model = self.profile.model_id.as_str();
        let limit = self.profile.message_limit;
        if self.meter.message_cost(&message, model) <= limit {
            return vec![message];
        }

        let name = message.name.as_deref().and_then(|n| self.fitted_name(message.role, n));
        let budget = self.meter.content_budget(message.role, name.as_deref(), model, limit);
        self.splitter
            .split_within(&message.content, model, budget)
            .into_iter()
            .map(|chunk| Message { role: message.role, content: chunk, name: name.clone() })
            .collect()
    }

    /// `name`, truncated so its framing takes at most half the message
    /// limit. `None` when nothing of it fits.
    fn fitted_name(&self, role: Role, name: &str) -> Option<String> {
        let model = self.profile.model_id.as_str();
        let room = (self.profile.message_limit / 2)
            .saturating_sub(self.meter.framing_cost(role, None, model));
        if self.meter.text_cost(name, model) <= room {
            return Some(name.to_string());
        }

        let fitted = self.meter.truncate(name, room, model);
        tracing::warn!(
            model,
            name_tokens = self.meter.text_cost(name, model),
            room,
            "threadline.session.name_truncated"
        );
        (!fitted.is_empty()).then_some(fitted)
    }
}

impl<S> std::fmt::Debug for ChatSession<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("profile", &self.profile)
            .field("messages", &self.thread.len())
            .finish_non_exhaustive()
    }
}
