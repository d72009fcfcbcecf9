//! Context compaction strategies: drop, slide and summarize.

use serde::{Deserialize, Serialize};
use threadline_types::{
    CompletionRequest, CompletionService, ContextError, Message, ModelProfile, Role,
};

use crate::counter::TokenMeter;

/// Prefix every summary message starts with, so summaries stay recognizable
/// in the thread.
pub const SUMMARY_PREFIX: &str = "CONTEXT SUMMARY:";

/// How to shrink a thread that no longer fits the context window.
///
/// A session holds at most one strategy to run before each call and one to
/// run after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompactionStrategy {
    /// Keep the system messages, forget the conversation. Pairs with JSON
    /// mode, where every call stands on its own.
    Drop,
    /// Evict one message limit worth of the oldest conversation.
    Slide,
    /// Fold old conversation into summary messages written by the model.
    Summarize,
}

// ---- Drop ------------------------------------------------------------------

/// Keeps only the system messages, in their original order.
///
/// # Example
///
/// ```
/// use threadline_context::strategies::drop_to_system;
/// use threadline_types::Message;
///
/// let thread = vec![Message::system("be brief"), Message::user("hi"), Message::assistant("hello")];
/// assert_eq!(drop_to_system(thread), vec![Message::system("be brief")]);
/// ```
#[must_use]
pub fn drop_to_system(thread: Vec<Message>) -> Vec<Message> {
    thread.into_iter().filter(|m| m.is_system()).collect()
}

// ---- Slide -----------------------------------------------------------------

/// Drops the oldest non-system messages until at least `message_limit`
/// tokens have been freed.
///
/// A thread already under [`ModelProfile::thread_budget`] comes back
/// unchanged. The message whose cost crosses the limit is dropped with the
/// ones before it. The most recent non-system message is always kept, even
/// when that frees less than the limit. System messages are kept in their
/// original relative order.
#[must_use]
pub fn slide_window(thread: Vec<Message>, meter: &TokenMeter, profile: &ModelProfile) -> Vec<Message> {
    let model = profile.model_id.as_str();
    if meter.thread_cost(&thread, model) < profile.thread_budget() {
        return thread;
    }

    let (mut system, rest): (Vec<Message>, Vec<Message>) =
        thread.into_iter().partition(Message::is_system);

    let mut freed = 0;
    let mut cut = 0;
    for message in rest.iter().take(rest.len().saturating_sub(1)) {
        freed += meter.message_cost(message, model);
        cut += 1;
        if freed >= profile.message_limit {
            break;
        }
    }

    tracing::debug!(dropped = cut, freed, "threadline.context.slide");
    system.extend(rest.into_iter().skip(cut));
    system
}

// ---- Compactor -------------------------------------------------------------

/// Applies a [`CompactionStrategy`] to a thread for one model.
///
/// Holds the service used by [`CompactionStrategy::Summarize`]; the other
/// strategies never touch it. Compaction consumes the thread it is given and
/// returns a new one, so a failed summarization leaves the caller's copy as
/// it was.
pub struct Compactor<'a, S> {
    meter: &'a TokenMeter,
    profile: &'a ModelProfile,
    service: &'a S,
    temperature: Option<f32>,
    seed: Option<u64>,
}

impl<'a, S: CompletionService> Compactor<'a, S> {
    /// Creates a compactor measuring with `meter` against `profile`.
    #[must_use]
    pub fn new(meter: &'a TokenMeter, profile: &'a ModelProfile, service: &'a S) -> Self {
        Self { meter, profile, service, temperature: None, seed: None }
    }

    /// Sampling temperature for summary requests.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Sampling seed for summary requests.
    #[must_use]
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Runs `strategy` over `thread`.
    ///
    /// # Errors
    ///
    /// Only [`CompactionStrategy::Summarize`] can fail, with
    /// [`ContextError::Summarization`] when a summary request fails.
    pub async fn compact(
        &self,
        strategy: CompactionStrategy,
        thread: Vec<Message>,
    ) -> Result<Vec<Message>, ContextError> {
        match strategy {
            CompactionStrategy::Drop => Ok(drop_to_system(thread)),
            CompactionStrategy::Slide => Ok(slide_window(thread, self.meter, self.profile)),
            CompactionStrategy::Summarize => self.summarize(thread).await,
        }
    }

    /// Folds the conversation into summaries so every run of messages stays
    /// under the thread budget.
    ///
    /// System messages are set aside (their cost still counts). Other
    /// messages accumulate into a run; when the next message would bring the
    /// run to the budget, the run is replaced by one summary message and
    /// accumulation continues from that summary.
    ///
    /// When the system messages alone reach the budget no summary can help:
    /// nothing is summarized and no remote call is made.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::Summarization`] when a summary request fails.
    pub async fn summarize(&self, thread: Vec<Message>) -> Result<Vec<Message>, ContextError> {
        let model = self.profile.model_id.as_str();
        let budget = self.profile.thread_budget();

        let (mut system, rest): (Vec<Message>, Vec<Message>) =
            thread.into_iter().partition(Message::is_system);
        let system_cost = self.meter.thread_cost(&system, model);
        if system_cost >= budget {
            tracing::debug!(system_cost, budget, "threadline.context.summarize_skipped");
            system.extend(rest);
            return Ok(system);
        }

        let mut run: Vec<Message> = Vec::new();
        let mut run_cost = 0;
        for message in rest {
            let cost = self.meter.message_cost(&message, model);
            if !run.is_empty() && system_cost + run_cost + cost >= budget {
                let summary = self.summary_of(run).await?;
                run_cost = self.meter.message_cost(&summary, model);
                run = vec![summary];
            }
            run_cost += cost;
            run.push(message);
        }

        system.extend(run);
        Ok(system)
    }

    async fn summary_of(&self, mut run: Vec<Message>) -> Result<Message, ContextError> {
        let model = self.profile.model_id.as_str();
        let limit = self.profile.message_limit;
        let summarized = run.len();

        run.push(Message::user(format!(
            "Create a summary of this conversation in less than {limit} tokens. \
             Prefix the response with the words {SUMMARY_PREFIX}"
        )));
        let request = CompletionRequest {
            model: model.to_string(),
            messages: run,
            temperature: self.temperature,
            response_format: None,
            seed: self.seed,
        };

        let response = self.service.complete(request).await?;
        let text = response.message.content.trim();
        let mut content = if text.starts_with(SUMMARY_PREFIX) {
            text.to_string()
        } else {
            format!("{SUMMARY_PREFIX} {text}")
        };

        let budget = self.meter.content_budget(Role::Assistant, None, model, limit);
        if self.meter.text_cost(&content, model) > budget {
            content = self.meter.truncate(&content, budget, model);
        }

        tracing::info!(
            messages = summarized,
            summary_tokens = self.meter.text_cost(&content, model),
            "threadline.context.summarize"
        );
        Ok(Message::assistant(content))
    }
}
