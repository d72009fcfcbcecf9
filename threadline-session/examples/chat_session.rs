//! Example: a chat session that stays inside a small context window.
//!
//! Uses an offline echo service, so it runs without network access.
//!
//! Run with: `RUST_LOG=threadline=debug cargo run --example chat_session -p threadline-session`

use std::sync::Arc;

use threadline_context::{CompactionStrategy, TokenCounter};
use threadline_session::{ChatSession, SessionConfig};
use threadline_types::{
    CompletionRequest, CompletionResponse, CompletionService, Message, ModelRegistry,
    ProviderError, SessionError, TokenUsage,
};

/// Replies with the first sentence of the last message it was sent.
struct EchoService;

impl CompletionService for EchoService {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        let last = request.messages.last().map(|m| m.content.as_str()).unwrap_or_default();
        let first_sentence = last.split(". ").next().unwrap_or_default();
        Ok(CompletionResponse {
            model: request.model,
            message: Message::assistant(format!("You said: {first_sentence}")),
            usage: TokenUsage::default(),
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), SessionError> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = SessionConfig::chat("meta-llama/Llama-2-13b-chat-hf")
        .with_instruction("You are a concise assistant.")
        .with_pre_compaction(Some(CompactionStrategy::Slide));
    let mut session =
        ChatSession::new(EchoService, ModelRegistry::builtin(), Arc::new(TokenCounter::new()), config)?;

    let budget = session.profile().thread_budget();
    for turn in 1..=12 {
        let text = format!("This is turn {turn}. ") + &"It rambles on for a while. ".repeat(40);
        let reply = session.send(&text).await?;
        println!(
            "turn {turn:>2}: {} messages, {:>4}/{budget} tokens, reply: {reply}",
            session.thread().len(),
            session.token_count(),
        );
    }

    session.update_model("HuggingFaceH4/zephyr-7b-beta")?;
    println!(
        "after switching to {}: {} messages",
        session.profile().model_id,
        session.thread().len()
    );
    Ok(())
}
