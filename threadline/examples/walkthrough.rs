//! Example: JSON extraction and a long free-text chat with one offline service.
//!
//! Run with: `RUST_LOG=threadline=info cargo run --example walkthrough -p threadline`

use std::sync::Arc;

use threadline::prelude::*;

/// Offline stand-in for a hosted model.
struct CannedService;

impl CompletionService for CannedService {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        let asked_for_summary = request
            .messages
            .last()
            .is_some_and(|m| m.content.starts_with("Create a summary"));
        let text = if asked_for_summary {
            "CONTEXT SUMMARY: the user has been describing their garden.".to_string()
        } else if request.response_format.is_some() {
            r#"{"plants": 3}"#.to_string()
        } else {
            format!("I have read {} messages so far.", request.messages.len())
        };
        Ok(CompletionResponse {
            model: request.model,
            message: Message::assistant(text),
            usage: Default::default(),
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), SessionError> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let tokenizer: Arc<dyn Tokenizer> = Arc::new(TokenCounter::new());

    // 1. JSON mode: each call stands alone
    let config = SessionConfig::json("gpt-3.5-turbo-1106", None)
        .with_instruction("Count the plants mentioned. Reply as JSON.");
    let mut extractor =
        ChatSession::new(CannedService, ModelRegistry::builtin(), Arc::clone(&tokenizer), config)?;
    for text in ["Roses and tulips.", "Basil, mint and thyme."] {
        let reply = extractor.send(text).await?;
        println!("json reply: {reply} (thread back to {} message)", extractor.thread().len());
    }

    // 2. Free text with summarization on a small window
    let config = SessionConfig::chat("HuggingFaceH4/zephyr-7b-beta")
        .with_instruction("You are a gardening assistant.");
    let mut chat = ChatSession::new(CannedService, ModelRegistry::builtin(), tokenizer, config)?;
    let budget = chat.profile().thread_budget();
    for day in 1..=40 {
        let note = format!("Day {day}: watered the beds and pulled some weeds. ").repeat(60);
        chat.send(&note).await?;
        if day % 10 == 0 {
            println!("day {day}: {} tokens of {budget}", chat.token_count());
        }
    }
    Ok(())
}
