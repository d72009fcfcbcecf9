//! Example: split a long document for a small model and compact a thread.
//!
//! Run with: `cargo run --example split_document -p threadline-context`

use threadline_context::{ContentSplitter, TokenCounter, TokenMeter, drop_to_system, slide_window};
use threadline_types::{Message, ModelRegistry};

fn main() {
    let registry = ModelRegistry::builtin();
    let Ok(profile) = registry.get("HuggingFaceH4/zephyr-7b-beta") else {
        eprintln!("model missing from the builtin registry");
        return;
    };

    // 1. Split a document that is far larger than one message
    let meter = TokenMeter::new(TokenCounter::new());
    let splitter = ContentSplitter::new(meter.clone())
        .with_metadata(|chunk| format!("From the handbook:\n{chunk}"));
    let document = "Keep the workshop tidy. Return tools to the wall when done.\n".repeat(120);
    let chunks = splitter.split(&document, profile);
    println!(
        "{} tokens split into {} chunks for {} (limit {})",
        meter.text_cost(&document, &profile.model_id),
        chunks.len(),
        profile.model_id,
        profile.message_limit,
    );

    // 2. Build a thread from the chunks and compact it
    let mut thread = vec![Message::system("Answer questions about the handbook.")];
    thread.extend(chunks.into_iter().map(Message::user));
    println!("thread: {} tokens", meter.thread_cost(&thread, &profile.model_id));

    let slid = slide_window(thread.clone(), &meter, profile);
    println!(
        "after slide: {} messages, {} tokens",
        slid.len(),
        meter.thread_cost(&slid, &profile.model_id)
    );

    let dropped = drop_to_system(thread);
    println!("after drop: {} messages", dropped.len());
}
