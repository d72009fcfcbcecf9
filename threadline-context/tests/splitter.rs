//! Integration tests for ContentSplitter.

use threadline_context::{ContentSplitter, TokenCounter, TokenMeter};
use threadline_types::{ModelProfile, ModelRegistry};

fn splitter() -> ContentSplitter {
    ContentSplitter::new(TokenMeter::new(TokenCounter::new()))
}

fn cost(text: &str) -> usize {
    TokenCounter::new().estimate_text(text)
}

/// Words with sentence punctuation stripped, so cuts on ". " compare equal.
fn words(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|w| w.trim_end_matches(['.', '?', '!']).to_string())
        .filter(|w| !w.is_empty())
        .collect()
}

fn paragraph() -> String {
    let subjects = ["The archivist", "A courier", "Her neighbour", "The old clock", "Somebody"];
    let verbs = ["counted", "carried", "forgot", "repaired", "described"];
    let objects = ["the ledgers", "seven lanterns", "a quiet harbour", "the winter road"];
    let mut sentences = Vec::new();
    for i in 0..40 {
        let s = subjects[i % subjects.len()];
        let v = verbs[(i * 3) % verbs.len()];
        let o = objects[(i * 7) % objects.len()];
        let end = match i % 3 {
            0 => '.',
            1 => '?',
            _ => '!',
        };
        sentences.push(format!("{s} {v} {o} on day number {i} before sunset{end}"));
    }
    sentences.join(" ")
}

#[test]
fn empty_and_blank_text_yield_nothing() {
    let profile = ModelProfile::new("m", 64, 8);
    assert!(splitter().split("", &profile).is_empty());
    assert!(splitter().split("  \n\n \t", &profile).is_empty());
}

#[test]
fn text_at_the_limit_is_not_split() {
    let profile = ModelProfile::new("m", 64, 8);
    let text = "abcd. efgh. ijkl. mnopqrstuvwxyz12";
    assert_eq!(cost(text), 9);
    let exact = &text[..32];
    assert_eq!(cost(exact), 8);
    assert_eq!(splitter().split(exact, &profile), vec![exact.to_string()]);
}

#[test]
fn whitespace_is_trimmed_before_measuring() {
    let profile = ModelProfile::new("m", 64, 8);
    let chunks = splitter().split("   short text   ", &profile);
    assert_eq!(chunks, vec!["short text"]);
}

#[test]
fn paragraphs_are_preferred_over_lines() {
    let profile = ModelProfile::new("m", 256, 8);
    let text = "first line\nsecond line\n\nthird line\nfourth line";
    let chunks = splitter().split(text, &profile);
    assert_eq!(chunks, vec!["first line\nsecond line", "third line\nfourth line"]);
}

#[test]
fn text_without_delimiters_is_truncated() {
    let profile = ModelProfile::new("m", 64, 5);
    let chunks = splitter().split(&"x".repeat(100), &profile);
    assert_eq!(chunks, vec!["x".repeat(20)]);
}

#[test]
fn custom_delimiters_split_code() {
    let profile = ModelProfile::new("m", 64, 6);
    let code = "let a = 1;let b = 2;let c = 3;let d = 4;";
    let chunks = splitter().with_delimiters([";"]).split(code, &profile);
    assert!(chunks.len() >= 2);
    for chunk in &chunks {
        assert!(cost(chunk) <= 6, "chunk over budget: {chunk:?}");
    }
    assert_eq!(chunks.join(";"), code.trim_end_matches(';'));
}

#[test]
fn metadata_wraps_every_chunk_within_budget() {
    let profile = ModelProfile::new("m", 256, 16);
    let splitter = splitter().with_metadata(|chunk| format!("[doc] {chunk}"));
    let text = "alpha beta gamma.\nDelta epsilon zeta.\nEta theta iota.\nKappa lambda mu.";
    let chunks = splitter.split(text, &profile);
    assert!(chunks.len() > 1);
    for chunk in &chunks {
        assert!(chunk.starts_with("[doc] "));
        assert!(cost(chunk) <= 16, "chunk over budget: {chunk:?}");
        assert_eq!(chunk.matches("[doc]").count(), 1);
    }
}

#[test]
fn repeated_paragraph_fits_the_small_model() {
    let registry = ModelRegistry::builtin();
    let profile = registry.get("meta-llama/Llama-2-13b-chat-hf").unwrap();
    assert_eq!(profile.message_limit, 512);

    let paragraph = paragraph();
    assert!(paragraph.len() >= 2600, "paragraph is {} bytes", paragraph.len());
    let text = vec![paragraph; 20].join("\n\n");

    let chunks = splitter().split(&text, profile);

    assert!(chunks.len() > 20, "only {} chunks", chunks.len());
    for chunk in &chunks {
        assert!(cost(chunk) <= 512);
    }
    assert_eq!(words(&chunks.join(" ")), words(&text));
}

#[test]
fn split_within_uses_the_explicit_limit() {
    let text = "one two three four. five six seven eight. nine ten eleven twelve.";
    let loose = splitter().split_within(text, "m", 100);
    let tight = splitter().split_within(text, "m", 6);
    assert_eq!(loose.len(), 1);
    assert!(tight.len() > 1);
    for chunk in &tight {
        assert!(cost(chunk) <= 6);
    }
}
