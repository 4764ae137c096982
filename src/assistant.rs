//! Scripted assistant replies.
//!
//! No language model is involved: replies come from a fixed pool with a few
//! keyword overrides, after an artificial "thinking" delay.

use async_trait::async_trait;
use rand::seq::IndexedRandom;
use rand::Rng;
use std::ops::RangeInclusive;
use std::time::Duration;

/// Result type for reply generation
pub type AssistantResult<T> = Result<T, AssistantError>;

/// Errors that can occur while producing a reply
#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    #[error("reply generation failed: {0}")]
    Generation(String),
}

/// Anything that can turn an inbound chat text into a reply.
///
/// The gateway only talks to this trait, so tests can swap in deterministic
/// or failing generators.
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    /// Produce a reply for the given user text
    async fn generate(&self, input: &str) -> AssistantResult<String>;

    /// Get the name of this generator
    fn name(&self) -> &str;
}

/// Greeting sent privately to every freshly connected client
pub const WELCOME_TEXT: &str = "Hello! I am your friendly AI assistant. Ask me anything!";

/// Used when random selection somehow yields nothing
const FALLBACK_REPLY: &str = "Hmm, that's a good question.";

const CANNED_REPLIES: &[&str] = &[
    "That's an interesting point!",
    "Could you tell me more about that?",
    "I'm still learning, but I'll try my best to understand.",
    "Let me think about that for a moment...",
    "Fascinating! What else is on your mind?",
    "I see. And how does that make you feel? (Just kidding, I'm a basic AI!)",
    "Processing... please stand by.",
    "Hmm, that's a good question.",
];

/// Picks replies from [`CANNED_REPLIES`], optionally sleeping first to fake
/// thinking time. The sleep suspends only the calling connection's task.
pub struct CannedAssistant {
    delay_ms: Option<RangeInclusive<u64>>,
}

impl CannedAssistant {
    /// Standard configuration: 500-2500 ms of simulated thinking time
    pub fn new() -> Self {
        Self {
            delay_ms: Some(500..=2500),
        }
    }

    /// Reply immediately; for tests and local debugging
    pub fn without_delay() -> Self {
        Self { delay_ms: None }
    }

    fn pick_reply(&self, input: &str) -> String {
        let lower = input.to_lowercase();
        if lower.contains("hello") || lower.contains("hi") {
            return "Hello there! How can I help you today?".to_string();
        }
        if lower.contains("bye") {
            return "Goodbye! Have a great day.".to_string();
        }
        if input.contains('?') {
            return "That's a great question! Unfortunately, I'm just a dummy AI.".to_string();
        }

        CANNED_REPLIES
            .choose(&mut rand::rng())
            .copied()
            .unwrap_or(FALLBACK_REPLY)
            .to_string()
    }
}

impl Default for CannedAssistant {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResponseGenerator for CannedAssistant {
    async fn generate(&self, input: &str) -> AssistantResult<String> {
        if let Some(range) = &self.delay_ms {
            let ms = rand::rng().random_range(range.clone());
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }

        Ok(self.pick_reply(input))
    }

    fn name(&self) -> &str {
        "canned"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reply_is_never_empty() {
        let assistant = CannedAssistant::without_delay();
        for input in ["hello", "weather", "??", "bye", ""] {
            let reply = assistant.generate(input).await.unwrap();
            assert!(!reply.is_empty(), "empty reply for input {:?}", input);
        }
    }

    #[tokio::test]
    async fn test_greeting_override() {
        let assistant = CannedAssistant::without_delay();
        let reply = assistant.generate("Hello over there").await.unwrap();
        assert_eq!(reply, "Hello there! How can I help you today?");
    }

    #[tokio::test]
    async fn test_farewell_override() {
        let assistant = CannedAssistant::without_delay();
        let reply = assistant.generate("ok BYE now").await.unwrap();
        assert_eq!(reply, "Goodbye! Have a great day.");
    }

    #[tokio::test]
    async fn test_question_override() {
        let assistant = CannedAssistant::without_delay();
        let reply = assistant.generate("what's the answer?").await.unwrap();
        assert_eq!(
            reply,
            "That's a great question! Unfortunately, I'm just a dummy AI."
        );
    }

    #[tokio::test]
    async fn test_random_reply_comes_from_pool() {
        let assistant = CannedAssistant::without_delay();
        let reply = assistant.generate("the weather today").await.unwrap();
        assert!(CANNED_REPLIES.contains(&reply.as_str()));
    }
}
