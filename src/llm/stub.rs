//! Deterministic stub generator.

use async_trait::async_trait;

use super::{Generation, ResponseGenerator};
use crate::error::LlmError;

/// Reply for messages mentioning chest pain.
pub const CHEST_PAIN_REPLY: &str =
    "Chest pain can be serious. Please seek medical attention immediately.";

/// Reply for everything else.
pub const GENERIC_REPLY: &str = "Thank you for your message. A nurse will review it shortly.";

/// Canned replies with no metadata and no network access.
#[derive(Debug, Default, Clone)]
pub struct StubGenerator;

impl StubGenerator {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ResponseGenerator for StubGenerator {
    fn name(&self) -> &str {
        "stub"
    }

    async fn generate(&self, text: &str) -> Result<Generation, LlmError> {
        let reply = if text.to_lowercase().contains("chest pain") {
            CHEST_PAIN_REPLY
        } else {
            GENERIC_REPLY
        };
        Ok(Generation::text(reply))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn chest_pain_gets_advisory() {
        let generation = StubGenerator::new().generate("My CHEST PAIN is bad").await.unwrap();
        assert_eq!(generation.text, CHEST_PAIN_REPLY);
        assert!(generation.metadata.is_none());
    }

    #[tokio::test]
    async fn anything_else_gets_acknowledgement() {
        let generation = StubGenerator::new().generate("").await.unwrap();
        assert_eq!(generation.text, GENERIC_REPLY);
    }

    #[tokio::test]
    async fn substring_match_is_not_word_bounded() {
        let generation = StubGenerator::new().generate("chest painful").await.unwrap();
        assert_eq!(generation.text, CHEST_PAIN_REPLY);
    }
}
