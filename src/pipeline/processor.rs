//! Triage pipeline: classifies a student message and produces a reply.
//!
//! Flow for one request:
//! 1. Relevance gate → fixed rejection, nothing else runs
//! 2. Crisis gate → fixed escalation, cache never touched
//! 3. Cache lookup → stored reply and flags on hit
//! 4. Sanitize → classify → generate → disclaimer → store
//!
//! Every terminal state is reached within one call; there are no retries.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::cache::ResponseCache;
use super::rules::RulesEngine;
use super::sanitize::{DEFAULT_MAX_CHARS, make_cache_key, sanitize};
use super::types::{Classification, Priority, StudentMessage, TriageResponse, TriageStatus};
use crate::error::PipelineError;
use crate::llm::ResponseGenerator;

/// Reply for messages caught by the relevance gate.
pub const REJECTION_TEXT: &str = "⚠️ This is not an appropriate question for Illini Prompt Nurse.";

/// Reply for messages containing crisis language.
pub const ESCALATION_TEXT: &str =
    "Your message has been forwarded to the Mental Health Office for urgent review.";

const BLOCKED_CONFIDENCE: u8 = 0;
const ESCALATED_CONFIDENCE: u8 = 100;
/// Fixed confidence for answered messages (stub value, not model-derived).
const ANSWERED_CONFIDENCE: u8 = 80;

/// Tunables for the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Character budget for text sent to the generator.
    pub max_chars: usize,
    /// Check crisis language before relevance, so a crisis phrase inside an
    /// otherwise irrelevant message still escalates.
    pub crisis_overrides_irrelevant: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_chars: DEFAULT_MAX_CHARS,
            crisis_overrides_irrelevant: false,
        }
    }
}

/// Message triage pipeline.
///
/// Holds the shared pattern table, the response cache and the generator;
/// cheap to share behind an `Arc` across request handlers.
pub struct TriagePipeline {
    rules: Arc<RulesEngine>,
    cache: Arc<ResponseCache>,
    generator: Arc<dyn ResponseGenerator>,
    settings: PipelineSettings,
}

impl TriagePipeline {
    /// Create a new pipeline.
    pub fn new(
        rules: Arc<RulesEngine>,
        cache: Arc<ResponseCache>,
        generator: Arc<dyn ResponseGenerator>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            rules,
            cache,
            generator,
            settings,
        }
    }

    pub fn rules(&self) -> &RulesEngine {
        &self.rules
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Process a message handed over by the transport layer.
    pub async fn process(&self, message: &StudentMessage) -> Result<TriageResponse, PipelineError> {
        self.classify_and_respond(&message.student_id, &message.message)
            .await
    }

    /// Run one message through the full pipeline.
    pub async fn classify_and_respond(
        &self,
        student_id: &str,
        message: &str,
    ) -> Result<TriageResponse, PipelineError> {
        let response = self.run(student_id, message).await?;
        info!(
            student_id,
            status = response.status.label(),
            priority = response.priority.as_str(),
            cached = response.cached,
            "Triaged student message"
        );
        Ok(response)
    }

    async fn run(&self, student_id: &str, message: &str) -> Result<TriageResponse, PipelineError> {
        debug!(student_id, chars = message.chars().count(), "Triage started");

        if self.settings.crisis_overrides_irrelevant {
            if self.rules.has_crisis_language(message) {
                return Ok(escalated());
            }
            if !self.rules.is_relevant(message) {
                return Ok(blocked());
            }
        } else {
            if !self.rules.is_relevant(message) {
                return Ok(blocked());
            }
            if self.rules.has_crisis_language(message) {
                return Ok(escalated());
            }
        }

        let key = make_cache_key(student_id, message);
        if let Some(hit) = self.cache.get(&key).await {
            return Ok(answered(hit.response, hit.flags, true, hit.metadata));
        }

        let cleaned = sanitize(message, self.settings.max_chars);
        let flags = self.rules.classify(&cleaned);

        let generation = self.generator.generate(&cleaned).await.map_err(|e| {
            warn!(
                student_id,
                generator = self.generator.name(),
                error = %e,
                "Response generation failed"
            );
            PipelineError::GenerationFailed(e)
        })?;

        let text = match self.rules.disclaimer_for(&cleaned) {
            Some(disclaimer) => format!("{disclaimer} {}", generation.text),
            None => generation.text,
        };

        self.cache
            .insert(key, text.clone(), generation.metadata.clone(), flags)
            .await;

        Ok(answered(text, flags, false, generation.metadata))
    }
}

fn blocked() -> TriageResponse {
    TriageResponse {
        response: REJECTION_TEXT.to_string(),
        status: TriageStatus::Blocked,
        priority: Priority::Low,
        confidence: BLOCKED_CONFIDENCE,
        cached: false,
        blocked: true,
        crisis: false,
        appointment_intent: false,
        metadata: None,
    }
}

fn escalated() -> TriageResponse {
    TriageResponse {
        response: ESCALATION_TEXT.to_string(),
        status: TriageStatus::Escalated,
        priority: Priority::High,
        confidence: ESCALATED_CONFIDENCE,
        cached: false,
        blocked: false,
        crisis: true,
        appointment_intent: false,
        metadata: None,
    }
}

fn answered(
    response: String,
    flags: Classification,
    cached: bool,
    metadata: Option<crate::llm::GenerationMetadata>,
) -> TriageResponse {
    TriageResponse {
        response,
        status: TriageStatus::Answered,
        priority: flags.urgency,
        confidence: ANSWERED_CONFIDENCE,
        cached,
        blocked: false,
        crisis: false,
        appointment_intent: flags.appointment_intent,
        metadata,
    }
}
