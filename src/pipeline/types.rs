//! Shared types for the triage pipeline.

use serde::{Deserialize, Serialize};

use crate::llm::GenerationMetadata;

// ── Inbound message ─────────────────────────────────────────────────

/// A student message as handed over by the transport layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentMessage {
    /// Opaque student identifier (not validated).
    pub student_id: String,
    /// Free-form message body.
    pub message: String,
}

// ── Classification ──────────────────────────────────────────────────

/// Coarse urgency label attached to a processed message.
///
/// `Low` is only ever produced for rejected (irrelevant) messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    High,
    Routine,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::High => "high",
            Self::Routine => "routine",
        }
    }
}

/// The four heuristic facts computed from message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub relevant: bool,
    pub crisis: bool,
    pub appointment_intent: bool,
    pub urgency: Priority,
}

// ── Response ────────────────────────────────────────────────────────

/// Which terminal state of the pipeline produced the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriageStatus {
    /// Irrelevant message, rejected before any other check.
    Blocked,
    /// Crisis language, forwarded for urgent human review.
    Escalated,
    /// Normal path: generated or cached answer.
    Answered,
}

impl TriageStatus {
    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Blocked => "blocked",
            Self::Escalated => "escalated",
            Self::Answered => "answered",
        }
    }
}

/// Result of running a message through the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageResponse {
    /// Reply text, disclaimer-prefixed when the message looked urgent.
    pub response: String,
    pub status: TriageStatus,
    pub priority: Priority,
    /// Fixed per terminal state, not a model confidence.
    pub confidence: u8,
    pub cached: bool,
    pub blocked: bool,
    pub crisis: bool,
    pub appointment_intent: bool,
    /// Generator metadata, passed through unmodified.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<GenerationMetadata>,
}
