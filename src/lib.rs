//! Prompt Nurse: message triage for a student health assistant.

pub mod api;
pub mod config;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod uploads;
