//! Message triage pipeline.
//!
//! Every student message flows through:
//! 1. `RulesEngine`: relevance and crisis gates (fast pattern matching)
//! 2. `ResponseCache`: per `(student, message)` memoization
//! 3. `ResponseGenerator`: reply text for sanitized input, plus disclaimer
//!
//! Crisis messages are only labeled here; routing them to humans is not
//! part of this service.

pub mod cache;
pub mod processor;
pub mod rules;
pub mod sanitize;
pub mod types;

pub use cache::{CachedResponse, ResponseCache};
pub use processor::{PipelineSettings, TriagePipeline};
pub use rules::{Category, RulesEngine};
pub use sanitize::{CacheKey, make_cache_key, sanitize};
pub use types::{Classification, Priority, StudentMessage, TriageResponse, TriageStatus};
