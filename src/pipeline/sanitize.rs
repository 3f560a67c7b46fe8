//! Message sanitizing and cache-key construction.

use std::fmt;

/// Default character budget for text handed to the response generator.
pub const DEFAULT_MAX_CHARS: usize = 500;

/// Marker appended to truncated messages.
pub const ELLIPSIS: &str = "...";

/// Trim outer whitespace and cap the text at `max_chars` characters.
///
/// Text longer than the cap keeps its first `max_chars` characters followed
/// by [`ELLIPSIS`]. Counting is per `char`, never splitting a code point.
pub fn sanitize(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    match trimmed.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{ELLIPSIS}", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}

/// Cache slot for a `(student, message)` pair.
///
/// Exact on the student id, case-insensitive on the raw (unsanitized) text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    student_id: String,
    message: String,
}

impl CacheKey {
    pub fn student_id(&self) -> &str {
        &self.student_id
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.student_id, self.message)
    }
}

/// Build the cache key for a student message.
pub fn make_cache_key(student_id: &str, text: &str) -> CacheKey {
    CacheKey {
        student_id: student_id.to_string(),
        message: text.to_lowercase(),
    }
}
