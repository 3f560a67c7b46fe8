//! Keyword rules engine for message triage.
//!
//! Four pattern categories drive every heuristic in the pipeline:
//! - `irrelevant` → message is rejected before anything else runs
//! - `crisis` → message is escalated, never cached
//! - `appointment` → informational flag on the answered response
//! - `urgent` → `high` priority *and* the legal disclaimer
//!
//! Each expression is compiled once as a case-insensitive, word-bounded
//! regex. The table is built at startup and shared read-only afterwards.

use std::collections::HashMap;
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;
use crate::pipeline::types::{Classification, Priority};

/// Legal disclaimer prefixed to answers that mention acute symptoms.
pub const DISCLAIMER: &str = "Illini Prompt Nurse is not legally allowed to give medical \
recommendations. You must always contact McKinley Health Center for confirmation.";

/// Pattern category name, as used in the JSON override file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Irrelevant,
    Crisis,
    Appointment,
    Urgent,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Irrelevant,
        Category::Crisis,
        Category::Appointment,
        Category::Urgent,
    ];

    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Irrelevant => "irrelevant",
            Self::Crisis => "crisis",
            Self::Appointment => "appointment",
            Self::Urgent => "urgent",
        }
    }

    fn default_expressions(&self) -> &'static [&'static str] {
        match self {
            Self::Irrelevant => &["cow", "cows", "moo"],
            Self::Crisis => &["suicide", "kill myself", "don't want to live"],
            Self::Appointment => &["appointment", "schedule", "come in"],
            Self::Urgent => &["chest pain", "difficulty breathing", "shortness of breath"],
        }
    }
}

/// A single compiled match expression.
#[derive(Debug, Clone)]
pub struct PatternRule {
    /// Expression as written in the table.
    pub pattern: String,
    /// Compiled word-bounded, case-insensitive regex.
    pub regex: Regex,
}

impl PatternRule {
    /// Compile an expression as `(?i)\b(?:expr)\b`.
    pub fn compile(pattern: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(&format!(r"(?i)\b(?:{pattern})\b"))?;
        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }
}

/// Category → expressions table for triage heuristics.
#[derive(Debug, Clone)]
pub struct RulesEngine {
    rules: HashMap<Category, Vec<PatternRule>>,
}

impl RulesEngine {
    /// Create a rules engine with the built-in pattern table.
    pub fn default_rules() -> Self {
        let mut engine = Self::empty();
        for category in Category::ALL {
            for expr in category.default_expressions() {
                engine
                    .add_rule(category, expr)
                    .expect("built-in triage pattern must compile");
            }
        }
        engine
    }

    /// Create an empty rules engine (for testing).
    pub fn empty() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    /// Build from the defaults, replacing every category present in a
    /// JSON object of the form `{"irrelevant": ["cow", "moo"], ...}`.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let overrides: HashMap<Category, Vec<String>> = serde_json::from_str(json)
            .map_err(|e| ConfigError::ParseError(format!("pattern table: {e}")))?;

        let mut engine = Self::default_rules();
        for (category, expressions) in overrides {
            let compiled = expressions
                .iter()
                .map(|expr| {
                    PatternRule::compile(expr).map_err(|e| ConfigError::InvalidValue {
                        key: format!("patterns.{}", category.label()),
                        message: e.to_string(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            engine.rules.insert(category, compiled);
        }
        Ok(engine)
    }

    /// Load a JSON pattern table from disk (see [`RulesEngine::from_json`]).
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Add an expression to a category.
    pub fn add_rule(&mut self, category: Category, pattern: &str) -> Result<(), regex::Error> {
        let rule = PatternRule::compile(pattern)?;
        self.rules.entry(category).or_default().push(rule);
        Ok(())
    }

    /// Expressions currently registered for a category.
    pub fn patterns(&self, category: Category) -> Vec<&str> {
        self.rules
            .get(&category)
            .map(|rules| rules.iter().map(|r| r.pattern.as_str()).collect())
            .unwrap_or_default()
    }

    /// First expression in `category` that matches `text`, if any.
    pub fn first_match(&self, category: Category, text: &str) -> Option<&str> {
        let rule = self
            .rules
            .get(&category)?
            .iter()
            .find(|rule| rule.regex.is_match(text))?;
        debug!(
            category = category.label(),
            rule = %rule.pattern,
            "Message matched triage rule"
        );
        Some(rule.pattern.as_str())
    }

    fn matches(&self, category: Category, text: &str) -> bool {
        self.first_match(category, text).is_some()
    }

    /// False iff the text hits any `irrelevant` expression.
    pub fn is_relevant(&self, text: &str) -> bool {
        !self.matches(Category::Irrelevant, text)
    }

    pub fn has_crisis_language(&self, text: &str) -> bool {
        self.matches(Category::Crisis, text)
    }

    pub fn wants_appointment(&self, text: &str) -> bool {
        self.matches(Category::Appointment, text)
    }

    /// `High` when any `urgent` expression matches, else `Routine`.
    pub fn triage_priority(&self, text: &str) -> Priority {
        if self.matches(Category::Urgent, text) {
            Priority::High
        } else {
            Priority::Routine
        }
    }

    /// The legal disclaimer, when the text looks medically urgent.
    ///
    /// Shares the `urgent` category with [`RulesEngine::triage_priority`].
    pub fn disclaimer_for(&self, text: &str) -> Option<&'static str> {
        self.matches(Category::Urgent, text).then_some(DISCLAIMER)
    }

    /// Evaluate all four heuristics at once.
    pub fn classify(&self, text: &str) -> Classification {
        Classification {
            relevant: self.is_relevant(text),
            crisis: self.has_crisis_language(text),
            appointment_intent: self.wants_appointment(text),
            urgency: self.triage_priority(text),
        }
    }
}

impl Default for RulesEngine {
    fn default() -> Self {
        Self::default_rules()
    }
}
