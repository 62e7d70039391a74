use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// What a question source is asked to produce.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "error_type", rename_all = "snake_case")]
pub enum QuestionKind {
    /// An ordinary question at the band.
    #[default]
    Standard,
    /// Asks the learner to explain or justify a step rather than compute.
    Why,
    /// Targets a mistake the learner keeps making, named by its error type.
    FixingHabits(String),
}

impl QuestionKind {
    #[must_use]
    pub fn is_standard(&self) -> bool {
        matches!(self, QuestionKind::Standard)
    }
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionKind::Standard => f.write_str("standard"),
            QuestionKind::Why => f.write_str("why"),
            QuestionKind::FixingHabits(error_type) => write!(f, "fixing_habits({error_type})"),
        }
    }
}

/// Per-session state that decides which learning questions are not standard.
///
/// Tracks how many learning questions were asked (for the "why" cadence) and
/// how often each tagged mistake happened. A mistake's count goes down by one
/// each time the learner gets a habit-fixing question about it right.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestionMix {
    learning_questions: u64,
    errors: BTreeMap<String, u32>,
}

impl QuestionMix {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Standard and "why" learning questions counted so far.
    #[must_use]
    pub fn learning_questions(&self) -> u64 {
        self.learning_questions
    }

    /// Count one more learning question and report whether it is a "why" turn.
    pub fn next_is_why(&mut self, every: u32) -> bool {
        self.learning_questions = self.learning_questions.saturating_add(1);
        every != 0 && self.learning_questions % u64::from(every) == 0
    }

    pub fn record_error(&mut self, error_type: &str) {
        let count = self.errors.entry(error_type.to_owned()).or_default();
        *count = count.saturating_add(1);
    }

    /// A habit-fixing question about `error_type` was answered correctly.
    pub fn record_fixed(&mut self, error_type: &str) {
        if let Some(count) = self.errors.get_mut(error_type) {
            *count = count.saturating_sub(1);
        }
    }

    #[must_use]
    pub fn error_count(&self, error_type: &str) -> u32 {
        self.errors.get(error_type).copied().unwrap_or(0)
    }

    /// Most frequent error type with at least `min_errors` occurrences.
    /// Ties go to the alphabetically first type.
    #[must_use]
    pub fn recurring_error(&self, min_errors: u32) -> Option<&str> {
        let mut best: Option<(&str, u32)> = None;
        for (error_type, &count) in &self.errors {
            if count >= min_errors.max(1) && best.is_none_or(|(_, top)| count > top) {
                best = Some((error_type, count));
            }
        }
        best.map(|(error_type, _)| error_type)
    }
}
