use serde::{Deserialize, Serialize};

use crate::model::AnswerOutcome;

/// Per-signature tally kept for the length of one session.
///
/// `count` always equals `correct_count + incorrect_count` plus the number of
/// skips, and `last_asked_index` only moves forward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionLogEntry {
    pub count: u32,
    pub correct_count: u32,
    pub incorrect_count: u32,
    pub last_asked_index: u64,
}

impl SessionLogEntry {
    /// Record one asking at `index`. Correctness counters only move for a
    /// known, non-skipped outcome.
    pub fn record(&mut self, index: u64, outcome: Option<AnswerOutcome>) {
        self.count = self.count.saturating_add(1);
        self.last_asked_index = self.last_asked_index.max(index);
        match outcome.and_then(AnswerOutcome::correctness) {
            Some(true) => self.correct_count = self.correct_count.saturating_add(1),
            Some(false) => self.incorrect_count = self.incorrect_count.saturating_add(1),
            None => {}
        }
    }

    #[must_use]
    pub fn skipped_count(&self) -> u32 {
        self.count
            .saturating_sub(self.correct_count)
            .saturating_sub(self.incorrect_count)
    }

    /// Answered correctly more often than not.
    #[must_use]
    pub fn is_overasked(&self) -> bool {
        self.correct_count > self.incorrect_count
    }

    /// Missed at least once and last asked within `window` questions of `counter`.
    #[must_use]
    pub fn is_recently_missed(&self, counter: u64, window: u64) -> bool {
        self.incorrect_count > 0 && counter.saturating_sub(self.last_asked_index) <= window
    }
}
