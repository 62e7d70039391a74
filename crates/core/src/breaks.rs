use chrono::{DateTime, Utc};

use crate::config::BreakConfig;
use crate::time::millis_since;

/// Decides when a tired or disengaged learner should be offered a rest.
///
/// The detector is a pure predicate. Showing the prompt and moving the
/// last-break timestamp are left to the caller.
#[derive(Debug, Clone, Default)]
pub struct BreakDetector {
    config: BreakConfig,
}

impl BreakDetector {
    #[must_use]
    pub fn new(config: BreakConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &BreakConfig {
        &self.config
    }

    /// Percent correct over the most recent `recent_window` outcomes, or
    /// `None` until `min_samples` outcomes exist.
    #[must_use]
    pub fn recent_score(&self, recent_history: &[bool]) -> Option<f64> {
        if recent_history.len() < self.config.min_samples || recent_history.is_empty() {
            return None;
        }
        let window = tail(recent_history, self.config.recent_window);
        Some(percent_correct(window))
    }

    /// Long session with a weak recent score.
    #[must_use]
    pub fn is_fatigued(&self, recent_history: &[bool], active_minutes: f64) -> bool {
        self.recent_score(recent_history).is_some_and(|score| {
            active_minutes > self.config.session_min_minutes
                && score < self.config.score_threshold_pct
        })
    }

    /// Almost nothing right in the last few answers, a sign of guessing.
    #[must_use]
    pub fn is_disengaged(&self, recent_history: &[bool]) -> bool {
        if recent_history.len() < self.config.rapid_window {
            return false;
        }
        let window = tail(recent_history, self.config.rapid_window);
        let correct = window.iter().filter(|correct| **correct).count();
        correct <= self.config.rapid_max_correct
    }

    /// Cooldown since the previous break has run out. No previous break counts as elapsed.
    #[must_use]
    pub fn cooldown_elapsed(&self, last_break_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        millis_since(last_break_at, now).is_none_or(|elapsed| elapsed > self.config.cooldown_ms)
    }

    /// Number of most recent outcomes any check looks at. Older ones can be dropped.
    #[must_use]
    pub fn history_len(&self) -> usize {
        self.config
            .recent_window
            .max(self.config.rapid_window)
            .max(self.config.min_samples)
    }

    #[must_use]
    pub fn should_suggest_break(
        &self,
        recent_history: &[bool],
        active_minutes: f64,
        last_break_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> bool {
        let struggling = self.is_fatigued(recent_history, active_minutes)
            || self.is_disengaged(recent_history);
        struggling && self.cooldown_elapsed(last_break_at, now)
    }
}

fn tail(history: &[bool], len: usize) -> &[bool] {
    &history[history.len().saturating_sub(len)..]
}

#[allow(clippy::cast_precision_loss)]
fn percent_correct(window: &[bool]) -> f64 {
    if window.is_empty() {
        return 0.0;
    }
    let correct = window.iter().filter(|correct| **correct).count();
    correct as f64 * 100.0 / window.len() as f64
}
