use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{AnswerEvent, AnswerOutcome};

/// Phase of a practice session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    /// Placement search; no spaced repetition, no repetition filtering.
    Calibration,
    #[default]
    Learning,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionSummaryError {
    #[error("completed_at is before started_at")]
    InvalidTimeRange,

    #[error("too many answers for a single session: {len}")]
    TooManyAnswers { len: usize },

    #[error("total answers ({total}) does not match outcome counts ({sum})")]
    CountMismatch { total: u32, sum: u32 },
}

/// Aggregate summary of a practice session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
    total_answers: u32,
    correct: u32,
    incorrect: u32,
    skipped: u32,
    start_level: f64,
    end_level: f64,
    peak_level: f64,
}

impl SessionSummary {
    /// Rebuild a summary from stored totals.
    ///
    /// # Errors
    ///
    /// Returns `SessionSummaryError::InvalidTimeRange` if `completed_at` is before
    /// `started_at`, or `CountMismatch` if the outcome counts do not add up.
    #[allow(clippy::too_many_arguments)]
    pub fn from_totals(
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        total_answers: u32,
        correct: u32,
        incorrect: u32,
        skipped: u32,
        start_level: f64,
        end_level: f64,
        peak_level: f64,
    ) -> Result<Self, SessionSummaryError> {
        if completed_at < started_at {
            return Err(SessionSummaryError::InvalidTimeRange);
        }
        let sum = correct
            .saturating_add(incorrect)
            .saturating_add(skipped);
        if sum != total_answers {
            return Err(SessionSummaryError::CountMismatch {
                total: total_answers,
                sum,
            });
        }

        Ok(Self {
            started_at,
            completed_at,
            total_answers,
            correct,
            incorrect,
            skipped,
            start_level,
            end_level,
            peak_level: peak_level.max(start_level).max(end_level),
        })
    }

    /// Summarize a session from its answer events.
    ///
    /// # Errors
    ///
    /// Returns `SessionSummaryError::InvalidTimeRange` if `completed_at` is before
    /// `started_at`, or `TooManyAnswers` if the count does not fit in `u32`.
    pub fn from_events(
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        start_level: f64,
        events: &[AnswerEvent],
    ) -> Result<Self, SessionSummaryError> {
        if completed_at < started_at {
            return Err(SessionSummaryError::InvalidTimeRange);
        }

        let mut correct = 0_u32;
        let mut incorrect = 0_u32;
        let mut skipped = 0_u32;
        let mut peak_level = start_level;

        for event in events {
            match event.outcome {
                AnswerOutcome::Correct => correct = correct.saturating_add(1),
                AnswerOutcome::Incorrect => incorrect = incorrect.saturating_add(1),
                AnswerOutcome::Skipped => skipped = skipped.saturating_add(1),
            }
            peak_level = peak_level.max(event.level);
        }

        let total_answers = u32::try_from(events.len())
            .map_err(|_| SessionSummaryError::TooManyAnswers { len: events.len() })?;
        let end_level = events.last().map_or(start_level, |event| event.level);

        Self::from_totals(
            started_at,
            completed_at,
            total_answers,
            correct,
            incorrect,
            skipped,
            start_level,
            end_level,
            peak_level,
        )
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    #[must_use]
    pub fn total_answers(&self) -> u32 {
        self.total_answers
    }

    #[must_use]
    pub fn correct(&self) -> u32 {
        self.correct
    }

    #[must_use]
    pub fn incorrect(&self) -> u32 {
        self.incorrect
    }

    #[must_use]
    pub fn skipped(&self) -> u32 {
        self.skipped
    }

    #[must_use]
    pub fn start_level(&self) -> f64 {
        self.start_level
    }

    #[must_use]
    pub fn end_level(&self) -> f64 {
        self.end_level
    }

    #[must_use]
    pub fn peak_level(&self) -> f64 {
        self.peak_level
    }

    /// Percent of answered (non-skipped) questions that were correct.
    #[must_use]
    pub fn accuracy_pct(&self) -> Option<f64> {
        let answered = self.correct + self.incorrect;
        (answered > 0).then(|| f64::from(self.correct) * 100.0 / f64::from(answered))
    }
}
