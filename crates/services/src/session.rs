use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use drill_core::breaks::BreakDetector;
use drill_core::calibration::Calibration;
use drill_core::config::EngineConfig;
use drill_core::model::{
    AnswerOutcome, AnsweredQuestion, Band, Question, QuestionKind, QuestionMix, QuestionSignature,
    SessionMode, SessionSummary, SessionSummaryError,
};
use storage::repository::{InMemorySessionLog, SessionLogRepository};

use crate::selector::PickedQuestion;

//
// ─── PENDING QUESTION ──────────────────────────────────────────────────────────
//

/// The question currently shown to the learner.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingQuestion {
    pub question: Question,
    pub signature: QuestionSignature,
    pub band: Band,
    pub kind: QuestionKind,
}

impl From<PickedQuestion> for PendingQuestion {
    fn from(picked: PickedQuestion) -> Self {
        Self {
            question: picked.question,
            signature: picked.signature,
            band: picked.band,
            kind: picked.kind,
        }
    }
}

//
// ─── TOTALS ────────────────────────────────────────────────────────────────────
//

/// Running counts behind the session summary.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct AnswerTotals {
    correct: u32,
    incorrect: u32,
    skipped: u32,
    peak_level: Option<f64>,
    end_level: Option<f64>,
}

impl AnswerTotals {
    fn add(&mut self, outcome: AnswerOutcome, level: f64) {
        match outcome {
            AnswerOutcome::Correct => self.correct = self.correct.saturating_add(1),
            AnswerOutcome::Incorrect => self.incorrect = self.incorrect.saturating_add(1),
            AnswerOutcome::Skipped => self.skipped = self.skipped.saturating_add(1),
        }
        self.peak_level = Some(self.peak_level.map_or(level, |peak| peak.max(level)));
        self.end_level = Some(level);
    }

    fn answered(&self) -> u32 {
        self.correct
            .saturating_add(self.incorrect)
            .saturating_add(self.skipped)
    }
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// State of one practice session.
///
/// All mutation goes through `&mut self`, so reading the level, scoring an
/// answer and writing the new level can never interleave. Hosts that share a
/// session across threads wrap it in a single `Mutex`.
///
/// Memory stays flat however long the session runs: answers are folded into
/// running totals, and only the last `break_window` outcomes are kept for the
/// break detector. The full event stream goes to the answer sink.
pub struct LearningSession {
    id: Uuid,
    mode: SessionMode,
    level: f64,
    start_level: f64,
    streak: u32,
    log: Arc<dyn SessionLogRepository>,
    pending: Option<PendingQuestion>,
    last_answer: Option<AnsweredQuestion>,
    totals: AnswerTotals,
    break_history: Vec<bool>,
    break_window: usize,
    mix: QuestionMix,
    last_break_at: Option<DateTime<Utc>>,
    active_secs: f64,
    calibration: Option<Calibration>,
    started_at: DateTime<Utc>,
}

impl LearningSession {
    /// Session that starts learning straight away at the configured start level.
    #[must_use]
    pub fn new(config: &EngineConfig, started_at: DateTime<Utc>) -> Self {
        let level = config.levels.clamp(config.levels.start_level);
        let break_window = BreakDetector::new(config.breaks.clone()).history_len();
        Self {
            id: Uuid::new_v4(),
            mode: SessionMode::Learning,
            level,
            start_level: level,
            streak: 0,
            log: Arc::new(InMemorySessionLog::new()),
            pending: None,
            last_answer: None,
            totals: AnswerTotals::default(),
            break_history: Vec::with_capacity(break_window),
            break_window,
            mix: QuestionMix::new(),
            last_break_at: None,
            active_secs: 0.0,
            calibration: None,
            started_at,
        }
    }

    /// Session that first searches for the learner's level.
    #[must_use]
    pub fn calibrating(config: &EngineConfig, started_at: DateTime<Utc>) -> Self {
        let calibration = Calibration::new(config.calibration.clone(), &config.levels);
        let mut session = Self::new(config, started_at);
        session.mode = SessionMode::Calibration;
        session.level = calibration.probe();
        session.start_level = calibration.probe();
        session.calibration = Some(calibration);
        session
    }

    /// Use a different session log backend.
    #[must_use]
    pub fn with_log(mut self, log: Arc<dyn SessionLogRepository>) -> Self {
        self.log = log;
        self
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    #[must_use]
    pub fn level(&self) -> f64 {
        self.level
    }

    #[must_use]
    pub fn start_level(&self) -> f64 {
        self.start_level
    }

    #[must_use]
    pub fn streak(&self) -> u32 {
        self.streak
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn log(&self) -> &dyn SessionLogRepository {
        self.log.as_ref()
    }

    pub(crate) fn log_handle(&self) -> Arc<dyn SessionLogRepository> {
        Arc::clone(&self.log)
    }

    #[must_use]
    pub fn pending(&self) -> Option<&PendingQuestion> {
        self.pending.as_ref()
    }

    #[must_use]
    pub fn last_answer(&self) -> Option<&AnsweredQuestion> {
        self.last_answer.as_ref()
    }

    /// Answers with a known outcome, skips included.
    #[must_use]
    pub fn answered(&self) -> u32 {
        self.totals.answered()
    }

    /// Correctness of the most recent learning-mode answers, oldest first.
    /// Skips are left out.
    #[must_use]
    pub fn break_history(&self) -> &[bool] {
        &self.break_history
    }

    #[must_use]
    pub fn question_mix(&self) -> &QuestionMix {
        &self.mix
    }

    #[must_use]
    pub fn calibration(&self) -> Option<&Calibration> {
        self.calibration.as_ref()
    }

    #[must_use]
    pub fn last_break_at(&self) -> Option<DateTime<Utc>> {
        self.last_break_at
    }

    #[must_use]
    pub fn active_minutes(&self) -> f64 {
        self.active_secs / 60.0
    }

    /// Count time spent outside answering (reading feedback, worked examples).
    pub fn add_active_time(&mut self, secs: f64) {
        if secs.is_finite() && secs > 0.0 {
            self.active_secs += secs;
        }
    }

    /// Remember that a break was offered at `at`, starting the cooldown.
    pub fn record_break(&mut self, at: DateTime<Utc>) {
        self.last_break_at = Some(at);
    }

    /// Summarize the session up to `completed_at`.
    ///
    /// # Errors
    ///
    /// Returns `SessionSummaryError::InvalidTimeRange` if `completed_at` is
    /// before the session started.
    pub fn summary(&self, completed_at: DateTime<Utc>) -> Result<SessionSummary, SessionSummaryError> {
        let totals = &self.totals;
        SessionSummary::from_totals(
            self.started_at,
            completed_at,
            totals.answered(),
            totals.correct,
            totals.incorrect,
            totals.skipped,
            self.start_level,
            totals.end_level.unwrap_or(self.start_level),
            totals.peak_level.unwrap_or(self.start_level),
        )
    }

    pub(crate) fn set_pending(&mut self, pending: PendingQuestion) {
        self.pending = Some(pending);
    }

    pub(crate) fn take_pending(&mut self) -> Option<PendingQuestion> {
        self.pending.take()
    }

    pub(crate) fn question_mix_mut(&mut self) -> &mut QuestionMix {
        &mut self.mix
    }

    pub(crate) fn calibration_mut(&mut self) -> Option<&mut Calibration> {
        self.calibration.as_mut()
    }

    pub(crate) fn apply(&mut self, level: f64, streak: u32) {
        self.level = level;
        self.streak = streak;
    }

    /// Leave calibration and start learning at `level`.
    pub(crate) fn finish_calibration(&mut self, level: f64) {
        self.mode = SessionMode::Learning;
        self.level = level;
        self.streak = 0;
    }

    /// Fold an answer given in `mode` into the session; `level` is the level after it.
    pub(crate) fn push_answer(&mut self, answered: AnsweredQuestion, mode: SessionMode, level: f64) {
        if mode == SessionMode::Learning {
            if let Some(correct) = answered.outcome.correctness() {
                if self.break_history.len() >= self.break_window {
                    self.break_history.remove(0);
                }
                self.break_history.push(correct);
            }
        }
        self.add_active_time(answered.response_time_secs);
        self.totals.add(answered.outcome, level);
        self.last_answer = Some(answered);
    }
}
