use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rand::rngs::StdRng;

use drill_core::breaks::BreakDetector;
use drill_core::calibration::CalibrationProgress;
use drill_core::config::EngineConfig;
use drill_core::model::{
    AnswerEvent, AnswerOutcome, AnsweredQuestion, Band, QuestionKind, QuestionSignature,
    SessionMode, SessionSummary, SpeedTier,
};
use drill_core::scoring::{AnswerContext, AnswerScorer};
use drill_core::time::Clock;
use storage::sink::AnswerSink;

use crate::error::{PickError, SessionError};
use crate::selector::{LevelSelector, PickedQuestion};
use crate::session::{LearningSession, PendingQuestion};
use crate::source::QuestionSource;

//
// ─── ANSWER RESULT ─────────────────────────────────────────────────────────────
//

/// What one answer did to the session.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerResult {
    pub signature: QuestionSignature,
    pub band: Band,
    pub kind: QuestionKind,
    /// `None` when the reported outcome was not recognised.
    pub outcome: Option<AnswerOutcome>,
    pub delta: f64,
    pub level: f64,
    pub streak: u32,
    pub is_review: bool,
    pub speed: SpeedTier,
    /// Mode after the answer; calibration can hand over to learning.
    pub mode: SessionMode,
    pub calibration: Option<CalibrationProgress>,
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Runs the question/answer loop for practice sessions.
pub struct PracticeService<R = StdRng> {
    config: EngineConfig,
    selector: LevelSelector<R>,
    scorer: AnswerScorer,
    breaks: BreakDetector,
    clock: Clock,
    sink: Arc<dyn AnswerSink>,
}

impl PracticeService<StdRng> {
    /// Validate `config` and build a service with an OS-seeded selector.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Config` if the configuration is inconsistent.
    pub fn new(config: EngineConfig, sink: Arc<dyn AnswerSink>) -> Result<Self, SessionError> {
        config.validate()?;
        let selector = LevelSelector::new(config.selection.clone(), &config.levels);
        Ok(Self::assemble(config, selector, sink))
    }

    /// Like [`PracticeService::new`] with a reproducible draw sequence.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Config` if the configuration is inconsistent.
    pub fn seeded(
        config: EngineConfig,
        sink: Arc<dyn AnswerSink>,
        seed: u64,
    ) -> Result<Self, SessionError> {
        config.validate()?;
        let selector = LevelSelector::seeded(config.selection.clone(), &config.levels, seed);
        Ok(Self::assemble(config, selector, sink))
    }
}

impl<R: Rng> PracticeService<R> {
    fn assemble(config: EngineConfig, selector: LevelSelector<R>, sink: Arc<dyn AnswerSink>) -> Self {
        Self {
            scorer: AnswerScorer::new(config.scoring.clone(), config.levels.clone()),
            breaks: BreakDetector::new(config.breaks.clone()),
            config,
            selector,
            clock: Clock::default(),
            sink,
        }
    }

    /// Override the clock (usually for deterministic testing).
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Current time according to the service's clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Move a fixed clock forward.
    pub fn advance_clock(&mut self, delta: Duration) {
        self.clock.advance(delta);
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Start a session that goes straight into learning.
    #[must_use]
    pub fn start_session(&self) -> LearningSession {
        LearningSession::new(&self.config, self.now())
    }

    /// Start a session that calibrates first.
    #[must_use]
    pub fn start_calibration(&self) -> LearningSession {
        LearningSession::calibrating(&self.config, self.now())
    }

    /// Pick the next question and make it the one awaiting an answer.
    ///
    /// A question that was still pending is replaced without being recorded.
    ///
    /// # Errors
    ///
    /// Returns the source's error unchanged, or a storage error from the session log.
    pub fn next_question<S>(
        &mut self,
        session: &mut LearningSession,
        source: &mut S,
    ) -> Result<PickedQuestion, PickError<S::Error>>
    where
        S: QuestionSource + ?Sized,
    {
        let log = session.log_handle();
        let (level, mode) = (session.level(), session.mode());
        let picked = self.selector.pick_question(
            level,
            mode,
            session.question_mix_mut(),
            source,
            log.as_ref(),
        )?;
        session.set_pending(PendingQuestion::from(picked.clone()));
        Ok(picked)
    }

    /// Apply the learner's answer to the pending question.
    ///
    /// The question is recorded in the session log whatever the outcome. An
    /// unrecognised outcome (`None`) leaves level and streak untouched and
    /// produces no answer event.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoPendingQuestion` if nothing was asked, or
    /// `SessionError::Storage` if the session log cannot be updated.
    pub fn answer(
        &mut self,
        session: &mut LearningSession,
        outcome: Option<AnswerOutcome>,
        response_time_secs: f64,
    ) -> Result<AnswerResult, SessionError> {
        self.answer_with_error(session, outcome, response_time_secs, None)
    }

    /// Like [`PracticeService::answer`], with the kind of mistake behind an
    /// incorrect answer (for example `"sign"` for a dropped negative root).
    ///
    /// Tagged mistakes are tallied per session; once one recurs, learning
    /// questions start to include habit-fixing questions about it. A correct
    /// answer to such a question takes one off its tally. The tag is ignored
    /// for any outcome other than `Incorrect`.
    ///
    /// # Errors
    ///
    /// As [`PracticeService::answer`].
    pub fn answer_with_error(
        &mut self,
        session: &mut LearningSession,
        outcome: Option<AnswerOutcome>,
        response_time_secs: f64,
        error_type: Option<&str>,
    ) -> Result<AnswerResult, SessionError> {
        let pending = session.take_pending().ok_or(SessionError::NoPendingQuestion)?;
        session.log().record_asked(&pending.signature, outcome)?;

        let mode = session.mode();
        let before = session.level();
        let ctx = AnswerContext {
            response_time_secs,
            question_band: pending.band,
            current_level: before,
            current_streak: session.streak(),
        };
        let scored = self.scorer.score_reported(outcome, &ctx);

        let mut calibration = None;
        match (mode, outcome) {
            (SessionMode::Learning, _) => session.apply(scored.new_level, scored.new_streak),
            (SessionMode::Calibration, Some(outcome)) => {
                if let Some(search) = session
                    .calibration_mut()
                    .filter(|search| !search.is_finished())
                {
                    let progress = search.answer(outcome, response_time_secs);
                    match progress {
                        CalibrationProgress::Continue { next_probe } => {
                            session.apply(next_probe, 0);
                        }
                        CalibrationProgress::Placed { level } => {
                            tracing::info!(
                                session_id = %session.id(),
                                level,
                                "calibration finished"
                            );
                            session.finish_calibration(level);
                        }
                    }
                    calibration = Some(progress);
                }
            }
            (SessionMode::Calibration, None) => {}
        }

        match (outcome, &pending.kind, error_type) {
            (Some(AnswerOutcome::Incorrect), _, Some(error_type)) => {
                session.question_mix_mut().record_error(error_type);
            }
            (Some(AnswerOutcome::Correct), QuestionKind::FixingHabits(error_type), _) => {
                session.question_mix_mut().record_fixed(error_type);
            }
            _ => {}
        }

        let level = session.level();
        let delta = level - before;
        tracing::debug!(
            signature = %pending.signature,
            band = %pending.band,
            kind = %pending.kind,
            ?outcome,
            delta,
            level,
            streak = session.streak(),
            "answer scored"
        );

        if let Some(outcome) = outcome {
            let event = AnswerEvent {
                session_id: session.id(),
                signature: pending.signature.clone(),
                band: pending.band,
                outcome,
                mode,
                response_time_secs,
                speed_score: scored.speed.score(),
                delta,
                level,
                streak: session.streak(),
                answered_at: self.now(),
            };
            session.push_answer(
                AnsweredQuestion {
                    band: pending.band,
                    outcome,
                    response_time_secs,
                },
                mode,
                level,
            );
            self.sink.record(event);
        }

        Ok(AnswerResult {
            signature: pending.signature,
            band: pending.band,
            kind: pending.kind,
            outcome,
            delta,
            level,
            streak: session.streak(),
            is_review: scored.is_review,
            speed: scored.speed,
            mode: session.mode(),
            calibration,
        })
    }

    /// Whether the learner should be offered a break right now.
    #[must_use]
    pub fn should_suggest_break(&self, session: &LearningSession) -> bool {
        let suggest = self.breaks.should_suggest_break(
            session.break_history(),
            session.active_minutes(),
            session.last_break_at(),
            self.now(),
        );
        if suggest {
            tracing::info!(
                session_id = %session.id(),
                active_minutes = session.active_minutes(),
                "suggesting a break"
            );
        }
        suggest
    }

    /// Record that a break was offered now.
    pub fn take_break(&self, session: &mut LearningSession) {
        session.record_break(self.now());
    }

    /// Summarize the session as of now.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Summary` if the clock is behind the session start.
    pub fn summary(&self, session: &LearningSession) -> Result<SessionSummary, SessionError> {
        Ok(session.summary(self.now())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::FnSource;
    use drill_core::calibration::Calibration;
    use drill_core::config::SelectionConfig;
    use drill_core::model::Question;
    use drill_core::time::fixed_clock;
    use std::convert::Infallible;
    use storage::sink::InMemoryAnswerLog;

    fn counting_source() -> FnSource<impl FnMut(Band, QuestionKind) -> Result<Question, Infallible>> {
        let mut n = 0_u32;
        FnSource::new(move |band: Band, _kind: QuestionKind| {
            n += 1;
            Ok(Question::new(format!("q{n} @ {band}"), format!("{n}")))
        })
    }

    fn no_review_config() -> EngineConfig {
        EngineConfig {
            selection: SelectionConfig {
                one_below_pct: 0.0,
                two_below_pct: 0.0,
                three_below_pct: 0.0,
                deep_below_pct: 0.0,
                ..SelectionConfig::default()
            },
            ..EngineConfig::default()
        }
    }

    fn service(config: EngineConfig) -> (PracticeService, InMemoryAnswerLog) {
        let log = InMemoryAnswerLog::new();
        let service = PracticeService::seeded(config, Arc::new(log.clone()), 5)
            .unwrap()
            .with_clock(fixed_clock());
        (service, log)
    }

    #[test]
    fn answering_without_question_fails() {
        let (mut service, _) = service(EngineConfig::default());
        let mut session = service.start_session();
        let err = service
            .answer(&mut session, Some(AnswerOutcome::Correct), 3.0)
            .unwrap_err();
        assert!(matches!(err, SessionError::NoPendingQuestion));
    }

    #[test]
    fn correct_answers_climb_and_emit_events() {
        let (mut service, log) = service(no_review_config());
        let mut session = service.start_session();
        let mut source = counting_source();

        for _ in 0..3 {
            service.next_question(&mut session, &mut source).unwrap();
            service
                .answer(&mut session, Some(AnswerOutcome::Correct), 4.0)
                .unwrap();
        }

        assert!((session.level() - 5.8).abs() < 1e-9);
        assert_eq!(session.streak(), 3);
        assert_eq!(log.len(), 3);
        assert_eq!(session.log().counter().unwrap(), 3);
        assert!(log.events().iter().all(|event| event.session_id == session.id()));
    }

    #[test]
    fn unknown_outcome_changes_nothing_but_the_log() {
        let (mut service, log) = service(no_review_config());
        let mut session = service.start_session();
        let mut source = counting_source();

        let picked = service.next_question(&mut session, &mut source).unwrap();
        let result = service
            .answer(&mut session, AnswerOutcome::parse("¯\\_(ツ)_/¯"), 4.0)
            .unwrap();

        assert_eq!(result.delta, 0.0);
        assert_eq!(session.level(), 5.0);
        assert!(log.is_empty());
        let entry = session.log().get(&picked.signature).unwrap().unwrap();
        assert_eq!(entry.count, 1);
        assert_eq!(entry.correct_count + entry.incorrect_count, 0);
        assert!(session.pending().is_none());
    }

    #[test]
    fn skips_stay_out_of_break_history() {
        let (mut service, _) = service(no_review_config());
        let mut session = service.start_session();
        let mut source = counting_source();

        for outcome in [AnswerOutcome::Skipped, AnswerOutcome::Incorrect, AnswerOutcome::Skipped] {
            service.next_question(&mut session, &mut source).unwrap();
            service.answer(&mut session, Some(outcome), 6.0).unwrap();
        }

        assert_eq!(session.break_history(), &[false]);
        assert_eq!(session.answered(), 3);
        assert!((session.active_minutes() - 0.3).abs() < 1e-9);
    }

    #[test]
    fn struggling_learner_gets_one_break_per_cooldown() {
        let (mut service, _) = service(no_review_config());
        let mut session = service.start_session();
        let mut source = counting_source();

        for _ in 0..5 {
            service.next_question(&mut session, &mut source).unwrap();
            service
                .answer(&mut session, Some(AnswerOutcome::Incorrect), 5.0)
                .unwrap();
        }
        assert!(service.should_suggest_break(&session));

        service.take_break(&mut session);
        assert!(!service.should_suggest_break(&session));

        service.advance_clock(Duration::minutes(16));
        assert!(service.should_suggest_break(&session));
    }

    #[test]
    fn calibration_hands_over_to_learning() {
        let (mut service, log) = service(EngineConfig::default());
        let mut session = service.start_calibration();
        let mut source = counting_source();

        let mut bands = Vec::new();
        let mut last = None;
        while session.mode() == SessionMode::Calibration {
            let picked = service.next_question(&mut session, &mut source).unwrap();
            bands.push(picked.band.value());
            last = Some(
                service
                    .answer(&mut session, Some(AnswerOutcome::Incorrect), 3.0)
                    .unwrap(),
            );
        }

        assert_eq!(bands, vec![12, 6, 3, 2, 1]);
        let last = last.unwrap();
        assert_eq!(last.calibration, Some(CalibrationProgress::Placed { level: 1.0 }));
        assert_eq!(last.mode, SessionMode::Learning);
        assert_eq!(session.level(), 1.0);
        assert!(session.calibration().is_some_and(Calibration::is_finished));
        assert!(session.break_history().is_empty());
        assert!(log.events().iter().all(|event| event.mode == SessionMode::Calibration));
    }

    #[test]
    fn recurring_mistake_brings_habit_question_until_fixed() {
        let mut config = no_review_config();
        config.selection.fixing_habits_pct = 100.0;
        config.selection.why_every = 0;
        let (mut service, _) = service(config);
        let mut session = service.start_session();
        let mut source = counting_source();

        for _ in 0..2 {
            let picked = service.next_question(&mut session, &mut source).unwrap();
            assert_eq!(picked.kind, QuestionKind::Standard);
            service
                .answer_with_error(&mut session, Some(AnswerOutcome::Incorrect), 5.0, Some("sign"))
                .unwrap();
        }
        assert_eq!(session.question_mix().error_count("sign"), 2);

        let picked = service.next_question(&mut session, &mut source).unwrap();
        assert_eq!(picked.kind, QuestionKind::FixingHabits("sign".into()));
        let result = service
            .answer(&mut session, Some(AnswerOutcome::Correct), 5.0)
            .unwrap();
        assert_eq!(result.kind, QuestionKind::FixingHabits("sign".into()));
        assert_eq!(session.question_mix().error_count("sign"), 1);

        let picked = service.next_question(&mut session, &mut source).unwrap();
        assert_eq!(picked.kind, QuestionKind::Standard);
    }

    #[test]
    fn error_tag_only_counts_for_incorrect_answers() {
        let (mut service, _) = service(no_review_config());
        let mut session = service.start_session();
        let mut source = counting_source();

        for outcome in [AnswerOutcome::Correct, AnswerOutcome::Skipped] {
            service.next_question(&mut session, &mut source).unwrap();
            service
                .answer_with_error(&mut session, Some(outcome), 5.0, Some("sign"))
                .unwrap();
        }
        assert_eq!(session.question_mix().error_count("sign"), 0);
    }

    #[test]
    fn every_third_learning_question_is_why() {
        let (mut service, _) = service(no_review_config());
        let mut session = service.start_session();
        let mut source = counting_source();

        let mut kinds = Vec::new();
        for _ in 0..6 {
            kinds.push(service.next_question(&mut session, &mut source).unwrap().kind);
            service
                .answer(&mut session, Some(AnswerOutcome::Correct), 5.0)
                .unwrap();
        }
        let whys: Vec<usize> = kinds
            .iter()
            .enumerate()
            .filter(|(_, kind)| **kind == QuestionKind::Why)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(whys, [2, 5]);
    }

    #[test]
    fn summary_reflects_answers() {
        let (mut service, _) = service(no_review_config());
        let mut session = service.start_session();
        let mut source = counting_source();

        for outcome in [AnswerOutcome::Correct, AnswerOutcome::Incorrect, AnswerOutcome::Skipped] {
            service.next_question(&mut session, &mut source).unwrap();
            service.answer(&mut session, Some(outcome), 5.0).unwrap();
        }
        service.advance_clock(Duration::minutes(3));

        let summary = service.summary(&session).unwrap();
        assert_eq!(summary.total_answers(), 3);
        assert_eq!(summary.correct(), 1);
        assert_eq!(summary.skipped(), 1);
        assert_eq!(summary.start_level(), 5.0);
        assert!((summary.peak_level() - 5.2).abs() < 1e-9);
    }

    #[test]
    fn rejects_invalid_config() {
        let mut config = EngineConfig::default();
        config.levels.start_level = 99.0;
        let result = PracticeService::new(config, Arc::new(InMemoryAnswerLog::new()));
        assert!(matches!(result, Err(SessionError::Config(_))));
    }
}
