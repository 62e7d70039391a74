use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use drill_core::config::{LevelConfig, SelectionConfig};
use drill_core::model::{Band, Question, QuestionKind, QuestionMix, QuestionSignature, SessionMode};
use drill_core::selection::{LadderStep, fallback_ladder, select_band};
use storage::repository::SessionLogRepository;

use crate::error::PickError;
use crate::source::QuestionSource;

//
// ─── PICKED QUESTION ───────────────────────────────────────────────────────────
//

/// A question chosen for the learner, with how it was found.
#[derive(Debug, Clone, PartialEq)]
pub struct PickedQuestion {
    pub question: Question,
    pub signature: QuestionSignature,
    /// Band the question was generated at.
    pub band: Band,
    /// Rung of the fallback ladder that produced it.
    pub step: LadderStep,
    /// Candidates generated, including the accepted one.
    pub attempts: u32,
    pub kind: QuestionKind,
}

//
// ─── SELECTOR ──────────────────────────────────────────────────────────────────
//

/// Chooses the band for each question and filters out material the learner
/// has already mastered this session.
pub struct LevelSelector<R = StdRng> {
    config: SelectionConfig,
    max_band: u32,
    rng: R,
}

impl LevelSelector<StdRng> {
    /// Selector seeded from the operating system.
    #[must_use]
    pub fn new(config: SelectionConfig, levels: &LevelConfig) -> Self {
        Self::with_rng(config, levels, StdRng::from_rng(&mut rand::rng()))
    }

    /// Selector with a reproducible draw sequence.
    #[must_use]
    pub fn seeded(config: SelectionConfig, levels: &LevelConfig, seed: u64) -> Self {
        Self::with_rng(config, levels, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> LevelSelector<R> {
    #[must_use]
    pub fn with_rng(config: SelectionConfig, levels: &LevelConfig, rng: R) -> Self {
        Self {
            config,
            max_band: levels.max_band(),
            rng,
        }
    }

    #[must_use]
    pub fn config(&self) -> &SelectionConfig {
        &self.config
    }

    /// Draw the level the next question should come from.
    pub fn select_band(&mut self, current_level: f64) -> f64 {
        select_band(current_level, &self.config, &mut self.rng)
    }

    /// Pick the next question for a learner at `current_level`.
    ///
    /// In learning mode the band is drawn with review fall-off and candidates
    /// the learner keeps getting right are skipped, unless they were missed
    /// recently. When the requested band keeps producing rejects the search
    /// moves one band up, then one band down, and finally accepts the last
    /// candidate it generated. Calibration asks exactly at the probe level and
    /// never rejects.
    ///
    /// Learning mode also mixes in other kinds of question, decided by `mix`:
    /// a habit-fixing question at `fixing_habits_pct` once a tagged mistake has
    /// happened `fixing_habits_min_errors` times, otherwise a "why" question on
    /// every `why_every`-th turn. Those are generated once at the drawn band
    /// and never filtered.
    ///
    /// # Errors
    ///
    /// Returns `PickError::Source` with the source's own error, or
    /// `PickError::Storage` if the session log cannot be read.
    pub fn pick_question<S>(
        &mut self,
        current_level: f64,
        mode: SessionMode,
        mix: &mut QuestionMix,
        source: &mut S,
        log: &dyn SessionLogRepository,
    ) -> Result<PickedQuestion, PickError<S::Error>>
    where
        S: QuestionSource + ?Sized,
    {
        if mode == SessionMode::Calibration {
            let band = Band::from_level(current_level);
            return Self::generate_once(band, QuestionKind::Standard, source);
        }

        let target = self.select_band(current_level);
        let requested = Band::from_level(target);
        tracing::debug!(current_level, target, band = %requested, "selected band");

        if let Some(kind) = self.interleaved_kind(mix) {
            tracing::debug!(%kind, band = %requested, "interleaving question");
            return Self::generate_once(requested, kind, source);
        }

        let mut attempts = 0_u32;
        let mut last: Option<(Question, QuestionSignature, Band)> = None;

        for step in fallback_ladder(requested, self.max_band) {
            let Some(band) = step.band() else {
                break;
            };
            if attempts > 0 {
                tracing::debug!(?step, attempts, "falling back to neighbouring band");
            }

            for _ in 0..self.config.max_attempts {
                let question = source
                    .generate(band, QuestionKind::Standard)
                    .map_err(PickError::Source)?;
                attempts += 1;
                let signature = question.signature();

                if !self.should_reject(&signature, log)? {
                    return Ok(PickedQuestion {
                        question,
                        signature,
                        band,
                        step,
                        attempts,
                        kind: QuestionKind::Standard,
                    });
                }
                last = Some((question, signature, band));
            }
        }

        let (question, signature, band) = match last {
            Some(candidate) => candidate,
            None => {
                let question = source
                    .generate(requested, QuestionKind::Standard)
                    .map_err(PickError::Source)?;
                attempts += 1;
                let signature = question.signature();
                (question, signature, requested)
            }
        };
        tracing::debug!(%signature, attempts, "accepting last candidate");

        Ok(PickedQuestion {
            question,
            signature,
            band,
            step: LadderStep::AcceptLast,
            attempts,
            kind: QuestionKind::Standard,
        })
    }

    /// Non-standard kind for the next learning question, if any.
    fn interleaved_kind(&mut self, mix: &mut QuestionMix) -> Option<QuestionKind> {
        if let Some(error_type) = mix.recurring_error(self.config.fixing_habits_min_errors) {
            if self.rng.random_range(0.0..100.0) < self.config.fixing_habits_pct {
                return Some(QuestionKind::FixingHabits(error_type.to_owned()));
            }
        }
        mix.next_is_why(self.config.why_every)
            .then_some(QuestionKind::Why)
    }

    fn generate_once<S>(
        band: Band,
        kind: QuestionKind,
        source: &mut S,
    ) -> Result<PickedQuestion, PickError<S::Error>>
    where
        S: QuestionSource + ?Sized,
    {
        let question = source
            .generate(band, kind.clone())
            .map_err(PickError::Source)?;
        Ok(PickedQuestion {
            signature: question.signature(),
            question,
            band,
            step: LadderStep::Requested(band),
            attempts: 1,
            kind,
        })
    }

    fn should_reject(
        &self,
        signature: &QuestionSignature,
        log: &dyn SessionLogRepository,
    ) -> Result<bool, storage::repository::StorageError> {
        Ok(log.is_overasked(signature)?
            && !log.is_recently_missed(signature, self.config.recent_miss_window)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::FnSource;
    use drill_core::model::AnswerOutcome;
    use std::convert::Infallible;
    use storage::repository::InMemorySessionLog;

    #[derive(Debug, thiserror::Error, PartialEq)]
    #[error("generator offline")]
    struct Offline;

    fn no_review() -> SelectionConfig {
        SelectionConfig {
            one_below_pct: 0.0,
            two_below_pct: 0.0,
            three_below_pct: 0.0,
            deep_below_pct: 0.0,
            ..SelectionConfig::default()
        }
    }

    fn selector(config: SelectionConfig) -> LevelSelector {
        LevelSelector::seeded(config, &LevelConfig::default(), 11)
    }

    /// Source that always produces the same question for a band.
    fn fixed_per_band() -> FnSource<impl FnMut(Band, QuestionKind) -> Result<Question, Infallible>> {
        FnSource::new(|band: Band, _kind: QuestionKind| Ok(Question::new(format!("band {band}"), "42")))
    }

    /// Source that says which kind it was asked for.
    fn kind_echo() -> FnSource<impl FnMut(Band, QuestionKind) -> Result<Question, Infallible>> {
        FnSource::new(|band: Band, kind: QuestionKind| {
            Ok(Question::new(format!("{kind} at {band}"), "42"))
        })
    }

    fn kinds(
        selector: &mut LevelSelector,
        mode: SessionMode,
        mix: &mut QuestionMix,
        picks: usize,
    ) -> Vec<QuestionKind> {
        let log = InMemorySessionLog::new();
        let mut source = kind_echo();
        (0..picks)
            .map(|_| {
                let picked = selector
                    .pick_question(6.0, mode, mix, &mut source, &log)
                    .unwrap();
                assert_eq!(picked.question.content(), format!("{} at {}", picked.kind, picked.band));
                picked.kind
            })
            .collect()
    }

    fn master(log: &InMemorySessionLog, question: &Question) {
        log.record_asked(&question.signature(), Some(AnswerOutcome::Correct))
            .unwrap();
    }

    #[test]
    fn fresh_question_accepted_first_try() {
        let mut selector = selector(no_review());
        let log = InMemorySessionLog::new();
        let mut source = fixed_per_band();

        let picked = selector
            .pick_question(6.0, SessionMode::Learning, &mut QuestionMix::new(), &mut source, &log)
            .unwrap();
        assert_eq!(picked.band, Band::new(6));
        assert_eq!(picked.step, LadderStep::Requested(Band::new(6)));
        assert_eq!(picked.attempts, 1);
    }

    #[test]
    fn mastered_band_falls_back_one_up() {
        let mut selector = selector(no_review());
        let log = InMemorySessionLog::new();
        master(&log, &Question::new("band 6", "42"));
        let mut source = fixed_per_band();

        let picked = selector
            .pick_question(6.0, SessionMode::Learning, &mut QuestionMix::new(), &mut source, &log)
            .unwrap();
        assert_eq!(picked.step, LadderStep::OneUp(Band::new(7)));
        assert_eq!(picked.attempts, 11);
    }

    #[test]
    fn walks_the_whole_ladder_then_accepts_last() {
        let mut selector = selector(no_review());
        let log = InMemorySessionLog::new();
        for band in 5..=7 {
            master(&log, &Question::new(format!("band {band}"), "42"));
        }
        let mut source = fixed_per_band();

        let picked = selector
            .pick_question(6.0, SessionMode::Learning, &mut QuestionMix::new(), &mut source, &log)
            .unwrap();
        assert_eq!(picked.step, LadderStep::AcceptLast);
        assert_eq!(picked.band, Band::new(5));
        assert_eq!(picked.attempts, 30);
        assert_eq!(picked.question.content(), "band 5");
    }

    #[test]
    fn recently_missed_question_is_not_rejected() {
        let mut selector = selector(no_review());
        let log = InMemorySessionLog::new();
        let question = Question::new("band 6", "42");
        let signature = question.signature();
        log.record_asked(&signature, Some(AnswerOutcome::Correct)).unwrap();
        log.record_asked(&signature, Some(AnswerOutcome::Correct)).unwrap();
        log.record_asked(&signature, Some(AnswerOutcome::Incorrect)).unwrap();
        assert!(log.is_overasked(&signature).unwrap());
        let mut source = fixed_per_band();

        let picked = selector
            .pick_question(6.0, SessionMode::Learning, &mut QuestionMix::new(), &mut source, &log)
            .unwrap();
        assert_eq!(picked.signature, signature);
        assert_eq!(picked.attempts, 1);
    }

    #[test]
    fn calibration_never_filters() {
        let mut selector = selector(SelectionConfig::default());
        let log = InMemorySessionLog::new();
        master(&log, &Question::new("band 12", "42"));
        let mut source = fixed_per_band();

        let picked = selector
            .pick_question(12.0, SessionMode::Calibration, &mut QuestionMix::new(), &mut source, &log)
            .unwrap();
        assert_eq!(picked.band, Band::new(12));
        assert_eq!(picked.attempts, 1);
    }

    #[test]
    fn source_errors_pass_through() {
        let mut selector = selector(SelectionConfig::default());
        let log = InMemorySessionLog::new();
        let mut source = FnSource::new(|_band: Band, _kind: QuestionKind| Err::<Question, _>(Offline));

        let err = selector
            .pick_question(4.0, SessionMode::Learning, &mut QuestionMix::new(), &mut source, &log)
            .unwrap_err();
        assert!(matches!(err, PickError::Source(Offline)));
    }

    #[test]
    fn every_third_learning_question_asks_why() {
        let mut selector = selector(no_review());
        let mut mix = QuestionMix::new();

        let asked = kinds(&mut selector, SessionMode::Learning, &mut mix, 6);
        use QuestionKind::{Standard, Why};
        assert_eq!(asked, [Standard, Standard, Why, Standard, Standard, Why]);
        assert_eq!(mix.learning_questions(), 6);
    }

    #[test]
    fn why_question_skips_the_repetition_filter() {
        let config = SelectionConfig {
            why_every: 1,
            ..no_review()
        };
        let mut selector = selector(config);
        let log = InMemorySessionLog::new();
        master(&log, &Question::new("band 6", "42"));
        let mut source = fixed_per_band();

        let picked = selector
            .pick_question(6.0, SessionMode::Learning, &mut QuestionMix::new(), &mut source, &log)
            .unwrap();
        assert_eq!(picked.kind, QuestionKind::Why);
        assert_eq!(picked.step, LadderStep::Requested(Band::new(6)));
        assert_eq!(picked.attempts, 1);
    }

    #[test]
    fn habit_questions_wait_for_a_recurring_mistake() {
        let config = SelectionConfig {
            why_every: 0,
            ..no_review()
        };
        let mut selector = selector(config);
        let mut mix = QuestionMix::new();

        mix.record_error("sign");
        let asked = kinds(&mut selector, SessionMode::Learning, &mut mix, 200);
        assert!(asked.iter().all(QuestionKind::is_standard));

        mix.record_error("sign");
        let asked = kinds(&mut selector, SessionMode::Learning, &mut mix, 200);
        let habits = asked
            .iter()
            .filter(|kind| **kind == QuestionKind::FixingHabits("sign".into()))
            .count();
        assert_eq!(habits + asked.iter().filter(|kind| kind.is_standard()).count(), 200);
        // 15% of 200, give or take
        assert!((10..=55).contains(&habits), "got {habits} habit questions");
    }

    #[test]
    fn habit_question_comes_before_the_why_turn() {
        let config = SelectionConfig {
            fixing_habits_pct: 100.0,
            why_every: 1,
            ..no_review()
        };
        let mut selector = selector(config);
        let mut mix = QuestionMix::new();
        mix.record_error("zero_division");
        mix.record_error("zero_division");

        let asked = kinds(&mut selector, SessionMode::Learning, &mut mix, 2);
        assert_eq!(asked, vec![QuestionKind::FixingHabits("zero_division".into()); 2]);
        assert_eq!(mix.learning_questions(), 0);
    }

    #[test]
    fn calibration_only_asks_standard_questions() {
        let config = SelectionConfig {
            fixing_habits_pct: 100.0,
            why_every: 1,
            ..SelectionConfig::default()
        };
        let mut selector = selector(config);
        let mut mix = QuestionMix::new();
        mix.record_error("sign");
        mix.record_error("sign");

        let asked = kinds(&mut selector, SessionMode::Calibration, &mut mix, 10);
        assert!(asked.iter().all(QuestionKind::is_standard));
        assert_eq!(mix.learning_questions(), 0);
        assert_eq!(mix.error_count("sign"), 2);
    }

    #[test]
    fn same_seed_same_bands() {
        let mut a = selector(SelectionConfig::default());
        let mut b = selector(SelectionConfig::default());
        let left: Vec<f64> = (0..50).map(|_| a.select_band(9.0)).collect();
        let right: Vec<f64> = (0..50).map(|_| b.select_band(9.0)).collect();
        assert_eq!(left, right);
    }
}
