use serde::{Deserialize, Serialize};

use crate::config::{LevelConfig, ScoringConfig};
use crate::model::{AnswerOutcome, Band, SpeedTier};

//
// ─── CONTEXT & RESULT ──────────────────────────────────────────────────────────
//

/// Learner state and timing around a single answer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnswerContext {
    pub response_time_secs: f64,
    pub question_band: Band,
    pub current_level: f64,
    pub current_streak: u32,
}

/// Level movement produced by one answer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    /// Signed change before clamping.
    pub delta: f64,
    pub new_level: f64,
    pub new_streak: u32,
    /// The question came from a band below the learner's level.
    pub is_review: bool,
    pub speed: SpeedTier,
}

//
// ─── SCORER ────────────────────────────────────────────────────────────────────
//

/// Turns answer outcomes into skill-level movement.
///
/// Correct answers climb faster on a streak and slower when answered slowly;
/// review material earns a bonus when right and a heavier penalty when badly
/// wrong. The resulting level is always clamped to the configured bounds.
///
/// ```
/// # use drill_core::scoring::{AnswerContext, AnswerScorer};
/// # use drill_core::model::{AnswerOutcome, Band};
/// let scorer = AnswerScorer::default();
/// let result = scorer.score(
///     AnswerOutcome::Incorrect,
///     &AnswerContext {
///         response_time_secs: 4.0,
///         question_band: Band::new(5),
///         current_level: 5.0,
///         current_streak: 0,
///     },
/// );
/// assert_eq!(result.delta, -0.8);
/// assert!((result.new_level - 4.2).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, Default)]
pub struct AnswerScorer {
    scoring: ScoringConfig,
    levels: LevelConfig,
}

impl AnswerScorer {
    #[must_use]
    pub fn new(scoring: ScoringConfig, levels: LevelConfig) -> Self {
        Self { scoring, levels }
    }

    #[must_use]
    pub fn scoring(&self) -> &ScoringConfig {
        &self.scoring
    }

    #[must_use]
    pub fn levels(&self) -> &LevelConfig {
        &self.levels
    }

    /// Score an outcome that may not have been recognised.
    ///
    /// `None` leaves level and streak exactly as they were.
    #[must_use]
    pub fn score_reported(&self, outcome: Option<AnswerOutcome>, ctx: &AnswerContext) -> ScoreResult {
        match outcome {
            Some(outcome) => self.score(outcome, ctx),
            None => ScoreResult {
                delta: 0.0,
                new_level: ctx.current_level,
                new_streak: ctx.current_streak,
                is_review: self.is_review(ctx),
                speed: self.speed(ctx),
            },
        }
    }

    #[must_use]
    pub fn score(&self, outcome: AnswerOutcome, ctx: &AnswerContext) -> ScoreResult {
        let cfg = &self.scoring;
        let level_difference = self.level_difference(ctx);
        let is_review = self.is_review(ctx);
        let speed = self.speed(ctx);

        let (delta, new_streak) = match outcome {
            AnswerOutcome::Skipped => (cfg.skip_delta, ctx.current_streak),
            AnswerOutcome::Correct => {
                let streak = ctx.current_streak.saturating_add(1);
                let base = if streak >= cfg.turbo_streak {
                    cfg.turbo_delta
                } else {
                    cfg.base_delta
                };
                let mut delta = base * speed.factor();
                if is_review {
                    delta *= self.review_bonus(level_difference);
                }
                (delta, streak)
            }
            AnswerOutcome::Incorrect => {
                let mut delta = if ctx.current_streak == 0 {
                    cfg.repeat_miss_delta
                } else {
                    cfg.first_miss_delta
                };
                if is_review && level_difference >= cfg.review_penalty_min_difference {
                    delta *= 1.0 + level_difference * cfg.review_penalty_per_level;
                }
                (delta, 0)
            }
        };

        ScoreResult {
            delta,
            new_level: self.levels.clamp(ctx.current_level + delta),
            new_streak,
            is_review,
            speed,
        }
    }

    /// Multiplier for a correct review answer: base plus a per-level step, capped.
    #[must_use]
    pub fn review_bonus(&self, level_difference: f64) -> f64 {
        let cfg = &self.scoring;
        cfg.review_bonus_base + (level_difference * cfg.review_bonus_per_level).min(cfg.review_bonus_cap)
    }

    fn level_difference(&self, ctx: &AnswerContext) -> f64 {
        ctx.current_level - ctx.question_band.as_level()
    }

    fn is_review(&self, ctx: &AnswerContext) -> bool {
        self.level_difference(ctx) > self.scoring.review_threshold
    }

    fn speed(&self, ctx: &AnswerContext) -> SpeedTier {
        SpeedTier::classify(
            ctx.response_time_secs,
            self.scoring.fast_threshold_secs,
            self.scoring.slow_threshold_secs,
        )
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const EPS: f64 = 1e-9;

    fn ctx(level: f64, band: u32, streak: u32, secs: f64) -> AnswerContext {
        AnswerContext {
            response_time_secs: secs,
            question_band: Band::new(band),
            current_level: level,
            current_streak: streak,
        }
    }

    #[test]
    fn correct_streak_accelerates_on_third_answer() {
        let scorer = AnswerScorer::default();
        let mut level = 5.0;
        let mut streak = 0;
        let mut deltas = Vec::new();

        for _ in 0..3 {
            let result = scorer.score(AnswerOutcome::Correct, &ctx(level, 5, streak, 3.0));
            assert!(result.new_level > level);
            assert!(!result.is_review);
            deltas.push(result.new_level - level);
            level = result.new_level;
            streak = result.new_streak;
        }

        assert_eq!(streak, 3);
        assert!((deltas[0] - 0.2).abs() < EPS);
        assert!((deltas[1] - 0.2).abs() < EPS);
        assert!((deltas[2] - 0.4).abs() < EPS);
        assert!(deltas[2] > deltas[0] && deltas[2] > deltas[1]);
    }

    #[test]
    fn speed_scales_correct_gain() {
        let scorer = AnswerScorer::default();
        let fast = scorer.score(AnswerOutcome::Correct, &ctx(5.0, 5, 0, 2.0));
        let normal = scorer.score(AnswerOutcome::Correct, &ctx(5.0, 5, 0, 12.0));
        let slow = scorer.score(AnswerOutcome::Correct, &ctx(5.0, 5, 0, 45.0));

        assert!((fast.delta - 0.2).abs() < EPS);
        assert!((normal.delta - 0.15).abs() < EPS);
        assert!((slow.delta - 0.1).abs() < EPS);
        assert_eq!(slow.speed, SpeedTier::Slow);
    }

    #[test]
    fn review_bonus_applies_to_lower_band() {
        let scorer = AnswerScorer::default();
        let review = scorer.score(AnswerOutcome::Correct, &ctx(6.0, 4, 0, 3.0));
        let current = scorer.score(AnswerOutcome::Correct, &ctx(6.0, 6, 0, 3.0));

        assert!(review.is_review);
        assert!(!current.is_review);
        let ratio = review.delta / current.delta;
        assert!((1.2..=1.4 + EPS).contains(&ratio), "ratio {ratio}");
        assert!((ratio - 1.4).abs() < EPS);
    }

    #[test]
    fn review_bonus_is_capped() {
        let scorer = AnswerScorer::default();
        assert!((scorer.review_bonus(1.0) - 1.3).abs() < EPS);
        assert!((scorer.review_bonus(3.0) - 1.5).abs() < EPS);
        assert!((scorer.review_bonus(9.0) - 1.5).abs() < EPS);
    }

    #[test]
    fn double_miss_drops_hard_each_time() {
        let scorer = AnswerScorer::default();
        let first = scorer.score(AnswerOutcome::Incorrect, &ctx(5.0, 5, 0, 5.0));
        assert!((first.delta + 0.8).abs() < EPS);
        assert_eq!(first.new_streak, 0);

        let second = scorer.score(
            AnswerOutcome::Incorrect,
            &ctx(first.new_level, 4, first.new_streak, 5.0),
        );
        assert!((second.delta + 0.8).abs() < EPS);
    }

    #[test]
    fn first_miss_after_success_is_gentle() {
        let scorer = AnswerScorer::default();
        let result = scorer.score(AnswerOutcome::Incorrect, &ctx(5.0, 5, 4, 5.0));
        assert!((result.delta + 0.3).abs() < EPS);
        assert_eq!(result.new_streak, 0);
    }

    #[test]
    fn missing_far_review_is_penalized_more() {
        let scorer = AnswerScorer::default();
        // difference 4: -0.8 * (1 + 0.8)
        let result = scorer.score(AnswerOutcome::Incorrect, &ctx(8.0, 4, 0, 5.0));
        assert!((result.delta + 1.44).abs() < EPS);

        // difference 1 is review but below the penalty threshold
        let near = scorer.score(AnswerOutcome::Incorrect, &ctx(8.0, 7, 0, 5.0));
        assert!(near.is_review);
        assert!((near.delta + 0.8).abs() < EPS);
    }

    #[test]
    fn skip_eases_without_touching_streak() {
        let scorer = AnswerScorer::default();
        let result = scorer.score(AnswerOutcome::Skipped, &ctx(5.0, 5, 2, 5.0));
        assert!((result.delta + 0.3).abs() < EPS);
        assert_eq!(result.new_streak, 2);
    }

    #[test]
    fn unknown_outcome_is_a_no_op() {
        let scorer = AnswerScorer::default();
        let context = ctx(7.3, 7, 2, 5.0);
        let result = scorer.score_reported(AnswerOutcome::parse("banana"), &context);
        assert_eq!(result.delta, 0.0);
        assert_eq!(result.new_level, 7.3);
        assert_eq!(result.new_streak, 2);
    }

    #[test]
    fn clamps_at_both_bounds() {
        let scorer = AnswerScorer::default();
        let floor = scorer.score(AnswerOutcome::Incorrect, &ctx(1.2, 1, 0, 5.0));
        assert_eq!(floor.new_level, 1.0);
        let ceiling = scorer.score(AnswerOutcome::Correct, &ctx(23.9, 24, 5, 1.0));
        assert_eq!(ceiling.new_level, 24.0);
    }

    fn outcome_strategy() -> impl Strategy<Value = AnswerOutcome> {
        prop_oneof![
            Just(AnswerOutcome::Correct),
            Just(AnswerOutcome::Incorrect),
            Just(AnswerOutcome::Skipped),
        ]
    }

    proptest! {
        #[test]
        fn level_stays_within_bounds(
            start in 1.0f64..=24.0,
            answers in prop::collection::vec((outcome_strategy(), 1u32..=30, -5.0f64..120.0), 1..200),
        ) {
            let scorer = AnswerScorer::default();
            let mut level = start;
            let mut streak = 0;
            for (outcome, band, secs) in answers {
                let result = scorer.score(outcome, &ctx(level, band, streak, secs));
                prop_assert!(result.new_level >= 1.0 && result.new_level <= 24.0);
                if outcome == AnswerOutcome::Skipped {
                    prop_assert_eq!(result.new_streak, streak);
                }
                level = result.new_level;
                streak = result.new_streak;
            }
        }
    }
}
