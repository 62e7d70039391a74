//! Stand-ins for the real question generator and a human learner.

use std::convert::Infallible;

use rand::Rng;
use rand::rngs::StdRng;

use drill_core::model::{AnswerOutcome, Band, Question, QuestionKind};
use services::QuestionSource;

//
// ─── DEMO SOURCE ───────────────────────────────────────────────────────────────
//

/// Mistake tags the simulated learner reports and the demo source can target.
pub const ERROR_TYPES: [&str; 3] = ["carry", "sign", "zero_division"];

/// Arithmetic drills whose operands grow with the band.
pub struct ArithmeticSource {
    rng: StdRng,
}

impl ArithmeticSource {
    #[must_use]
    pub fn new(rng: StdRng) -> Self {
        Self { rng }
    }
}

impl QuestionSource for ArithmeticSource {
    type Error = Infallible;

    fn generate(&mut self, band: Band, kind: QuestionKind) -> Result<Question, Infallible> {
        let level = band.value();
        let ceiling = level.saturating_mul(3).max(3);
        let a = self.rng.random_range(1..=ceiling);
        let b = self.rng.random_range(1..=ceiling);

        let question = match (kind, level) {
            (QuestionKind::Why, _) => Question::new(
                format!("why is {a} + {b} the same as {b} + {a}?"),
                "addition is commutative",
            ),
            (QuestionKind::FixingHabits(error_type), _) => match error_type.as_str() {
                "sign" => Question::new(format!("x² = {}", a * a), format!("x = ±{a}")),
                "zero_division" => Question::new(format!("({a}x + {b}) / x at x = 0"), "undefined"),
                _ => {
                    let (a, b) = (a * 19, b * 19);
                    Question::new(format!("{a} + {b}"), (a + b).to_string())
                }
            },
            (QuestionKind::Standard, level) => Self::standard(level, a, b),
        };
        Ok(question)
    }
}

impl ArithmeticSource {
    fn standard(level: u32, a: u32, b: u32) -> Question {
        match level {
            0..=6 => Question::new(format!("{a} + {b}"), (a + b).to_string()),
            7..=12 => {
                let (hi, lo) = (a.max(b), a.min(b));
                Question::new(format!("{hi} - {lo}"), (hi - lo).to_string())
            }
            13..=18 => Question::new(format!("{a} × {b}"), (a * b).to_string()),
            _ => Question::new(format!("{a}x = {}", a * b), format!("x = {b}")),
        }
    }
}

//
// ─── LEARNER ───────────────────────────────────────────────────────────────────
//

/// How a simulated learner answered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulatedAnswer {
    pub outcome: AnswerOutcome,
    pub response_time_secs: f64,
    /// Set for incorrect answers only.
    pub error_type: Option<&'static str>,
}

/// Learner with a fixed true skill: likely right below it, likely wrong above.
pub struct SimulatedLearner {
    skill: f64,
    skip_pct: f64,
    rng: StdRng,
}

impl SimulatedLearner {
    #[must_use]
    pub fn new(skill: f64, rng: StdRng) -> Self {
        Self {
            skill,
            skip_pct: 5.0,
            rng,
        }
    }

    #[must_use]
    pub fn skill(&self) -> f64 {
        self.skill
    }

    /// Chance of a correct answer at `band`.
    #[must_use]
    pub fn success_chance(&self, band: Band) -> f64 {
        1.0 / (1.0 + (band.as_level() - self.skill - 0.5).exp())
    }

    pub fn answer(&mut self, band: Band) -> SimulatedAnswer {
        let stretch = (band.as_level() - self.skill).max(0.0);
        let response_time_secs = 3.0 + stretch * 2.5 + self.rng.random_range(0.0..6.0);

        let outcome = if self.rng.random_range(0.0..100.0) < self.skip_pct {
            AnswerOutcome::Skipped
        } else if self.rng.random_bool(self.success_chance(band)) {
            AnswerOutcome::Correct
        } else {
            AnswerOutcome::Incorrect
        };

        let error_type = (outcome == AnswerOutcome::Incorrect)
            .then(|| ERROR_TYPES[self.rng.random_range(0..ERROR_TYPES.len())]);

        SimulatedAnswer {
            outcome,
            response_time_secs,
            error_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn arithmetic_answers_check_out() {
        let mut source = ArithmeticSource::new(StdRng::seed_from_u64(1));
        for band in [1, 8, 15] {
            let question = source
                .generate(Band::new(band), QuestionKind::Standard)
                .unwrap();
            let parts: Vec<&str> = question.content().split(' ').collect();
            let (a, b): (u32, u32) = (parts[0].parse().unwrap(), parts[2].parse().unwrap());
            let expected = match parts[1] {
                "+" => a + b,
                "-" => a - b,
                _ => a * b,
            };
            assert_eq!(question.correct_answer(), expected.to_string());
        }
    }

    #[test]
    fn habit_questions_follow_the_error_type() {
        let mut source = ArithmeticSource::new(StdRng::seed_from_u64(4));
        let question = source
            .generate(Band::new(9), QuestionKind::FixingHabits("sign".into()))
            .unwrap();
        assert!(question.content().starts_with("x² = "));
        assert!(question.correct_answer().starts_with("x = ±"));

        let question = source.generate(Band::new(9), QuestionKind::Why).unwrap();
        assert!(question.content().starts_with("why"));
    }

    #[test]
    fn only_wrong_answers_carry_an_error_type() {
        let mut learner = SimulatedLearner::new(8.0, StdRng::seed_from_u64(5));
        for band in 1..=20 {
            let reply = learner.answer(Band::new(band));
            assert_eq!(
                reply.error_type.is_some(),
                reply.outcome == AnswerOutcome::Incorrect
            );
        }
    }

    #[test]
    fn learner_struggles_above_skill() {
        let learner = SimulatedLearner::new(8.0, StdRng::seed_from_u64(2));
        assert!(learner.success_chance(Band::new(4)) > 0.9);
        assert!(learner.success_chance(Band::new(14)) < 0.1);
    }

    #[test]
    fn learner_is_reproducible() {
        let mut a = SimulatedLearner::new(6.0, StdRng::seed_from_u64(3));
        let mut b = SimulatedLearner::new(6.0, StdRng::seed_from_u64(3));
        for band in 1..=12 {
            assert_eq!(a.answer(Band::new(band)), b.answer(Band::new(band)));
        }
    }
}
