use serde::{Deserialize, Serialize};

use crate::model::Band;

//
// ─── ANSWER OUTCOME ────────────────────────────────────────────────────────────
//

/// What the learner did with a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerOutcome {
    Correct,
    Incorrect,
    /// "I don't know": eases difficulty without counting as a miss.
    Skipped,
}

impl AnswerOutcome {
    /// Parse an outcome reported by a client. Unknown text yields `None`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "correct" => Some(Self::Correct),
            "incorrect" | "wrong" => Some(Self::Incorrect),
            "skipped" | "skip" | "dont_know" => Some(Self::Skipped),
            _ => None,
        }
    }

    /// `Some(true)` correct, `Some(false)` incorrect, `None` skipped.
    #[must_use]
    pub fn from_correctness(correct: Option<bool>) -> Self {
        match correct {
            Some(true) => Self::Correct,
            Some(false) => Self::Incorrect,
            None => Self::Skipped,
        }
    }

    /// Correctness for history and counters; skips have none.
    #[must_use]
    pub fn correctness(self) -> Option<bool> {
        match self {
            Self::Correct => Some(true),
            Self::Incorrect => Some(false),
            Self::Skipped => None,
        }
    }
}

//
// ─── SPEED ─────────────────────────────────────────────────────────────────────
//

/// Response speed bucket relative to the fast/slow thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeedTier {
    Fast,
    Normal,
    Slow,
}

impl SpeedTier {
    /// Negative times count as instant; NaN lands in `Normal`.
    #[must_use]
    pub fn classify(response_time_secs: f64, fast_secs: f64, slow_secs: f64) -> Self {
        let secs = if response_time_secs < 0.0 {
            0.0
        } else {
            response_time_secs
        };
        if secs < fast_secs {
            Self::Fast
        } else if secs > slow_secs {
            Self::Slow
        } else {
            Self::Normal
        }
    }

    /// Multiplier applied to a correct answer's level gain.
    #[must_use]
    pub fn factor(self) -> f64 {
        match self {
            Self::Fast => 1.0,
            Self::Normal => 0.75,
            Self::Slow => 0.5,
        }
    }

    /// Speed history score: 1 fast, 0.5 normal, 0 slow.
    #[must_use]
    pub fn score(self) -> f64 {
        match self {
            Self::Fast => 1.0,
            Self::Normal => 0.5,
            Self::Slow => 0.0,
        }
    }
}

/// One answered question as the session saw it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnsweredQuestion {
    pub band: Band,
    pub outcome: AnswerOutcome,
    pub response_time_secs: f64,
}
