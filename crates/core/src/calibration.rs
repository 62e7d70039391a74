//! Placement search run before learning starts.
//!
//! The learner answers probes picked by bisecting a `[lower, upper]` level
//! range. Passing a probe raises the floor, anything else lowers the ceiling.
//! The search stops once the range is narrow and recent answers straddle the
//! boundary, or after a fixed number of probes.

use serde::{Deserialize, Serialize};

use crate::config::{CalibrationConfig, LevelConfig};
use crate::model::AnswerOutcome;

//
// ─── RESPONSES ─────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationResponse {
    Pass,
    Fail,
    Doubt,
}

impl CalibrationResponse {
    /// Classify an answered probe.
    ///
    /// A slow correct answer is only a doubt. A skip that ran past the
    /// timeout is treated as the probe going unanswered, which fails it.
    #[must_use]
    pub fn classify(outcome: AnswerOutcome, response_time_secs: f64, config: &CalibrationConfig) -> Self {
        match outcome {
            AnswerOutcome::Correct if response_time_secs <= config.pass_time_limit_secs => Self::Pass,
            AnswerOutcome::Correct => Self::Doubt,
            AnswerOutcome::Incorrect => Self::Fail,
            AnswerOutcome::Skipped if response_time_secs >= config.timeout_secs => Self::Fail,
            AnswerOutcome::Skipped => Self::Doubt,
        }
    }
}

/// One answered probe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationStep {
    pub probe: f64,
    pub response: CalibrationResponse,
    pub response_time_secs: f64,
}

/// What happens after a probe is answered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CalibrationProgress {
    /// Ask another probe at this level.
    Continue { next_probe: f64 },
    /// Search is over; learning starts at `level`.
    Placed { level: f64 },
}

//
// ─── SEARCH ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq)]
pub struct Calibration {
    config: CalibrationConfig,
    min_level: f64,
    max_level: f64,
    lower: f64,
    upper: f64,
    probe: f64,
    history: Vec<CalibrationStep>,
    placed: Option<f64>,
}

impl Calibration {
    #[must_use]
    pub fn new(config: CalibrationConfig, levels: &LevelConfig) -> Self {
        let lower = levels.min_level - 1.0;
        let upper = levels.max_level;
        Self {
            config,
            min_level: levels.min_level,
            max_level: levels.max_level,
            lower,
            upper,
            probe: half_step((lower + upper) / 2.0),
            history: Vec::new(),
            placed: None,
        }
    }

    /// Level of the probe currently being asked.
    #[must_use]
    pub fn probe(&self) -> f64 {
        self.probe
    }

    #[must_use]
    pub fn bounds(&self) -> (f64, f64) {
        (self.lower, self.upper)
    }

    #[must_use]
    pub fn history(&self) -> &[CalibrationStep] {
        &self.history
    }

    /// Starting level once the search has finished.
    #[must_use]
    pub fn placed_level(&self) -> Option<f64> {
        self.placed
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.placed.is_some()
    }

    /// Classify an answer to the current probe and advance the search.
    pub fn answer(&mut self, outcome: AnswerOutcome, response_time_secs: f64) -> CalibrationProgress {
        let response = CalibrationResponse::classify(outcome, response_time_secs, &self.config);
        self.respond(response, response_time_secs)
    }

    /// The current probe went unanswered for the whole timeout.
    pub fn time_out(&mut self) -> CalibrationProgress {
        self.respond(CalibrationResponse::Fail, self.config.timeout_secs)
    }

    /// Record a response to the current probe and advance the search.
    ///
    /// Once placed, further responses are ignored and the placement is returned again.
    pub fn respond(&mut self, response: CalibrationResponse, response_time_secs: f64) -> CalibrationProgress {
        if let Some(level) = self.placed {
            return CalibrationProgress::Placed { level };
        }

        self.history.push(CalibrationStep {
            probe: self.probe,
            response,
            response_time_secs,
        });
        match response {
            CalibrationResponse::Pass => self.lower = self.probe,
            CalibrationResponse::Fail | CalibrationResponse::Doubt => self.upper = self.probe,
        }

        if self.should_end() {
            let level = self.placement();
            self.placed = Some(level);
            CalibrationProgress::Placed { level }
        } else {
            self.probe = half_step((self.lower + self.upper) / 2.0);
            CalibrationProgress::Continue { next_probe: self.probe }
        }
    }

    /// Whether enough evidence has been gathered to place the learner.
    #[must_use]
    pub fn should_end(&self) -> bool {
        let cfg = &self.config;
        let answered = self.history.len();

        if answered >= cfg.max_responses {
            return true;
        }
        if answered < cfg.min_responses {
            return false;
        }
        if self.upper <= self.min_level || self.lower >= self.max_level - 1.0 {
            return true;
        }
        if self.upper - self.lower >= cfg.convergence_range {
            return false;
        }

        self.recent_straddles_boundary()
    }

    /// Level learning starts from, a little below the highest level passed.
    #[must_use]
    pub fn placement(&self) -> f64 {
        if self.upper <= self.min_level {
            self.min_level
        } else if self.lower >= self.max_level {
            self.max_level
        } else {
            (self.lower - self.config.placement_offset).max(self.min_level)
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn recent_straddles_boundary(&self) -> bool {
        let window = self.config.consistency_window;
        if window == 0 {
            return false;
        }
        let recent = &self.history[self.history.len().saturating_sub(window)..];

        let (mut passes, mut fails, mut doubts) = (0_usize, 0_usize, 0_usize);
        for step in recent {
            match step.response {
                CalibrationResponse::Pass => passes += 1,
                CalibrationResponse::Fail => fails += 1,
                CalibrationResponse::Doubt => doubts += 1,
            }
        }

        if passes == window || fails == window {
            return false;
        }
        if doubts as f64 > window as f64 / 2.0 {
            return false;
        }
        if passes == 0 || fails + doubts == 0 {
            return false;
        }

        let average = recent.iter().map(|step| step.probe).sum::<f64>() / recent.len() as f64;
        (self.lower..=self.upper).contains(&average)
    }
}

fn half_step(level: f64) -> f64 {
    (level * 2.0).round() / 2.0
}
