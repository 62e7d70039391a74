//! Tunable constants for the practice engine.
//!
//! Every threshold the controller consults lives here rather than inline. The
//! defaults reproduce the production drill; a deployment can override any
//! subset from TOML:
//!
//! ```toml
//! [levels]
//! max_level = 10.0
//!
//! [breaks]
//! cooldown_ms = 600000
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("level bounds must be finite with 1 <= min < max, got [{min}, {max}]")]
    InvalidLevelBounds { min: f64, max: f64 },

    #[error("start level {start} is outside [{min}, {max}]")]
    StartLevelOutOfRange { start: f64, min: f64, max: f64 },

    #[error("{field} must be positive and finite, got {value}")]
    NonPositive { field: &'static str, value: f64 },

    #[error("{field} must be negative and finite, got {value}")]
    NonNegativeDrop { field: &'static str, value: f64 },

    #[error("fast threshold ({fast}s) must be below slow threshold ({slow}s)")]
    InvalidSpeedThresholds { fast: f64, slow: f64 },

    #[error("review percentages must be non-negative and sum below 100, got {total}")]
    InvalidReviewWeights { total: f64 },

    #[error("deep review drop range must satisfy 1 <= min <= max, got {min}..={max}")]
    InvalidDeepDrop { min: u32, max: u32 },

    #[error("{field} must be > 0")]
    Zero { field: &'static str },

    #[error("break score threshold must be within 0..=100, got {0}")]
    InvalidScoreThreshold(f64),

    #[error("{field} must be a percentage within 0..=100, got {value}")]
    InvalidPercent { field: &'static str, value: f64 },

    #[error("calibration needs min_responses <= max_responses, got {min} > {max}")]
    InvalidCalibrationResponses { min: usize, max: usize },

    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

//
// ─── SECTIONS ──────────────────────────────────────────────────────────────────
//

/// Bounds of the continuous skill level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelConfig {
    pub min_level: f64,
    pub max_level: f64,
    /// Level a fresh session starts from before calibration moves it.
    pub start_level: f64,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            min_level: 1.0,
            max_level: 24.0,
            start_level: 5.0,
        }
    }
}

impl LevelConfig {
    /// Clamp `value` into the configured bounds. Non-finite values collapse to the floor.
    #[must_use]
    pub fn clamp(&self, value: f64) -> f64 {
        if value.is_finite() {
            value.clamp(self.min_level, self.max_level)
        } else {
            self.min_level
        }
    }

    /// Highest band a question source is asked for.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn max_band(&self) -> u32 {
        self.max_level.round().max(1.0) as u32
    }
}

/// Constants of the answer scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub base_delta: f64,
    pub turbo_delta: f64,
    /// Streak length at which `turbo_delta` replaces `base_delta`.
    pub turbo_streak: u32,
    pub fast_threshold_secs: f64,
    pub slow_threshold_secs: f64,
    pub skip_delta: f64,
    /// Miss right after a correct answer.
    pub first_miss_delta: f64,
    /// Miss with no streak to protect.
    pub repeat_miss_delta: f64,
    /// `level - band` above which a question counts as review material.
    pub review_threshold: f64,
    pub review_bonus_base: f64,
    pub review_bonus_per_level: f64,
    pub review_bonus_cap: f64,
    pub review_penalty_min_difference: f64,
    pub review_penalty_per_level: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            base_delta: 0.2,
            turbo_delta: 0.4,
            turbo_streak: 3,
            fast_threshold_secs: 8.0,
            slow_threshold_secs: 20.0,
            skip_delta: -0.3,
            first_miss_delta: -0.3,
            repeat_miss_delta: -0.8,
            review_threshold: 0.5,
            review_bonus_base: 1.2,
            review_bonus_per_level: 0.1,
            review_bonus_cap: 0.3,
            review_penalty_min_difference: 2.0,
            review_penalty_per_level: 0.2,
        }
    }
}

/// Spaced-repetition fall-off and anti-repetition limits.
///
/// The percentages are the share of draws that fall 1, 2, 3 and 4+ bands
/// below the current level; whatever is left stays at the current level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    pub one_below_pct: f64,
    pub two_below_pct: f64,
    pub three_below_pct: f64,
    pub deep_below_pct: f64,
    pub deep_min_drop: u32,
    pub deep_max_drop: u32,
    /// Candidates generated per ladder rung before moving on.
    pub max_attempts: u32,
    /// How many questions back a miss still counts as recent.
    pub recent_miss_window: u64,
    /// Every n-th learning question asks for reasoning. `0` turns this off.
    pub why_every: u32,
    /// Chance of a habit-fixing question once a mistake keeps recurring.
    pub fixing_habits_pct: f64,
    /// Tagged mistakes of one kind before habit-fixing questions start.
    pub fixing_habits_min_errors: u32,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            one_below_pct: 10.0,
            two_below_pct: 5.0,
            three_below_pct: 2.0,
            deep_below_pct: 1.0,
            deep_min_drop: 4,
            deep_max_drop: 5,
            max_attempts: 10,
            recent_miss_window: 5,
            why_every: 3,
            fixing_habits_pct: 15.0,
            fixing_habits_min_errors: 2,
        }
    }
}

impl SelectionConfig {
    #[must_use]
    pub fn review_total_pct(&self) -> f64 {
        self.one_below_pct + self.two_below_pct + self.three_below_pct + self.deep_below_pct
    }
}

/// Break-suggestion heuristics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakConfig {
    pub recent_window: usize,
    pub min_samples: usize,
    pub session_min_minutes: f64,
    pub score_threshold_pct: f64,
    pub rapid_window: usize,
    pub rapid_max_correct: usize,
    pub cooldown_ms: i64,
}

impl Default for BreakConfig {
    fn default() -> Self {
        Self {
            recent_window: 10,
            min_samples: 5,
            session_min_minutes: 25.0,
            score_threshold_pct: 40.0,
            rapid_window: 5,
            rapid_max_correct: 1,
            cooldown_ms: 15 * 60 * 1000,
        }
    }
}

/// Placement search run before learning starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    pub min_responses: usize,
    pub max_responses: usize,
    pub convergence_range: f64,
    pub consistency_window: usize,
    /// Unanswered probes are failed after this many seconds.
    pub timeout_secs: f64,
    /// A correct answer slower than this only counts as doubt.
    pub pass_time_limit_secs: f64,
    /// How far below the found level learning starts.
    pub placement_offset: f64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            min_responses: 4,
            max_responses: 6,
            convergence_range: 2.0,
            consistency_window: 3,
            timeout_secs: 15.0,
            pass_time_limit_secs: 20.0,
            placement_offset: 1.0,
        }
    }
}

//
// ─── ENGINE CONFIG ─────────────────────────────────────────────────────────────
//

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub levels: LevelConfig,
    pub scoring: ScoringConfig,
    pub selection: SelectionConfig,
    pub breaks: BreakConfig,
    pub calibration: CalibrationConfig,
}

impl EngineConfig {
    /// Parse and validate a TOML document. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for malformed TOML and any validation error.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` if the file cannot be read, otherwise as
    /// [`EngineConfig::from_toml_str`].
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Check every section for values the controller cannot work with.
    ///
    /// # Errors
    ///
    /// Returns the first `ConfigError` found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let levels = &self.levels;
        if !levels.min_level.is_finite()
            || !levels.max_level.is_finite()
            || levels.min_level < 1.0
            || levels.min_level >= levels.max_level
        {
            return Err(ConfigError::InvalidLevelBounds {
                min: levels.min_level,
                max: levels.max_level,
            });
        }
        if !(levels.min_level..=levels.max_level).contains(&levels.start_level) {
            return Err(ConfigError::StartLevelOutOfRange {
                start: levels.start_level,
                min: levels.min_level,
                max: levels.max_level,
            });
        }

        let scoring = &self.scoring;
        for (field, value) in [
            ("base_delta", scoring.base_delta),
            ("turbo_delta", scoring.turbo_delta),
            ("fast_threshold_secs", scoring.fast_threshold_secs),
            ("review_bonus_base", scoring.review_bonus_base),
        ] {
            require_positive(field, value)?;
        }
        for (field, value) in [
            ("skip_delta", scoring.skip_delta),
            ("first_miss_delta", scoring.first_miss_delta),
            ("repeat_miss_delta", scoring.repeat_miss_delta),
        ] {
            if !value.is_finite() || value >= 0.0 {
                return Err(ConfigError::NonNegativeDrop { field, value });
            }
        }
        if scoring.fast_threshold_secs >= scoring.slow_threshold_secs {
            return Err(ConfigError::InvalidSpeedThresholds {
                fast: scoring.fast_threshold_secs,
                slow: scoring.slow_threshold_secs,
            });
        }
        if scoring.turbo_streak == 0 {
            return Err(ConfigError::Zero {
                field: "turbo_streak",
            });
        }

        let selection = &self.selection;
        let total = selection.review_total_pct();
        let any_negative = [
            selection.one_below_pct,
            selection.two_below_pct,
            selection.three_below_pct,
            selection.deep_below_pct,
        ]
        .iter()
        .any(|pct| !pct.is_finite() || *pct < 0.0);
        if any_negative || total >= 100.0 {
            return Err(ConfigError::InvalidReviewWeights { total });
        }
        if selection.deep_min_drop == 0 || selection.deep_min_drop > selection.deep_max_drop {
            return Err(ConfigError::InvalidDeepDrop {
                min: selection.deep_min_drop,
                max: selection.deep_max_drop,
            });
        }
        if selection.max_attempts == 0 {
            return Err(ConfigError::Zero {
                field: "max_attempts",
            });
        }
        if !(0.0..=100.0).contains(&selection.fixing_habits_pct) {
            return Err(ConfigError::InvalidPercent {
                field: "fixing_habits_pct",
                value: selection.fixing_habits_pct,
            });
        }
        if selection.fixing_habits_min_errors == 0 {
            return Err(ConfigError::Zero {
                field: "fixing_habits_min_errors",
            });
        }

        let breaks = &self.breaks;
        if breaks.recent_window == 0 {
            return Err(ConfigError::Zero {
                field: "recent_window",
            });
        }
        if breaks.rapid_window == 0 {
            return Err(ConfigError::Zero {
                field: "rapid_window",
            });
        }
        if !(0.0..=100.0).contains(&breaks.score_threshold_pct) {
            return Err(ConfigError::InvalidScoreThreshold(
                breaks.score_threshold_pct,
            ));
        }
        if breaks.cooldown_ms < 0 {
            return Err(ConfigError::NonPositive {
                field: "cooldown_ms",
                value: breaks.cooldown_ms as f64,
            });
        }

        let calibration = &self.calibration;
        if calibration.min_responses > calibration.max_responses {
            return Err(ConfigError::InvalidCalibrationResponses {
                min: calibration.min_responses,
                max: calibration.max_responses,
            });
        }
        if calibration.max_responses == 0 {
            return Err(ConfigError::Zero {
                field: "max_responses",
            });
        }
        if calibration.consistency_window == 0 {
            return Err(ConfigError::Zero {
                field: "consistency_window",
            });
        }
        require_positive("timeout_secs", calibration.timeout_secs)?;
        require_positive("pass_time_limit_secs", calibration.pass_time_limit_secs)?;
        require_positive("convergence_range", calibration.convergence_range)?;

        Ok(())
    }
}

fn require_positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { field, value })
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
