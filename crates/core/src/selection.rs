//! Band selection with logarithmic spaced-repetition fall-off, and the
//! fallback ladder used when candidates at the chosen band keep getting
//! rejected.

use rand::Rng;

use crate::config::SelectionConfig;
use crate::model::Band;

//
// ─── REVIEW DROP ───────────────────────────────────────────────────────────────
//

/// How far below the current level a single draw lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewDrop {
    /// Stay at the current level.
    None,
    /// Fixed number of bands below (1, 2 or 3).
    Below(u32),
    /// Deepest bucket; the exact drop is drawn from the deep range.
    Deep,
}

impl ReviewDrop {
    /// Bucket for a roll in `[0, 100)`. The rarest bucket sits at the bottom
    /// of the range so each shallower bucket stacks on top of it.
    #[must_use]
    pub fn for_roll(roll: f64, config: &SelectionConfig) -> Self {
        let mut ceiling = config.deep_below_pct;
        if roll < ceiling {
            return Self::Deep;
        }
        for (drop, pct) in [
            (3, config.three_below_pct),
            (2, config.two_below_pct),
            (1, config.one_below_pct),
        ] {
            ceiling += pct;
            if roll < ceiling {
                return Self::Below(drop);
            }
        }
        Self::None
    }
}

/// Pick the level a new question should be drawn from.
///
/// Most draws return `current_level`; the rest fall 1, 2, 3 or 4+ levels
/// below it with decaying probability, never below 1. At or below level 1
/// there is nothing to review and the level comes back unchanged.
pub fn select_band<R: Rng + ?Sized>(current_level: f64, config: &SelectionConfig, rng: &mut R) -> f64 {
    if current_level.is_nan() {
        return 1.0;
    }
    if current_level <= 1.0 {
        return current_level;
    }

    let roll = rng.random_range(0.0..100.0);
    let drop = match ReviewDrop::for_roll(roll, config) {
        ReviewDrop::None => return current_level,
        ReviewDrop::Below(levels) => f64::from(levels),
        ReviewDrop::Deep => {
            let extra = rng.random_range(0..=config.deep_max_drop.saturating_sub(config.deep_min_drop));
            f64::from(config.deep_min_drop + extra).min(current_level - 1.0)
        }
    };

    (current_level - drop).max(1.0)
}

//
// ─── FALLBACK LADDER ───────────────────────────────────────────────────────────
//

/// One rung of the candidate search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LadderStep {
    Requested(Band),
    OneUp(Band),
    OneDown(Band),
    /// Give up filtering and keep the last candidate generated.
    AcceptLast,
}

impl LadderStep {
    /// Band this rung generates from; `None` for `AcceptLast`.
    #[must_use]
    pub fn band(self) -> Option<Band> {
        match self {
            Self::Requested(band) | Self::OneUp(band) | Self::OneDown(band) => Some(band),
            Self::AcceptLast => None,
        }
    }
}

/// Rungs in the order they are tried: requested band, one up (capped at
/// `max_band`), one down (floored at 1), then accept whatever came last.
#[must_use]
pub fn fallback_ladder(requested: Band, max_band: u32) -> [LadderStep; 4] {
    [
        LadderStep::Requested(requested),
        LadderStep::OneUp(requested.up(max_band)),
        LadderStep::OneDown(requested.down()),
        LadderStep::AcceptLast,
    ]
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
