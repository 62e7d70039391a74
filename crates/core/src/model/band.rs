use serde::{Deserialize, Serialize};
use std::fmt;

/// Integer difficulty tier handed to the question source.
///
/// Bands start at 1; anything lower is lifted to 1.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Band(u32);

impl Band {
    #[must_use]
    pub fn new(value: u32) -> Self {
        Self(value.max(1))
    }

    /// Band for a continuous level: nearest integer, halves rounding up.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_level(level: f64) -> Self {
        if !level.is_finite() || level < 1.0 {
            return Self(1);
        }
        Self::new(level.round() as u32)
    }

    #[must_use]
    pub fn value(self) -> u32 {
        self.0
    }

    #[must_use]
    pub fn as_level(self) -> f64 {
        f64::from(self.0)
    }

    /// Next band up, never past `max`.
    #[must_use]
    pub fn up(self, max: u32) -> Self {
        Self::new(self.0.saturating_add(1).min(max.max(1)))
    }

    /// Next band down, never below 1.
    #[must_use]
    pub fn down(self) -> Self {
        Self::new(self.0.saturating_sub(1))
    }
}

impl fmt::Debug for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Band({})", self.0)
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
