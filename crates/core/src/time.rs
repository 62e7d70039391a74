use chrono::{DateTime, Duration, Utc};

/// Where "now" comes from for break cooldowns, answer timestamps and summaries.
///
/// A `Fixed` clock only moves when `advance` is called, so a test or a
/// simulation can walk a whole session forward without sleeping.
#[derive(Debug, Clone, Copy, Default)]
pub enum Clock {
    #[default]
    System,
    Fixed(DateTime<Utc>),
}

impl Clock {
    #[must_use]
    pub fn system() -> Self {
        Self::System
    }

    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at)
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::System => Utc::now(),
            Clock::Fixed(t) => *t,
        }
    }

    /// Move a fixed clock forward. The system clock ignores this.
    pub fn advance(&mut self, delta: Duration) {
        if let Clock::Fixed(t) = self {
            *t += delta;
        }
    }

    #[must_use]
    pub fn is_fixed(&self) -> bool {
        matches!(self, Clock::Fixed(_))
    }
}

/// Whole milliseconds from `earlier` to `now`, or `None` when nothing happened yet.
#[must_use]
pub fn millis_since(earlier: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Option<i64> {
    earlier.map(|at| now.signed_duration_since(at).num_milliseconds())
}

/// 2023-11-14T22:13:20Z, the instant every test session starts at.
pub const FIXED_TEST_TIMESTAMP: i64 = 1_700_000_000;

/// [`FIXED_TEST_TIMESTAMP`] as a `DateTime<Utc>`.
///
/// # Panics
///
/// Panics if the fixed timestamp cannot be represented.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(FIXED_TEST_TIMESTAMP, 0)
        .expect("fixed timestamp should be valid")
}

#[must_use]
pub fn fixed_clock() -> Clock {
    Clock::fixed(fixed_now())
}
