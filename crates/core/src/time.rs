use chrono::{DateTime, Duration, TimeZone, Utc};

/// Source of "now" for services. The scheduler itself never reads a clock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Clock {
    /// Wall-clock time.
    #[default]
    System,
    /// A frozen instant, for tests and replay.
    Frozen(DateTime<Utc>),
}

impl Clock {
    #[must_use]
    pub fn frozen_at(at: DateTime<Utc>) -> Self {
        Self::Frozen(at)
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::System => Utc::now(),
            Clock::Frozen(at) => *at,
        }
    }

    /// Move a frozen clock forward by whole days. No-op on the system clock.
    pub fn advance_days(&mut self, days: i64) {
        if let Clock::Frozen(at) = self {
            *at += Duration::days(days);
        }
    }

    #[must_use]
    pub fn is_frozen(&self) -> bool {
        matches!(self, Clock::Frozen(_))
    }
}

/// Deterministic instant used by tests and doc examples: 2024-01-01T00:00:00Z.
///
/// # Panics
///
/// Never in practice; the date is a valid constant.
#[must_use]
pub fn reference_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .expect("2024-01-01 is a valid UTC instant")
}

#[must_use]
pub fn frozen_clock() -> Clock {
    Clock::frozen_at(reference_now())
}
