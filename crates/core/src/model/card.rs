use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{CardId, CardKey};
use crate::model::review::ReviewRating;
use crate::scheduler::{INITIAL_EASE_FACTOR, MIN_EASE_FACTOR, ScheduledReview, schedule_review};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum CardError {
    #[error("ease factor must be finite, got {0}")]
    NonFiniteEase(f64),

    #[error("invalid persisted card state: {0}")]
    InvalidPersistedState(String),
}

//
// ─── MEMORY STATE ──────────────────────────────────────────────────────────────
//

/// Memory-strength state of a card: the only input the scheduler reads from it.
///
/// Values are normalized on construction, so a `MemoryState` always satisfies
/// `ease_factor >= 1.3`. The default is the state of a never-reviewed card.
///
/// ```
/// # use srs_core::model::MemoryState;
/// let state = MemoryState::try_new(1.1, -4, 2)?;
/// assert_eq!(state.ease_factor(), 1.3);
/// assert_eq!(state.interval(), 0);
/// # Ok::<(), srs_core::model::CardError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawMemoryState", rename_all = "camelCase")]
pub struct MemoryState {
    ease_factor: f64,
    interval: u32,
    repetitions: u32,
}

impl MemoryState {
    /// Validate externally supplied state.
    ///
    /// Ease below the floor is clamped up; negative interval or repetitions are read as 0.
    ///
    /// # Errors
    ///
    /// Returns `CardError::NonFiniteEase` for NaN or infinite ease factors.
    pub fn try_new(ease_factor: f64, interval: i64, repetitions: i64) -> Result<Self, CardError> {
        if !ease_factor.is_finite() {
            return Err(CardError::NonFiniteEase(ease_factor));
        }
        Ok(Self {
            ease_factor: ease_factor.max(MIN_EASE_FACTOR),
            interval: non_negative_u32(interval),
            repetitions: non_negative_u32(repetitions),
        })
    }

    /// Like [`MemoryState::try_new`], filling missing fields with the unseen defaults.
    ///
    /// # Errors
    ///
    /// Returns `CardError::NonFiniteEase` for NaN or infinite ease factors.
    pub fn from_optional(
        ease_factor: Option<f64>,
        interval: Option<i64>,
        repetitions: Option<i64>,
    ) -> Result<Self, CardError> {
        Self::try_new(
            ease_factor.unwrap_or(INITIAL_EASE_FACTOR),
            interval.unwrap_or(0),
            repetitions.unwrap_or(0),
        )
    }

    /// Trusted constructor for values the scheduler has already bounded.
    pub(crate) fn from_parts(ease_factor: f64, interval: u32, repetitions: u32) -> Self {
        Self {
            ease_factor,
            interval,
            repetitions,
        }
    }

    #[must_use]
    pub fn ease_factor(&self) -> f64 {
        self.ease_factor
    }

    /// Days between the latest review and the next one.
    #[must_use]
    pub fn interval(&self) -> u32 {
        self.interval
    }

    #[must_use]
    pub fn repetitions(&self) -> u32 {
        self.repetitions
    }
}

impl Default for MemoryState {
    fn default() -> Self {
        Self::from_parts(INITIAL_EASE_FACTOR, 0, 0)
    }
}

fn non_negative_u32(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMemoryState {
    ease_factor: Option<f64>,
    interval: Option<i64>,
    repetitions: Option<i64>,
}

impl TryFrom<RawMemoryState> for MemoryState {
    type Error = CardError;

    fn try_from(raw: RawMemoryState) -> Result<Self, Self::Error> {
        Self::from_optional(raw.ease_factor, raw.interval, raw.repetitions)
    }
}

//
// ─── CARD ──────────────────────────────────────────────────────────────────────
//

/// A schedulable unit of recall for one user and one exam question.
///
/// Cards are created lazily by the first review of their key and afterwards
/// only change through [`Card::record_review`].
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    id: CardId,
    key: CardKey,
    memory: MemoryState,
    next_review_date: DateTime<Utc>,
    last_reviewed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl Card {
    /// Create the card for `key` by applying its very first review.
    #[must_use]
    pub fn first_review(
        id: CardId,
        key: CardKey,
        rating: ReviewRating,
        reviewed_at: DateTime<Utc>,
    ) -> Self {
        let scheduled = schedule_review(&MemoryState::default(), rating, reviewed_at);
        Self {
            id,
            key,
            memory: scheduled.memory,
            next_review_date: scheduled.next_review_date,
            last_reviewed_at: Some(scheduled.last_reviewed_at),
            created_at: reviewed_at,
        }
    }

    /// Rehydrate a card from storage.
    ///
    /// # Errors
    ///
    /// Returns `CardError::InvalidPersistedState` if the next review date precedes the
    /// last review.
    pub fn from_persisted(
        id: CardId,
        key: CardKey,
        memory: MemoryState,
        next_review_date: DateTime<Utc>,
        last_reviewed_at: Option<DateTime<Utc>>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, CardError> {
        if let Some(last) = last_reviewed_at {
            if next_review_date < last {
                return Err(CardError::InvalidPersistedState(format!(
                    "next review {next_review_date} is before last review {last}"
                )));
            }
        }

        Ok(Self {
            id,
            key,
            memory,
            next_review_date,
            last_reviewed_at,
            created_at,
        })
    }

    /// Apply a rating at `reviewed_at` and return the schedule that was stored.
    pub fn record_review(
        &mut self,
        rating: ReviewRating,
        reviewed_at: DateTime<Utc>,
    ) -> ScheduledReview {
        let scheduled = schedule_review(&self.memory, rating, reviewed_at);
        self.memory = scheduled.memory;
        self.next_review_date = scheduled.next_review_date;
        self.last_reviewed_at = Some(scheduled.last_reviewed_at);
        scheduled
    }

    /// A card is due once its next review date has arrived.
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_review_date <= now
    }

    #[must_use]
    pub fn id(&self) -> CardId {
        self.id
    }

    #[must_use]
    pub fn key(&self) -> CardKey {
        self.key
    }

    #[must_use]
    pub fn memory(&self) -> &MemoryState {
        &self.memory
    }

    #[must_use]
    pub fn next_review_date(&self) -> DateTime<Utc> {
        self.next_review_date
    }

    #[must_use]
    pub fn last_reviewed_at(&self) -> Option<DateTime<Utc>> {
        self.last_reviewed_at
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
