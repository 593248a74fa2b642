use std::collections::HashSet;

use chrono::{DateTime, Utc};

use srs_core::{
    due::{DueItem, select_due},
    model::{Card, CardId, CardKey, QuestionRef, ReviewRating, UserId},
    scheduler::ScheduledReview,
    time::Clock,
};
use srs_storage::repository::CardRepository;

use crate::error::ReviewServiceError;

//
// ─── REVIEW RESULT ─────────────────────────────────────────────────────────────
//

/// Card after a review, the schedule that produced it, and whether it was just created.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewResult {
    pub card: Card,
    pub scheduled: ScheduledReview,
    pub created: bool,
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Feeds ratings into the scheduler and hands the new card state to the store.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReviewService {
    clock: Clock,
}

impl ReviewService {
    /// Review service on the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the clock (usually for deterministic testing).
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Current time according to the service's clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Apply `rating` to the card stored under `key`, creating it if this is the first review.
    ///
    /// # Errors
    ///
    /// Returns `ReviewServiceError::KeyMismatch` if `existing` belongs to another key.
    pub fn review_card(
        &self,
        existing: Option<Card>,
        key: CardKey,
        rating: ReviewRating,
        reviewed_at: DateTime<Utc>,
    ) -> Result<ReviewResult, ReviewServiceError> {
        match existing {
            Some(mut card) => {
                if card.key() != key {
                    return Err(ReviewServiceError::KeyMismatch {
                        expected: key,
                        found: card.key(),
                    });
                }
                let scheduled = card.record_review(rating, reviewed_at);
                Ok(ReviewResult {
                    card,
                    scheduled,
                    created: false,
                })
            }
            None => {
                let card = Card::first_review(CardId::generate(), key, rating, reviewed_at);
                let scheduled = ScheduledReview {
                    memory: *card.memory(),
                    last_reviewed_at: reviewed_at,
                    next_review_date: card.next_review_date(),
                };
                Ok(ReviewResult {
                    card,
                    scheduled,
                    created: true,
                })
            }
        }
    }

    /// Load the current state for `key`, apply `rating` at the clock's now, and store the result.
    ///
    /// Nothing is written if loading fails; a failed write leaves the stored card unchanged.
    ///
    /// # Errors
    ///
    /// Returns storage errors from either the lookup or the write.
    pub async fn review_persisted(
        &self,
        key: CardKey,
        rating: ReviewRating,
        cards: &dyn CardRepository,
    ) -> Result<ReviewResult, ReviewServiceError> {
        let existing = cards.get_card(&key).await?;
        let result = self.review_card(existing, key, rating, self.now())?;
        cards.upsert_card(&result.card).await?;

        log::debug!(
            "reviewed {} q{} as {rating}: interval {}d, ease {:.2}, reps {}, next {}",
            key.exam_id(),
            key.question_index(),
            result.scheduled.interval(),
            result.scheduled.ease_factor(),
            result.scheduled.repetitions(),
            result.scheduled.next_review_date,
        );

        Ok(result)
    }

    /// The user's due set right now: due cards plus never-reviewed `candidates`.
    ///
    /// # Errors
    ///
    /// Returns storage errors from the due query or the candidate lookup.
    pub async fn due_queue(
        &self,
        user: UserId,
        candidates: impl IntoIterator<Item = QuestionRef> + Send,
        cards: &dyn CardRepository,
    ) -> Result<Vec<DueItem>, ReviewServiceError> {
        let now = self.now();
        let candidates: Vec<QuestionRef> = candidates.into_iter().collect();

        let due = cards.due_cards(user, now).await?;
        let reviewed: HashSet<QuestionRef> = cards
            .reviewed_questions(user, &candidates)
            .await?
            .into_iter()
            .collect();
        let unseen = candidates.into_iter().filter(|q| !reviewed.contains(q));

        Ok(select_due(user, due, unseen, now))
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
