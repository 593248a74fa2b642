use std::sync::Arc;

use srs_core::model::{QuestionRef, ReviewRating, UserId};
use srs_storage::repository::CardRepository;

use super::progress::SessionProgress;
use super::service::{ReviewSession, SessionReview};
use crate::Clock;
use crate::error::SessionError;
use crate::review_service::ReviewService;

/// Result of answering a single item in a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionAnswerResult {
    pub review: SessionReview,
    pub progress: SessionProgress,
}

/// Starts sessions from the store's due set and persists every answer.
#[derive(Clone)]
pub struct ReviewSessionService {
    clock: Clock,
    cards: Arc<dyn CardRepository>,
    limit: Option<usize>,
}

impl ReviewSessionService {
    #[must_use]
    pub fn new(clock: Clock, cards: Arc<dyn CardRepository>) -> Self {
        Self {
            clock,
            cards,
            limit: None,
        }
    }

    /// Cap the number of items a session will present.
    #[must_use]
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    fn review_service(&self) -> ReviewService {
        ReviewService::new().with_clock(self.clock)
    }

    /// Snapshot the user's due set (including never-reviewed `candidates`) into a session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` when nothing is due, or storage errors.
    pub async fn start_session(
        &self,
        user: UserId,
        candidates: Vec<QuestionRef>,
    ) -> Result<ReviewSession, SessionError> {
        let review_service = self.review_service();
        let started_at = review_service.now();
        let items = review_service
            .due_queue(user, candidates, self.cards.as_ref())
            .await?;
        let session = ReviewSession::new(user, items, started_at, self.limit)?;

        let counts = session.due_counts();
        log::info!(
            "session started for {user}: {} items ({} due, {} unseen)",
            counts.total(),
            counts.scheduled,
            counts.unseen
        );
        Ok(session)
    }

    /// Answer the current item and persist the new card state.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` for review or persistence failures.
    pub async fn answer_current(
        &self,
        session: &mut ReviewSession,
        rating: ReviewRating,
    ) -> Result<SessionAnswerResult, SessionError> {
        let review_service = self.review_service();
        let review = session
            .answer_current_persisted(&review_service, rating, self.cards.as_ref())
            .await?
            .clone();

        if let Some(completed_at) = session.completed_at() {
            let tally = session.tally();
            let created = session.results().iter().filter(|r| r.result.created).count();
            log::info!(
                "session for {} complete in {}s: {} reviews ({created} new), again {} / hard {} / good {} / easy {}",
                session.user(),
                (completed_at - session.started_at()).num_seconds(),
                tally.total(),
                tally.again,
                tally.hard,
                tally.good,
                tally.easy
            );
        }

        Ok(SessionAnswerResult {
            review,
            progress: session.progress(),
        })
    }
}
