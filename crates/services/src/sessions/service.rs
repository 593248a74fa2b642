use chrono::{DateTime, Utc};
use std::fmt;

use srs_core::due::{DueCounts, DueItem};
use srs_core::model::{CardKey, QuestionRef, ReviewRating, UserId};
use srs_storage::repository::CardRepository;

use super::progress::{SessionProgress, SessionTally};
use crate::error::SessionError;
use crate::review_service::{ReviewResult, ReviewService};

//
// ─── REVIEW RESULT WITH QUESTION ───────────────────────────────────────────────
//

/// Captures the outcome of reviewing one due item within a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionReview {
    pub question: QuestionRef,
    pub rating: ReviewRating,
    pub result: ReviewResult,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// A pass over one user's due set, taken as a snapshot when the session starts.
///
/// Items are presented in due-set order and each answer is fed through
/// `ReviewService`.
pub struct ReviewSession {
    user: UserId,
    items: Vec<DueItem>,
    current: usize,
    results: Vec<SessionReview>,
    tally: SessionTally,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl ReviewSession {
    /// Create a session over `items`, keeping at most `limit` of them.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` if there is nothing to review.
    pub fn new(
        user: UserId,
        mut items: Vec<DueItem>,
        started_at: DateTime<Utc>,
        limit: Option<usize>,
    ) -> Result<Self, SessionError> {
        if let Some(limit) = limit {
            items.truncate(limit);
        }

        if items.is_empty() {
            return Err(SessionError::Empty);
        }

        Ok(Self {
            user,
            items,
            current: 0,
            results: Vec::new(),
            tally: SessionTally::default(),
            started_at,
            completed_at: None,
        })
    }

    #[must_use]
    pub fn user(&self) -> UserId {
        self.user
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn results(&self) -> &[SessionReview] {
        &self.results
    }

    #[must_use]
    pub fn tally(&self) -> SessionTally {
        self.tally
    }

    #[must_use]
    pub fn due_counts(&self) -> DueCounts {
        DueCounts::of(&self.items)
    }

    #[must_use]
    pub fn total_items(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.items.len().saturating_sub(self.current)
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        SessionProgress {
            total: self.total_items(),
            answered: self.results.len(),
            remaining: self.remaining(),
            is_complete: self.is_complete(),
        }
    }

    #[must_use]
    pub fn current_item(&self) -> Option<&DueItem> {
        self.items.get(self.current)
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.completed_at.is_some()
    }

    fn current_key(&self) -> Result<CardKey, SessionError> {
        let item = self.current_item().ok_or(SessionError::Completed)?;
        let question = item.question();
        Ok(CardKey::new(
            self.user,
            question.exam_id,
            question.question_index,
        ))
    }

    /// Apply a rating to the current item using the snapshot state, without storage.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` if the session is already finished.
    pub fn answer_current(
        &mut self,
        review_service: &ReviewService,
        rating: ReviewRating,
        reviewed_at: DateTime<Utc>,
    ) -> Result<&SessionReview, SessionError> {
        let key = self.current_key()?;
        let snapshot = self.current_item().and_then(DueItem::card).cloned();
        let result = review_service.review_card(snapshot, key, rating, reviewed_at)?;
        self.record(key.question, rating, result, reviewed_at)
    }

    /// Apply a rating to the current item against the store's latest state and persist it.
    ///
    /// On error the session does not advance.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` if the session is already finished, or the
    /// underlying review/storage error.
    pub async fn answer_current_persisted(
        &mut self,
        review_service: &ReviewService,
        rating: ReviewRating,
        cards: &dyn CardRepository,
    ) -> Result<&SessionReview, SessionError> {
        let key = self.current_key()?;
        let result = review_service.review_persisted(key, rating, cards).await?;
        let reviewed_at = result.scheduled.last_reviewed_at;
        self.record(key.question, rating, result, reviewed_at)
    }

    fn record(
        &mut self,
        question: QuestionRef,
        rating: ReviewRating,
        result: ReviewResult,
        reviewed_at: DateTime<Utc>,
    ) -> Result<&SessionReview, SessionError> {
        self.tally.record(rating);
        self.results.push(SessionReview {
            question,
            rating,
            result,
        });

        self.current += 1;
        if self.current >= self.items.len() {
            self.completed_at = Some(reviewed_at);
        }

        self.results.last().ok_or(SessionError::Completed)
    }
}

impl fmt::Debug for ReviewSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReviewSession")
            .field("user", &self.user)
            .field("items_len", &self.items.len())
            .field("current", &self.current)
            .field("tally", &self.tally)
            .field("started_at", &self.started_at)
            .field("completed_at", &self.completed_at)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
