use async_trait::async_trait;
use chrono::{DateTime, Utc};
use srs_core::due::due_order_key;
use srs_core::model::{Card, CardKey, QuestionRef, UserId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Persistence contract for spaced-repetition cards.
///
/// Writes are last-write-wins per [`CardKey`]: the first stored `id` and
/// `created_at` survive, every other field takes the latest written value.
#[async_trait]
pub trait CardRepository: Send + Sync {
    /// Fetch the card for a (user, exam, question) key, if the user has reviewed it.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn get_card(&self, key: &CardKey) -> Result<Option<Card>, StorageError>;

    /// Insert a card or overwrite the state of the card already stored under its key.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the card cannot be stored.
    async fn upsert_card(&self, card: &Card) -> Result<(), StorageError>;

    /// All of a user's cards with `next_review_date <= now`, oldest due first.
    ///
    /// Ties are broken by exam id then question index.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn due_cards(&self, user: UserId, now: DateTime<Utc>)
    -> Result<Vec<Card>, StorageError>;

    /// Every card a user owns, in the same order as `due_cards`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn cards_for_user(&self, user: UserId) -> Result<Vec<Card>, StorageError>;

    /// The subset of `questions` the user already has a card for, in input order.
    ///
    /// Answered by key lookups; adapters may batch them but never list the
    /// user's whole history.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn reviewed_questions(
        &self,
        user: UserId,
        questions: &[QuestionRef],
    ) -> Result<Vec<QuestionRef>, StorageError> {
        let mut reviewed = Vec::new();
        for question in questions {
            let key = CardKey::new(user, question.exam_id, question.question_index);
            if self.get_card(&key).await?.is_some() {
                reviewed.push(*question);
            }
        }
        Ok(reviewed)
    }
}

/// Merge an incoming write with whatever is stored under the same key.
pub(crate) fn merge_last_write(existing: Option<&Card>, incoming: &Card) -> Result<Card, StorageError> {
    let Some(existing) = existing else {
        return Ok(incoming.clone());
    };
    if existing.id() == incoming.id() && existing.created_at() == incoming.created_at() {
        return Ok(incoming.clone());
    }
    Card::from_persisted(
        existing.id(),
        incoming.key(),
        *incoming.memory(),
        incoming.next_review_date(),
        incoming.last_reviewed_at(),
        existing.created_at(),
    )
    .map_err(|e| StorageError::Serialization(e.to_string()))
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    cards: Arc<Mutex<HashMap<CardKey, Card>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn sorted_for_user(
        guard: &HashMap<CardKey, Card>,
        user: UserId,
        now: Option<DateTime<Utc>>,
    ) -> Vec<Card> {
        let mut out: Vec<Card> = guard
            .values()
            .filter(|c| c.key().user_id == user)
            .filter(|c| now.is_none_or(|t| c.is_due(t)))
            .cloned()
            .collect();
        out.sort_by_key(due_order_key);
        out
    }
}

#[async_trait]
impl CardRepository for InMemoryRepository {
    async fn get_card(&self, key: &CardKey) -> Result<Option<Card>, StorageError> {
        let guard = self
            .cards
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(key).cloned())
    }

    async fn upsert_card(&self, card: &Card) -> Result<(), StorageError> {
        let mut guard = self
            .cards
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let merged = merge_last_write(guard.get(&card.key()), card)?;
        guard.insert(card.key(), merged);
        Ok(())
    }

    async fn due_cards(
        &self,
        user: UserId,
        now: DateTime<Utc>,
    ) -> Result<Vec<Card>, StorageError> {
        let guard = self
            .cards
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(Self::sorted_for_user(&guard, user, Some(now)))
    }

    async fn cards_for_user(&self, user: UserId) -> Result<Vec<Card>, StorageError> {
        let guard = self
            .cards
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(Self::sorted_for_user(&guard, user, None))
    }

    async fn reviewed_questions(
        &self,
        user: UserId,
        questions: &[QuestionRef],
    ) -> Result<Vec<QuestionRef>, StorageError> {
        let guard = self
            .cards
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(questions
            .iter()
            .filter(|q| guard.contains_key(&CardKey::new(user, q.exam_id, q.question_index)))
            .copied()
            .collect())
    }
}

/// Explicit handle to the card store, passed to services instead of a global client.
#[derive(Clone)]
pub struct Storage {
    pub cards: Arc<dyn CardRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            cards: Arc::new(InMemoryRepository::new()),
        }
    }
}
