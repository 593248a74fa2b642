//! Due-set membership and ordering.
//!
//! A user's due set at time `T` holds every card of theirs with
//! `next_review_date <= T`, plus every candidate question they have never
//! reviewed. The order is a pure function of the inputs so a session built
//! from the same snapshot always presents items in the same order.

use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, Utc};

use crate::model::{Card, QuestionRef, UserId};

/// One entry of the due set.
#[derive(Debug, Clone, PartialEq)]
pub enum DueItem {
    /// An existing card whose review date has arrived.
    Scheduled(Card),
    /// A question the user has no card for yet; due by default.
    Unseen(QuestionRef),
}

impl DueItem {
    #[must_use]
    pub fn question(&self) -> QuestionRef {
        match self {
            DueItem::Scheduled(card) => card.key().question,
            DueItem::Unseen(question) => *question,
        }
    }

    #[must_use]
    pub fn card(&self) -> Option<&Card> {
        match self {
            DueItem::Scheduled(card) => Some(card),
            DueItem::Unseen(_) => None,
        }
    }

    #[must_use]
    pub fn is_unseen(&self) -> bool {
        matches!(self, DueItem::Unseen(_))
    }
}

/// How many scheduled and unseen items a due set contains.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DueCounts {
    pub scheduled: usize,
    pub unseen: usize,
}

impl DueCounts {
    #[must_use]
    pub fn of(items: &[DueItem]) -> Self {
        items.iter().fold(Self::default(), |mut acc, item| {
            if item.is_unseen() {
                acc.unseen += 1;
            } else {
                acc.scheduled += 1;
            }
            acc
        })
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.scheduled + self.unseen
    }
}

/// Sort key for scheduled cards: due date, then source question.
#[must_use]
pub fn due_order_key(card: &Card) -> (DateTime<Utc>, QuestionRef) {
    (card.next_review_date(), card.key().question)
}

/// Build the due set for `user` at `now`.
///
/// Cards belonging to other users are ignored. Scheduled cards come first,
/// ordered by [`due_order_key`]; unseen candidates follow in
/// `(exam_id, question_index)` order with duplicates collapsed.
pub fn select_due(
    user: UserId,
    cards: impl IntoIterator<Item = Card>,
    candidates: impl IntoIterator<Item = QuestionRef>,
    now: DateTime<Utc>,
) -> Vec<DueItem> {
    let mut known = HashSet::new();
    let mut scheduled = Vec::new();

    for card in cards.into_iter().filter(|c| c.key().user_id == user) {
        known.insert(card.key().question);
        if card.is_due(now) {
            scheduled.push(card);
        }
    }
    scheduled.sort_by_key(due_order_key);

    let unseen: BTreeSet<QuestionRef> = candidates
        .into_iter()
        .filter(|q| !known.contains(q))
        .collect();

    scheduled
        .into_iter()
        .map(DueItem::Scheduled)
        .chain(unseen.into_iter().map(DueItem::Unseen))
        .collect()
}
