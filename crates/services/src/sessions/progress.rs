use srs_core::model::ReviewRating;

/// Aggregated view of session progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionProgress {
    pub total: usize,
    pub answered: usize,
    pub remaining: usize,
    pub is_complete: bool,
}

/// How many times each rating was given during a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionTally {
    pub again: u32,
    pub hard: u32,
    pub good: u32,
    pub easy: u32,
}

impl SessionTally {
    pub fn record(&mut self, rating: ReviewRating) {
        let slot = match rating {
            ReviewRating::Again => &mut self.again,
            ReviewRating::Hard => &mut self.hard,
            ReviewRating::Good => &mut self.good,
            ReviewRating::Easy => &mut self.easy,
        };
        *slot = slot.saturating_add(1);
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.again + self.hard + self.good + self.easy
    }

    /// Share of reviews that were not `Again`, or `None` before any review.
    #[must_use]
    pub fn recall_rate(&self) -> Option<f64> {
        let total = self.total();
        (total > 0).then(|| f64::from(total - self.again) / f64::from(total))
    }
}
