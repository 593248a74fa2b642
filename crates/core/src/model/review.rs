use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

/// Raised when a rating arriving from outside the engine is not one of the four levels.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReviewError {
    #[error("unrecognized review rating {0:?}; expected again, hard, good or easy")]
    InvalidRating(String),
    #[error("invalid review rating value: {0}")]
    InvalidRatingValue(u8),
}

//
// ─── REVIEW RATING ────────────────────────────────────────────────────────────
//

/// Four-level self-assessed recall quality for a single review.
///
/// The set is closed: ratings are parsed at the boundary with [`FromStr`] or
/// [`ReviewRating::from_u8`] and an unknown value is an error, never a default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewRating {
    /// Total failure. The card restarts its streak.
    Again,
    /// Recalled with difficulty.
    Hard,
    /// Recalled correctly.
    Good,
    /// Recalled effortlessly.
    Easy,
}

impl ReviewRating {
    pub const ALL: [ReviewRating; 4] = [Self::Again, Self::Hard, Self::Good, Self::Easy];

    /// Converts a numeric rating (0-3) to a `ReviewRating`.
    ///
    /// # Errors
    ///
    /// Returns `ReviewError::InvalidRatingValue` if the value is not in the range 0-3.
    pub fn from_u8(value: u8) -> Result<Self, ReviewError> {
        match value {
            0 => Ok(Self::Again),
            1 => Ok(Self::Hard),
            2 => Ok(Self::Good),
            3 => Ok(Self::Easy),
            _ => Err(ReviewError::InvalidRatingValue(value)),
        }
    }

    #[must_use]
    pub fn as_u8(self) -> u8 {
        match self {
            Self::Again => 0,
            Self::Hard => 1,
            Self::Good => 2,
            Self::Easy => 3,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Again => "again",
            Self::Hard => "hard",
            Self::Good => "good",
            Self::Easy => "easy",
        }
    }

    /// Only `Again` counts as a failed recall.
    #[must_use]
    pub fn is_failure(self) -> bool {
        matches!(self, Self::Again)
    }
}

impl fmt::Display for ReviewRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReviewRating {
    type Err = ReviewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|rating| rating.as_str() == normalized)
            .ok_or_else(|| ReviewError::InvalidRating(s.to_owned()))
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
