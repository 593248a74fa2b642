mod card;
mod ids;
mod review;

pub use card::{Card, CardError, MemoryState};
pub use ids::{CardId, CardKey, ExamId, ParseIdError, QuestionRef, UserId};
pub use review::{ReviewError, ReviewRating};
