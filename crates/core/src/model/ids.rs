use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Error type for parsing an ID from string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    kind: &'static str,
    raw: String,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {} from {:?}", self.kind, self.raw)
    }
}

impl std::error::Error for ParseIdError {}

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            #[must_use]
            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Mints a fresh random identifier.
            #[must_use]
            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }

            #[must_use]
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim())
                    .map(Self)
                    .map_err(|_| ParseIdError {
                        kind: stringify!($name),
                        raw: s.to_owned(),
                    })
            }
        }
    };
}

uuid_id!(
    /// Opaque identifier of a spaced-repetition card.
    CardId
);
uuid_id!(
    /// Identifier of the user a card belongs to.
    UserId
);
uuid_id!(
    /// Identifier of the exam a card's question comes from.
    ExamId
);

/// The source item a card is about: one question inside one exam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRef {
    pub exam_id: ExamId,
    pub question_index: u32,
}

impl QuestionRef {
    #[must_use]
    pub fn new(exam_id: ExamId, question_index: u32) -> Self {
        Self {
            exam_id,
            question_index,
        }
    }
}

/// Unique (user, exam, question index) triple. At most one card exists per key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardKey {
    pub user_id: UserId,
    pub question: QuestionRef,
}

impl CardKey {
    #[must_use]
    pub fn new(user_id: UserId, exam_id: ExamId, question_index: u32) -> Self {
        Self {
            user_id,
            question: QuestionRef::new(exam_id, question_index),
        }
    }

    #[must_use]
    pub fn exam_id(&self) -> ExamId {
        self.question.exam_id
    }

    #[must_use]
    pub fn question_index(&self) -> u32 {
        self.question.question_index
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────
