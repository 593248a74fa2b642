use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, Utc};
use sqlx::Row;
use srs_core::model::{Card, CardKey, ExamId, QuestionRef, UserId};

use super::{
    SqliteRepository,
    mapping::{instant_to_micros, map_card_row, map_card_rows, question_index_to_i64},
};
use crate::repository::{CardRepository, StorageError};

const CARD_COLUMNS: &str = r"
    id, user_id, exam_id, question_index, ease_factor, interval_days,
    repetitions, next_review_date, last_reviewed_at, created_at
";

#[async_trait::async_trait]
impl CardRepository for SqliteRepository {
    async fn get_card(&self, key: &CardKey) -> Result<Option<Card>, StorageError> {
        let sql = format!(
            "SELECT {CARD_COLUMNS} FROM review_cards
             WHERE user_id = ?1 AND exam_id = ?2 AND question_index = ?3"
        );
        let row = sqlx::query(&sql)
            .bind(key.user_id.to_string())
            .bind(key.exam_id().to_string())
            .bind(question_index_to_i64(key.question_index()))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_card_row).transpose()
    }

    async fn upsert_card(&self, card: &Card) -> Result<(), StorageError> {
        let key = card.key();
        let memory = card.memory();

        sqlx::query(
            r"
            INSERT INTO review_cards (
                id, user_id, exam_id, question_index, ease_factor, interval_days,
                repetitions, next_review_date, last_reviewed_at, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT(user_id, exam_id, question_index) DO UPDATE SET
                -- last write wins; id and created_at stay from the first insert
                ease_factor = excluded.ease_factor,
                interval_days = excluded.interval_days,
                repetitions = excluded.repetitions,
                next_review_date = excluded.next_review_date,
                last_reviewed_at = excluded.last_reviewed_at
            ",
        )
        .bind(card.id().to_string())
        .bind(key.user_id.to_string())
        .bind(key.exam_id().to_string())
        .bind(question_index_to_i64(key.question_index()))
        .bind(memory.ease_factor())
        .bind(i64::from(memory.interval()))
        .bind(i64::from(memory.repetitions()))
        .bind(instant_to_micros(card.next_review_date()))
        .bind(card.last_reviewed_at().map(instant_to_micros))
        .bind(instant_to_micros(card.created_at()))
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn due_cards(
        &self,
        user: UserId,
        now: DateTime<Utc>,
    ) -> Result<Vec<Card>, StorageError> {
        let sql = format!(
            "SELECT {CARD_COLUMNS} FROM review_cards
             WHERE user_id = ?1 AND next_review_date <= ?2
             ORDER BY next_review_date ASC, exam_id ASC, question_index ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(user.to_string())
            .bind(instant_to_micros(now))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        map_card_rows(rows)
    }

    async fn cards_for_user(&self, user: UserId) -> Result<Vec<Card>, StorageError> {
        let sql = format!(
            "SELECT {CARD_COLUMNS} FROM review_cards
             WHERE user_id = ?1
             ORDER BY next_review_date ASC, exam_id ASC, question_index ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(user.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        map_card_rows(rows)
    }

    async fn reviewed_questions(
        &self,
        user: UserId,
        questions: &[QuestionRef],
    ) -> Result<Vec<QuestionRef>, StorageError> {
        let exams: BTreeSet<ExamId> = questions.iter().map(|q| q.exam_id).collect();

        let mut known = HashSet::new();
        for exam in &exams {
            // served by the UNIQUE (user_id, exam_id, question_index) index
            let rows = sqlx::query(
                "SELECT question_index FROM review_cards WHERE user_id = ?1 AND exam_id = ?2",
            )
            .bind(user.to_string())
            .bind(exam.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

            for row in rows {
                let index: i64 = row
                    .try_get("question_index")
                    .map_err(|e| StorageError::Serialization(e.to_string()))?;
                if let Ok(index) = u32::try_from(index) {
                    known.insert(QuestionRef::new(*exam, index));
                }
            }
        }

        Ok(questions
            .iter()
            .filter(|q| known.contains(q))
            .copied()
            .collect())
    }
}
