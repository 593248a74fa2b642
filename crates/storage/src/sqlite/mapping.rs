use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::Row;
use srs_core::model::{Card, CardId, CardKey, ExamId, MemoryState, UserId};

use crate::repository::StorageError;

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn parse_id<T>(row: &sqlx::sqlite::SqliteRow, column: &'static str) -> Result<T, StorageError>
where
    T: FromStr,
    T::Err: core::fmt::Display,
{
    let raw: String = row.try_get(column).map_err(ser)?;
    raw.parse::<T>().map_err(ser)
}

pub(crate) fn question_index_to_i64(index: u32) -> i64 {
    i64::from(index)
}

/// Instants are stored as microseconds since the Unix epoch; integer order
/// matches `DateTime` order over chrono's whole range.
pub(crate) fn instant_to_micros(at: DateTime<Utc>) -> i64 {
    at.timestamp_micros()
}

fn instant_from_micros(raw: i64, column: &'static str) -> Result<DateTime<Utc>, StorageError> {
    DateTime::from_timestamp_micros(raw)
        .ok_or_else(|| StorageError::Serialization(format!("invalid {column}: {raw}")))
}

fn instant(row: &sqlx::sqlite::SqliteRow, column: &'static str) -> Result<DateTime<Utc>, StorageError> {
    let raw: i64 = row.try_get(column).map_err(ser)?;
    instant_from_micros(raw, column)
}

pub(crate) fn map_card_row(row: &sqlx::sqlite::SqliteRow) -> Result<Card, StorageError> {
    let index_i64: i64 = row.try_get("question_index").map_err(ser)?;
    let question_index = u32::try_from(index_i64)
        .map_err(|_| StorageError::Serialization(format!("invalid question_index: {index_i64}")))?;

    let key = CardKey::new(
        parse_id::<UserId>(row, "user_id")?,
        parse_id::<ExamId>(row, "exam_id")?,
        question_index,
    );

    let memory = MemoryState::try_new(
        row.try_get::<f64, _>("ease_factor").map_err(ser)?,
        row.try_get::<i64, _>("interval_days").map_err(ser)?,
        row.try_get::<i64, _>("repetitions").map_err(ser)?,
    )
    .map_err(ser)?;

    let next_review_date = instant(row, "next_review_date")?;
    let last_reviewed_at = row
        .try_get::<Option<i64>, _>("last_reviewed_at")
        .map_err(ser)?
        .map(|raw| instant_from_micros(raw, "last_reviewed_at"))
        .transpose()?;
    let created_at = instant(row, "created_at")?;

    Card::from_persisted(
        parse_id::<CardId>(row, "id")?,
        key,
        memory,
        next_review_date,
        last_reviewed_at,
        created_at,
    )
    .map_err(ser)
}

pub(crate) fn map_card_rows(rows: Vec<sqlx::sqlite::SqliteRow>) -> Result<Vec<Card>, StorageError> {
    let mut cards = Vec::with_capacity(rows.len());
    for row in rows {
        match map_card_row(&row) {
            Ok(card) => cards.push(card),
            Err(err) => {
                log::warn!("rejecting stored review card: {err}");
                return Err(err);
            }
        }
    }
    Ok(cards)
}
