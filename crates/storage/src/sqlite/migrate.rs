use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

const CURRENT_VERSION: i64 = 1;

/// Apply every migration newer than the recorded schema version.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: review cards keyed by (user, exam, question).
    if !is_applied(pool, CURRENT_VERSION).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS review_cards (
                    id TEXT PRIMARY KEY,
                    user_id TEXT NOT NULL,
                    exam_id TEXT NOT NULL,
                    question_index INTEGER NOT NULL CHECK (question_index >= 0),
                    ease_factor REAL NOT NULL CHECK (ease_factor >= 1.3),
                    interval_days INTEGER NOT NULL CHECK (interval_days >= 0),
                    repetitions INTEGER NOT NULL CHECK (repetitions >= 0),
                    -- instants: microseconds since the Unix epoch
                    next_review_date INTEGER NOT NULL,
                    last_reviewed_at INTEGER,
                    created_at INTEGER NOT NULL,
                    UNIQUE (user_id, exam_id, question_index)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_review_cards_user_next_review
                    ON review_cards (user_id, next_review_date, exam_id, question_index);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(CURRENT_VERSION)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        log::info!("applied schema migration v{CURRENT_VERSION}");
    }

    Ok(())
}
