#![forbid(unsafe_code)]

mod cli;

use std::process::ExitCode;

use clap::Parser;
use serde_json::{Value, json};
use srs_core::due::DueItem;
use srs_core::model::{Card, CardKey, MemoryState, QuestionRef, UserId};
use srs_core::scheduler::schedule_review;
use srs_services::{ReviewResult, ReviewService, ReviewServiceError};
use srs_storage::repository::{Storage, StorageError};
use srs_storage::sqlite::SqliteInitError;
use thiserror::Error;

use crate::cli::{Cli, Command};

#[derive(Debug, Error)]
enum AppError {
    #[error("--user (or SRS_USER_ID) is required for this command")]
    MissingUser,
    #[error(transparent)]
    Card(#[from] srs_core::model::CardError),
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Review(#[from] ReviewServiceError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

fn require_user(user: Option<UserId>) -> Result<UserId, AppError> {
    user.ok_or(AppError::MissingUser)
}

fn review_json(result: &ReviewResult) -> Result<Value, AppError> {
    let mut value = serde_json::to_value(result.scheduled)?;
    if let Value::Object(map) = &mut value {
        map.insert("cardId".into(), json!(result.card.id()));
        map.insert("created".into(), json!(result.created));
    }
    Ok(value)
}

fn card_json(card: &Card) -> Value {
    json!({
        "cardId": card.id(),
        "question": card.key().question,
        "nextReviewDate": card.next_review_date(),
        "lastReviewedAt": card.last_reviewed_at(),
        "interval": card.memory().interval(),
        "easeFactor": card.memory().ease_factor(),
        "repetitions": card.memory().repetitions(),
    })
}

fn due_json(item: &DueItem) -> Value {
    match item {
        DueItem::Scheduled(card) => {
            let mut value = card_json(card);
            if let Value::Object(map) = &mut value {
                map.insert("status".into(), json!("scheduled"));
            }
            value
        }
        DueItem::Unseen(question) => json!({
            "status": "unseen",
            "question": question,
        }),
    }
}

async fn run(cli: Cli) -> Result<Value, AppError> {
    let clock = cli.clock();

    match cli.command {
        Command::Schedule {
            ease,
            interval,
            repetitions,
            rating,
        } => {
            let state = MemoryState::try_new(ease, interval, repetitions)?;
            let next = schedule_review(&state, rating, clock.now());
            Ok(serde_json::to_value(next)?)
        }
        Command::Review {
            exam,
            question,
            rating,
        } => {
            let user = require_user(cli.user)?;
            let storage = Storage::sqlite(&cli.database_url).await?;
            let service = ReviewService::new().with_clock(clock);
            let key = CardKey::new(user, exam, question);
            let result = service
                .review_persisted(key, rating, storage.cards.as_ref())
                .await?;
            review_json(&result)
        }
        Command::Due {
            exam,
            questions,
            limit,
        } => {
            let user = require_user(cli.user)?;
            let storage = Storage::sqlite(&cli.database_url).await?;
            let service = ReviewService::new().with_clock(clock);
            let candidates: Vec<QuestionRef> = exam
                .map(|exam| (0..questions).map(|i| QuestionRef::new(exam, i)).collect())
                .unwrap_or_default();
            let mut items = service
                .due_queue(user, candidates, storage.cards.as_ref())
                .await?;
            if let Some(limit) = limit {
                items.truncate(limit);
            }
            Ok(Value::Array(items.iter().map(due_json).collect()))
        }
        Command::Cards => {
            let user = require_user(cli.user)?;
            let storage = Storage::sqlite(&cli.database_url).await?;
            let cards = storage.cards.cards_for_user(user).await?;
            Ok(Value::Array(cards.iter().map(card_json).collect()))
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    log::debug!("using database {}", cli.database_url);

    match run(cli).await {
        Ok(output) => {
            println!("{output:#}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            log::error!("{err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
