use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use srs_core::Clock;
use srs_core::model::{ExamId, ReviewRating, UserId};

pub const DEFAULT_DATABASE_URL: &str = "sqlite://srs.db?mode=rwc";

#[derive(Debug, Parser)]
#[command(version, about = "Spaced-repetition scheduling for exam questions", long_about = None)]
pub struct Cli {
    /// SQLite database holding review cards.
    #[arg(long, env = "SRS_DATABASE_URL", default_value = DEFAULT_DATABASE_URL, global = true)]
    pub database_url: String,

    /// Reviewer whose cards are read and written.
    #[arg(long, env = "SRS_USER_ID", global = true)]
    pub user: Option<UserId>,

    /// Pretend the current time is this RFC 3339 instant.
    #[arg(long, global = true)]
    pub now: Option<DateTime<Utc>>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    #[must_use]
    pub fn clock(&self) -> Clock {
        self.now.map_or(Clock::System, Clock::frozen_at)
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Compute the next state for a card without touching storage.
    Schedule {
        /// Current ease factor.
        #[arg(long, default_value_t = srs_core::scheduler::INITIAL_EASE_FACTOR)]
        ease: f64,
        /// Current interval in days. Negative values are read as 0.
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        interval: i64,
        /// Consecutive successful reviews so far.
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        repetitions: i64,
        /// again, hard, good or easy.
        #[arg(long)]
        rating: ReviewRating,
    },
    /// Record a review of one exam question and print the new card state.
    Review {
        #[arg(long)]
        exam: ExamId,
        /// Zero-based question index within the exam.
        #[arg(long)]
        question: u32,
        /// again, hard, good or easy.
        #[arg(long)]
        rating: ReviewRating,
    },
    /// List what is due for review.
    Due {
        /// Exam whose questions count as candidates for first review.
        #[arg(long)]
        exam: Option<ExamId>,
        /// Number of questions in that exam.
        #[arg(long, default_value_t = 0, requires = "exam")]
        questions: u32,
        /// Show at most this many items.
        #[arg(long)]
        limit: Option<usize>,
    },
    /// List every card the user has, soonest due first.
    Cards,
}
