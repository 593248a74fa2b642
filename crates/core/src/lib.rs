#![forbid(unsafe_code)]

//! Domain model and scheduling engine for exam question review.
//!
//! The scheduler is a pure SM-2 style function over [`model::MemoryState`];
//! everything that touches storage or the wall clock lives in the
//! `srs-storage` and `srs-services` crates.

pub mod due;
pub mod model;
pub mod scheduler;
pub mod time;

pub use time::Clock;
