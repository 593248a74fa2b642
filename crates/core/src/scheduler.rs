use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::model::{MemoryState, ReviewRating};

//
// ─── PARAMETERS ────────────────────────────────────────────────────────────────
//

/// Ease factor of a card that has never been reviewed.
pub const INITIAL_EASE_FACTOR: f64 = 2.5;
/// Ease factor never drops below this floor.
pub const MIN_EASE_FACTOR: f64 = 1.3;
pub const AGAIN_EASE_PENALTY: f64 = 0.2;
pub const HARD_EASE_PENALTY: f64 = 0.15;
pub const EASY_EASE_BONUS: f64 = 0.15;
/// Interval after a failure and after the first success.
pub const FIRST_INTERVAL_DAYS: u32 = 1;
pub const SECOND_INTERVAL_DAYS: u32 = 6;
/// Largest interval the engine stores. Growth follows `round(interval * ease)`
/// exactly below this bound; a due date past the calendar's range is pinned to
/// `DateTime::<Utc>::MAX_UTC` instead.
pub const MAX_INTERVAL_DAYS: u32 = u32::MAX;

//
// ─── SCHEDULED REVIEW ──────────────────────────────────────────────────────────
//

/// State of a card right after a review was applied.
///
/// Serializes with the field names callers outside the engine expect:
/// `easeFactor`, `interval`, `repetitions`, `lastReviewedAt`, `nextReviewDate`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledReview {
    #[serde(flatten)]
    pub memory: MemoryState,
    pub last_reviewed_at: DateTime<Utc>,
    pub next_review_date: DateTime<Utc>,
}

impl ScheduledReview {
    #[must_use]
    pub fn ease_factor(&self) -> f64 {
        self.memory.ease_factor()
    }

    #[must_use]
    pub fn interval(&self) -> u32 {
        self.memory.interval()
    }

    #[must_use]
    pub fn repetitions(&self) -> u32 {
        self.memory.repetitions()
    }
}

//
// ─── SCHEDULER ─────────────────────────────────────────────────────────────────
//

/// Compute the next memory state and due date for one review.
///
/// SM-2 style rules:
///
/// - `Again` resets `repetitions` to 0, schedules the card for tomorrow and
///   lowers ease by 0.2.
/// - `Hard`, `Good` and `Easy` extend the streak. The interval becomes 1 day,
///   then 6 days, then `round(previous_interval * ease_factor)` using the ease
///   factor the card had before this review. Afterwards ease moves by
///   -0.15 / 0 / +0.15 respectively.
///
/// Ease never falls below [`MIN_EASE_FACTOR`]. The function is pure: `now` is
/// the review instant and the only notion of time it uses.
///
/// ```
/// # use srs_core::model::{MemoryState, ReviewRating};
/// # use srs_core::scheduler::schedule_review;
/// # use chrono::{Duration, TimeZone, Utc};
/// let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
/// let next = schedule_review(&MemoryState::default(), ReviewRating::Good, now);
/// assert_eq!(next.interval(), 1);
/// assert_eq!(next.repetitions(), 1);
/// assert_eq!(next.next_review_date, now + Duration::days(1));
/// ```
#[must_use]
pub fn schedule_review(
    state: &MemoryState,
    rating: ReviewRating,
    now: DateTime<Utc>,
) -> ScheduledReview {
    let (interval, repetitions) = if rating.is_failure() {
        (FIRST_INTERVAL_DAYS, 0)
    } else {
        let repetitions = state.repetitions().saturating_add(1);
        let interval = match repetitions {
            1 => FIRST_INTERVAL_DAYS,
            2 => SECOND_INTERVAL_DAYS,
            _ => grow_interval(state.interval(), state.ease_factor()),
        };
        (interval, repetitions)
    };

    let memory = MemoryState::from_parts(
        adjust_ease(state.ease_factor(), rating),
        interval,
        repetitions,
    );

    ScheduledReview {
        memory,
        last_reviewed_at: now,
        next_review_date: due_date(now, interval),
    }
}

fn adjust_ease(ease_factor: f64, rating: ReviewRating) -> f64 {
    let adjusted = match rating {
        ReviewRating::Again => ease_factor - AGAIN_EASE_PENALTY,
        ReviewRating::Hard => ease_factor - HARD_EASE_PENALTY,
        ReviewRating::Good => ease_factor,
        ReviewRating::Easy => ease_factor + EASY_EASE_BONUS,
    };
    adjusted.max(MIN_EASE_FACTOR)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn grow_interval(previous: u32, ease_factor: f64) -> u32 {
    let grown = (f64::from(previous) * ease_factor).round();
    if grown >= f64::from(MAX_INTERVAL_DAYS) {
        MAX_INTERVAL_DAYS
    } else {
        // ease >= 1.3 and previous >= 0, so `grown` is a non-negative integer below the bound
        grown as u32
    }
}

fn due_date(now: DateTime<Utc>, interval_days: u32) -> DateTime<Utc> {
    now.checked_add_signed(Duration::days(i64::from(interval_days)))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const EPS: f64 = 1e-9;

    fn day(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn state(ease: f64, interval: i64, reps: i64) -> MemoryState {
        MemoryState::try_new(ease, interval, reps).unwrap()
    }

    fn grid() -> Vec<MemoryState> {
        let eases = [1.3, 1.35, 1.45, 1.7, 2.0, 2.5, 2.65, 3.1, 5.0];
        let intervals = [0, 1, 2, 6, 15, 37, 400, 36_500];
        let reps = [0, 1, 2, 3, 4, 10, 250];
        let mut out = Vec::new();
        for &e in &eases {
            for &i in &intervals {
                for &r in &reps {
                    out.push(state(e, i, r));
                }
            }
        }
        out
    }

    #[test]
    fn first_review_good() {
        let now = day(2024, 1, 1);
        let next = schedule_review(&MemoryState::default(), ReviewRating::Good, now);

        assert!((next.ease_factor() - 2.5).abs() < EPS);
        assert_eq!(next.interval(), 1);
        assert_eq!(next.repetitions(), 1);
        assert_eq!(next.last_reviewed_at, now);
        assert_eq!(next.next_review_date, day(2024, 1, 2));
    }

    #[test]
    fn second_review_good() {
        let next = schedule_review(&state(2.5, 1, 1), ReviewRating::Good, day(2024, 1, 2));

        assert!((next.ease_factor() - 2.5).abs() < EPS);
        assert_eq!(next.interval(), 6);
        assert_eq!(next.repetitions(), 2);
        assert_eq!(next.next_review_date, day(2024, 1, 8));
    }

    #[test]
    fn third_review_good_multiplies_by_ease() {
        let next = schedule_review(&state(2.5, 6, 2), ReviewRating::Good, day(2024, 1, 8));

        assert_eq!(next.interval(), 15);
        assert_eq!(next.repetitions(), 3);
        assert_eq!(next.next_review_date, day(2024, 1, 23));
    }

    #[test]
    fn again_resets_streak_and_lowers_ease() {
        let now = day(2024, 2, 10);
        let next = schedule_review(&state(2.5, 15, 3), ReviewRating::Again, now);

        assert!((next.ease_factor() - 2.3).abs() < EPS);
        assert_eq!(next.interval(), 1);
        assert_eq!(next.repetitions(), 0);
        assert_eq!(next.next_review_date, now + Duration::days(1));
    }

    #[test]
    fn easy_on_floor_raises_ease() {
        let next = schedule_review(&state(1.3, 1, 1), ReviewRating::Easy, day(2024, 1, 1));

        assert!((next.ease_factor() - 1.45).abs() < EPS);
        assert_eq!(next.interval(), 6);
    }

    #[test]
    fn hard_clamps_at_floor() {
        let now = day(2024, 1, 1);
        let once = schedule_review(&state(1.35, 6, 2), ReviewRating::Hard, now);
        assert_eq!(once.ease_factor(), MIN_EASE_FACTOR);

        let twice = schedule_review(&once.memory, ReviewRating::Hard, now);
        assert_eq!(twice.ease_factor(), MIN_EASE_FACTOR);
    }

    #[test]
    fn hard_still_counts_as_success() {
        let next = schedule_review(&state(2.5, 6, 2), ReviewRating::Hard, day(2024, 1, 1));

        assert_eq!(next.repetitions(), 3);
        // growth uses the ease factor from before the penalty
        assert_eq!(next.interval(), 15);
        assert!((next.ease_factor() - 2.35).abs() < EPS);
    }

    #[test]
    fn rounding_is_half_away_from_zero() {
        // 5 * 2.5 = 12.5 -> 13
        let next = schedule_review(&state(2.5, 5, 2), ReviewRating::Good, day(2024, 1, 1));
        assert_eq!(next.interval(), 13);
        // 3 * 1.5 = 4.5 -> 5
        let next = schedule_review(&state(1.5, 3, 5), ReviewRating::Good, day(2024, 1, 1));
        assert_eq!(next.interval(), 5);
    }

    #[test]
    fn zero_prior_interval_stays_zero_on_late_streak() {
        let now = day(2024, 1, 1);
        let next = schedule_review(&state(2.5, -7, 4), ReviewRating::Good, now);

        assert_eq!(next.interval(), 0);
        assert_eq!(next.next_review_date, now);
    }

    #[test]
    fn interval_growth_saturates() {
        let next = schedule_review(
            &state(3.0, i64::from(MAX_INTERVAL_DAYS), 9),
            ReviewRating::Easy,
            day(2024, 1, 1),
        );
        assert_eq!(next.interval(), MAX_INTERVAL_DAYS);
    }

    #[test]
    fn long_streaks_are_not_capped_early() {
        let mut current = MemoryState::default();
        let mut now = day(2024, 1, 1);
        let mut last = None;
        for _ in 0..12 {
            let next = schedule_review(&current, ReviewRating::Good, now);
            now = next.next_review_date;
            current = next.memory;
            last = Some(next);
        }

        let twelfth = last.unwrap();
        assert_eq!(twelfth.interval(), 58_125);
        assert_eq!(
            twelfth.next_review_date,
            twelfth.last_reviewed_at + Duration::days(58_125)
        );
    }

    #[test]
    fn repetitions_saturate() {
        let next = schedule_review(
            &state(2.5, 10, i64::from(u32::MAX)),
            ReviewRating::Good,
            day(2024, 1, 1),
        );
        assert_eq!(next.repetitions(), u32::MAX);
    }

    #[test]
    fn due_date_never_overflows() {
        let late = DateTime::<Utc>::MAX_UTC - Duration::days(2);
        let next = schedule_review(&state(2.5, 6, 2), ReviewRating::Good, late);
        assert_eq!(next.next_review_date, DateTime::<Utc>::MAX_UTC);
    }

    // ── properties, checked over a grid of states ──

    #[test]
    fn ease_never_drops_below_floor() {
        let now = day(2024, 3, 1);
        for s in grid() {
            for rating in ReviewRating::ALL {
                let next = schedule_review(&s, rating, now);
                assert!(next.ease_factor() >= MIN_EASE_FACTOR, "{s:?} {rating}");
            }
        }
    }

    #[test]
    fn again_always_resets_repetitions() {
        let now = day(2024, 3, 1);
        for s in grid() {
            let next = schedule_review(&s, ReviewRating::Again, now);
            assert_eq!(next.repetitions(), 0);
            assert_eq!(next.interval(), FIRST_INTERVAL_DAYS);
        }
    }

    #[test]
    fn good_streak_follows_expected_sequence() {
        for ease in [1.3, 1.8, 2.5, 2.9] {
            let mut current = state(ease, 0, 0);
            let mut now = day(2024, 1, 1);
            let mut expected = vec![1_u32, 6];
            let mut prev = 6_u32;
            for _ in 0..8 {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let grown = ((f64::from(prev) * ease).round() as u32).min(MAX_INTERVAL_DAYS);
                expected.push(grown);
                prev = grown;
            }

            let mut seen = Vec::new();
            for _ in 0..expected.len() {
                let next = schedule_review(&current, ReviewRating::Good, now);
                seen.push(next.interval());
                now = next.next_review_date;
                current = next.memory;
            }

            assert_eq!(seen, expected, "ease {ease}");
            assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        }
    }

    #[test]
    fn identical_inputs_give_identical_outputs() {
        let now = day(2024, 5, 17);
        for s in grid() {
            for rating in ReviewRating::ALL {
                assert_eq!(schedule_review(&s, rating, now), schedule_review(&s, rating, now));
            }
        }
    }

    #[test]
    fn next_date_is_now_plus_interval() {
        let now = Utc.with_ymd_and_hms(2024, 6, 30, 13, 45, 12).unwrap();
        for s in grid() {
            for rating in ReviewRating::ALL {
                let next = schedule_review(&s, rating, now);
                assert_eq!(
                    next.next_review_date,
                    now + Duration::days(i64::from(next.interval()))
                );
                assert_eq!(next.last_reviewed_at, now);
            }
        }
    }

    #[test]
    fn serializes_with_external_field_names() {
        let next = schedule_review(&MemoryState::default(), ReviewRating::Good, day(2024, 1, 1));
        let json = serde_json::to_value(next).unwrap();

        assert_eq!(json["easeFactor"], 2.5);
        assert_eq!(json["interval"], 1);
        assert_eq!(json["repetitions"], 1);
        assert!(json["lastReviewedAt"].is_string());
        assert!(json["nextReviewDate"].is_string());
    }
}
