use chrono::{DateTime, Duration, TimeZone, Utc};
use srs_core::model::{
    Card, CardId, CardKey, ExamId, MemoryState, QuestionRef, ReviewRating, UserId,
};
use srs_core::time::reference_now;
use srs_storage::repository::{CardRepository, InMemoryRepository, Storage};
use srs_storage::sqlite::SqliteRepository;

async fn fresh_repo(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

#[tokio::test]
async fn sqlite_roundtrip_preserves_card_state() {
    let repo = fresh_repo("memdb_roundtrip").await;
    let key = CardKey::new(UserId::generate(), ExamId::generate(), 12);
    let now = reference_now();

    let mut card = Card::first_review(CardId::generate(), key, ReviewRating::Good, now);
    card.record_review(ReviewRating::Easy, now + Duration::days(1));
    repo.upsert_card(&card).await.unwrap();

    let fetched = repo.get_card(&key).await.unwrap().expect("stored card");
    assert_eq!(fetched, card);
    assert_eq!(fetched.memory().repetitions(), 2);
    assert_eq!(fetched.memory().interval(), 6);
}

#[tokio::test]
async fn sqlite_missing_card_is_none() {
    let repo = fresh_repo("memdb_missing").await;
    let key = CardKey::new(UserId::generate(), ExamId::generate(), 0);
    assert!(repo.get_card(&key).await.unwrap().is_none());
}

#[tokio::test]
async fn sqlite_upsert_is_last_write_wins_per_key() {
    let repo = fresh_repo("memdb_lww").await;
    let key = CardKey::new(UserId::generate(), ExamId::generate(), 3);
    let now = reference_now();

    let first = Card::first_review(CardId::generate(), key, ReviewRating::Easy, now);
    let racing = Card::first_review(
        CardId::generate(),
        key,
        ReviewRating::Again,
        now + Duration::seconds(5),
    );
    repo.upsert_card(&first).await.unwrap();
    repo.upsert_card(&racing).await.unwrap();

    let stored = repo.get_card(&key).await.unwrap().unwrap();
    assert_eq!(stored.id(), first.id());
    assert_eq!(stored.created_at(), first.created_at());
    assert_eq!(stored.memory(), racing.memory());
    assert_eq!(stored.next_review_date(), racing.next_review_date());

    let all = repo.cards_for_user(key.user_id).await.unwrap();
    assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn sqlite_due_cards_respects_boundary_and_order() {
    let repo = fresh_repo("memdb_due").await;
    let user = UserId::generate();
    let exam = ExamId::generate();
    let now = reference_now();

    let due_same_time = |index: u32| {
        Card::from_persisted(
            CardId::generate(),
            CardKey::new(user, exam, index),
            MemoryState::try_new(2.5, 6, 2).unwrap(),
            now,
            Some(now - Duration::days(6)),
            now - Duration::days(7),
        )
        .unwrap()
    };
    let late = due_same_time(8);
    let early = due_same_time(1);
    let overdue = Card::first_review(
        CardId::generate(),
        CardKey::new(user, exam, 20),
        ReviewRating::Again,
        now - Duration::days(3),
    );
    let future = Card::first_review(
        CardId::generate(),
        CardKey::new(user, exam, 30),
        ReviewRating::Good,
        now,
    );
    let stranger = Card::first_review(
        CardId::generate(),
        CardKey::new(UserId::generate(), exam, 1),
        ReviewRating::Again,
        now - Duration::days(9),
    );
    for card in [&late, &early, &overdue, &future, &stranger] {
        repo.upsert_card(card).await.unwrap();
    }

    let due = repo.due_cards(user, now).await.unwrap();
    let indices: Vec<u32> = due.iter().map(|c| c.key().question_index()).collect();
    assert_eq!(indices, vec![20, 1, 8]);

    let before = repo
        .due_cards(user, now - Duration::seconds(1))
        .await
        .unwrap();
    assert_eq!(before.len(), 1);
}

#[tokio::test]
async fn sqlite_due_cards_agrees_with_memory_past_year_9999() {
    let repo = fresh_repo("memdb_far_future").await;
    let memory = InMemoryRepository::new();
    let key = CardKey::new(UserId::generate(), ExamId::generate(), 0);

    let start = Utc.with_ymd_and_hms(9999, 12, 20, 0, 0, 0).unwrap();
    let mut card = Card::first_review(CardId::generate(), key, ReviewRating::Good, start);
    card.record_review(ReviewRating::Good, start + Duration::days(1));
    card.record_review(ReviewRating::Good, start + Duration::days(7));
    assert_eq!(
        card.next_review_date(),
        Utc.with_ymd_and_hms(10_000, 1, 11, 0, 0, 0).unwrap()
    );

    let pinned = Card::first_review(
        CardId::generate(),
        CardKey::new(key.user_id, key.exam_id(), 1),
        ReviewRating::Good,
        DateTime::<Utc>::MAX_UTC - Duration::hours(1),
    );
    assert_eq!(pinned.next_review_date(), DateTime::<Utc>::MAX_UTC);

    for stored in [&card, &pinned] {
        repo.upsert_card(stored).await.unwrap();
        memory.upsert_card(stored).await.unwrap();
    }

    for now in [reference_now(), start, card.next_review_date() - Duration::seconds(1)] {
        assert!(repo.due_cards(key.user_id, now).await.unwrap().is_empty());
        assert!(memory.due_cards(key.user_id, now).await.unwrap().is_empty());
    }

    let due = repo
        .due_cards(key.user_id, card.next_review_date())
        .await
        .unwrap();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].next_review_date(), card.next_review_date());

    let ordered = repo.cards_for_user(key.user_id).await.unwrap();
    let indices: Vec<u32> = ordered.iter().map(|c| c.key().question_index()).collect();
    assert_eq!(indices, vec![0, 1]);
}

#[tokio::test]
async fn sqlite_reviewed_questions_uses_keys_only() {
    let repo = fresh_repo("memdb_reviewed").await;
    let user = UserId::generate();
    let exam = ExamId::generate();
    let other_exam = ExamId::generate();

    for key in [
        CardKey::new(user, exam, 4),
        CardKey::new(user, other_exam, 0),
        CardKey::new(UserId::generate(), exam, 5),
    ] {
        let card = Card::first_review(CardId::generate(), key, ReviewRating::Good, reference_now());
        repo.upsert_card(&card).await.unwrap();
    }

    let asked = [
        QuestionRef::new(exam, 5),
        QuestionRef::new(other_exam, 0),
        QuestionRef::new(exam, 4),
        QuestionRef::new(exam, 6),
    ];
    let known = repo.reviewed_questions(user, &asked).await.unwrap();
    assert_eq!(
        known,
        vec![QuestionRef::new(other_exam, 0), QuestionRef::new(exam, 4)]
    );
    assert!(repo.reviewed_questions(user, &[]).await.unwrap().is_empty());
}

#[tokio::test]
async fn storage_sqlite_constructor_migrates_idempotently() {
    let url = "sqlite:file:memdb_storage?mode=memory&cache=shared";
    let storage = Storage::sqlite(url).await.expect("first open");
    // Keep the shared in-memory database alive while re-running migrations.
    let again = SqliteRepository::connect(url).await.expect("second connect");
    again.migrate().await.expect("second migrate is a no-op");

    let key = CardKey::new(UserId::generate(), ExamId::generate(), 0);
    let card = Card::first_review(CardId::generate(), key, ReviewRating::Hard, reference_now());
    storage.cards.upsert_card(&card).await.unwrap();
    assert_eq!(again.get_card(&key).await.unwrap(), Some(card));
}
