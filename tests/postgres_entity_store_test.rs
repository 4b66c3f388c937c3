//! PostgreSQLエンティティストアのテスト
//!
//! 実行には DATABASE_URL が必要: `cargo test -- --ignored`
//! 各テストは新しいIDのみを検証するため、既存データがあっても実行できる。

use chrono::{Days, NaiveDate, Utc};
use rusty_library_loans::adapters::mock::FixedClock;
use rusty_library_loans::adapters::postgres::PostgresEntityStore;
use rusty_library_loans::application::{
    ApplicationError, ServiceDependencies, book,
    loan::{create_loan, return_loan},
    user,
};
use rusty_library_loans::domain::{
    BookId,
    book::register_book,
    commands::{CreateBook, CreateUser, DeleteBook, LendBook, ReturnLoan},
};
use rusty_library_loans::ports::{ChangeSet, EntityStore};
use std::sync::Arc;

mod common;

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

async fn setup() -> (Arc<PostgresEntityStore>, ServiceDependencies) {
    let pool = common::create_test_pool().await;
    let store = Arc::new(PostgresEntityStore::new(pool));
    let deps = ServiceDependencies::new(store.clone(), Arc::new(FixedClock::at_date(today())));
    (store, deps)
}

async fn new_book(deps: &ServiceDependencies, copies: u32) -> BookId {
    book::create_book(
        deps,
        CreateBook {
            title: "Postgres Book".to_string(),
            author: "Test Author".to_string(),
            total_copies: copies,
        },
    )
    .await
    .unwrap()
    .id
}

#[tokio::test]
#[ignore]
async fn test_book_round_trip_and_soft_delete() {
    let (store, deps) = setup().await;
    let book_id = new_book(&deps, 3).await;

    let fetched = store.get_book(book_id, false).await.unwrap().unwrap();
    assert_eq!(fetched.total_copies, 3);
    assert_eq!(fetched.available, 3);

    book::delete_book(&deps, DeleteBook { book_id }).await.unwrap();

    assert!(store.get_book(book_id, false).await.unwrap().is_none());
    let tombstone = store.get_book(book_id, true).await.unwrap().unwrap();
    assert!(tombstone.is_deleted);
    assert!(tombstone.deleted_at.is_some());

    let live_ids: Vec<BookId> = store
        .list_books(false)
        .await
        .unwrap()
        .into_iter()
        .map(|b| b.id)
        .collect();
    assert!(!live_ids.contains(&book_id));
}

#[tokio::test]
#[ignore]
async fn test_lend_return_and_reminder_query() {
    let (store, deps) = setup().await;
    let book_id = new_book(&deps, 1).await;
    let alice = user::create_user(
        &deps,
        CreateUser {
            name: "Alice".to_string(),
            email: format!("alice+{}@example.com", book_id),
        },
    )
    .await
    .unwrap();
    let tomorrow = today().checked_add_days(Days::new(1)).unwrap();

    let loan = create_loan(
        &deps,
        LendBook {
            user_id: alice.id,
            book_id,
            expiration_date: Some(tomorrow),
        },
    )
    .await
    .unwrap();
    assert_eq!(store.get_book(book_id, true).await.unwrap().unwrap().available, 0);

    let second = create_loan(
        &deps,
        LendBook {
            user_id: alice.id,
            book_id,
            expiration_date: None,
        },
    )
    .await;
    assert!(matches!(second, Err(ApplicationError::NoAvailableCopies)));

    let candidates = store.find_active_loans_expiring_on(tomorrow).await.unwrap();
    assert!(candidates.iter().any(|c| c.loan_id == loan.id));

    return_loan(&deps, ReturnLoan { loan_id: loan.id })
        .await
        .unwrap();
    assert_eq!(store.get_book(book_id, true).await.unwrap().unwrap().available, 1);

    let candidates = store.find_active_loans_expiring_on(tomorrow).await.unwrap();
    assert!(!candidates.iter().any(|c| c.loan_id == loan.id));

    let details = store.list_loans(true).await.unwrap();
    let detail = details.iter().find(|d| d.loan_id == loan.id).unwrap();
    assert_eq!(detail.book_title, "Postgres Book");
    assert_eq!(detail.return_date, Some(today()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn test_concurrent_lends_of_last_copy_succeed_once() {
    let (store, deps) = setup().await;
    let book_id = new_book(&deps, 1).await;
    let alice = user::create_user(
        &deps,
        CreateUser {
            name: "Alice".to_string(),
            email: format!("alice+race-{}@example.com", book_id),
        },
    )
    .await
    .unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let deps = deps.clone();
            let cmd = LendBook {
                user_id: alice.id,
                book_id,
                expiration_date: None,
            };
            tokio::spawn(async move { create_loan(&deps, cmd).await })
        })
        .collect();

    let mut succeeded = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(err) => assert!(matches!(err, ApplicationError::NoAvailableCopies)),
        }
    }

    assert_eq!(succeeded, 1);
    assert_eq!(store.get_book(book_id, true).await.unwrap().unwrap().available, 0);
    let loans_for_book = store
        .list_loans(true)
        .await
        .unwrap()
        .into_iter()
        .filter(|d| d.book_id == book_id)
        .count();
    assert_eq!(loans_for_book, 1);
}

#[tokio::test]
#[ignore]
async fn test_failed_batch_leaves_nothing_behind() {
    let (store, _deps) = setup().await;
    let book = register_book("Duplicate".to_string(), "Author".to_string(), 1);

    let mut changes = ChangeSet::new();
    changes.add(book.clone());
    changes.add(book.clone());

    let tx = store.begin().await.unwrap();
    let result = tx.persist(changes).await;

    assert!(result.is_err());
    assert!(store.get_book(book.id, true).await.unwrap().is_none());
}
