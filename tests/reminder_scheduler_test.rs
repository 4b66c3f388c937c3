use chrono::{Days, NaiveDate};
use rusty_library_loans::application::loan::{
    REMINDER_SUBJECT, create_loan, return_loan, run_reminder_scheduler, send_expiration_reminders,
};
use rusty_library_loans::domain::{
    Book, User,
    commands::{LendBook, ReturnLoan},
};
use rusty_library_loans::ports::Notifier;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

mod common;

use common::{TestContext, today};

fn tomorrow() -> NaiveDate {
    today().checked_add_days(Days::new(1)).unwrap()
}

async fn lend_until(ctx: &TestContext, user: &User, book: &Book, expiration: NaiveDate) {
    create_loan(
        &ctx.deps,
        LendBook {
            user_id: user.id,
            book_id: book.id,
            expiration_date: Some(expiration),
        },
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn test_only_active_loans_expiring_tomorrow_are_reminded() {
    // Arrange
    let ctx = TestContext::new();
    let book = ctx.add_book("C# Basics", 5).await;
    let alice = ctx.add_user("Alice", "alice@example.com").await;
    let bob = ctx.add_user("Bob", "bob@example.com").await;
    let carol = ctx.add_user("Carol", "carol@example.com").await;

    // 明日が期限（対象）
    lend_until(&ctx, &alice, &book, tomorrow()).await;
    // 期限が先（対象外）
    lend_until(&ctx, &bob, &book, tomorrow().checked_add_days(Days::new(1)).unwrap()).await;
    // 明日が期限だが返却済み（対象外）
    let returned = create_loan(
        &ctx.deps,
        LendBook {
            user_id: carol.id,
            book_id: book.id,
            expiration_date: Some(tomorrow()),
        },
    )
    .await
    .unwrap();
    return_loan(&ctx.deps, ReturnLoan {
        loan_id: returned.id,
    })
    .await
    .unwrap();

    let (_shutdown_tx, shutdown_rx) = watch::channel(false);

    // Act
    let report = send_expiration_reminders(&ctx.deps, ctx.notifier.as_ref(), &shutdown_rx)
        .await
        .unwrap();

    // Assert: アリスにだけ1通
    assert_eq!(report.candidates, 1);
    assert_eq!(report.sent, 1);
    assert_eq!(report.failed, 0);

    let sent = ctx.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to_email, "alice@example.com");
    assert_eq!(sent[0].subject, REMINDER_SUBJECT);
    assert_eq!(
        sent[0].body,
        "Dear Alice,\n\nYour loan of \"C# Basics\" expires tomorrow (2025-03-11)."
    );
}

#[tokio::test]
async fn test_failed_send_does_not_stop_the_others() {
    // Arrange: 3件の対象のうち1件の送信が失敗する
    let ctx = TestContext::new();
    let book = ctx.add_book("Dune", 3).await;
    let alice = ctx.add_user("Alice", "alice@example.com").await;
    let bob = ctx.add_user("Bob", "bob@example.com").await;
    let carol = ctx.add_user("Carol", "carol@example.com").await;
    for user in [&alice, &bob, &carol] {
        lend_until(&ctx, user, &book, tomorrow()).await;
    }
    ctx.notifier.fail_for("bob@example.com");

    let (_shutdown_tx, shutdown_rx) = watch::channel(false);

    // Act
    let report = send_expiration_reminders(&ctx.deps, ctx.notifier.as_ref(), &shutdown_rx)
        .await
        .unwrap();

    // Assert
    assert_eq!(report.candidates, 3);
    assert_eq!(report.sent, 2);
    assert_eq!(report.failed, 1);
    let recipients: Vec<String> = ctx
        .notifier
        .sent()
        .into_iter()
        .map(|reminder| reminder.to_email)
        .collect();
    assert_eq!(recipients, vec!["alice@example.com", "carol@example.com"]);
}

#[tokio::test]
async fn test_default_loan_is_reminded_the_day_before_it_expires() {
    // Arrange: 既定の返却期限（1か月後）の貸出
    let ctx = TestContext::new();
    let book = ctx.add_book("Emma", 1).await;
    let alice = ctx.add_user("Alice", "alice@example.com").await;
    let loan = create_loan(
        &ctx.deps,
        LendBook {
            user_id: alice.id,
            book_id: book.id,
            expiration_date: None,
        },
    )
    .await
    .unwrap();
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);

    // 貸出当日は対象外
    let report = send_expiration_reminders(&ctx.deps, ctx.notifier.as_ref(), &shutdown_rx)
        .await
        .unwrap();
    assert_eq!(report.candidates, 0);

    // Act: 時計を期限の前日の夕方に進める
    let day_before = loan.expiration_date.checked_sub_days(Days::new(1)).unwrap();
    ctx.clock
        .set(day_before.and_hms_opt(18, 30, 0).unwrap().and_utc());
    let report = send_expiration_reminders(&ctx.deps, ctx.notifier.as_ref(), &shutdown_rx)
        .await
        .unwrap();

    // Assert
    assert_eq!(report.sent, 1);
    assert_eq!(
        ctx.notifier.sent()[0].body,
        "Dear Alice,\n\nYour loan of \"Emma\" expires tomorrow (2025-04-10)."
    );
}

#[tokio::test]
async fn test_no_candidates_sends_nothing() {
    let ctx = TestContext::new();
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);

    let report = send_expiration_reminders(&ctx.deps, ctx.notifier.as_ref(), &shutdown_rx)
        .await
        .unwrap();

    assert_eq!(report.candidates, 0);
    assert_eq!(report.sent, 0);
    assert!(ctx.notifier.sent().is_empty());
}

#[tokio::test]
async fn test_cycle_stops_between_sends_when_shutdown_requested() {
    let ctx = TestContext::new();
    let book = ctx.add_book("Dune", 2).await;
    let alice = ctx.add_user("Alice", "alice@example.com").await;
    lend_until(&ctx, &alice, &book, tomorrow()).await;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    shutdown_tx.send(true).unwrap();

    let report = send_expiration_reminders(&ctx.deps, ctx.notifier.as_ref(), &shutdown_rx)
        .await
        .unwrap();

    assert!(report.interrupted);
    assert_eq!(report.sent, 0);
    assert!(ctx.notifier.sent().is_empty());
}

#[tokio::test]
async fn test_scheduler_sends_and_stops_promptly() {
    // Arrange: 明日が期限の貸出が1件、待機間隔は十分に長い
    let ctx = TestContext::new();
    let book = ctx.add_book("Dune", 2).await;
    let alice = ctx.add_user("Alice", "alice@example.com").await;
    lend_until(&ctx, &alice, &book, tomorrow()).await;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let notifier: Arc<dyn Notifier> = ctx.notifier.clone();
    let handle = tokio::spawn(run_reminder_scheduler(
        ctx.deps.clone(),
        notifier,
        Duration::from_secs(3600),
        shutdown_rx,
    ));

    // Act: 最初のサイクルの送信を待つ
    tokio::time::timeout(Duration::from_secs(5), async {
        while ctx.notifier.sent().is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("first reminder cycle did not run");

    shutdown_tx.send(true).unwrap();

    // Assert: 長い待機中でも停止要求ですぐに終了する
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("scheduler did not stop promptly")
        .unwrap();
    assert_eq!(ctx.notifier.sent().len(), 1);
}

#[tokio::test]
async fn test_scheduler_stops_when_sender_is_dropped() {
    let ctx = TestContext::new();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let notifier: Arc<dyn Notifier> = ctx.notifier.clone();
    let handle = tokio::spawn(run_reminder_scheduler(
        ctx.deps.clone(),
        notifier,
        Duration::from_secs(3600),
        shutdown_rx,
    ));

    drop(shutdown_tx);

    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("scheduler did not stop promptly")
        .unwrap();
}
