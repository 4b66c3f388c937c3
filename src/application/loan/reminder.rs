use crate::application::{
    dependencies::ServiceDependencies,
    errors::{ApplicationError, Result},
};
use crate::ports::{Notifier, ReminderCandidate};
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// リマインダーメールの件名
pub const REMINDER_SUBJECT: &str = "Loan expiration reminder";

/// スケジューラーの既定の実行間隔
pub const DEFAULT_REMINDER_INTERVAL: Duration = Duration::from_secs(5);

/// 1サイクルの実行結果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReminderReport {
    /// 送信対象の件数
    pub candidates: usize,
    pub sent: usize,
    pub failed: usize,
    /// 停止要求により途中で打ち切ったか
    pub interrupted: bool,
}

/// リマインダー本文を組み立てる
pub fn compose_reminder(candidate: &ReminderCandidate) -> String {
    format!(
        "Dear {},\n\nYour loan of \"{}\" expires tomorrow ({}).",
        candidate.user_name, candidate.book_title, candidate.expiration_date
    )
}

/// 返却期限リマインダーを1サイクル分送信する
///
/// ビジネスルール：
/// - 対象は明日が返却期限の貸出中の貸出のみ
/// - 1件につき1通、取得順に逐次送信する
/// - 1件の送信失敗は他の送信を妨げない（ログに記録して続行）
///
/// 送信の合間に停止要求を確認し、要求があればそこで打ち切る。
///
/// # エラー
/// ストアの読み取りに失敗した場合のみ
pub async fn send_expiration_reminders(
    deps: &ServiceDependencies,
    notifier: &dyn Notifier,
    shutdown: &watch::Receiver<bool>,
) -> Result<ReminderReport> {
    let tomorrow = deps.clock.today().succ_opt().unwrap_or(NaiveDate::MAX);

    let candidates = deps
        .entity_store
        .find_active_loans_expiring_on(tomorrow)
        .await
        .map_err(ApplicationError::Store)?;

    let mut report = ReminderReport {
        candidates: candidates.len(),
        ..Default::default()
    };

    for candidate in &candidates {
        if *shutdown.borrow() {
            report.interrupted = true;
            break;
        }

        let body = compose_reminder(candidate);
        match notifier
            .send_reminder(&candidate.user_email, REMINDER_SUBJECT, &body)
            .await
        {
            Ok(()) => report.sent += 1,
            Err(e) => {
                tracing::warn!(
                    "Failed to send reminder for loan {} to {}: {}",
                    candidate.loan_id,
                    candidate.user_email,
                    e
                );
                report.failed += 1;
            }
        }
    }

    Ok(report)
}

/// リマインダースケジューラー
///
/// 停止要求を受けるまで、1サイクル実行 → 一定時間待機 を繰り返す。
/// 待機は停止要求で即座に中断される。サイクルの失敗はログに記録して続行する。
/// 送信側がdropされた場合も停止要求とみなす。
pub async fn run_reminder_scheduler(
    deps: ServiceDependencies,
    notifier: Arc<dyn Notifier>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    tracing::info!("Reminder scheduler started (interval: {:?})", interval);

    loop {
        if *shutdown.borrow() {
            break;
        }

        match send_expiration_reminders(&deps, notifier.as_ref(), &shutdown).await {
            Ok(report) => tracing::debug!(
                "Reminder cycle finished: {} candidate(s), {} sent, {} failed",
                report.candidates,
                report.sent,
                report.failed
            ),
            Err(e) => tracing::error!("Reminder cycle failed: {}", e),
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    tracing::info!("Reminder scheduler stopped");
}
