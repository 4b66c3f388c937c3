use chrono::{DateTime, NaiveDate, Utc};

/// 時計ポート
///
/// 現在時刻をグローバルに読まず注入することで、
/// 貸出処理とリマインダーを決定的にテストできるようにする。
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// 今日の日付（UTC）
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}
