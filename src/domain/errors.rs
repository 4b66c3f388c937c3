use chrono::NaiveDate;

/// 貸出のエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LendBookError {
    /// 貸出可能な在庫がない
    NoAvailableCopies,
    /// 返却期限が早すぎる（明日以降である必要がある）
    ExpirationTooSoon { minimum: NaiveDate },
}

/// 返却のエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnLoanError {
    /// 既に返却済み
    AlreadyReturned,
}

/// 書籍更新のエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateBookError {
    /// 貸出中の冊数を下回る総冊数への変更
    UnreturnedCopies,
}
