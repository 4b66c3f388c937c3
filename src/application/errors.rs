use crate::domain::{LendBookError, ReturnLoanError, UpdateBookError};
use std::collections::BTreeMap;
use thiserror::Error;

/// フィールド名 → エラーメッセージ一覧
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// 返却期限が早すぎる場合のメッセージ
pub const EXPIRATION_TOO_SOON_MESSAGE: &str = "ExpirationDate must be tomorrow or later";

/// アプリケーション層のエラー
///
/// NotFound / Conflict / BadRequest は呼び出し側で回復可能な結果、
/// Storeはストア障害で、そのまま呼び出し側へ伝播する。
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// 利用者が存在しない
    #[error("User not found")]
    UserNotFound,

    /// 書籍が存在しない（論理削除済みを含む）
    #[error("Book not found")]
    BookNotFound,

    /// 貸出が存在しない
    #[error("Loan not found")]
    LoanNotFound,

    /// 貸出可能な在庫がない
    #[error("No available copies of the book.")]
    NoAvailableCopies,

    /// 既に返却済み
    #[error("Loan already returned.")]
    LoanAlreadyReturned,

    /// 未返却の貸出があるため削除できない
    #[error("Book has an active loan, it cannot be deleted.")]
    BookHasActiveLoan,

    /// 貸出中の冊数を下回る総冊数への変更
    #[error("Cannot remove unreturned book copies.")]
    UnreturnedCopies,

    /// 入力値の検証エラー
    #[error("Validation failed")]
    Validation(FieldErrors),

    /// エンティティストアのエラー
    #[error("Entity store error")]
    Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// 呼び出し側が区別すべき結果の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    BadRequest,
    Internal,
}

impl ApplicationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApplicationError::UserNotFound
            | ApplicationError::BookNotFound
            | ApplicationError::LoanNotFound => ErrorKind::NotFound,
            ApplicationError::NoAvailableCopies
            | ApplicationError::LoanAlreadyReturned
            | ApplicationError::BookHasActiveLoan
            | ApplicationError::UnreturnedCopies => ErrorKind::Conflict,
            ApplicationError::Validation(_) => ErrorKind::BadRequest,
            ApplicationError::Store(_) => ErrorKind::Internal,
        }
    }

    /// 1フィールド1メッセージの検証エラーを作る
    pub fn field_error(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.into(), vec![message.into()]);
        ApplicationError::Validation(errors)
    }
}

impl From<LendBookError> for ApplicationError {
    fn from(err: LendBookError) -> Self {
        match err {
            LendBookError::NoAvailableCopies => ApplicationError::NoAvailableCopies,
            LendBookError::ExpirationTooSoon { .. } => {
                ApplicationError::field_error("expiration_date", EXPIRATION_TOO_SOON_MESSAGE)
            }
        }
    }
}

impl From<ReturnLoanError> for ApplicationError {
    fn from(err: ReturnLoanError) -> Self {
        match err {
            ReturnLoanError::AlreadyReturned => ApplicationError::LoanAlreadyReturned,
        }
    }
}

impl From<UpdateBookError> for ApplicationError {
    fn from(err: UpdateBookError) -> Self {
        match err {
            UpdateBookError::UnreturnedCopies => ApplicationError::UnreturnedCopies,
        }
    }
}

/// アプリケーション層の Result型
pub type Result<T> = std::result::Result<T, ApplicationError>;
