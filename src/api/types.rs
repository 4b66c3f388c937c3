use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::application::FieldErrors;
use crate::domain::{
    Book, BookId, Loan, LoanId, User, UserId,
    commands::{CreateBook, CreateUser, LendBook, ReturnLoan, UpdateBook},
};

// ============================================================================
// Requests
// ============================================================================

/// 書籍登録リクエスト（POST /books）
///
/// `total_copies` を省略した場合は0冊として登録する。
#[derive(Debug, Default, Deserialize, Validate)]
pub struct CreateBookRequest {
    #[validate(
        required(message = "Title is required."),
        length(min = 1, max = 100, message = "Title must be between 1 and 100 characters")
    )]
    pub title: Option<String>,
    #[validate(
        required(message = "Author is required."),
        length(min = 1, max = 100, message = "Author must be between 1 and 100 characters")
    )]
    pub author: Option<String>,
    #[serde(default)]
    #[validate(range(min = 0, message = "TotalCopies must be zero or greater"))]
    pub total_copies: i32,
}

impl CreateBookRequest {
    /// 検証済みのリクエストをコマンドに変換する
    pub fn to_command(&self) -> CreateBook {
        CreateBook {
            title: self.title.clone().unwrap_or_default(),
            author: self.author.clone().unwrap_or_default(),
            total_copies: to_copies(self.total_copies),
        }
    }
}

/// 書籍更新リクエスト（PUT /books/:id）
///
/// 省略したフィールドは変更しない。
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateBookRequest {
    #[validate(length(min = 1, max = 100, message = "Title must be between 1 and 100 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 100, message = "Author must be between 1 and 100 characters"))]
    pub author: Option<String>,
    #[validate(range(min = 0, message = "TotalCopies must be zero or greater"))]
    pub total_copies: Option<i32>,
}

impl UpdateBookRequest {
    pub fn to_command(&self, book_id: Uuid) -> UpdateBook {
        UpdateBook {
            book_id: BookId::from_uuid(book_id),
            title: self.title.clone(),
            author: self.author.clone(),
            total_copies: self.total_copies.map(to_copies),
        }
    }
}

/// 利用者登録リクエスト（POST /users）
#[derive(Debug, Default, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(
        required(message = "Name is required."),
        length(min = 1, max = 100, message = "Name must be between 1 and 100 characters")
    )]
    pub name: Option<String>,
    #[validate(
        required(message = "Email is required."),
        email(message = "Invalid email format")
    )]
    pub email: Option<String>,
}

impl CreateUserRequest {
    pub fn to_command(&self) -> CreateUser {
        CreateUser {
            name: self.name.clone().unwrap_or_default(),
            email: self.email.clone().unwrap_or_default(),
        }
    }
}

/// 貸出リクエスト（POST /loans）
///
/// 返却期限を省略した場合は1か月後になる。
#[derive(Debug, Deserialize)]
pub struct CreateLoanRequest {
    pub user_id: Uuid,
    pub book_id: Uuid,
    pub expiration_date: Option<NaiveDate>,
}

impl CreateLoanRequest {
    pub fn to_command(&self) -> LendBook {
        LendBook {
            user_id: UserId::from_uuid(self.user_id),
            book_id: BookId::from_uuid(self.book_id),
            expiration_date: self.expiration_date,
        }
    }
}

pub fn return_command(loan_id: Uuid) -> ReturnLoan {
    ReturnLoan {
        loan_id: LoanId::from_uuid(loan_id),
    }
}

/// 範囲検証済みの冊数を変換する
fn to_copies(value: i32) -> u32 {
    u32::try_from(value).unwrap_or_default()
}

/// 書籍一覧のクエリパラメータ
#[derive(Debug, Default, Deserialize)]
pub struct ListBooksQuery {
    /// 論理削除済みの書籍も含める（既定: false）
    pub include_deleted: Option<bool>,
}

/// 書籍取得のクエリパラメータ
#[derive(Debug, Default, Deserialize)]
pub struct GetBookQuery {
    /// 論理削除済みの書籍も返す（既定: true）
    pub include_deleted: Option<bool>,
}

// ============================================================================
// Responses
// ============================================================================

#[derive(Debug, Serialize)]
pub struct BookResponse {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub total_copies: u32,
    pub available: u32,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl From<Book> for BookResponse {
    fn from(book: Book) -> Self {
        Self {
            id: book.id.value(),
            title: book.title,
            author: book.author,
            total_copies: book.total_copies,
            available: book.available,
            is_deleted: book.is_deleted,
            deleted_at: book.deleted_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id.value(),
            name: user.name,
            email: user.email,
        }
    }
}

/// 貸出作成レスポンス（POST /loans）
#[derive(Debug, Serialize)]
pub struct LoanResponse {
    pub id: Uuid,
    pub book_id: Uuid,
    pub user_id: Uuid,
    pub start_date: NaiveDate,
    pub expiration_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
}

impl From<Loan> for LoanResponse {
    fn from(loan: Loan) -> Self {
        Self {
            id: loan.id.value(),
            book_id: loan.book_id.value(),
            user_id: loan.user_id.value(),
            start_date: loan.start_date,
            expiration_date: loan.expiration_date,
            return_date: loan.return_date,
        }
    }
}

/// エラーレスポンス
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<FieldErrors>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            errors: None,
        }
    }

    pub fn with_field_errors(mut self, errors: FieldErrors) -> Self {
        self.errors = Some(errors);
        self
    }
}
