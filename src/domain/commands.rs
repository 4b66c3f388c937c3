use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{BookId, LoanId, UserId};

/// コマンド：書籍を登録する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateBook {
    pub title: String,
    pub author: String,
    pub total_copies: u32,
}

/// コマンド：書籍を部分更新する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateBook {
    pub book_id: BookId,
    pub title: Option<String>,
    pub author: Option<String>,
    pub total_copies: Option<u32>,
}

/// コマンド：書籍を削除する（論理削除される）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteBook {
    pub book_id: BookId,
}

/// コマンド：利用者を登録する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateUser {
    pub name: String,
    pub email: String,
}

/// コマンド：書籍を貸し出す
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LendBook {
    pub user_id: UserId,
    pub book_id: BookId,
    pub expiration_date: Option<NaiveDate>,
}

/// コマンド：書籍を返却する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnLoan {
    pub loan_id: LoanId,
}
