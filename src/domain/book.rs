use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{BookId, UpdateBookError};

/// 論理削除（トゥームストーン化）の能力
///
/// この能力を持つエンティティは、コミット時に物理削除ではなく
/// `is_deleted = true` / `deleted_at = now` の更新に書き換えられる。
pub trait SoftDelete {
    fn is_deleted(&self) -> bool;

    fn mark_deleted(&mut self, deleted_at: DateTime<Utc>);
}

/// 書籍
///
/// 不変条件：`0 <= available <= total_copies`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub total_copies: u32,
    pub available: u32,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl SoftDelete for Book {
    fn is_deleted(&self) -> bool {
        self.is_deleted
    }

    fn mark_deleted(&mut self, deleted_at: DateTime<Utc>) {
        self.is_deleted = true;
        self.deleted_at = Some(deleted_at);
    }
}

/// 書籍の部分更新内容
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookChanges {
    pub title: Option<String>,
    pub author: Option<String>,
    pub total_copies: Option<u32>,
}

/// 純粋関数：書籍を登録する
///
/// 登録直後は全冊が貸出可能。
pub fn register_book(title: String, author: String, total_copies: u32) -> Book {
    Book {
        id: BookId::new(),
        title,
        author,
        total_copies,
        available: total_copies,
        is_deleted: false,
        deleted_at: None,
    }
}

/// 純粋関数：書籍を部分更新する
///
/// ビジネスルール：
/// - 総冊数がDだけ変わった場合、貸出可能数も同じDだけ変える
/// - 貸出可能数が負になる変更（貸出中の冊数を削る変更）は拒否する
pub fn update_book(book: &Book, changes: BookChanges) -> Result<Book, UpdateBookError> {
    let mut updated = book.clone();

    if let Some(title) = changes.title {
        updated.title = title;
    }
    if let Some(author) = changes.author {
        updated.author = author;
    }

    if let Some(total_copies) = changes.total_copies {
        let delta = i64::from(total_copies) - i64::from(book.total_copies);
        let available = i64::from(book.available) + delta;
        if available < 0 {
            return Err(UpdateBookError::UnreturnedCopies);
        }

        updated.total_copies = total_copies;
        updated.available =
            u32::try_from(available).map_err(|_| UpdateBookError::UnreturnedCopies)?;
    }

    Ok(updated)
}

/// 純粋関数：1冊を貸出に回す
///
/// 呼び出し側で `available > 0` を確認済みであること。
pub fn check_out_copy(book: &Book) -> Book {
    Book {
        available: book.available.saturating_sub(1),
        ..book.clone()
    }
}

/// 純粋関数：返却された1冊を在庫に戻す
///
/// 貸出中の冊数と貸出可能数の合計は常に総冊数に等しい。
pub fn check_in_copy(book: &Book) -> Book {
    debug_assert!(
        book.available < book.total_copies,
        "returned copy would exceed total copies"
    );
    Book {
        available: book.available + 1,
        ..book.clone()
    }
}
