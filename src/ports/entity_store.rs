use crate::domain::{Book, BookId, Loan, LoanId, SoftDelete, User, UserId};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// コミット対象として追跡されるエンティティ
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackedEntity {
    Book(Book),
    User(User),
    Loan(Loan),
}

impl TrackedEntity {
    /// 論理削除の能力を持つ場合のみ `Some` を返す
    ///
    /// 現在は書籍のみ。利用者と貸出は物理削除される。
    pub fn as_soft_delete_mut(&mut self) -> Option<&mut dyn SoftDelete> {
        match self {
            TrackedEntity::Book(book) => Some(book as &mut dyn SoftDelete),
            TrackedEntity::User(_) | TrackedEntity::Loan(_) => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            TrackedEntity::Book(_) => "book",
            TrackedEntity::User(_) => "user",
            TrackedEntity::Loan(_) => "loan",
        }
    }
}

impl From<Book> for TrackedEntity {
    fn from(book: Book) -> Self {
        TrackedEntity::Book(book)
    }
}

impl From<User> for TrackedEntity {
    fn from(user: User) -> Self {
        TrackedEntity::User(user)
    }
}

impl From<Loan> for TrackedEntity {
    fn from(loan: Loan) -> Self {
        TrackedEntity::Loan(loan)
    }
}

/// 保留中の変更の種別
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    Added,
    Modified,
    Deleted,
}

/// 保留中の変更1件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEntry {
    pub state: EntryState,
    pub entity: TrackedEntity,
}

/// 1回のコミットでまとめて永続化される変更の集合
///
/// 追加順が保持される。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    entries: Vec<ChangeEntry>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, entity: impl Into<TrackedEntity>) {
        self.push(EntryState::Added, entity.into());
    }

    pub fn update(&mut self, entity: impl Into<TrackedEntity>) {
        self.push(EntryState::Modified, entity.into());
    }

    pub fn remove(&mut self, entity: impl Into<TrackedEntity>) {
        self.push(EntryState::Deleted, entity.into());
    }

    fn push(&mut self, state: EntryState, entity: TrackedEntity) {
        self.entries.push(ChangeEntry { state, entity });
    }

    pub fn entries(&self) -> &[ChangeEntry] {
        &self.entries
    }

    pub fn entries_mut(&mut self) -> &mut [ChangeEntry] {
        &mut self.entries
    }

    pub fn into_entries(self) -> Vec<ChangeEntry> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// 貸出一覧用の結合ビュー
///
/// 書籍は論理削除済みでも解決される（履歴表示のため）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoanDetail {
    pub loan_id: LoanId,
    pub user_id: UserId,
    pub book_id: BookId,
    pub user_email: String,
    pub book_title: String,
    pub start_date: NaiveDate,
    pub expiration_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
}

/// 返却期限リマインダーの送信対象
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderCandidate {
    pub loan_id: LoanId,
    pub user_name: String,
    pub user_email: String,
    pub book_title: String,
    pub expiration_date: NaiveDate,
}

/// ストアのトランザクション
///
/// 読み取り→判定→変更の一連の処理を、同じ書籍・貸出に対する
/// 並行処理から保護する。`persist` で変更をまとめて適用し、
/// 永続化せずにdropした場合は何も反映されない。
#[async_trait]
pub trait StoreTransaction: Send {
    /// IDで書籍を取得する（`include_deleted` が false なら論理削除済みを除外）
    async fn find_book(&mut self, book_id: BookId, include_deleted: bool) -> Result<Option<Book>>;

    async fn find_user(&mut self, user_id: UserId) -> Result<Option<User>>;

    async fn find_loan(&mut self, loan_id: LoanId) -> Result<Option<Loan>>;

    /// 書籍に未返却の貸出があるか
    async fn has_active_loans(&mut self, book_id: BookId) -> Result<bool>;

    /// 変更集合を1単位として適用し、トランザクションを終了する
    async fn persist(self: Box<Self>, changes: ChangeSet) -> Result<()>;
}

/// エンティティストアポート
///
/// すべての読み取りは `include_deleted` を明示的に受け取る。
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// 変更用のトランザクションを開始する
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>>;

    async fn list_books(&self, include_deleted: bool) -> Result<Vec<Book>>;

    async fn get_book(&self, book_id: BookId, include_deleted: bool) -> Result<Option<Book>>;

    async fn list_users(&self) -> Result<Vec<User>>;

    async fn get_user(&self, user_id: UserId) -> Result<Option<User>>;

    /// 貸出一覧を書籍・利用者と結合して返す
    ///
    /// `include_deleted` が false の場合、論理削除済み書籍の貸出は含まない。
    async fn list_loans(&self, include_deleted: bool) -> Result<Vec<LoanDetail>>;

    /// 指定日に返却期限を迎える貸出中の貸出を返す
    async fn find_active_loans_expiring_on(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<ReminderCandidate>>;

    /// 書籍も利用者も1件も登録されていないか（初期データ投入の判定用）
    async fn is_empty(&self) -> Result<bool>;
}
