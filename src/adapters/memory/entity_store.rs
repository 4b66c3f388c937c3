use crate::domain::{Book, BookId, Loan, LoanId, User, UserId, loan::expires_on};
use crate::ports::entity_store::{
    ChangeEntry, ChangeSet, EntityStore as EntityStoreTrait, EntryState, LoanDetail,
    ReminderCandidate, Result, StoreTransaction, TrackedEntity,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// Errors raised when a change batch does not fit the stored rows
#[derive(Debug, Error)]
pub enum MemoryStoreError {
    #[error("{kind} {id} already exists")]
    DuplicateRow { kind: &'static str, id: Uuid },

    #[error("{kind} {id} does not exist")]
    MissingRow { kind: &'static str, id: Uuid },

    #[error("loan {loan_id} references missing {kind} {id}")]
    DanglingReference {
        loan_id: Uuid,
        kind: &'static str,
        id: Uuid,
    },
}

/// Row storage. Each table keeps insertion order, which is the listing order.
#[derive(Debug, Clone, Default)]
struct Tables {
    books: Vec<Book>,
    users: Vec<User>,
    loans: Vec<Loan>,
}

impl Tables {
    fn find_book(&self, book_id: BookId, include_deleted: bool) -> Option<&Book> {
        self.books
            .iter()
            .find(|book| book.id == book_id && (include_deleted || !book.is_deleted))
    }

    fn find_user(&self, user_id: UserId) -> Option<&User> {
        self.users.iter().find(|user| user.id == user_id)
    }

    fn find_loan(&self, loan_id: LoanId) -> Option<&Loan> {
        self.loans.iter().find(|loan| loan.id == loan_id)
    }

    fn has_active_loans(&self, book_id: BookId) -> bool {
        self.loans
            .iter()
            .any(|loan| loan.book_id == book_id && loan.is_active())
    }

    fn loan_details(&self, include_deleted: bool) -> Vec<LoanDetail> {
        self.loans
            .iter()
            .filter_map(|loan| {
                let book = self.find_book(loan.book_id, include_deleted)?;
                let user = self.find_user(loan.user_id)?;
                Some(LoanDetail {
                    loan_id: loan.id,
                    user_id: user.id,
                    book_id: book.id,
                    user_email: user.email.clone(),
                    book_title: book.title.clone(),
                    start_date: loan.start_date,
                    expiration_date: loan.expiration_date,
                    return_date: loan.return_date,
                })
            })
            .collect()
    }

    fn reminder_candidates(&self, date: NaiveDate) -> Vec<ReminderCandidate> {
        self.loans
            .iter()
            .filter(|loan| expires_on(loan, date))
            .filter_map(|loan| {
                let book = self.find_book(loan.book_id, true)?;
                let user = self.find_user(loan.user_id)?;
                Some(ReminderCandidate {
                    loan_id: loan.id,
                    user_name: user.name.clone(),
                    user_email: user.email.clone(),
                    book_title: book.title.clone(),
                    expiration_date: loan.expiration_date,
                })
            })
            .collect()
    }

    fn apply(&mut self, entry: ChangeEntry) -> std::result::Result<(), MemoryStoreError> {
        match (entry.state, entry.entity) {
            (EntryState::Added, TrackedEntity::Book(book)) => {
                insert_row(&mut self.books, book, |b| b.id.value(), "book")
            }
            (EntryState::Modified, TrackedEntity::Book(book)) => {
                replace_row(&mut self.books, book, |b| b.id.value(), "book")
            }
            (EntryState::Deleted, TrackedEntity::Book(book)) => {
                delete_row(&mut self.books, book.id.value(), |b| b.id.value(), "book")
            }
            (EntryState::Added, TrackedEntity::User(user)) => {
                insert_row(&mut self.users, user, |u| u.id.value(), "user")
            }
            (EntryState::Modified, TrackedEntity::User(user)) => {
                replace_row(&mut self.users, user, |u| u.id.value(), "user")
            }
            (EntryState::Deleted, TrackedEntity::User(user)) => {
                delete_row(&mut self.users, user.id.value(), |u| u.id.value(), "user")
            }
            (EntryState::Added, TrackedEntity::Loan(loan)) => {
                self.check_loan_references(&loan)?;
                insert_row(&mut self.loans, loan, |l| l.id.value(), "loan")
            }
            (EntryState::Modified, TrackedEntity::Loan(loan)) => {
                replace_row(&mut self.loans, loan, |l| l.id.value(), "loan")
            }
            (EntryState::Deleted, TrackedEntity::Loan(loan)) => {
                delete_row(&mut self.loans, loan.id.value(), |l| l.id.value(), "loan")
            }
        }
    }

    fn check_loan_references(&self, loan: &Loan) -> std::result::Result<(), MemoryStoreError> {
        if self.find_book(loan.book_id, true).is_none() {
            return Err(MemoryStoreError::DanglingReference {
                loan_id: loan.id.value(),
                kind: "book",
                id: loan.book_id.value(),
            });
        }
        if self.find_user(loan.user_id).is_none() {
            return Err(MemoryStoreError::DanglingReference {
                loan_id: loan.id.value(),
                kind: "user",
                id: loan.user_id.value(),
            });
        }
        Ok(())
    }
}

fn insert_row<T>(
    rows: &mut Vec<T>,
    row: T,
    key: impl Fn(&T) -> Uuid,
    kind: &'static str,
) -> std::result::Result<(), MemoryStoreError> {
    let id = key(&row);
    if rows.iter().any(|existing| key(existing) == id) {
        return Err(MemoryStoreError::DuplicateRow { kind, id });
    }
    rows.push(row);
    Ok(())
}

fn replace_row<T>(
    rows: &mut [T],
    row: T,
    key: impl Fn(&T) -> Uuid,
    kind: &'static str,
) -> std::result::Result<(), MemoryStoreError> {
    let id = key(&row);
    let slot = rows
        .iter_mut()
        .find(|existing| key(existing) == id)
        .ok_or(MemoryStoreError::MissingRow { kind, id })?;
    *slot = row;
    Ok(())
}

fn delete_row<T>(
    rows: &mut Vec<T>,
    id: Uuid,
    key: impl Fn(&T) -> Uuid,
    kind: &'static str,
) -> std::result::Result<(), MemoryStoreError> {
    let position = rows
        .iter()
        .position(|existing| key(existing) == id)
        .ok_or(MemoryStoreError::MissingRow { kind, id })?;
    rows.remove(position);
    Ok(())
}

/// In-memory implementation of EntityStore
///
/// All tables live behind one async mutex. A transaction owns the lock until it
/// is persisted or dropped, so check-then-mutate sequences are serialized.
#[derive(Clone, Default)]
pub struct EntityStore {
    tables: Arc<Mutex<Tables>>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Transaction holding the table lock
struct MemoryTransaction {
    tables: OwnedMutexGuard<Tables>,
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn find_book(&mut self, book_id: BookId, include_deleted: bool) -> Result<Option<Book>> {
        Ok(self.tables.find_book(book_id, include_deleted).cloned())
    }

    async fn find_user(&mut self, user_id: UserId) -> Result<Option<User>> {
        Ok(self.tables.find_user(user_id).cloned())
    }

    async fn find_loan(&mut self, loan_id: LoanId) -> Result<Option<Loan>> {
        Ok(self.tables.find_loan(loan_id).cloned())
    }

    async fn has_active_loans(&mut self, book_id: BookId) -> Result<bool> {
        Ok(self.tables.has_active_loans(book_id))
    }

    /// Apply the batch to a copy of the tables and swap it in only if every entry applied
    async fn persist(self: Box<Self>, changes: ChangeSet) -> Result<()> {
        let mut tx = *self;
        let mut staged = (*tx.tables).clone();

        for entry in changes.into_entries() {
            staged.apply(entry)?;
        }

        *tx.tables = staged;
        Ok(())
    }
}

#[async_trait]
impl EntityStoreTrait for EntityStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>> {
        let tables = self.tables.clone().lock_owned().await;
        Ok(Box::new(MemoryTransaction { tables }))
    }

    async fn list_books(&self, include_deleted: bool) -> Result<Vec<Book>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .books
            .iter()
            .filter(|book| include_deleted || !book.is_deleted)
            .cloned()
            .collect())
    }

    async fn get_book(&self, book_id: BookId, include_deleted: bool) -> Result<Option<Book>> {
        let tables = self.tables.lock().await;
        Ok(tables.find_book(book_id, include_deleted).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let tables = self.tables.lock().await;
        Ok(tables.users.clone())
    }

    async fn get_user(&self, user_id: UserId) -> Result<Option<User>> {
        let tables = self.tables.lock().await;
        Ok(tables.find_user(user_id).cloned())
    }

    async fn list_loans(&self, include_deleted: bool) -> Result<Vec<LoanDetail>> {
        let tables = self.tables.lock().await;
        Ok(tables.loan_details(include_deleted))
    }

    async fn find_active_loans_expiring_on(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<ReminderCandidate>> {
        let tables = self.tables.lock().await;
        Ok(tables.reminder_candidates(date))
    }

    async fn is_empty(&self) -> Result<bool> {
        let tables = self.tables.lock().await;
        Ok(tables.books.is_empty() && tables.users.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{book::register_book, user::register_user};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    fn loan_for(book: &Book, user: &User, expiration_date: NaiveDate) -> Loan {
        Loan {
            id: LoanId::new(),
            book_id: book.id,
            user_id: user.id,
            start_date: day(1),
            expiration_date,
            return_date: None,
        }
    }

    async fn seed(store: &EntityStore, changes: ChangeSet) {
        let tx = store.begin().await.unwrap();
        tx.persist(changes).await.unwrap();
    }

    #[tokio::test]
    async fn test_persist_applies_batch() {
        let store = EntityStore::new();
        let book = register_book("Title".to_string(), "Author".to_string(), 2);
        let user = register_user("Alice".to_string(), "alice@example.com".to_string());

        let mut changes = ChangeSet::new();
        changes.add(book.clone());
        changes.add(user.clone());
        changes.add(loan_for(&book, &user, day(20)));
        seed(&store, changes).await;

        assert_eq!(store.list_books(false).await.unwrap(), vec![book]);
        assert_eq!(store.list_users().await.unwrap(), vec![user]);
        assert_eq!(store.list_loans(true).await.unwrap().len(), 1);
        assert!(!store.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_failed_batch_leaves_tables_untouched() {
        let store = EntityStore::new();
        let book = register_book("Title".to_string(), "Author".to_string(), 2);
        let mut changes = ChangeSet::new();
        changes.add(book.clone());
        seed(&store, changes).await;

        // 2件目が存在しない利用者を参照しているためバッチ全体が失敗する
        let updated = Book {
            available: 1,
            ..book.clone()
        };
        let ghost = register_user("Ghost".to_string(), "ghost@example.com".to_string());
        let mut changes = ChangeSet::new();
        changes.update(updated);
        changes.add(loan_for(&book, &ghost, day(20)));

        let tx = store.begin().await.unwrap();
        assert!(tx.persist(changes).await.is_err());

        let stored = store.get_book(book.id, false).await.unwrap().unwrap();
        assert_eq!(stored.available, 2);
        assert!(store.list_loans(true).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dropped_transaction_discards_nothing_and_releases_lock() {
        let store = EntityStore::new();
        {
            let mut tx = store.begin().await.unwrap();
            assert!(!tx.has_active_loans(BookId::new()).await.unwrap());
        }

        // ロックが解放されていれば次のトランザクションを開始できる
        let tx = store.begin().await.unwrap();
        tx.persist(ChangeSet::new()).await.unwrap();
        assert!(store.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_live_view_hides_tombstoned_books() {
        let store = EntityStore::new();
        let mut book = register_book("Title".to_string(), "Author".to_string(), 1);
        book.is_deleted = true;
        book.deleted_at = Some(chrono::Utc::now());

        let mut changes = ChangeSet::new();
        changes.add(book.clone());
        seed(&store, changes).await;

        assert!(store.list_books(false).await.unwrap().is_empty());
        assert_eq!(store.list_books(true).await.unwrap().len(), 1);
        assert!(store.get_book(book.id, false).await.unwrap().is_none());
        assert!(store.get_book(book.id, true).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_reminder_candidates_only_active_loans_on_date() {
        let store = EntityStore::new();
        let book = register_book("Title".to_string(), "Author".to_string(), 5);
        let user = register_user("Alice".to_string(), "alice@example.com".to_string());

        let due = loan_for(&book, &user, day(11));
        let later = loan_for(&book, &user, day(12));
        let returned = Loan {
            return_date: Some(day(5)),
            ..loan_for(&book, &user, day(11))
        };

        let mut changes = ChangeSet::new();
        changes.add(book.clone());
        changes.add(user.clone());
        changes.add(due.clone());
        changes.add(later);
        changes.add(returned);
        seed(&store, changes).await;

        let candidates = store.find_active_loans_expiring_on(day(11)).await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].loan_id, due.id);
        assert_eq!(candidates[0].user_email, "alice@example.com");
        assert_eq!(candidates[0].book_title, "Title");
    }

    #[tokio::test]
    async fn test_physical_delete_of_user() {
        let store = EntityStore::new();
        let user = register_user("Alice".to_string(), "alice@example.com".to_string());
        let mut changes = ChangeSet::new();
        changes.add(user.clone());
        seed(&store, changes).await;

        let mut changes = ChangeSet::new();
        changes.remove(user.clone());
        seed(&store, changes).await;

        assert!(store.get_user(user.id).await.unwrap().is_none());
    }
}
