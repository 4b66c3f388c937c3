use crate::domain::{Book, BookId, Loan, LoanId, User, UserId};
use crate::ports::{ChangeSet, Clock, StoreTransaction, TrackedEntity};
use std::sync::Arc;

use super::{
    dependencies::ServiceDependencies,
    errors::{ApplicationError, Result},
    interceptors::InterceptorChain,
};

/// 1回の変更操作の作業単位
///
/// ストアのトランザクション上で読み取りと変更の登録を行い、
/// `commit` でインターセプターを適用してから変更集合をまとめて永続化する。
/// コミットせずにdropした場合は何も反映されない。
pub struct UnitOfWork {
    tx: Box<dyn StoreTransaction>,
    changes: ChangeSet,
    interceptors: InterceptorChain,
    clock: Arc<dyn Clock>,
}

impl UnitOfWork {
    pub async fn begin(deps: &ServiceDependencies) -> Result<Self> {
        let tx = deps
            .entity_store
            .begin()
            .await
            .map_err(ApplicationError::Store)?;

        Ok(Self {
            tx,
            changes: ChangeSet::new(),
            interceptors: deps.interceptors.clone(),
            clock: deps.clock.clone(),
        })
    }

    pub async fn find_book(&mut self, book_id: BookId, include_deleted: bool) -> Result<Option<Book>> {
        self.tx
            .find_book(book_id, include_deleted)
            .await
            .map_err(ApplicationError::Store)
    }

    pub async fn find_user(&mut self, user_id: UserId) -> Result<Option<User>> {
        self.tx.find_user(user_id).await.map_err(ApplicationError::Store)
    }

    pub async fn find_loan(&mut self, loan_id: LoanId) -> Result<Option<Loan>> {
        self.tx.find_loan(loan_id).await.map_err(ApplicationError::Store)
    }

    pub async fn has_active_loans(&mut self, book_id: BookId) -> Result<bool> {
        self.tx
            .has_active_loans(book_id)
            .await
            .map_err(ApplicationError::Store)
    }

    pub fn add(&mut self, entity: impl Into<TrackedEntity>) {
        self.changes.add(entity);
    }

    pub fn update(&mut self, entity: impl Into<TrackedEntity>) {
        self.changes.update(entity);
    }

    pub fn remove(&mut self, entity: impl Into<TrackedEntity>) {
        self.changes.remove(entity);
    }

    /// インターセプターを適用し、変更集合を1単位として永続化する
    pub async fn commit(self) -> Result<()> {
        let Self {
            tx,
            mut changes,
            interceptors,
            clock,
        } = self;

        interceptors.apply(&mut changes, clock.now());
        tracing::debug!("Committing {} change(s)", changes.len());

        tx.persist(changes).await.map_err(ApplicationError::Store)
    }
}
