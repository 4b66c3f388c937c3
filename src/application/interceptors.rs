use crate::ports::{ChangeEntry, ChangeSet, EntryState};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// コミット時インターセプター
///
/// コミット1回につき1度、ストアへ渡る直前の変更集合に対して呼ばれる。
/// コミットを失敗させてはならない。
pub trait CommitInterceptor: Send + Sync {
    fn saving_changes(&self, entries: &mut [ChangeEntry], now: DateTime<Utc>);
}

/// 登録順に適用されるインターセプターの列
#[derive(Clone, Default)]
pub struct InterceptorChain {
    interceptors: Vec<Arc<dyn CommitInterceptor>>,
}

impl InterceptorChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// 論理削除インターセプターを含む標準構成
    pub fn standard() -> Self {
        Self::new().with(SoftDeleteInterceptor)
    }

    pub fn with(mut self, interceptor: impl CommitInterceptor + 'static) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    pub fn apply(&self, changes: &mut ChangeSet, now: DateTime<Utc>) {
        for interceptor in &self.interceptors {
            interceptor.saving_changes(changes.entries_mut(), now);
        }
    }
}

/// 論理削除インターセプター
///
/// 論理削除の能力を持つエンティティの Deleted を Modified に書き換え、
/// `is_deleted` と `deleted_at` を設定する。能力を持たないエンティティは
/// そのまま物理削除される。
#[derive(Debug, Clone, Copy, Default)]
pub struct SoftDeleteInterceptor;

impl CommitInterceptor for SoftDeleteInterceptor {
    fn saving_changes(&self, entries: &mut [ChangeEntry], now: DateTime<Utc>) {
        for entry in entries
            .iter_mut()
            .filter(|entry| entry.state == EntryState::Deleted)
        {
            let kind = entry.entity.kind();
            if let Some(soft_deletable) = entry.entity.as_soft_delete_mut() {
                soft_deletable.mark_deleted(now);
                entry.state = EntryState::Modified;
                tracing::debug!("Rewrote delete of {} into tombstone update", kind);
            }
        }
    }
}
