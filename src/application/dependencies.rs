use crate::ports::{Clock, EntityStore};
use std::sync::Arc;

use super::interceptors::InterceptorChain;

/// サービスの依存関係
///
/// 関数型DDDの原則に従い、データ構造として定義。
/// 振る舞いは持たず、各ユースケース関数に明示的に渡す。
#[derive(Clone)]
pub struct ServiceDependencies {
    pub entity_store: Arc<dyn EntityStore>,
    pub clock: Arc<dyn Clock>,
    pub interceptors: InterceptorChain,
}

impl ServiceDependencies {
    /// 標準のインターセプター構成（論理削除）で依存関係を組み立てる
    pub fn new(entity_store: Arc<dyn EntityStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            entity_store,
            clock,
            interceptors: InterceptorChain::standard(),
        }
    }
}
