use serde::{Deserialize, Serialize};

use super::UserId;

/// 利用者（作成後は不変）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

/// 純粋関数：利用者を登録する
pub fn register_user(name: String, email: String) -> User {
    User {
        id: UserId::new(),
        name,
        email,
    }
}
