use crate::application::{
    dependencies::ServiceDependencies,
    errors::{ApplicationError, Result},
    unit_of_work::UnitOfWork,
};
use crate::domain::{self, User, UserId, commands::CreateUser};

/// 利用者一覧を取得する
pub async fn list_users(deps: &ServiceDependencies) -> Result<Vec<User>> {
    deps.entity_store
        .list_users()
        .await
        .map_err(ApplicationError::Store)
}

/// IDで利用者を取得する
pub async fn get_user(deps: &ServiceDependencies, user_id: UserId) -> Result<User> {
    deps.entity_store
        .get_user(user_id)
        .await
        .map_err(ApplicationError::Store)?
        .ok_or(ApplicationError::UserNotFound)
}

/// 利用者を登録する
pub async fn create_user(deps: &ServiceDependencies, cmd: CreateUser) -> Result<User> {
    let user = domain::user::register_user(cmd.name, cmd.email);

    let mut uow = UnitOfWork::begin(deps).await?;
    uow.add(user.clone());
    uow.commit().await?;

    tracing::info!("User {} registered", user.id);
    Ok(user)
}
