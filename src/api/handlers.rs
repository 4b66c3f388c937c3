use crate::application::{
    ServiceDependencies,
    book::{
        create_book as execute_create_book, delete_book as execute_delete_book,
        get_book as execute_get_book, list_books as execute_list_books,
        update_book as execute_update_book,
    },
    loan::{
        LoanReturnDetail, create_loan as execute_create_loan, list_loans as execute_list_loans,
        return_loan as execute_return_loan,
    },
    user::{
        create_user as execute_create_user, get_user as execute_get_user,
        list_users as execute_list_users,
    },
};
use crate::domain::{BookId, UserId, commands::DeleteBook};
use crate::ports::LoanDetail;
use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
};
use std::sync::Arc;
use uuid::Uuid;

use super::{
    error::ApiError,
    types::{
        BookResponse, CreateBookRequest, CreateLoanRequest, CreateUserRequest, GetBookQuery,
        ListBooksQuery, LoanResponse, UpdateBookRequest, UserResponse, return_command,
    },
    validation::validate_request,
};

// ============================================================================
// State
// ============================================================================

/// ハンドラー間で共有されるアプリケーション状態
#[derive(Clone)]
pub struct AppState {
    pub service_deps: ServiceDependencies,
}

// ============================================================================
// Books
// ============================================================================

/// GET /books - 書籍一覧
///
/// `?include_deleted=true` で論理削除済みの書籍も含める。
pub async fn list_books(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListBooksQuery>,
) -> Result<Json<Vec<BookResponse>>, ApiError> {
    let include_deleted = query.include_deleted.unwrap_or(false);

    let books = execute_list_books(&state.service_deps, include_deleted).await?;

    Ok(Json(books.into_iter().map(BookResponse::from).collect()))
}

/// GET /books/:id - 書籍をIDで取得
///
/// 論理削除済みの書籍も既定で返す（`?include_deleted=false` で除外）。
pub async fn get_book(
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<Uuid>,
    Query(query): Query<GetBookQuery>,
) -> Result<Json<BookResponse>, ApiError> {
    let include_deleted = query.include_deleted.unwrap_or(true);

    let book = execute_get_book(
        &state.service_deps,
        BookId::from_uuid(book_id),
        include_deleted,
    )
    .await?;

    Ok(Json(BookResponse::from(book)))
}

/// POST /books - 書籍を登録
pub async fn create_book(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateBookRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<BookResponse>), ApiError> {
    let Json(req) = payload?;
    validate_request(&req)?;

    let book = execute_create_book(&state.service_deps, req.to_command()).await?;

    Ok((StatusCode::CREATED, Json(BookResponse::from(book))))
}

/// PUT /books/:id - 書籍を部分更新
///
/// 総冊数の変更は貸出可能数にも同じ差分で反映される。
/// 貸出中の冊数を下回る変更は409を返す。
pub async fn update_book(
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<Uuid>,
    payload: Result<Json<UpdateBookRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(req) = payload?;
    validate_request(&req)?;

    execute_update_book(&state.service_deps, req.to_command(book_id)).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /books/:id - 書籍を削除（論理削除）
pub async fn delete_book(
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let cmd = DeleteBook {
        book_id: BookId::from_uuid(book_id),
    };

    execute_delete_book(&state.service_deps, cmd).await?;

    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Users
// ============================================================================

/// GET /users - 利用者一覧
pub async fn list_users(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users = execute_list_users(&state.service_deps).await?;

    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// GET /users/:id - 利用者をIDで取得
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = execute_get_user(&state.service_deps, UserId::from_uuid(user_id)).await?;

    Ok(Json(UserResponse::from(user)))
}

/// POST /users - 利用者を登録
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let Json(req) = payload?;
    validate_request(&req)?;

    let user = execute_create_user(&state.service_deps, req.to_command()).await?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

// ============================================================================
// Loans
// ============================================================================

/// GET /loans - 貸出一覧
///
/// 論理削除済みの書籍に対する貸出も書名付きで返す。
pub async fn list_loans(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<LoanDetail>>, ApiError> {
    let loans = execute_list_loans(&state.service_deps).await?;

    Ok(Json(loans))
}

/// POST /loans - 書籍を貸し出す
///
/// 強制されるビジネスルール:
/// - 利用者が存在すること
/// - 書籍が存在すること（論理削除済みは不可）
/// - 貸出可能な在庫があること
/// - 返却期限が明日以降であること
pub async fn create_loan(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateLoanRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<LoanResponse>), ApiError> {
    let Json(req) = payload?;
    let loan = execute_create_loan(&state.service_deps, req.to_command()).await?;

    Ok((StatusCode::CREATED, Json(LoanResponse::from(loan))))
}

/// PUT /loans/:id/return - 書籍を返却する
pub async fn return_loan(
    State(state): State<Arc<AppState>>,
    Path(loan_id): Path<Uuid>,
) -> Result<Json<LoanReturnDetail>, ApiError> {
    let detail = execute_return_loan(&state.service_deps, return_command(loan_id)).await?;

    Ok(Json(detail))
}
