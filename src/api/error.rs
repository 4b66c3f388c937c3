use crate::application::ApplicationError;
use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::types::ErrorResponse;

/// ボディ全体に対する検証エラーのキー
pub const REQUEST_BODY_FIELD: &str = "body";

/// API層のエラー型
///
/// アプリケーション層のエラーをラップし、HTTPレスポンスへのマッピングを提供する。
#[derive(Debug)]
pub struct ApiError(ApplicationError);

impl From<ApplicationError> for ApiError {
    fn from(err: ApplicationError) -> Self {
        ApiError(err)
    }
}

/// 読み取れないリクエストボディは `body` フィールドの検証エラーとして扱う
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(ApplicationError::field_error(
            REQUEST_BODY_FIELD,
            rejection.body_text(),
        ))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = self.0.to_string();

        let (status, body) = match self.0 {
            // 404 Not Found - リクエストされたリソースが存在しない
            ApplicationError::UserNotFound => (
                StatusCode::NOT_FOUND,
                ErrorResponse::new("USER_NOT_FOUND", message),
            ),
            ApplicationError::BookNotFound => (
                StatusCode::NOT_FOUND,
                ErrorResponse::new("BOOK_NOT_FOUND", message),
            ),
            ApplicationError::LoanNotFound => (
                StatusCode::NOT_FOUND,
                ErrorResponse::new("LOAN_NOT_FOUND", message),
            ),

            // 409 Conflict - 現在の状態と矛盾する操作
            ApplicationError::NoAvailableCopies => (
                StatusCode::CONFLICT,
                ErrorResponse::new("NO_AVAILABLE_COPIES", message),
            ),
            ApplicationError::LoanAlreadyReturned => (
                StatusCode::CONFLICT,
                ErrorResponse::new("LOAN_ALREADY_RETURNED", message),
            ),
            ApplicationError::BookHasActiveLoan => (
                StatusCode::CONFLICT,
                ErrorResponse::new("BOOK_HAS_ACTIVE_LOAN", message),
            ),
            ApplicationError::UnreturnedCopies => (
                StatusCode::CONFLICT,
                ErrorResponse::new("UNRETURNED_COPIES", message),
            ),

            // 400 Bad Request - 入力値の検証エラー
            ApplicationError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new("VALIDATION_ERROR", message).with_field_errors(errors),
            ),

            // 500 Internal Server Error - システム障害
            // 内部エラーの詳細はログに記録し、クライアントには一般的なメッセージのみを返す
            ApplicationError::Store(ref e) => {
                tracing::error!("Entity store error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("STORE_ERROR", "Failed to access the data store"),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
