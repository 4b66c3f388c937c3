use axum::{
    Router,
    routing::{get, put},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers::{
    AppState, create_book, create_loan, create_user, delete_book, get_book, get_user, list_books,
    list_loans, list_users, return_loan, update_book,
};

/// Creates the API router with the catalog and loan endpoints
///
/// Books:
/// - GET /books, POST /books
/// - GET /books/:id, PUT /books/:id, DELETE /books/:id
///
/// Users:
/// - GET /users, POST /users, GET /users/:id
///
/// Loans:
/// - GET /loans, POST /loans
/// - PUT /loans/:id/return
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check endpoint
        .route("/health", get(health_check))
        .route("/books", get(list_books).post(create_book))
        .route(
            "/books/:id",
            get(get_book).put(update_book).delete(delete_book),
        )
        .route("/users", get(list_users).post(create_user))
        .route("/users/:id", get(get_user))
        .route("/loans", get(list_loans).post(create_loan))
        .route("/loans/:id/return", put(return_loan))
        // Add tracing middleware
        .layer(TraceLayer::new_for_http())
        // Add application state
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
