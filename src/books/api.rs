//! Catalog route handlers

use crate::books::{
    external::ExternalBookService,
    models::{AuthorGroup, Book, BookInput, ExternalDetails},
    store::{BookError, BookStore, TOP_BORROWED_LIMIT},
};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use std::sync::Arc;

/// Shared catalog state
#[derive(Clone)]
pub struct BookState {
    pub store: Arc<BookStore>,
    pub external: Arc<ExternalBookService>,
}

// ===== Route Handlers =====

/// GET /api/books
pub async fn list_books(State(state): State<BookState>) -> Result<Json<Vec<Book>>, ApiError> {
    Ok(Json(state.store.list()?))
}

/// GET /api/books/:id
pub async fn get_book(
    State(state): State<BookState>,
    Path(id): Path<i64>,
) -> Result<Json<Book>, ApiError> {
    state
        .store
        .get(id)?
        .map(Json)
        .ok_or(ApiError::NotFound(format!("Book {} not found", id)))
}

/// POST /api/books (Admin)
pub async fn create_book(
    State(state): State<BookState>,
    input: Result<Json<BookInput>, JsonRejection>,
) -> Result<Json<Book>, ApiError> {
    let Json(input) = input?;
    Ok(Json(state.store.create(&input)?))
}

/// PUT /api/books/:id (Admin)
pub async fn update_book(
    State(state): State<BookState>,
    Path(id): Path<i64>,
    input: Result<Json<BookInput>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(input) = input?;
    state.store.update(id, &input)?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/books/:id (Admin)
pub async fn delete_book(
    State(state): State<BookState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.store.delete(id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/books/grouped-by-author
pub async fn books_grouped_by_author(
    State(state): State<BookState>,
) -> Result<Json<Vec<AuthorGroup>>, ApiError> {
    Ok(Json(state.store.grouped_by_author()?))
}

/// GET /api/books/top-borrowed
pub async fn top_borrowed_books(
    State(state): State<BookState>,
) -> Result<Json<Vec<Book>>, ApiError> {
    Ok(Json(state.store.top_borrowed(TOP_BORROWED_LIMIT)?))
}

/// GET /api/books/:id/external-details
pub async fn external_details(
    State(state): State<BookState>,
    Path(id): Path<i64>,
) -> Json<ExternalDetails> {
    Json(state.external.fetch_details(id).await)
}

// ===== Error Handling =====

#[derive(Debug)]
pub enum ApiError {
    Database(String),
    NotFound(String),
    BadRequest(String),
}

impl From<BookError> for ApiError {
    fn from(err: BookError) -> Self {
        match err {
            BookError::NotFound(_) => ApiError::NotFound(err.to_string()),
            BookError::Validation(msg) => ApiError::BadRequest(msg),
            BookError::Database(e) => ApiError::Database(e.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Database(err) => {
                tracing::error!("Database error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        };

        let body = Json(json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}
