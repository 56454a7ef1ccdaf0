//! Book catalog endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookView, CreateBook, UpdateBook},
};

use super::{AuthenticatedUser, MessageResponse};

/// Query parameters for book deletion
#[derive(Deserialize)]
pub struct DeleteBookQuery {
    /// Delete even when active loans reference the book
    pub force: Option<bool>,
}

fn parse_book_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| AppError::Validation("Valid book ID is required".to_string()))
}

fn validation_message(errors: &validator::ValidationErrors) -> String {
    errors
        .field_errors()
        .values()
        .flat_map(|errs| errs.iter())
        .find_map(|err| err.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| "Invalid request".to_string())
}

/// List all books
///
/// Admins see ledger counters per book, members the derived availability.
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All books, shaped by caller role", body = Vec<BookView>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_books(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<BookView>>> {
    let books = state.services.catalog.list_books(claims.role).await?;
    Ok(Json(books))
}

/// Get a single book by ID
#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(
        ("id" = String, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book details, shaped by caller role", body = BookView),
        (status = 400, description = "Malformed book ID"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<String>,
) -> AppResult<Json<BookView>> {
    let id = parse_book_id(&id)?;

    let book = state.services.catalog.get_book(id, claims.role).await?;
    Ok(Json(book))
}

/// Create a new book (admin)
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    security(("bearer_auth" = [])),
    request_body = CreateBook,
    responses(
        (status = 201, description = "Book created", body = Book),
        (status = 400, description = "Invalid payload"),
        (status = 403, description = "Admin access only")
    )
)]
pub async fn create_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(payload): Json<CreateBook>,
) -> AppResult<(StatusCode, Json<Book>)> {
    claims.require_admin()?;

    payload
        .validate()
        .map_err(|e| AppError::Validation(validation_message(&e)))?;

    let book = state.services.catalog.create_book(payload).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

/// Update a book (admin)
#[utoipa::path(
    put,
    path = "/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(
        ("id" = String, Path, description = "Book ID")
    ),
    request_body = UpdateBook,
    responses(
        (status = 200, description = "Book updated", body = Book),
        (status = 400, description = "Invalid payload"),
        (status = 403, description = "Admin access only"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn update_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<String>,
    Json(payload): Json<UpdateBook>,
) -> AppResult<Json<Book>> {
    claims.require_admin()?;

    let id = parse_book_id(&id)?;
    payload
        .validate()
        .map_err(|e| AppError::Validation(validation_message(&e)))?;

    let book = state.services.catalog.update_book(id, payload).await?;
    Ok(Json(book))
}

/// Delete a book (admin)
///
/// Refused while active loans reference the book unless force=true is
/// passed; a forced delete orphans those loan records.
#[utoipa::path(
    delete,
    path = "/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(
        ("id" = String, Path, description = "Book ID"),
        ("force" = Option<bool>, Query, description = "Delete even with active loans")
    ),
    responses(
        (status = 200, description = "Book deleted", body = MessageResponse),
        (status = 403, description = "Admin access only"),
        (status = 404, description = "Book not found"),
        (status = 409, description = "Book has active loans")
    )
)]
pub async fn delete_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<String>,
    Query(query): Query<DeleteBookQuery>,
) -> AppResult<Json<MessageResponse>> {
    claims.require_admin()?;

    let id = parse_book_id(&id)?;

    state
        .services
        .catalog
        .delete_book(id, query.force.unwrap_or(false))
        .await?;

    Ok(Json(MessageResponse {
        message: "Book deleted successfully".to_string(),
    }))
}
