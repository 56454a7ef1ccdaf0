//! Loan ledger endpoints (issue, return, listings, counters)

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::loan::{Loan, LoanCounts, LoanDetails},
};

use super::{AuthenticatedUser, MessageResponse};

/// Issue request body
#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IssueRequest {
    /// Book to issue to the caller
    pub book_id: Option<String>,
}

/// Return request body
#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReturnRequest {
    /// Book the caller is returning
    pub book_id: Option<String>,
}

/// Issue response with the created loan
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IssueResponse {
    /// Status message
    pub message: String,
    /// The loan that was created
    pub issued_book: Loan,
}

/// Missing and malformed book IDs are rejected the same way
fn parse_book_id(raw: Option<&str>) -> Result<Uuid, AppError> {
    raw.map(str::trim)
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| AppError::Validation("Valid book ID is required".to_string()))
}

/// Issue a book to the caller
#[utoipa::path(
    post,
    path = "/issued/issue",
    tag = "issued",
    security(("bearer_auth" = [])),
    request_body = IssueRequest,
    responses(
        (status = 201, description = "Book issued", body = IssueResponse),
        (status = 400, description = "Invalid book ID, borrow limit reached, or book unavailable"),
        (status = 404, description = "Book not found"),
        (status = 409, description = "Caller already holds this book")
    )
)]
pub async fn issue_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<IssueRequest>,
) -> AppResult<(StatusCode, Json<IssueResponse>)> {
    let book_id = parse_book_id(request.book_id.as_deref())?;

    let loan = state.services.lending.issue(claims.user_id, book_id).await?;

    Ok((
        StatusCode::CREATED,
        Json(IssueResponse {
            message: "Book issued successfully".to_string(),
            issued_book: loan,
        }),
    ))
}

/// Return a book held by the caller
#[utoipa::path(
    post,
    path = "/issued/return",
    tag = "issued",
    security(("bearer_auth" = [])),
    request_body = ReturnRequest,
    responses(
        (status = 200, description = "Book returned", body = MessageResponse),
        (status = 400, description = "Invalid book ID"),
        (status = 404, description = "No active loan for this book")
    )
)]
pub async fn return_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<ReturnRequest>,
) -> AppResult<Json<MessageResponse>> {
    let book_id = parse_book_id(request.book_id.as_deref())?;

    state.services.lending.return_book(claims.user_id, book_id).await?;

    Ok(Json(MessageResponse {
        message: "Book returned successfully".to_string(),
    }))
}

/// Active loans held by the caller
#[utoipa::path(
    get,
    path = "/issued/user",
    tag = "issued",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Caller's active loans", body = Vec<LoanDetails>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn my_loans(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<LoanDetails>>> {
    let loans = state.services.lending.loans_for_user(claims.user_id).await?;
    Ok(Json(loans))
}

/// Active loans held by a specific user (admin)
#[utoipa::path(
    get,
    path = "/issued/user/{user_id}",
    tag = "issued",
    security(("bearer_auth" = [])),
    params(
        ("user_id" = String, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User's active loans", body = Vec<LoanDetails>),
        (status = 400, description = "Malformed user ID"),
        (status = 403, description = "Admin access only")
    )
)]
pub async fn user_loans(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(user_id): Path<String>,
) -> AppResult<Json<Vec<LoanDetails>>> {
    claims.require_admin()?;

    let user_id = Uuid::parse_str(user_id.trim())
        .map_err(|_| AppError::Validation("Valid user ID is required".to_string()))?;

    let loans = state.services.lending.loans_for_user(user_id).await?;
    Ok(Json(loans))
}

/// All loan records, history included (admin)
#[utoipa::path(
    get,
    path = "/issued",
    tag = "issued",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Every loan on record", body = Vec<LoanDetails>),
        (status = 403, description = "Admin access only")
    )
)]
pub async fn list_all_loans(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<LoanDetails>>> {
    claims.require_admin()?;

    let loans = state.services.lending.all_loans().await?;
    Ok(Json(loans))
}

/// Global issued/returned counters (admin)
#[utoipa::path(
    get,
    path = "/issued/counts",
    tag = "issued",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Ledger counters", body = LoanCounts),
        (status = 403, description = "Admin access only")
    )
)]
pub async fn loan_counts(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<LoanCounts>> {
    claims.require_admin()?;

    let counts = state.services.lending.counts().await?;
    Ok(Json(counts))
}

/// Active holders of a book (admin)
#[utoipa::path(
    get,
    path = "/issued/book/{book_id}",
    tag = "issued",
    security(("bearer_auth" = [])),
    params(
        ("book_id" = String, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Active loans on the book", body = Vec<LoanDetails>),
        (status = 400, description = "Malformed book ID"),
        (status = 403, description = "Admin access only"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn book_holders(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(book_id): Path<String>,
) -> AppResult<Json<Vec<LoanDetails>>> {
    claims.require_admin()?;

    let book_id = parse_book_id(Some(&book_id))?;

    let loans = state.services.lending.holders_of_book(book_id).await?;
    Ok(Json(loans))
}
