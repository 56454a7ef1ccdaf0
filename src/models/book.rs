//! Book model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Image path used when a book is created without a cover
pub const DEFAULT_BOOK_IMAGE: &str = "/uploads/default-book.png";

/// Book catalog entry
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub category: String,
    /// Nominal copy count; availability is derived from the loan ledger
    pub quantity: i32,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Per-book counters derived from the loan ledger
#[derive(Debug, Clone, Copy, Default)]
pub struct BookLoanStats {
    pub issued_count: i64,
    pub returned_count: i64,
    pub overdue_count: i64,
}

/// Book as seen by a caller, shaped by role
#[derive(Debug, Serialize, ToSchema)]
#[serde(untagged)]
pub enum BookView {
    Admin(AdminBookView),
    Member(MemberBookView),
}

/// Admin projection: raw ledger counters attached
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminBookView {
    #[serde(flatten)]
    pub book: Book,
    pub issued_count: i64,
    pub returned_count: i64,
    pub overdue_count: i64,
}

/// Member projection: only the derived availability
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MemberBookView {
    #[serde(flatten)]
    pub book: Book,
    pub available_quantity: i64,
}

/// Required text fields are trimmed before storage, so whitespace-only
/// input reads as missing.
fn validate_required_text(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("required"));
    }
    Ok(())
}

/// Create book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBook {
    #[validate(custom(function = "validate_required_text", message = "Missing required fields"))]
    pub title: String,
    #[validate(custom(function = "validate_required_text", message = "Missing required fields"))]
    pub author: String,
    pub isbn: Option<String>,
    #[validate(custom(function = "validate_required_text", message = "Missing required fields"))]
    pub category: String,
    #[validate(range(min = 0, message = "Quantity must be a non-negative number"))]
    pub quantity: i32,
    pub image: Option<String>,
}

/// Update book request; absent fields are left unchanged
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBook {
    #[validate(custom(function = "validate_required_text", message = "Missing required fields"))]
    pub title: Option<String>,
    #[validate(custom(function = "validate_required_text", message = "Missing required fields"))]
    pub author: Option<String>,
    pub isbn: Option<String>,
    #[validate(custom(function = "validate_required_text", message = "Missing required fields"))]
    pub category: Option<String>,
    #[validate(range(min = 0, message = "Quantity must be a non-negative number"))]
    pub quantity: Option<i32>,
    pub image: Option<String>,
}
