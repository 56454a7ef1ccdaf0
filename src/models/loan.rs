//! Loan ledger model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Loan record from the ledger
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Loan {
    pub id: Uuid,
    pub user_id: Uuid,
    pub book_id: Uuid,
    pub issued_at: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
    pub returned: bool,
    pub returned_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Loan {
    /// An active loan past its due date is overdue. Derived on read,
    /// never stored.
    pub fn is_overdue_at(&self, now: DateTime<Utc>) -> bool {
        !self.returned && self.due_at < now
    }
}

/// Compact book fields joined into loan listings
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookSummary {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub category: String,
    pub isbn: Option<String>,
    pub quantity: i32,
}

/// Loan with full details for display
///
/// `book` is None when the book was force-deleted after issue;
/// the loan itself remains on record.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoanDetails {
    pub id: Uuid,
    pub user_id: Uuid,
    pub book_id: Uuid,
    pub issued_at: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
    pub returned: bool,
    pub returned_at: Option<DateTime<Utc>>,
    pub book: Option<BookSummary>,
    pub is_overdue: bool,
}

/// Global ledger counters
#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoanCounts {
    pub issued_count: i64,
    pub returned_count: i64,
}
