//! Loans repository for database operations
//!
//! The loans table is the system of record for lending state. Availability
//! and overdue status are always derived from it, never stored.

use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, FromRow, Pool, Postgres, Row};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::loan::{BookSummary, Loan, LoanCounts, LoanDetails},
};

/// Partial unique index guaranteeing one active loan per (user, book)
const ACTIVE_LOAN_CONSTRAINT: &str = "loans_active_user_book_key";

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Create a loan, enforcing every lending rule inside one transaction.
    ///
    /// The per-user advisory lock serializes concurrent issues by the same
    /// user (borrow limit), and the FOR UPDATE on the book row serializes
    /// concurrent issues of the same book (copy count). The partial unique
    /// index backstops the one-active-loan-per-book rule.
    pub async fn create(
        &self,
        user_id: Uuid,
        book_id: Uuid,
        now: DateTime<Utc>,
        due_at: DateTime<Utc>,
        max_active: i64,
    ) -> AppResult<Loan> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(user_lock_key(user_id))
            .execute(&mut *tx)
            .await?;

        let quantity: i32 = sqlx::query_scalar("SELECT quantity FROM books WHERE id = $1 FOR UPDATE")
            .bind(book_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Book not found".to_string()))?;

        let user_active = active_count_for_user(&mut *tx, user_id).await?;
        if user_active >= max_active {
            return Err(AppError::BorrowLimitExceeded(max_active));
        }

        let book_active = active_count_for_book(&mut *tx, book_id).await?;
        if book_active >= quantity as i64 {
            return Err(AppError::BookUnavailable);
        }

        let loan = sqlx::query_as::<_, Loan>(
            r#"
            INSERT INTO loans (id, user_id, book_id, issued_at, due_at, returned, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, FALSE, $4, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(book_id)
        .bind(now)
        .bind(due_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db) = &e {
                if db.constraint() == Some(ACTIVE_LOAN_CONSTRAINT) {
                    return AppError::DuplicateActiveLoan;
                }
            }
            AppError::from(e)
        })?;

        tx.commit().await?;

        Ok(loan)
    }

    /// Find the caller's active loan for a book, if any
    pub async fn find_active(&self, user_id: Uuid, book_id: Uuid) -> AppResult<Option<Loan>> {
        let loan = sqlx::query_as::<_, Loan>(
            "SELECT * FROM loans WHERE user_id = $1 AND book_id = $2 AND NOT returned",
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(loan)
    }

    /// Close a loan. The update is conditional on the loan still being
    /// active, so a concurrent return of the same loan loses cleanly.
    pub async fn mark_returned(&self, loan_id: Uuid, returned_at: DateTime<Utc>) -> AppResult<Loan> {
        sqlx::query_as::<_, Loan>(
            r#"
            UPDATE loans
            SET returned = TRUE, returned_at = $2, updated_at = $2
            WHERE id = $1 AND NOT returned
            RETURNING *
            "#,
        )
        .bind(loan_id)
        .bind(returned_at)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NoActiveLoan)
    }

    /// Active loans for a user, with book details
    pub async fn find_active_for_user(&self, user_id: Uuid) -> AppResult<Vec<LoanDetails>> {
        let rows = sqlx::query(
            r#"
            SELECT l.*, b.title AS book_title, b.author AS book_author,
                   b.category AS book_category, b.isbn AS book_isbn, b.quantity AS book_quantity
            FROM loans l
            LEFT JOIN books b ON b.id = l.book_id
            WHERE l.user_id = $1 AND NOT l.returned
            ORDER BY l.issued_at
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        collect_loan_details(rows)
    }

    /// Active loans on a book, with book details
    pub async fn find_active_for_book(&self, book_id: Uuid) -> AppResult<Vec<LoanDetails>> {
        let rows = sqlx::query(
            r#"
            SELECT l.*, b.title AS book_title, b.author AS book_author,
                   b.category AS book_category, b.isbn AS book_isbn, b.quantity AS book_quantity
            FROM loans l
            LEFT JOIN books b ON b.id = l.book_id
            WHERE l.book_id = $1 AND NOT l.returned
            ORDER BY l.issued_at
            "#,
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;

        collect_loan_details(rows)
    }

    /// Every loan on record, history included, newest first
    pub async fn find_all(&self) -> AppResult<Vec<LoanDetails>> {
        let rows = sqlx::query(
            r#"
            SELECT l.*, b.title AS book_title, b.author AS book_author,
                   b.category AS book_category, b.isbn AS book_isbn, b.quantity AS book_quantity
            FROM loans l
            LEFT JOIN books b ON b.id = l.book_id
            ORDER BY l.issued_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        collect_loan_details(rows)
    }

    /// Count active loans on a book
    pub async fn count_active_for_book(&self, book_id: Uuid) -> AppResult<i64> {
        active_count_for_book(&self.pool, book_id).await
    }

    /// Count active loans held by a user
    pub async fn count_active_for_user(&self, user_id: Uuid) -> AppResult<i64> {
        active_count_for_user(&self.pool, user_id).await
    }

    /// Count returned loans on a book
    pub async fn count_returned_for_book(&self, book_id: Uuid) -> AppResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM loans WHERE book_id = $1 AND returned")
                .bind(book_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    /// Count overdue loans on a book
    pub async fn count_overdue_for_book(
        &self,
        book_id: Uuid,
        as_of: DateTime<Utc>,
    ) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans WHERE book_id = $1 AND NOT returned AND due_at < $2",
        )
        .bind(book_id)
        .bind(as_of)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Global issued/returned counters
    pub async fn global_counts(&self) -> AppResult<LoanCounts> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) FILTER (WHERE NOT returned) AS issued_count,
                   COUNT(*) FILTER (WHERE returned) AS returned_count
            FROM loans
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(LoanCounts {
            issued_count: row.get("issued_count"),
            returned_count: row.get("returned_count"),
        })
    }

    /// Force-return every loan past its due date, as of the given instant.
    /// Returns the number of loans closed.
    pub async fn sweep_overdue(&self, as_of: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE loans
            SET returned = TRUE, returned_at = $1, updated_at = $1
            WHERE NOT returned AND due_at < $1
            "#,
        )
        .bind(as_of)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

/// Advisory lock key for a user, held for the span of the issue transaction.
/// Truncating the UUID can only merge lock keys, which over-serializes but
/// never lets two transactions for one user run concurrently.
fn user_lock_key(user_id: Uuid) -> i64 {
    let mut key = [0u8; 8];
    key.copy_from_slice(&user_id.as_bytes()[..8]);
    i64::from_be_bytes(key)
}

async fn active_count_for_user<'e, E>(executor: E, user_id: Uuid) -> AppResult<i64>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM loans WHERE user_id = $1 AND NOT returned")
            .bind(user_id)
            .fetch_one(executor)
            .await?;
    Ok(count)
}

async fn active_count_for_book<'e, E>(executor: E, book_id: Uuid) -> AppResult<i64>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM loans WHERE book_id = $1 AND NOT returned")
            .bind(book_id)
            .fetch_one(executor)
            .await?;
    Ok(count)
}

fn collect_loan_details(rows: Vec<PgRow>) -> AppResult<Vec<LoanDetails>> {
    let now = Utc::now();

    let mut result = Vec::with_capacity(rows.len());
    for row in rows {
        result.push(loan_details_from_row(&row, now)?);
    }

    Ok(result)
}

fn loan_details_from_row(row: &PgRow, now: DateTime<Utc>) -> AppResult<LoanDetails> {
    let loan = Loan::from_row(row)?;

    // book_title is NULL when the book was deleted after issue
    let book = row
        .get::<Option<String>, _>("book_title")
        .map(|title| BookSummary {
            id: loan.book_id,
            title,
            author: row.get::<Option<String>, _>("book_author").unwrap_or_default(),
            category: row.get::<Option<String>, _>("book_category").unwrap_or_default(),
            isbn: row.get("book_isbn"),
            quantity: row.get::<Option<i32>, _>("book_quantity").unwrap_or_default(),
        });

    let is_overdue = loan.is_overdue_at(now);

    Ok(LoanDetails {
        id: loan.id,
        user_id: loan.user_id,
        book_id: loan.book_id,
        issued_at: loan.issued_at,
        due_at: loan.due_at,
        returned: loan.returned,
        returned_at: loan.returned_at,
        book,
        is_overdue,
    })
}
