//! Books repository for database operations

use chrono::{DateTime, Utc};
use sqlx::{FromRow, Pool, Postgres, Row};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookLoanStats, CreateBook},
};

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get book by ID
    pub async fn get_by_id(&self, id: Uuid) -> AppResult<Book> {
        sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Book not found".to_string()))
    }

    /// List all books with their ledger counters, newest first
    pub async fn list_with_stats(
        &self,
        as_of: DateTime<Utc>,
    ) -> AppResult<Vec<(Book, BookLoanStats)>> {
        let rows = sqlx::query(
            r#"
            SELECT b.*,
                   (SELECT COUNT(*) FROM loans l
                    WHERE l.book_id = b.id AND NOT l.returned) AS issued_count,
                   (SELECT COUNT(*) FROM loans l
                    WHERE l.book_id = b.id AND l.returned) AS returned_count,
                   (SELECT COUNT(*) FROM loans l
                    WHERE l.book_id = b.id AND NOT l.returned AND l.due_at < $1) AS overdue_count
            FROM books b
            ORDER BY b.created_at DESC
            "#,
        )
        .bind(as_of)
        .fetch_all(&self.pool)
        .await?;

        let mut result = Vec::with_capacity(rows.len());
        for row in rows {
            let book = Book::from_row(&row)?;
            let stats = BookLoanStats {
                issued_count: row.get("issued_count"),
                returned_count: row.get("returned_count"),
                overdue_count: row.get("overdue_count"),
            };
            result.push((book, stats));
        }

        Ok(result)
    }

    /// Create a new book
    pub async fn create(&self, book: &CreateBook) -> AppResult<Book> {
        let now = Utc::now();

        let created = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (id, title, author, isbn, category, quantity, image, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.isbn)
        .bind(&book.category)
        .bind(book.quantity)
        .bind(&book.image)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    /// Persist changes to a book
    pub async fn update(&self, book: &Book) -> AppResult<Book> {
        let updated = sqlx::query_as::<_, Book>(
            r#"
            UPDATE books
            SET title = $2, author = $3, isbn = $4, category = $5,
                quantity = $6, image = $7, updated_at = $8
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(book.id)
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.isbn)
        .bind(&book.category)
        .bind(book.quantity)
        .bind(&book.image)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Book not found".to_string()))?;

        Ok(updated)
    }

    /// Delete a book. Loan records referencing it are kept (orphaned),
    /// so deletion with active loans requires force.
    pub async fn delete(&self, id: Uuid, force: bool) -> AppResult<()> {
        self.get_by_id(id).await?;

        let active: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans WHERE book_id = $1 AND NOT returned",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        if active > 0 && !force {
            return Err(AppError::Conflict(
                "Book has active loans. Use force=true to delete anyway.".to_string(),
            ));
        }

        sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
