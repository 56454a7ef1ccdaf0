//! Book catalog service

use chrono::Utc;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        book::{Book, BookLoanStats, BookView, CreateBook, UpdateBook, DEFAULT_BOOK_IMAGE},
        user::Role,
    },
    repository::Repository,
    services::availability,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// List all books, projected for the caller's role
    pub async fn list_books(&self, role: Role) -> AppResult<Vec<BookView>> {
        let books = self.repository.books.list_with_stats(Utc::now()).await?;

        Ok(books
            .into_iter()
            .map(|(book, stats)| availability::project_book(book, stats, role))
            .collect())
    }

    /// Get a single book, projected for the caller's role
    pub async fn get_book(&self, id: Uuid, role: Role) -> AppResult<BookView> {
        let book = self.repository.books.get_by_id(id).await?;

        let stats = BookLoanStats {
            issued_count: self.repository.loans.count_active_for_book(id).await?,
            returned_count: self.repository.loans.count_returned_for_book(id).await?,
            overdue_count: self
                .repository
                .loans
                .count_overdue_for_book(id, Utc::now())
                .await?,
        };

        Ok(availability::project_book(book, stats, role))
    }

    /// Create a new book
    pub async fn create_book(&self, mut payload: CreateBook) -> AppResult<Book> {
        payload.title = payload.title.trim().to_string();
        payload.author = payload.author.trim().to_string();
        payload.category = payload.category.trim().to_string();
        payload.isbn = payload.isbn.map(|s| s.trim().to_string());
        if payload.image.is_none() {
            payload.image = Some(DEFAULT_BOOK_IMAGE.to_string());
        }

        self.repository.books.create(&payload).await
    }

    /// Apply a partial update to a book
    pub async fn update_book(&self, id: Uuid, changes: UpdateBook) -> AppResult<Book> {
        let mut book = self.repository.books.get_by_id(id).await?;

        if let Some(title) = changes.title {
            book.title = title.trim().to_string();
        }
        if let Some(author) = changes.author {
            book.author = author.trim().to_string();
        }
        if let Some(isbn) = changes.isbn {
            book.isbn = Some(isbn.trim().to_string());
        }
        if let Some(category) = changes.category {
            book.category = category.trim().to_string();
        }
        if let Some(quantity) = changes.quantity {
            book.quantity = quantity;
        }
        if let Some(image) = changes.image {
            book.image = Some(image);
        }

        self.repository.books.update(&book).await
    }

    /// Delete a book; requires force when active loans reference it
    pub async fn delete_book(&self, id: Uuid, force: bool) -> AppResult<()> {
        self.repository.books.delete(id, force).await
    }
}
