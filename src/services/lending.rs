//! Lending policy service: issue and return workflows

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::{
    config::LendingConfig,
    error::{AppError, AppResult},
    models::loan::{Loan, LoanCounts, LoanDetails},
    repository::Repository,
};

#[derive(Clone)]
pub struct LendingService {
    repository: Repository,
    policy: LendingConfig,
}

impl LendingService {
    pub fn new(repository: Repository, policy: LendingConfig) -> Self {
        Self { repository, policy }
    }

    /// Issue a book to a user. The due date is the issue instant plus the
    /// configured loan period; every policy check runs atomically in the
    /// repository transaction.
    pub async fn issue(&self, user_id: Uuid, book_id: Uuid) -> AppResult<Loan> {
        let now = Utc::now();
        let due_at = now + Duration::days(self.policy.loan_period_days);

        self.repository
            .loans
            .create(user_id, book_id, now, due_at, self.policy.max_active_loans)
            .await
    }

    /// Return the caller's active loan for a book
    pub async fn return_book(&self, user_id: Uuid, book_id: Uuid) -> AppResult<Loan> {
        let loan = self
            .repository
            .loans
            .find_active(user_id, book_id)
            .await?
            .ok_or(AppError::NoActiveLoan)?;

        self.repository.loans.mark_returned(loan.id, Utc::now()).await
    }

    /// Active loans held by a user
    pub async fn loans_for_user(&self, user_id: Uuid) -> AppResult<Vec<LoanDetails>> {
        self.repository.loans.find_active_for_user(user_id).await
    }

    /// Active loans on a book
    pub async fn holders_of_book(&self, book_id: Uuid) -> AppResult<Vec<LoanDetails>> {
        // Verify the book exists so a bad ID reads as 404, not an empty list
        self.repository.books.get_by_id(book_id).await?;
        self.repository.loans.find_active_for_book(book_id).await
    }

    /// Every loan on record, history included
    pub async fn all_loans(&self) -> AppResult<Vec<LoanDetails>> {
        self.repository.loans.find_all().await
    }

    /// Global issued/returned counters
    pub async fn counts(&self) -> AppResult<LoanCounts> {
        self.repository.loans.global_counts().await
    }
}
