//! Data models for Lendura

pub mod book;
pub mod loan;
pub mod user;

// Re-export commonly used types
pub use book::{Book, BookLoanStats, BookView};
pub use loan::{Loan, LoanCounts, LoanDetails};
pub use user::{Role, UserClaims};
