//! Availability projection over the loan ledger
//!
//! Books carry no stored availability. What a caller sees is computed here
//! from the nominal copy count and the ledger counters, shaped by role:
//! admins get the raw counters, members only the derived shelf count.

use crate::models::{
    book::{AdminBookView, Book, BookLoanStats, BookView, MemberBookView},
    user::Role,
};

/// Copies still on the shelf. Clamped at zero for the case where an admin
/// shrank `quantity` below the number currently issued.
pub fn available_quantity(quantity: i32, issued_count: i64) -> i64 {
    (quantity as i64 - issued_count).max(0)
}

/// Shape a book for the caller's role
pub fn project_book(book: Book, stats: BookLoanStats, role: Role) -> BookView {
    match role {
        Role::Admin => BookView::Admin(AdminBookView {
            issued_count: stats.issued_count,
            returned_count: stats.returned_count,
            overdue_count: stats.overdue_count,
            book,
        }),
        Role::Member => BookView::Member(MemberBookView {
            available_quantity: available_quantity(book.quantity, stats.issued_count),
            book,
        }),
    }
}
