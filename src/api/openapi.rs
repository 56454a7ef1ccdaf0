//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{books, health, loans};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Lendura API",
        version = "1.0.0",
        description = "Library Lending System REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html"),
        contact(name = "Lendura Team", email = "contact@lendura.org")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Books
        books::list_books,
        books::get_book,
        books::create_book,
        books::update_book,
        books::delete_book,
        // Issued books
        loans::issue_book,
        loans::return_book,
        loans::my_loans,
        loans::user_loans,
        loans::list_all_loans,
        loans::loan_counts,
        loans::book_holders,
    ),
    components(
        schemas(
            // Books
            crate::models::book::Book,
            crate::models::book::BookView,
            crate::models::book::AdminBookView,
            crate::models::book::MemberBookView,
            crate::models::book::CreateBook,
            crate::models::book::UpdateBook,
            // Loans
            loans::IssueRequest,
            loans::ReturnRequest,
            loans::IssueResponse,
            crate::models::loan::Loan,
            crate::models::loan::BookSummary,
            crate::models::loan::LoanDetails,
            crate::models::loan::LoanCounts,
            // Identity
            crate::models::user::Role,
            // Health
            health::HealthResponse,
            // Errors
            crate::api::MessageResponse,
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "books", description = "Book catalog management"),
        (name = "issued", description = "Loan ledger and lending workflows")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
