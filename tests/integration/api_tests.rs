//! API integration tests
//!
//! These run against a live server (cargo run) backed by a scratch
//! database. Identity is external in production, so tests mint their own
//! tokens with the shared JWT secret.

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde_json::{json, Value};
use uuid::Uuid;

use lendura_server::models::user::{Role, UserClaims};

const BASE_URL: &str = "http://localhost:8080/api/v1";

fn jwt_secret() -> String {
    std::env::var("JWT_SECRET").unwrap_or_else(|_| "change-this-secret-in-production".to_string())
}

/// Mint a token for a fresh user so loan limits never leak between tests
fn mint_token(role: Role) -> String {
    mint_token_for(Uuid::new_v4(), role)
}

fn mint_token_for(user_id: Uuid, role: Role) -> String {
    let now = Utc::now().timestamp();
    let claims = UserClaims {
        sub: format!("it-{}@lendura.test", user_id),
        user_id,
        role,
        exp: now + 3600,
        iat: now,
    };
    claims.create_token(&jwt_secret()).expect("Failed to sign test token")
}

/// Helper to create a book as admin, returning its ID
async fn create_book(client: &Client, admin_token: &str, title: &str, quantity: i32) -> String {
    let response = client
        .post(format!("{}/books", BASE_URL))
        .header("Authorization", format!("Bearer {}", admin_token))
        .json(&json!({
            "title": title,
            "author": "Integration Author",
            "category": "Testing",
            "quantity": quantity
        }))
        .send()
        .await
        .expect("Failed to send create book request");

    assert_eq!(response.status(), 201);

    let body: Value = response.json().await.expect("Failed to parse create response");
    body["id"].as_str().expect("No id in create response").to_string()
}

async fn issue_book(client: &Client, token: &str, book_id: &str) -> reqwest::Response {
    client
        .post(format!("{}/issued/issue", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({ "bookId": book_id }))
        .send()
        .await
        .expect("Failed to send issue request")
}

/// Best-effort cleanup so repeated runs do not accumulate books
async fn force_delete_book(client: &Client, admin_token: &str, book_id: &str) {
    let _ = client
        .delete(format!("{}/books/{}?force=true", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", admin_token))
        .send()
        .await;
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_readiness_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/ready", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
#[ignore]
async fn test_request_without_token_is_rejected() {
    let client = Client::new();

    let response = client
        .get(format!("{}/books", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["message"], "Not authorized, no token");
}

#[tokio::test]
#[ignore]
async fn test_member_cannot_create_book() {
    let client = Client::new();
    let member = mint_token(Role::Member);

    let response = client
        .post(format!("{}/books", BASE_URL))
        .header("Authorization", format!("Bearer {}", member))
        .json(&json!({
            "title": "Forbidden",
            "author": "Nobody",
            "category": "Testing",
            "quantity": 1
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 403);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["message"], "Admin access only");
}

#[tokio::test]
#[ignore]
async fn test_create_book_rejects_negative_quantity() {
    let client = Client::new();
    let admin = mint_token(Role::Admin);

    let response = client
        .post(format!("{}/books", BASE_URL))
        .header("Authorization", format!("Bearer {}", admin))
        .json(&json!({
            "title": "Negative",
            "author": "Nobody",
            "category": "Testing",
            "quantity": -1
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 400);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["message"], "Quantity must be a non-negative number");
}

#[tokio::test]
#[ignore]
async fn test_create_book_rejects_blank_required_fields() {
    let client = Client::new();
    let admin = mint_token(Role::Admin);

    // Whitespace trims down to nothing, same as omitting the field
    let response = client
        .post(format!("{}/books", BASE_URL))
        .header("Authorization", format!("Bearer {}", admin))
        .json(&json!({
            "title": "   ",
            "author": "Nobody",
            "category": "Testing",
            "quantity": 1
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 400);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["message"], "Missing required fields");
}

#[tokio::test]
#[ignore]
async fn test_issue_requires_valid_book_id() {
    let client = Client::new();
    let member = mint_token(Role::Member);

    // Missing bookId
    let response = client
        .post(format!("{}/issued/issue", BASE_URL))
        .header("Authorization", format!("Bearer {}", member))
        .json(&json!({}))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 400);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["message"], "Valid book ID is required");

    // Malformed bookId
    let response = client
        .post(format!("{}/issued/issue", BASE_URL))
        .header("Authorization", format!("Bearer {}", member))
        .json(&json!({ "bookId": "not-a-uuid" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 400);
}

#[tokio::test]
#[ignore]
async fn test_issue_unknown_book_returns_not_found() {
    let client = Client::new();
    let member = mint_token(Role::Member);

    let response = issue_book(&client, &member, &Uuid::new_v4().to_string()).await;

    assert_eq!(response.status(), 404);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["message"], "Book not found");
}

#[tokio::test]
#[ignore]
async fn test_issue_and_return_round_trip() {
    let client = Client::new();
    let admin = mint_token(Role::Admin);
    let borrower_id = Uuid::new_v4();
    let borrower = mint_token_for(borrower_id, Role::Member);
    let observer = mint_token(Role::Member);

    let book_id = create_book(&client, &admin, "Round Trip", 2).await;

    // Issue: 201 with the loan attached
    let response = issue_book(&client, &borrower, &book_id).await;
    assert_eq!(response.status(), 201);

    let body: Value = response.json().await.expect("Failed to parse issue response");
    assert_eq!(body["message"], "Book issued successfully");
    assert_eq!(body["issuedBook"]["bookId"], book_id);
    assert_eq!(body["issuedBook"]["userId"], borrower_id.to_string());
    assert_eq!(body["issuedBook"]["returned"], false);

    // Due date is issue date plus the seven-day loan period
    let issued_at: DateTime<Utc> = body["issuedBook"]["issuedAt"]
        .as_str()
        .and_then(|s| s.parse().ok())
        .expect("issuedAt missing or unparseable");
    let due_at: DateTime<Utc> = body["issuedBook"]["dueAt"]
        .as_str()
        .and_then(|s| s.parse().ok())
        .expect("dueAt missing or unparseable");
    assert_eq!((due_at - issued_at).num_days(), 7);

    // One copy left on the shelf
    let response = client
        .get(format!("{}/books/{}", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", observer))
        .send()
        .await
        .expect("Failed to fetch book");
    let body: Value = response.json().await.expect("Failed to parse book");
    assert_eq!(body["availableQuantity"], 1);

    // The borrower sees the active loan
    let response = client
        .get(format!("{}/issued/user", BASE_URL))
        .header("Authorization", format!("Bearer {}", borrower))
        .send()
        .await
        .expect("Failed to fetch loans");
    let body: Value = response.json().await.expect("Failed to parse loans");
    let loans = body.as_array().expect("Expected a loan array");
    assert_eq!(loans.len(), 1);
    assert_eq!(loans[0]["isOverdue"], false);
    assert_eq!(loans[0]["book"]["title"], "Round Trip");

    // Return restores availability
    let response = client
        .post(format!("{}/issued/return", BASE_URL))
        .header("Authorization", format!("Bearer {}", borrower))
        .json(&json!({ "bookId": book_id }))
        .send()
        .await
        .expect("Failed to send return request");
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.expect("Failed to parse return response");
    assert_eq!(body["message"], "Book returned successfully");

    let response = client
        .get(format!("{}/books/{}", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", observer))
        .send()
        .await
        .expect("Failed to fetch book");
    let body: Value = response.json().await.expect("Failed to parse book");
    assert_eq!(body["availableQuantity"], 2);

    // The closed loan moves from the issued counter to the returned one
    let response = client
        .get(format!("{}/books/{}", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", admin))
        .send()
        .await
        .expect("Failed to fetch book as admin");
    let body: Value = response.json().await.expect("Failed to parse admin view");
    assert_eq!(body["issuedCount"], 0);
    assert_eq!(body["returnedCount"], 1);
    assert_eq!(body["overdueCount"], 0);

    force_delete_book(&client, &admin, &book_id).await;
}

#[tokio::test]
#[ignore]
async fn test_borrow_limit_enforced() {
    let client = Client::new();
    let admin = mint_token(Role::Admin);
    let member = mint_token(Role::Member);

    let first = create_book(&client, &admin, "Limit One", 1).await;
    let second = create_book(&client, &admin, "Limit Two", 1).await;
    let third = create_book(&client, &admin, "Limit Three", 1).await;

    assert_eq!(issue_book(&client, &member, &first).await.status(), 201);
    assert_eq!(issue_book(&client, &member, &second).await.status(), 201);

    let response = issue_book(&client, &member, &third).await;
    assert_eq!(response.status(), 400);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(
        body["message"],
        "You can only issue a maximum of 2 books at a time"
    );

    for id in [&first, &second, &third] {
        force_delete_book(&client, &admin, id).await;
    }
}

#[tokio::test]
#[ignore]
async fn test_book_unavailable_when_all_copies_issued() {
    let client = Client::new();
    let admin = mint_token(Role::Admin);
    let first_borrower = mint_token(Role::Member);
    let second_borrower = mint_token(Role::Member);

    let book_id = create_book(&client, &admin, "Single Copy", 1).await;

    assert_eq!(issue_book(&client, &first_borrower, &book_id).await.status(), 201);

    let response = issue_book(&client, &second_borrower, &book_id).await;
    assert_eq!(response.status(), 400);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["message"], "Book not available");

    force_delete_book(&client, &admin, &book_id).await;
}

#[tokio::test]
#[ignore]
async fn test_zero_quantity_book_is_never_available() {
    let client = Client::new();
    let admin = mint_token(Role::Admin);
    let member = mint_token(Role::Member);

    let book_id = create_book(&client, &admin, "Out of Stock", 0).await;

    let response = issue_book(&client, &member, &book_id).await;
    assert_eq!(response.status(), 400);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["message"], "Book not available");

    force_delete_book(&client, &admin, &book_id).await;
}

#[tokio::test]
#[ignore]
async fn test_duplicate_issue_conflicts() {
    let client = Client::new();
    let admin = mint_token(Role::Admin);
    let member = mint_token(Role::Member);

    // Plenty of copies, so only the duplicate rule can fire
    let book_id = create_book(&client, &admin, "Duplicate", 3).await;

    assert_eq!(issue_book(&client, &member, &book_id).await.status(), 201);
    assert_eq!(issue_book(&client, &member, &book_id).await.status(), 409);

    force_delete_book(&client, &admin, &book_id).await;
}

#[tokio::test]
#[ignore]
async fn test_return_without_active_loan() {
    let client = Client::new();
    let admin = mint_token(Role::Admin);
    let member = mint_token(Role::Member);

    let book_id = create_book(&client, &admin, "Never Issued", 1).await;

    let response = client
        .post(format!("{}/issued/return", BASE_URL))
        .header("Authorization", format!("Bearer {}", member))
        .json(&json!({ "bookId": book_id }))
        .send()
        .await
        .expect("Failed to send return request");

    assert_eq!(response.status(), 404);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["message"], "No active issued book found for you");

    force_delete_book(&client, &admin, &book_id).await;
}

#[tokio::test]
#[ignore]
async fn test_role_projection_on_book_detail() {
    let client = Client::new();
    let admin = mint_token(Role::Admin);
    let member = mint_token(Role::Member);

    let book_id = create_book(&client, &admin, "Projection", 2).await;
    assert_eq!(issue_book(&client, &member, &book_id).await.status(), 201);

    // Admin sees raw ledger counters
    let response = client
        .get(format!("{}/books/{}", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", admin))
        .send()
        .await
        .expect("Failed to fetch book as admin");
    let body: Value = response.json().await.expect("Failed to parse admin view");
    assert_eq!(body["issuedCount"], 1);
    assert_eq!(body["returnedCount"], 0);
    assert_eq!(body["overdueCount"], 0);
    assert!(body.get("availableQuantity").is_none());

    // Member sees only the derived availability
    let response = client
        .get(format!("{}/books/{}", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", member))
        .send()
        .await
        .expect("Failed to fetch book as member");
    let body: Value = response.json().await.expect("Failed to parse member view");
    assert_eq!(body["availableQuantity"], 1);
    assert!(body.get("issuedCount").is_none());
    assert!(body.get("overdueCount").is_none());

    force_delete_book(&client, &admin, &book_id).await;
}

#[tokio::test]
#[ignore]
async fn test_admin_loan_listings_and_counts() {
    let client = Client::new();
    let admin = mint_token(Role::Admin);
    let borrower_id = Uuid::new_v4();
    let borrower = mint_token_for(borrower_id, Role::Member);

    let book_id = create_book(&client, &admin, "Listings", 1).await;
    assert_eq!(issue_book(&client, &borrower, &book_id).await.status(), 201);

    // Per-user listing
    let response = client
        .get(format!("{}/issued/user/{}", BASE_URL, borrower_id))
        .header("Authorization", format!("Bearer {}", admin))
        .send()
        .await
        .expect("Failed to fetch user loans");
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse user loans");
    assert_eq!(body.as_array().map(Vec::len), Some(1));

    // Per-book holders
    let response = client
        .get(format!("{}/issued/book/{}", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", admin))
        .send()
        .await
        .expect("Failed to fetch book holders");
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse holders");
    let holders = body.as_array().expect("Expected holder array");
    assert_eq!(holders.len(), 1);
    assert_eq!(holders[0]["userId"], borrower_id.to_string());

    // Global counters
    let response = client
        .get(format!("{}/issued/counts", BASE_URL))
        .header("Authorization", format!("Bearer {}", admin))
        .send()
        .await
        .expect("Failed to fetch counts");
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse counts");
    assert!(body["issuedCount"].as_i64().unwrap_or(0) >= 1);
    assert!(body["returnedCount"].is_number());

    // Members are locked out of admin listings
    let response = client
        .get(format!("{}/issued/counts", BASE_URL))
        .header("Authorization", format!("Bearer {}", borrower))
        .send()
        .await
        .expect("Failed to send member counts request");
    assert_eq!(response.status(), 403);

    force_delete_book(&client, &admin, &book_id).await;
}

#[tokio::test]
#[ignore]
async fn test_admin_counters_reflect_ledger_history() {
    let client = Client::new();
    let admin = mint_token(Role::Admin);

    let book_id = create_book(&client, &admin, "Ledger History", 3).await;

    // Two borrowers issue and return, leaving closed loans behind
    for _ in 0..2 {
        let past_borrower = mint_token(Role::Member);
        assert_eq!(issue_book(&client, &past_borrower, &book_id).await.status(), 201);

        let response = client
            .post(format!("{}/issued/return", BASE_URL))
            .header("Authorization", format!("Bearer {}", past_borrower))
            .json(&json!({ "bookId": book_id }))
            .send()
            .await
            .expect("Failed to send return request");
        assert_eq!(response.status(), 200);
    }

    // Three more keep their copies
    for _ in 0..3 {
        let holder = mint_token(Role::Member);
        assert_eq!(issue_book(&client, &holder, &book_id).await.status(), 201);
    }

    // The listing counters cover the whole ledger, not just open loans
    let response = client
        .get(format!("{}/books", BASE_URL))
        .header("Authorization", format!("Bearer {}", admin))
        .send()
        .await
        .expect("Failed to fetch books");
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse books");
    let books = body.as_array().expect("Expected a book array");
    let entry = books
        .iter()
        .find(|b| b["id"] == book_id)
        .expect("Created book missing from listing");
    assert_eq!(entry["issuedCount"], 3);
    assert_eq!(entry["returnedCount"], 2);
    assert_eq!(entry["overdueCount"], 0);

    force_delete_book(&client, &admin, &book_id).await;
}

#[tokio::test]
#[ignore]
async fn test_delete_book_with_active_loans_requires_force() {
    let client = Client::new();
    let admin = mint_token(Role::Admin);
    let member = mint_token(Role::Member);

    let book_id = create_book(&client, &admin, "Deletable", 1).await;
    assert_eq!(issue_book(&client, &member, &book_id).await.status(), 201);

    let response = client
        .delete(format!("{}/books/{}", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", admin))
        .send()
        .await
        .expect("Failed to send delete request");
    assert_eq!(response.status(), 409);

    let response = client
        .delete(format!("{}/books/{}?force=true", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", admin))
        .send()
        .await
        .expect("Failed to send forced delete request");
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.expect("Failed to parse delete response");
    assert_eq!(body["message"], "Book deleted successfully");

    // The orphaned loan is still on the member's listing, without book data
    let response = client
        .get(format!("{}/issued/user", BASE_URL))
        .header("Authorization", format!("Bearer {}", member))
        .send()
        .await
        .expect("Failed to fetch loans");
    let body: Value = response.json().await.expect("Failed to parse loans");
    let loans = body.as_array().expect("Expected a loan array");
    assert_eq!(loans.len(), 1);
    assert!(loans[0]["book"].is_null());
}
