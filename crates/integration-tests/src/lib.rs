//! Integration tests for Lending Desk.
//!
//! The client is exercised end to end against a `wiremock` server standing in
//! for the lending API, so no real server or database is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p lending-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `session` - Login, registration, 401 handling, session restore
//! - `catalog` - Book queries, caching and read retries
//! - `cart_checkout` - Cart badge, duplicate submits, checkout invalidation
//! - `loans_reviews` - Loan returns and reviews
//! - `admin` - Local admin gating and admin mutations

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::{Path, PathBuf};
use std::time::Duration;

use lending_client::api::User;
use lending_client::{ClientConfig, LendingApp, SessionFile, Store};
use lending_core::UserRole;
use secrecy::SecretString;
use serde_json::{Value, json};
use url::Url;
use wiremock::MockServer;

/// Token handed out by [`TestContext::signed_in`].
pub const TEST_TOKEN: &str = "test-token";

/// A mock lending API and an app pointed at it.
///
/// The session file lives under the system temp directory and is removed on
/// drop.
pub struct TestContext {
    pub server: MockServer,
    pub app: LendingApp,
    pub session_path: PathBuf,
}

impl TestContext {
    /// An app with no session.
    pub async fn new() -> Self {
        let server = MockServer::start().await;
        let session_path =
            std::env::temp_dir().join(format!("lending-it-{}.json", uuid::Uuid::new_v4()));
        let app = Self::build_app(&server, &session_path);
        Self {
            server,
            app,
            session_path,
        }
    }

    /// An app already signed in as user 1 with `role`.
    pub async fn signed_in(role: UserRole) -> Self {
        let ctx = Self::new().await;
        ctx.app
            .store()
            .sign_in(SecretString::from(TEST_TOKEN), user(1, role))
            .await;
        ctx
    }

    /// A second app sharing this context's server and session file, as a
    /// fresh process would see it.
    #[must_use]
    pub fn relaunch(&self) -> LendingApp {
        Self::build_app(&self.server, &self.session_path)
    }

    /// The session file backing the app.
    #[must_use]
    pub fn session_file(&self) -> SessionFile {
        SessionFile::new(&self.session_path)
    }

    fn build_app(server: &MockServer, session_path: &Path) -> LendingApp {
        let mut config = ClientConfig::new(
            Url::parse(&server.uri()).expect("mock server URI is a valid URL"),
        );
        config.session_file = session_path.to_path_buf();
        config.read_retries = 2;
        config.retry_base = Duration::from_millis(5);

        let store = Store::with_session_file(SessionFile::new(session_path));
        LendingApp::new(&config, store).expect("Failed to build app")
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.session_path);
    }
}

// =============================================================================
// Fixtures
// =============================================================================

/// A user record as the API returns it.
#[must_use]
pub fn user(id: i32, role: UserRole) -> User {
    serde_json::from_value(user_json(id, role)).expect("user fixture matches User")
}

#[must_use]
pub fn user_json(id: i32, role: UserRole) -> Value {
    let role = match role {
        UserRole::User => "USER",
        UserRole::Admin => "ADMIN",
    };
    json!({
        "id": id,
        "name": format!("Reader {id}"),
        "email": format!("reader{id}@example.org"),
        "role": role,
        "createdAt": "2026-01-10T09:00:00Z"
    })
}

#[must_use]
pub fn profile_json(id: i32, role: UserRole) -> Value {
    let mut profile = user_json(id, role);
    profile["loanStats"] = json!({ "total": 4, "active": 1, "returned": 3, "overdue": 0 });
    profile
}

#[must_use]
pub fn book_json(id: i32, title: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "isbn": format!("978-0-00-{id:06}"),
        "stock": 3,
        "availableStock": 2,
        "averageRating": 4.5,
        "totalReviews": 2,
        "author": { "id": 7, "name": "Frank Herbert" },
        "category": { "id": 2, "name": "Science Fiction" },
        "createdAt": "2026-01-01T00:00:00Z"
    })
}

#[must_use]
pub fn cart_json(items: &[(i32, i32)]) -> Value {
    let items: Vec<Value> = items
        .iter()
        .map(|&(item_id, book_id)| {
            json!({
                "id": item_id,
                "bookId": book_id,
                "book": book_json(book_id, &format!("Book {book_id}"))
            })
        })
        .collect();
    json!({ "id": 1, "userId": 1, "items": items })
}

#[must_use]
pub fn loan_json(id: i32, book_id: i32, status: &str) -> Value {
    json!({
        "id": id,
        "userId": 1,
        "bookId": book_id,
        "borrowDate": "2026-05-01T10:00:00Z",
        "dueDate": "2026-05-06T10:00:00Z",
        "status": status,
        "book": book_json(book_id, &format!("Book {book_id}")),
        "createdAt": "2026-05-01T10:00:00Z"
    })
}

#[must_use]
pub fn review_json(id: i32, book_id: i32, star: u8) -> Value {
    json!({
        "id": id,
        "userId": 1,
        "bookId": book_id,
        "star": star,
        "comment": "Worth it",
        "user": { "id": 1, "name": "Reader 1" },
        "createdAt": "2026-05-02T08:00:00Z"
    })
}

/// Wrap `data` in the paginated envelope.
#[must_use]
pub fn page(data: Vec<Value>, page: u32, limit: u32, total: u32) -> Value {
    json!({
        "data": data,
        "meta": {
            "total": total,
            "page": page,
            "limit": limit,
            "totalPages": total.div_ceil(limit.max(1))
        }
    })
}
