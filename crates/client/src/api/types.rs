//! Wire types for the lending REST API.
//!
//! Records are mirrored from server responses as-is (camelCase JSON). The
//! client caches and displays them; it never derives stock, status or due
//! dates from them for anything but transient display.

use chrono::{DateTime, NaiveDate, Utc};
use lending_core::{
    AuthorId, BookId, BorrowDuration, CartId, CartItemId, CategoryId, LoanId, LoanStatus,
    ReviewId, StarRating, UserId, UserRole,
};
use serde::{Deserialize, Serialize};

// =============================================================================
// Users & Auth
// =============================================================================

/// A library member or administrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_photo: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Loan counters attached to the profile endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LoanStats {
    pub total: u32,
    pub active: u32,
    pub returned: u32,
    pub overdue: u32,
}

/// `GET /me` response: the user plus loan counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(flatten)]
    pub user: User,
    #[serde(default)]
    pub loan_stats: LoanStats,
}

/// Login request body.
#[derive(Debug, Clone, Serialize)]
pub struct LoginPayload {
    pub email: String,
    pub password: String,
}

/// Registration request body.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterPayload {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Token and user returned by login and registration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

/// A user summary embedded in reviews.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: UserId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_photo: Option<String>,
}

// =============================================================================
// Catalog
// =============================================================================

/// A book author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub id: AuthorId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

/// A catalog category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

/// A catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub isbn: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub stock: u32,
    pub available_stock: u32,
    #[serde(default)]
    pub average_rating: f64,
    #[serde(default)]
    pub total_reviews: u32,
    pub author: Author,
    pub category: Category,
    pub created_at: DateTime<Utc>,
}

impl Book {
    /// Whether the server reports at least one copy on the shelf.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        self.available_stock > 0
    }
}

/// A book summary embedded in reviews.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookSummary {
    pub id: BookId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
}

// =============================================================================
// Pagination
// =============================================================================

/// Pagination metadata for list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub total: u32,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
}

impl PaginationMeta {
    /// Page count for `total` items at `limit` per page (`ceil(total / limit)`).
    #[must_use]
    pub const fn pages_for(total: u32, limit: u32) -> u32 {
        if limit == 0 {
            return 0;
        }
        total.div_ceil(limit)
    }

    /// Whether `total_pages` agrees with `total` and `limit`.
    #[must_use]
    pub const fn is_consistent(&self) -> bool {
        self.total_pages == Self::pages_for(self.total, self.limit)
    }

    /// Whether there is a page after this one.
    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

/// A page of results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub meta: PaginationMeta,
}

// =============================================================================
// Cart
// =============================================================================

/// One book staged in the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: CartItemId,
    pub book_id: BookId,
    pub book: Book,
}

/// The current user's cart.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<CartId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub items: Vec<CartItem>,
}

impl Cart {
    /// Number of staged books.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        u32::try_from(self.items.len()).unwrap_or(u32::MAX)
    }

    /// Whether an item with this ID is in the cart.
    #[must_use]
    pub fn contains(&self, id: CartItemId) -> bool {
        self.items.iter().any(|item| item.id == id)
    }

    /// Items whose IDs appear in `selected`, in cart order.
    #[must_use]
    pub fn selected<'a>(&'a self, selected: &'a [CartItemId]) -> Vec<&'a CartItem> {
        self.items
            .iter()
            .filter(|item| selected.contains(&item.id))
            .collect()
    }
}

/// `POST /cart/items` body.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCartItem {
    pub book_id: BookId,
}

// =============================================================================
// Loans
// =============================================================================

/// A borrowed book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Loan {
    pub id: LoanId,
    pub user_id: UserId,
    pub book_id: BookId,
    pub borrow_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_date: Option<DateTime<Utc>>,
    pub status: LoanStatus,
    pub book: Book,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    pub created_at: DateTime<Utc>,
}

/// `POST /loans` body.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BorrowRequest {
    pub book_id: BookId,
    pub days: BorrowDuration,
}

/// `POST /loans/from-cart` body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartCheckoutRequest {
    pub item_ids: Vec<CartItemId>,
    pub days: BorrowDuration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub borrow_date: Option<NaiveDate>,
}

/// `POST /loans/from-cart` response.
///
/// Deployments answer either with the bare list of created loans or wrapped
/// in an object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CheckoutResponse {
    Loans(Vec<Loan>),
    Wrapped { loans: Vec<Loan> },
    Data { data: Vec<Loan> },
}

impl CheckoutResponse {
    /// The created loans.
    #[must_use]
    pub fn into_loans(self) -> Vec<Loan> {
        match self {
            Self::Loans(loans) | Self::Wrapped { loans } | Self::Data { data: loans } => loans,
        }
    }
}

// =============================================================================
// Reviews
// =============================================================================

/// A member's review of a book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: ReviewId,
    pub user_id: UserId,
    pub book_id: BookId,
    pub star: StarRating,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub user: UserSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub book: Option<BookSummary>,
    pub created_at: DateTime<Utc>,
}

/// `POST /reviews` body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReview {
    pub book_id: BookId,
    pub star: StarRating,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

// =============================================================================
// Admin
// =============================================================================

/// Dashboard counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminOverview {
    pub total_books: u32,
    pub total_users: u32,
    pub total_loans: u32,
    pub active_loans: u32,
    pub overdue_loans: u32,
    pub returned_loans: u32,
}

/// `POST /admin/loans` body.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminLoanCreate {
    pub user_id: UserId,
    pub book_id: BookId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_at: Option<NaiveDate>,
}

/// `PATCH /admin/loans/:id` body.
#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminLoanUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_at: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<LoanStatus>,
}

/// Category create/update body.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryInput {
    pub name: String,
}

/// Author create/update body.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorInput {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

/// An image file to upload with a multipart form.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Book create/update form (sent as multipart).
#[derive(Debug, Clone)]
pub struct BookInput {
    pub title: String,
    pub isbn: String,
    pub description: String,
    pub stock: u32,
    pub author_id: AuthorId,
    pub category_id: CategoryId,
    pub cover_image: Option<Upload>,
}

/// Profile update form (sent as multipart).
#[derive(Debug, Clone, Default)]
pub struct ProfileInput {
    pub name: String,
    pub phone: Option<String>,
    pub profile_photo: Option<Upload>,
}
