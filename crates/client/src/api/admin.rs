//! Administrative endpoints.
//!
//! The server authorizes every call; the client additionally hides these
//! operations from non-admin sessions (see [`crate::views::Route`]).

use lending_core::{AuthorId, CategoryId, LoanId};
use reqwest::Method;
use serde::Serialize;
use tracing::instrument;

use super::{
    AdminLoanCreate, AdminLoanUpdate, AdminOverview, ApiClient, ApiError, Auth, Book, Loan,
    LoanQuery, Paginated, User,
};

/// Filters and pagination for the admin book table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminBookQuery {
    /// Availability filter understood by the server (e.g. `available`, `borrowed`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<CategoryId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_id: Option<AuthorId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

/// Search and pagination for the admin user table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct UserQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl ApiClient {
    /// Dashboard counters.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn admin_overview(&self) -> Result<AdminOverview, ApiError> {
        self.get_path("/admin/overview").await
    }

    /// Paginated, filterable book table.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn admin_books(&self, query: &AdminBookQuery) -> Result<Paginated<Book>, ApiError> {
        self.get("/admin/books", query).await
    }

    /// Paginated, searchable user table.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn admin_users(&self, query: &UserQuery) -> Result<Paginated<User>, ApiError> {
        self.get("/admin/users", query).await
    }

    /// Paginated loan table across all members.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn admin_loans(&self, query: &LoanQuery) -> Result<Paginated<Loan>, ApiError> {
        self.get("/admin/loans", &query.params()).await
    }

    /// Loans past their due date and not yet returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn overdue_loans(&self) -> Result<Vec<Loan>, ApiError> {
        self.get_path("/admin/loans/overdue").await
    }

    /// Lend a book to a member directly.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn create_admin_loan(&self, input: &AdminLoanCreate) -> Result<Loan, ApiError> {
        self.write_json(Method::POST, "/admin/loans", input, Auth::Bearer)
            .await
    }

    /// Change a loan's due date or status.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn update_admin_loan(
        &self,
        id: LoanId,
        input: &AdminLoanUpdate,
    ) -> Result<Loan, ApiError> {
        self.write_json(
            Method::PATCH,
            &format!("/admin/loans/{id}"),
            input,
            Auth::Bearer,
        )
        .await
    }
}
