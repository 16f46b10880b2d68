//! Loan endpoints for the signed-in member.

use lending_core::{BookId, BorrowDuration, LoanId, LoanStatusFilter};
use reqwest::Method;
use serde::Serialize;
use tracing::instrument;

use super::{
    ApiClient, ApiError, Auth, BorrowRequest, CartCheckoutRequest, CheckoutResponse, Loan,
    Paginated,
};

/// Filters and pagination for loan lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct LoanQuery {
    pub status: LoanStatusFilter,
    pub q: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Query-string form of [`LoanQuery`].
#[derive(Serialize)]
pub(super) struct LoanQueryParams<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    q: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<u32>,
}

impl LoanQuery {
    pub(super) fn params(&self) -> LoanQueryParams<'_> {
        LoanQueryParams {
            status: self.status.as_query(),
            q: self.q.as_deref().filter(|q| !q.trim().is_empty()),
            page: self.page,
            limit: self.limit,
        }
    }
}

impl ApiClient {
    /// The signed-in member's loans.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn my_loans(&self, query: &LoanQuery) -> Result<Paginated<Loan>, ApiError> {
        self.get("/loans/my", &query.params()).await
    }

    /// Borrow a single book directly.
    ///
    /// # Errors
    ///
    /// Returns an error if the book is unavailable or the request fails.
    #[instrument(skip(self))]
    pub async fn borrow_book(
        &self,
        book_id: BookId,
        days: BorrowDuration,
    ) -> Result<Loan, ApiError> {
        self.write_json(
            Method::POST,
            "/loans",
            &BorrowRequest { book_id, days },
            Auth::Bearer,
        )
        .await
    }

    /// Ask the server to mark a loan as returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the loan is unknown, already returned, or the
    /// request fails.
    #[instrument(skip(self))]
    pub async fn return_loan(&self, id: LoanId) -> Result<Loan, ApiError> {
        let builder = self.request(Method::PATCH, &format!("/loans/{id}/return"));
        self.send(builder, Auth::Bearer).await
    }

    /// Convert selected cart items into loans in one request.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails; nothing is assumed changed
    /// server-side in that case.
    #[instrument(skip(self, request), fields(items = request.item_ids.len(), days = request.days.days()))]
    pub async fn checkout_from_cart(
        &self,
        request: &CartCheckoutRequest,
    ) -> Result<Vec<Loan>, ApiError> {
        let response: CheckoutResponse = self
            .write_json(Method::POST, "/loans/from-cart", request, Auth::Bearer)
            .await?;
        Ok(response.into_loans())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use lending_core::LoanStatus;

    use super::*;

    #[test]
    fn test_loan_query_params() {
        let query = LoanQuery {
            status: LoanStatusFilter::Only(LoanStatus::Late),
            q: Some("  ".to_string()),
            page: Some(2),
            limit: None,
        };
        assert_eq!(
            serde_json::to_value(query.params()).unwrap(),
            serde_json::json!({ "status": "LATE", "page": 2 })
        );
    }

    #[test]
    fn test_all_statuses_omit_status_param() {
        let query = LoanQuery::default();
        assert_eq!(
            serde_json::to_value(query.params()).unwrap(),
            serde_json::json!({})
        );
    }
}
