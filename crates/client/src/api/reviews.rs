//! Review endpoints.

use lending_core::{BookId, ReviewId};
use reqwest::Method;
use serde::Serialize;
use tracing::instrument;

use super::{ApiClient, ApiError, Auth, NewReview, Paginated, Review};

/// Pagination for a book's reviews.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct ReviewQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

/// Search and pagination for the member's own reviews.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct MyReviewsQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl ApiClient {
    /// Submit a review.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the review or the request fails.
    #[instrument(skip(self, review), fields(book_id = %review.book_id, star = review.star.get()))]
    pub async fn create_review(&self, review: &NewReview) -> Result<Review, ApiError> {
        self.write_json(Method::POST, "/reviews", review, Auth::Bearer)
            .await
    }

    /// Reviews for one book, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn book_reviews(
        &self,
        book_id: BookId,
        query: &ReviewQuery,
    ) -> Result<Paginated<Review>, ApiError> {
        self.get(&format!("/reviews/book/{book_id}"), query).await
    }

    /// Delete one of the member's own reviews.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn delete_review(&self, id: ReviewId) -> Result<(), ApiError> {
        self.delete(&format!("/reviews/{id}")).await
    }

    /// The member's own reviews.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn my_reviews(&self, query: &MyReviewsQuery) -> Result<Paginated<Review>, ApiError> {
        self.get("/me/reviews", query).await
    }
}
