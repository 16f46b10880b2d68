//! Catalog endpoints: books, categories and authors.

use lending_core::{AuthorId, BookId, CategoryId};
use reqwest::Method;
use serde::Serialize;
use tracing::instrument;

use super::{
    ApiClient, ApiError, Auth, Author, AuthorInput, Book, BookInput, Category, CategoryInput, Paginated,
    upload_part,
};

/// Filters and pagination for `GET /books`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<CategoryId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_id: Option<AuthorId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_rating: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

/// Parameters for `GET /books/recommend`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendQuery {
    /// Ranking strategy understood by the server (e.g. `rating`, `popular`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<CategoryId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

/// Pagination for `GET /authors/:id/books`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct AuthorBooksQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

#[derive(Serialize)]
struct SearchParam<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    q: Option<&'a str>,
}

#[derive(Serialize)]
struct LimitParam {
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<u32>,
}

fn book_form(input: &BookInput) -> Result<reqwest::multipart::Form, ApiError> {
    let mut form = reqwest::multipart::Form::new()
        .text("title", input.title.clone())
        .text("isbn", input.isbn.clone())
        .text("description", input.description.clone())
        .text("stock", input.stock.to_string())
        .text("authorId", input.author_id.to_string())
        .text("categoryId", input.category_id.to_string());

    if let Some(cover) = &input.cover_image {
        form = form.part("coverImage", upload_part(cover)?);
    }

    Ok(form)
}

impl ApiClient {
    // =========================================================================
    // Books
    // =========================================================================

    /// List catalog books matching `query`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn list_books(&self, query: &BookQuery) -> Result<Paginated<Book>, ApiError> {
        self.get("/books", query).await
    }

    /// Fetch one book, including its aggregate rating and review count.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` for unknown IDs, or any other `ApiError`
    /// if the request fails.
    #[instrument(skip(self))]
    pub async fn get_book(&self, id: BookId) -> Result<Book, ApiError> {
        self.get_path(&format!("/books/{id}")).await
    }

    /// Recommended books.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn recommended_books(
        &self,
        query: &RecommendQuery,
    ) -> Result<Paginated<Book>, ApiError> {
        self.get("/books/recommend", query).await
    }

    /// Create a catalog entry (multipart, optional cover image).
    ///
    /// # Errors
    ///
    /// Returns an error if the upload is malformed or the request fails.
    #[instrument(skip(self, input), fields(title = %input.title))]
    pub async fn create_book(&self, input: &BookInput) -> Result<Book, ApiError> {
        self.write_multipart(Method::POST, "/books", book_form(input)?)
            .await
    }

    /// Replace a catalog entry (multipart, optional cover image).
    ///
    /// # Errors
    ///
    /// Returns an error if the upload is malformed or the request fails.
    #[instrument(skip(self, input), fields(title = %input.title))]
    pub async fn update_book(&self, id: BookId, input: &BookInput) -> Result<Book, ApiError> {
        self.write_multipart(Method::PUT, &format!("/books/{id}"), book_form(input)?)
            .await
    }

    /// Delete a catalog entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn delete_book(&self, id: BookId) -> Result<(), ApiError> {
        self.delete(&format!("/books/{id}")).await
    }

    // =========================================================================
    // Categories
    // =========================================================================

    /// All categories.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn list_categories(&self) -> Result<Vec<Category>, ApiError> {
        self.get_path("/categories").await
    }

    /// Create a category.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn create_category(&self, input: &CategoryInput) -> Result<Category, ApiError> {
        self.write_json(Method::POST, "/categories", input, Auth::Bearer)
            .await
    }

    /// Rename a category.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn update_category(
        &self,
        id: CategoryId,
        input: &CategoryInput,
    ) -> Result<Category, ApiError> {
        self.write_json(
            Method::PUT,
            &format!("/categories/{id}"),
            input,
            Auth::Bearer,
        )
        .await
    }

    /// Delete a category.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn delete_category(&self, id: CategoryId) -> Result<(), ApiError> {
        self.delete(&format!("/categories/{id}")).await
    }

    // =========================================================================
    // Authors
    // =========================================================================

    /// Authors, optionally filtered by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn list_authors(&self, q: Option<&str>) -> Result<Vec<Author>, ApiError> {
        self.get("/authors", &SearchParam { q }).await
    }

    /// Authors ranked by borrowing activity.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn popular_authors(&self, limit: Option<u32>) -> Result<Vec<Author>, ApiError> {
        self.get("/authors/popular", &LimitParam { limit }).await
    }

    /// Books written by one author.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn author_books(
        &self,
        id: AuthorId,
        query: &AuthorBooksQuery,
    ) -> Result<Paginated<Book>, ApiError> {
        self.get(&format!("/authors/{id}/books"), query).await
    }

    /// Create an author.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn create_author(&self, input: &AuthorInput) -> Result<Author, ApiError> {
        self.write_json(Method::POST, "/authors", input, Auth::Bearer)
            .await
    }

    /// Update an author.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn update_author(&self, id: AuthorId, input: &AuthorInput) -> Result<Author, ApiError> {
        self.write_json(
            Method::PUT,
            &format!("/authors/{id}"),
            input,
            Auth::Bearer,
        )
        .await
    }

    /// Delete an author.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn delete_author(&self, id: AuthorId) -> Result<(), ApiError> {
        self.delete(&format!("/authors/{id}")).await
    }
}
