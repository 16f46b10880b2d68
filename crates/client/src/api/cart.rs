//! Cart endpoints.
//!
//! Cart mutations return nothing useful; callers refetch the cart instead of
//! patching it locally.

use lending_core::{BookId, CartItemId};
use reqwest::Method;
use tracing::instrument;

use super::{AddCartItem, ApiClient, ApiError, Cart};

impl ApiClient {
    /// The current user's cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn get_cart(&self) -> Result<Cart, ApiError> {
        self.get_path("/cart").await
    }

    /// Stage a book in the cart. Does not reserve stock.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn add_to_cart(&self, book_id: BookId) -> Result<(), ApiError> {
        self.write_json_empty(Method::POST, "/cart/items", &AddCartItem { book_id })
            .await
    }

    /// Remove one item from the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn remove_from_cart(&self, item_id: CartItemId) -> Result<(), ApiError> {
        self.delete(&format!("/cart/items/{item_id}")).await
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self) -> Result<(), ApiError> {
        self.delete("/cart").await
    }
}
