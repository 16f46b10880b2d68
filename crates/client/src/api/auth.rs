//! Authentication endpoints.

use reqwest::Method;
use tracing::instrument;

use super::{ApiClient, ApiError, Auth, AuthResponse, LoginPayload, RegisterPayload};

impl ApiClient {
    /// Exchange credentials for a token and user.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` for wrong credentials, or any other
    /// `ApiError` if the request fails.
    #[instrument(skip(self, payload), fields(email = %payload.email))]
    pub async fn login(&self, payload: &LoginPayload) -> Result<AuthResponse, ApiError> {
        self.write_json(Method::POST, "/auth/login", payload, Auth::Anonymous)
            .await
    }

    /// Create an account and receive a token and user.
    ///
    /// # Errors
    ///
    /// Returns an error if the email is taken, the payload is rejected, or
    /// the request fails.
    #[instrument(skip(self, payload), fields(email = %payload.email))]
    pub async fn register(&self, payload: &RegisterPayload) -> Result<AuthResponse, ApiError> {
        self.write_json(Method::POST, "/auth/register", payload, Auth::Anonymous)
            .await
    }
}
