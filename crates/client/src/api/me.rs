//! Profile endpoints.

use reqwest::Method;
use tracing::instrument;

use super::{ApiClient, ApiError, ProfileInput, UserProfile, upload_part};

impl ApiClient {
    /// The signed-in user with loan counters.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn profile(&self) -> Result<UserProfile, ApiError> {
        self.get_path("/me").await
    }

    /// Update name, phone and optionally the profile photo (multipart).
    ///
    /// The response body is ignored; refetch [`profile`](Self::profile) for
    /// the stored values.
    ///
    /// # Errors
    ///
    /// Returns an error if the upload is malformed or the request fails.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn update_profile(&self, input: &ProfileInput) -> Result<(), ApiError> {
        let mut form = reqwest::multipart::Form::new().text("name", input.name.clone());

        if let Some(phone) = &input.phone {
            form = form.text("phone", phone.clone());
        }
        if let Some(photo) = &input.profile_photo {
            form = form.part("profilePhoto", upload_part(photo)?);
        }

        self.write_multipart_empty(Method::PATCH, "/me", form).await
    }
}
