//! Errors surfaced to views.

use thiserror::Error;

use crate::api::ApiError;
use crate::session_file::SessionFileError;
use crate::validation::ValidationErrors;
use crate::views::Navigation;

/// Anything a view operation can fail with.
#[derive(Debug, Error)]
pub enum AppError {
    /// The server answered with an error or could not be reached.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The form was rejected before sending.
    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationErrors),

    /// Login was refused; carries the server's reason.
    #[error("Sign in failed: {0}")]
    LoginFailed(String),

    /// The operation needs a session and there is none.
    #[error("Please sign in first")]
    NotSignedIn,

    /// The operation needs the admin role; refused without a request.
    #[error("Administrator access required")]
    AdminOnly,

    /// The same submission is still awaiting its response.
    #[error("Already in progress, please wait")]
    Busy,

    /// The session file could not be read or written.
    #[error(transparent)]
    Session(#[from] SessionFileError),
}

impl AppError {
    /// Whether the same read may succeed if retried.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Api(e) => e.is_retryable(),
            Self::Busy => true,
            _ => false,
        }
    }

    /// Whether the session is gone and the user must sign in again.
    #[must_use]
    pub const fn requires_login(&self) -> bool {
        matches!(self, Self::NotSignedIn | Self::Api(ApiError::SessionExpired(_)))
    }

    /// Where the view should go after this error.
    #[must_use]
    pub const fn navigation(&self) -> Navigation {
        if self.requires_login() {
            Navigation::Login
        } else {
            Navigation::Stay
        }
    }

    /// Message suitable for a toast or status line.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api(ApiError::SessionExpired(_)) => {
                "Your session has expired, please sign in again".to_string()
            }
            Self::Api(ApiError::Unauthorized(message)) => message.clone(),
            Self::Api(ApiError::Forbidden(_)) => "You are not allowed to do that".to_string(),
            Self::Api(ApiError::NotFound(message) | ApiError::Api { message, .. }) => {
                message.clone()
            }
            Self::Api(ApiError::RateLimited(secs)) => {
                format!("Too many requests, try again in {secs}s")
            }
            Self::Api(ApiError::Http(_)) => {
                "Could not reach the library service, please try again".to_string()
            }
            Self::Api(ApiError::Parse(_)) => {
                "The library service sent an unexpected response".to_string()
            }
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::views::Navigation;

    #[test]
    fn test_expired_session_routes_to_login() {
        let err = AppError::from(ApiError::SessionExpired("expired".to_string()));
        assert!(err.requires_login());
        assert_eq!(err.navigation(), Navigation::Login);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_stale_rejection_stays_on_view() {
        let err = AppError::from(ApiError::Unauthorized("jwt expired".to_string()));
        assert!(!err.requires_login());
        assert_eq!(err.navigation(), Navigation::Stay);
        assert_eq!(err.user_message(), "jwt expired");
    }

    #[test]
    fn test_server_message_is_shown() {
        let err = AppError::from(ApiError::Api {
            status: 409,
            message: "Book is out of stock".to_string(),
        });
        assert_eq!(err.user_message(), "Book is out of stock");
        assert_eq!(err.navigation(), Navigation::Stay);
    }

    #[test]
    fn test_local_refusals() {
        assert_eq!(AppError::AdminOnly.user_message(), "Administrator access required");
        assert_eq!(AppError::NotSignedIn.navigation(), Navigation::Login);
        assert!(AppError::Busy.is_retryable());

        let login = AppError::LoginFailed("Invalid credentials".to_string());
        assert_eq!(login.user_message(), "Sign in failed: Invalid credentials");
        assert!(!login.requires_login());
    }
}
