#![cfg_attr(not(test), forbid(unsafe_code))]
//! Lending Desk client library.
//!
//! Everything between the terminal front-end and the lending REST API:
//!
//! - [`api`] - one typed method per endpoint, bearer auth, 401 handling
//! - [`cache`] - query cache with tag-based invalidation
//! - [`store`] - session, catalog filters and the cart badge
//! - [`session_file`] - persists the bearer token across runs
//! - [`validation`] - form checks that run before any request is sent
//! - [`views`] - view-model helpers (query state, countdowns, route gating)
//! - [`app`] - [`LendingApp`], which ties the pieces together

pub mod api;
pub mod app;
pub mod cache;
pub mod config;
pub mod error;
pub mod session_file;
pub mod store;
pub mod validation;
pub mod views;

pub use api::{ApiClient, ApiError};
pub use app::{LendingApp, Mutated};
pub use cache::{Invalidation, QueryCache, QueryKey, ResourceTag};
pub use config::{ClientConfig, ConfigError};
pub use error::AppError;
pub use session_file::{SessionFile, SessionFileError};
pub use store::{AppState, CartBadge, FilterAction, Session, StateSnapshot, Store, UiFilters};
pub use validation::{CheckoutForm, FieldError, ValidationErrors};
pub use views::{Access, Countdown, InFlight, MutationKey, Navigation, QueryState, Route};
