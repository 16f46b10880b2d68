//! Core types for Lending Desk.
//!
//! This module provides type-safe wrappers for the lending domain.

pub mod duration;
pub mod email;
pub mod id;
pub mod rating;
pub mod status;

pub use duration::{BorrowDuration, DurationError};
pub use email::{Email, EmailError};
pub use id::*;
pub use rating::{RatingError, StarRating};
pub use status::*;
