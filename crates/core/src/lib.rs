//! Lending Desk Core - Shared domain types.
//!
//! This crate provides the types used across all Lending Desk components:
//! - `client` - Typed API client, query cache and application store
//! - `cli` - Terminal front-end (`lend`)
//!
//! # Architecture
//!
//! The core crate contains only types and parsing rules - no I/O, no HTTP
//! clients. Everything the lending server computes (due dates, stock, overdue
//! status) is mirrored here as plain data, never derived.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, email, loan status, user role, star rating and
//!   borrow duration

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
