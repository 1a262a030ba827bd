//! REST client module for the hosted Postgres backend.
//!
//! `Backend` is the table-level seam the repositories are written against;
//! `SupabaseClient` implements it over HTTP with the project's anon key.

pub mod client;
pub mod error;

pub use client::{Backend, BackendSettings, Filter, SupabaseClient};
pub use error::ApiError;
