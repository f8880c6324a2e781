//! HTTP API layer for pollbox.
//!
//! This crate provides the JSON API over the poll, vote, tally and
//! contest services:
//!
//! - **Endpoints**: poll cards, voting, results, winner announcements
//! - **Extractors**: voter identity (trusted subject or anonymous
//!   fingerprint) and the admin guard
//! - **Response**: the `ApiResponse` envelope
//!
//! Built on Axum 0.8.

pub mod endpoints;
pub mod extractors;
pub mod response;
pub mod state;

pub use endpoints::router;
pub use state::AppState;
