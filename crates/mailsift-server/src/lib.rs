//! HTTP upload surface for mailsift
//!
//! Thin axum layer over `mailsift-core`: multipart upload validation,
//! response assembly, and nothing else. All downstream failures are absorbed
//! into the 200-status response body; only a missing primary document is a
//! client error.

pub mod routes;
pub mod state;

pub use routes::router;
pub use state::AppState;
