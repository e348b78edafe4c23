//! HTTP API layer for recipedia.
//!
//! This crate provides the REST API:
//!
//! - **Endpoints**: recipes, tags, ingredients, users, auth
//! - **Extractors**: required and optional authentication
//! - **Middleware**: bearer-token resolution
//! - **Responses**: envelope and pagination types
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

pub use endpoints::router;
