//! Core business logic for recipedia.

pub mod services;

pub use services::*;
