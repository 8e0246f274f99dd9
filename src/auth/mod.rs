//! # Auth Module
//!
//! This module handles login for registered users:
//! - Email and password login against the stored digest
//! - Server-side sessions wrapped in a signed JWT
//! - AuthedUser extractor for protected routes

pub mod extractors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod validators;

#[cfg(test)]
mod tests;

pub use extractors::AuthedUser;
pub use routes::auth_routes;
