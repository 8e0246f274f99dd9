//! # Diagnostics Module
//!
//! Health check for load balancers and the sign-up page's status check.

pub mod handlers;
pub mod routes;

pub use routes::diagnostics_routes;
