//! # Registration Module
//!
//! Sign-up rules and endpoints:
//! - Field rules for name, email, phone, gender, birth date, city, state,
//!   address and password
//! - Email uniqueness through an injected [`EmailLookup`]
//! - Password hashing before anything is persisted

pub mod config;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod rules;
pub mod validator;


pub use config::{PhoneFormat, RegistrationConfig};
pub use models::{Gender, PasswordStrength, RegistrationCandidate, ValidatedUser};
pub use routes::registration_routes;
pub use validator::{EmailLookup, RegistrationError, RegistrationValidator};
