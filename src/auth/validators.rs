// src/auth/validators.rs

use super::models::LoginRequest;
use crate::common::{ValidationResult, Validator};
use crate::registration::rules::{normalize_email, RegistrationRules};

/// Shape checks on a login form before any lookup happens
pub struct LoginValidator<'a> {
    rules: &'a RegistrationRules,
}

impl<'a> LoginValidator<'a> {
    pub fn new(rules: &'a RegistrationRules) -> Self {
        Self { rules }
    }
}

impl Validator<LoginRequest> for LoginValidator<'_> {
    fn validate(&self, data: &LoginRequest) -> ValidationResult {
        let mut result = ValidationResult::new();

        let email = normalize_email(&data.email);
        if email.is_empty() {
            result.add_error("email", "Email is required");
        } else if !self.rules.is_valid_email(&email) {
            result.add_error("email", "Email is invalid");
        }

        if data.password.is_empty() {
            result.add_error("password", "Password is required");
        }

        result
    }
}
