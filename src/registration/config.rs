// src/registration/config.rs

use std::env;
use tracing::warn;

/// How phone numbers are checked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhoneFormat {
    /// `(DD) DDDDD-DDDD` or `(DD) DDDD-DDDD`
    Formatted,
    /// Any text whose digits number 10 or 11
    DigitsOnly,
}

impl PhoneFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "formatted" => Some(PhoneFormat::Formatted),
            "digits" | "digits_only" => Some(PhoneFormat::DigitsOnly),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RegistrationConfig {
    pub phone_format: PhoneFormat,
    pub phone_required: bool,
    pub password_strength_check: bool,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            phone_format: PhoneFormat::Formatted,
            phone_required: true,
            password_strength_check: false,
        }
    }
}

impl RegistrationConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        // PHONE_FORMAT - "formatted" or "digits"
        if let Ok(format) = env::var("PHONE_FORMAT") {
            match PhoneFormat::parse(&format) {
                Some(parsed) => config.phone_format = parsed,
                None => warn!(value = %format, "Unknown PHONE_FORMAT, keeping default"),
            }
        }

        // PHONE_REQUIRED - set to "false" to make phone optional
        if let Ok(required) = env::var("PHONE_REQUIRED") {
            config.phone_required = required.to_lowercase() != "false";
        }

        // PASSWORD_STRENGTH_CHECK - set to "true" to require a strength score of 3
        if let Ok(check) = env::var("PASSWORD_STRENGTH_CHECK") {
            config.password_strength_check = check.to_lowercase() == "true";
        }

        config
    }
}
