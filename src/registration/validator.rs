// src/registration/validator.rs

use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use super::config::RegistrationConfig;
use super::models::{PasswordStrength, RegistrationCandidate, ValidatedUser};
use super::rules::{normalize_email, password_strength, RegistrationRules};
use crate::common::{ApiError, ValidationResult};
use crate::services::password::hash_blocking;
use crate::services::{CredentialHasher, HashError, StoreError};

/// Answers "is this email already registered?" for the uniqueness rule
#[async_trait]
pub trait EmailLookup: Send + Sync {
    async fn is_registered(&self, email: &str) -> Result<bool, StoreError>;
}

#[derive(Debug, Error)]
pub enum RegistrationError {
    /// Field rules failed; the result lists every violation in field order
    #[error("registration data is invalid")]
    Invalid(ValidationResult),

    #[error("email lookup failed: {0}")]
    Lookup(#[source] StoreError),

    #[error("password hashing failed: {0}")]
    Hashing(#[source] HashError),
}

impl From<RegistrationError> for ApiError {
    fn from(err: RegistrationError) -> Self {
        match err {
            RegistrationError::Invalid(result) => ApiError::from(result),
            other => ApiError::InternalServer(other.to_string()),
        }
    }
}

/// The single authoritative registration rule set.
///
/// Holds only immutable configuration, so one instance is shared by every
/// request. I/O happens only in the injected lookup and hasher.
#[derive(Debug)]
pub struct RegistrationValidator {
    rules: RegistrationRules,
}

impl RegistrationValidator {
    pub fn new(config: RegistrationConfig) -> Result<Self, regex::Error> {
        Ok(Self {
            rules: RegistrationRules::new(config)?,
        })
    }

    pub fn rules(&self) -> &RegistrationRules {
        &self.rules
    }

    async fn email_taken<L>(
        &self,
        candidate: &RegistrationCandidate,
        lookup: &L,
    ) -> Result<bool, RegistrationError>
    where
        L: EmailLookup + ?Sized,
    {
        let email = normalize_email(&candidate.email);
        if !self.rules.is_valid_email(&email) {
            return Ok(false);
        }
        lookup
            .is_registered(&email)
            .await
            .map_err(RegistrationError::Lookup)
    }

    /// Run every rule, including uniqueness, without hashing anything.
    /// Returns the password strength when the candidate would be accepted.
    pub async fn precheck<L>(
        &self,
        candidate: &RegistrationCandidate,
        lookup: &L,
        today: NaiveDate,
    ) -> Result<PasswordStrength, RegistrationError>
    where
        L: EmailLookup + ?Sized,
    {
        let email_taken = self.email_taken(candidate, lookup).await?;
        self.rules
            .evaluate(candidate, today, email_taken)
            .map(|_| password_strength(&candidate.password))
            .map_err(RegistrationError::Invalid)
    }

    /// Turn a candidate into a [`ValidatedUser`] or report every violated rule
    pub async fn validate<L>(
        &self,
        candidate: &RegistrationCandidate,
        lookup: &L,
        hasher: Arc<dyn CredentialHasher>,
        today: NaiveDate,
    ) -> Result<ValidatedUser, RegistrationError>
    where
        L: EmailLookup + ?Sized,
    {
        let email_taken = self.email_taken(candidate, lookup).await?;
        let checked = match self.rules.evaluate(candidate, today, email_taken) {
            Ok(checked) => checked,
            Err(result) => {
                debug!(errors = result.errors.len(), "Registration candidate rejected");
                return Err(RegistrationError::Invalid(result));
            }
        };

        let password_hash = hash_blocking(hasher, candidate.password.clone())
            .await
            .map_err(RegistrationError::Hashing)?;

        Ok(ValidatedUser {
            name: checked.name,
            email: checked.email,
            phone: checked.phone,
            gender: checked.gender,
            birth_date: checked.birth_date,
            city: checked.city,
            state: checked.state,
            address: checked.address,
            password_hash,
        })
    }
}
