// src/registration/models.rs

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Treats `null` the same as a missing field
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Untrusted registration data as submitted by the sign-up form.
///
/// Every field is free text. The Portuguese form names used by the site's
/// pages are accepted as aliases.
#[derive(Clone, Default, Deserialize)]
pub struct RegistrationCandidate {
    #[serde(default, alias = "nome", deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub email: String,
    #[serde(default, alias = "telefone", deserialize_with = "null_as_empty")]
    pub phone: String,
    #[serde(default, alias = "genero", deserialize_with = "null_as_empty")]
    pub gender: String,
    #[serde(default, alias = "datanascimento", deserialize_with = "null_as_empty")]
    pub birth_date: String,
    #[serde(default, alias = "cidade", deserialize_with = "null_as_empty")]
    pub city: String,
    #[serde(default, alias = "estado", deserialize_with = "null_as_empty")]
    pub state: String,
    #[serde(default, alias = "endereco", deserialize_with = "null_as_empty")]
    pub address: String,
    #[serde(default, alias = "senha", deserialize_with = "null_as_empty")]
    pub password: String,
}

impl fmt::Debug for RegistrationCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationCandidate")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("phone", &self.phone)
            .field("gender", &self.gender)
            .field("birth_date", &self.birth_date)
            .field("city", &self.city)
            .field("state", &self.state)
            .field("address", &self.address)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Gender {
    Masculino,
    Feminino,
    Outro,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Masculino => "Masculino",
            Gender::Feminino => "Feminino",
            Gender::Outro => "Outro",
        }
    }

    /// Exact, case-sensitive match against the accepted values
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Masculino" => Some(Gender::Masculino),
            "Feminino" => Some(Gender::Feminino),
            "Outro" => Some(Gender::Outro),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PasswordStrength {
    Weak,
    Fair,
    Good,
    Strong,
}

impl PasswordStrength {
    pub fn from_score(score: u8) -> Self {
        match score {
            0..=2 => PasswordStrength::Weak,
            3 => PasswordStrength::Fair,
            4 => PasswordStrength::Good,
            _ => PasswordStrength::Strong,
        }
    }
}

/// A candidate that passed every rule, normalized, with its password hashed.
///
/// Only the registration validator builds these.
#[derive(Clone)]
pub struct ValidatedUser {
    pub(super) name: String,
    pub(super) email: String,
    pub(super) phone: Option<String>,
    pub(super) gender: Gender,
    pub(super) birth_date: NaiveDate,
    pub(super) city: String,
    pub(super) state: String,
    pub(super) address: String,
    pub(super) password_hash: String,
}

impl ValidatedUser {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }

    pub fn gender(&self) -> Gender {
        self.gender
    }

    pub fn birth_date(&self) -> NaiveDate {
        self.birth_date
    }

    pub fn city(&self) -> &str {
        &self.city
    }

    pub fn state(&self) -> &str {
        &self.state
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn password_hash(&self) -> &str {
        &self.password_hash
    }
}

impl fmt::Debug for ValidatedUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatedUser")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("phone", &self.phone)
            .field("gender", &self.gender)
            .field("birth_date", &self.birth_date)
            .field("city", &self.city)
            .field("state", &self.state)
            .field("address", &self.address)
            .field("password_hash", &"<redacted>")
            .finish()
    }
}

/// Response body of the pre-check endpoint
#[derive(Debug, Serialize)]
pub struct PrecheckResponse {
    pub valid: bool,
    pub password_strength: PasswordStrength,
}
