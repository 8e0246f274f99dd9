// src/registration/rules.rs
//! Field rules for user registration.
//!
//! Fields are checked in a fixed order (name, email, phone, gender,
//! birth_date, city, state, address, password) and each field reports at
//! most one error: the first of its checks that fails. Every field is
//! checked regardless of earlier failures.

use chrono::{Datelike, NaiveDate};
use regex::Regex;

use super::config::{PhoneFormat, RegistrationConfig};
use super::models::{Gender, PasswordStrength, RegistrationCandidate};
use crate::common::ValidationResult;

pub const MIN_AGE_YEARS: i32 = 13;
pub const MIN_PASSWORD_CHARS: usize = 8;
pub const MIN_PASSWORD_SCORE: u8 = 3;

const MIN_NAME_CHARS: usize = 2;
const MIN_CITY_CHARS: usize = 2;
const MIN_STATE_CHARS: usize = 2;
const MIN_ADDRESS_CHARS: usize = 5;

const SPECIAL_CHARACTERS: &str = "!@#$%^&*(),.?\":{}|<>";

pub const EMAIL_TAKEN_MESSAGE: &str = "Email is already registered";

const NAME_PATTERN: &str = r"^[a-zA-ZÀ-ÿ\s]+$";
const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";
const PHONE_PATTERN: &str = r"^\([0-9]{2}\)\s[0-9]{4,5}-[0-9]{4}$";

/// Normalized values of a candidate that passed every field rule
pub(super) struct CheckedCandidate {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub gender: Gender,
    pub birth_date: NaiveDate,
    pub city: String,
    pub state: String,
    pub address: String,
}

#[derive(Debug)]
pub struct RegistrationRules {
    config: RegistrationConfig,
    name_pattern: Regex,
    email_pattern: Regex,
    phone_pattern: Regex,
}

impl RegistrationRules {
    pub fn new(config: RegistrationConfig) -> Result<Self, regex::Error> {
        Ok(Self {
            config,
            name_pattern: Regex::new(NAME_PATTERN)?,
            email_pattern: Regex::new(EMAIL_PATTERN)?,
            phone_pattern: Regex::new(PHONE_PATTERN)?,
        })
    }

    /// `local@domain.tld` shape check on an already trimmed address
    pub fn is_valid_email(&self, email: &str) -> bool {
        self.email_pattern.is_match(email)
    }

    /// Run every field rule. `email_taken` is the answer of the uniqueness
    /// lookup and is only reported when the email is otherwise valid.
    pub(super) fn evaluate(
        &self,
        candidate: &RegistrationCandidate,
        today: NaiveDate,
        email_taken: bool,
    ) -> Result<CheckedCandidate, ValidationResult> {
        let mut result = ValidationResult::new();

        let name = self.check_name(&candidate.name, &mut result);
        let email = self.check_email(&candidate.email, email_taken, &mut result);
        let phone = self.check_phone(&candidate.phone, &mut result);
        let gender = check_gender(&candidate.gender, &mut result);
        let birth_date = check_birth_date(&candidate.birth_date, today, &mut result);
        let city = check_min_length("city", "City", &candidate.city, MIN_CITY_CHARS, &mut result);
        let state = check_min_length(
            "state",
            "State",
            &candidate.state,
            MIN_STATE_CHARS,
            &mut result,
        );
        let address = check_min_length(
            "address",
            "Address",
            &candidate.address,
            MIN_ADDRESS_CHARS,
            &mut result,
        );
        let password_ok = self.check_password(&candidate.password, &mut result);

        match (name, email, phone, gender, birth_date, city, state, address) {
            (
                Some(name),
                Some(email),
                Some(phone),
                Some(gender),
                Some(birth_date),
                Some(city),
                Some(state),
                Some(address),
            ) if password_ok && result.is_valid => Ok(CheckedCandidate {
                name,
                email,
                phone,
                gender,
                birth_date,
                city,
                state,
                address,
            }),
            _ => Err(result),
        }
    }

    fn check_name(&self, raw: &str, result: &mut ValidationResult) -> Option<String> {
        let name = raw.trim();
        if name.is_empty() {
            result.add_error("name", "Name is required");
        } else if name.chars().count() < MIN_NAME_CHARS {
            result.add_error("name", "Name must be at least 2 characters");
        } else if !self.name_pattern.is_match(name) {
            result.add_error("name", "Name must contain only letters and spaces");
        } else {
            return Some(name.to_string());
        }
        None
    }

    fn check_email(
        &self,
        raw: &str,
        email_taken: bool,
        result: &mut ValidationResult,
    ) -> Option<String> {
        let email = normalize_email(raw);
        if email.is_empty() {
            result.add_error("email", "Email is required");
        } else if !self.is_valid_email(&email) {
            result.add_error("email", "Email is invalid");
        } else if email_taken {
            result.add_error("email", EMAIL_TAKEN_MESSAGE);
        } else {
            return Some(email);
        }
        None
    }

    /// `Some(None)` is an accepted empty optional phone
    fn check_phone(&self, raw: &str, result: &mut ValidationResult) -> Option<Option<String>> {
        let phone = raw.trim();
        if phone.is_empty() {
            if self.config.phone_required {
                result.add_error("phone", "Phone is required");
                return None;
            }
            return Some(None);
        }

        match self.config.phone_format {
            PhoneFormat::Formatted if !self.phone_pattern.is_match(phone) => {
                result.add_error(
                    "phone",
                    "Phone is invalid. Use the format (11) 99999-9999",
                );
                None
            }
            PhoneFormat::DigitsOnly if !matches!(digit_count(phone), 10 | 11) => {
                result.add_error("phone", "Phone must have 10 or 11 digits");
                None
            }
            _ => Some(Some(phone.to_string())),
        }
    }

    fn check_password(&self, raw: &str, result: &mut ValidationResult) -> bool {
        if raw.is_empty() {
            result.add_error("password", "Password is required");
        } else if raw.chars().count() < MIN_PASSWORD_CHARS {
            result.add_error("password", "Password must be at least 8 characters");
        } else if self.config.password_strength_check && password_score(raw) < MIN_PASSWORD_SCORE
        {
            result.add_error(
                "password",
                "Password is too weak. Mix upper and lower case letters, digits and symbols",
            );
        } else {
            return true;
        }
        false
    }
}

fn check_gender(raw: &str, result: &mut ValidationResult) -> Option<Gender> {
    let gender = raw.trim();
    if gender.is_empty() {
        result.add_error("gender", "Gender is required");
        return None;
    }
    let parsed = Gender::parse(gender);
    if parsed.is_none() {
        result.add_error("gender", "Gender is invalid");
    }
    parsed
}

fn check_birth_date(
    raw: &str,
    today: NaiveDate,
    result: &mut ValidationResult,
) -> Option<NaiveDate> {
    let value = raw.trim();
    if value.is_empty() {
        result.add_error("birth_date", "Birth date is required");
        return None;
    }
    match NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        Err(_) => {
            result.add_error("birth_date", "Birth date is invalid");
            None
        }
        Ok(birth_date) if age_on(birth_date, today) < MIN_AGE_YEARS => {
            result.add_error("birth_date", "You must be at least 13 years old");
            None
        }
        Ok(birth_date) => Some(birth_date),
    }
}

fn check_min_length(
    field: &str,
    label: &str,
    raw: &str,
    min_chars: usize,
    result: &mut ValidationResult,
) -> Option<String> {
    let value = raw.trim();
    if value.is_empty() {
        result.add_error(field, &format!("{} is required", label));
        None
    } else if value.chars().count() < min_chars {
        result.add_error(
            field,
            &format!("{} must be at least {} characters", label, min_chars),
        );
        None
    } else {
        Some(value.to_string())
    }
}

pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

pub fn digit_count(value: &str) -> usize {
    value.chars().filter(|c| c.is_ascii_digit()).count()
}

/// Whole years between `birth_date` and `today`, not counting a birthday
/// that has not happened yet this year
pub fn age_on(birth_date: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - birth_date.year();
    if (today.month(), today.day()) < (birth_date.month(), birth_date.day()) {
        age -= 1;
    }
    age
}

/// One point each for: minimum length, uppercase, lowercase, digit, symbol
pub fn password_score(password: &str) -> u8 {
    let checks = [
        password.chars().count() >= MIN_PASSWORD_CHARS,
        password.chars().any(|c| c.is_ascii_uppercase()),
        password.chars().any(|c| c.is_ascii_lowercase()),
        password.chars().any(|c| c.is_ascii_digit()),
        password.chars().any(|c| SPECIAL_CHARACTERS.contains(c)),
    ];
    checks.iter().filter(|passed| **passed).count() as u8
}

pub fn password_strength(password: &str) -> PasswordStrength {
    PasswordStrength::from_score(password_score(password))
}
