// src/common/id_generator.rs
//! Crockford Base32 ID Generator
//!
//! Generates human-readable, prefixed IDs using Crockford Base32 encoding.
//! Format: PREFIX_XXXXXXXX (e.g., U_K7NP3XQ2 for users)
//!
//! Session tokens use the same alphabet without a prefix and with enough
//! length (32 chars, 160 bits) to be unguessable.

use rand::Rng;

/// Crockford Base32 alphabet (excludes I, L, O, U to avoid confusion)
const CROCKFORD_ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Random characters in an entity id
const ENTITY_ID_LENGTH: usize = 8;

/// Random characters in a session token
pub const SESSION_TOKEN_LENGTH: usize = 32;

/// Entity type prefixes for ID generation
#[derive(Debug, Clone, Copy)]
pub enum EntityPrefix {
    /// Registered user (U_)
    User,
    /// Login session (K_) - K for Key
    Session,
}

impl EntityPrefix {
    /// Get the string prefix for this entity type
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityPrefix::User => "U",
            EntityPrefix::Session => "K",
        }
    }
}

/// Generate a random Crockford Base32 string of specified length
fn generate_crockford_string(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..32);
            CROCKFORD_ALPHABET[idx] as char
        })
        .collect()
}

/// Generate a prefixed ID using Crockford Base32 encoding
///
/// # Example
/// ```
/// let user_id = generate_id(EntityPrefix::User);
/// // Returns something like "U_K7NP3XQ2"
/// ```
pub fn generate_id(prefix: EntityPrefix) -> String {
    format!(
        "{}_{}",
        prefix.as_str(),
        generate_crockford_string(ENTITY_ID_LENGTH)
    )
}

/// Generate a raw Crockford Base32 string without prefix
pub fn generate_raw_id(length: usize) -> String {
    generate_crockford_string(length)
}

/// Generate a User ID (U_XXXXXXXX)
pub fn generate_user_id() -> String {
    generate_id(EntityPrefix::User)
}

/// Generate an opaque session token (K_ + 32 chars)
pub fn generate_session_id() -> String {
    format!(
        "{}_{}",
        EntityPrefix::Session.as_str(),
        generate_raw_id(SESSION_TOKEN_LENGTH)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_user_id_format() {
        let user_id = generate_user_id();
        assert!(user_id.starts_with("U_"));
        assert_eq!(user_id.len(), 2 + ENTITY_ID_LENGTH);
    }

    #[test]
    fn test_crockford_alphabet_only() {
        let id = generate_user_id();
        let random_part = &id[2..];

        for c in random_part.chars() {
            assert!(
                CROCKFORD_ALPHABET.contains(&(c as u8)),
                "Character '{}' not in Crockford alphabet",
                c
            );
        }

        assert!(!random_part.contains('I'));
        assert!(!random_part.contains('L'));
        assert!(!random_part.contains('O'));
        assert!(!random_part.contains('U'));
    }

    #[test]
    fn test_session_ids_are_long_and_unique() {
        let mut ids = HashSet::new();
        for _ in 0..1000 {
            let id = generate_session_id();
            assert!(id.starts_with("K_"));
            assert_eq!(id.len(), 2 + SESSION_TOKEN_LENGTH);
            assert!(ids.insert(id), "Duplicate session id generated");
        }
    }

    #[test]
    fn test_raw_id() {
        let raw = generate_raw_id(8);
        assert_eq!(raw.len(), 8);
        assert!(!raw.contains('_'));
    }
}
