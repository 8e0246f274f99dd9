// Helper functions for safe logging

/// Masks email addresses for safe logging
/// Prevents sensitive data exposure while preserving debugging utility
///
/// # Example
/// ```
/// let masked = safe_email_log("user@example.com");
/// // Returns: "u***@example.com"
/// ```
pub fn safe_email_log(email: &str) -> String {
    if email.len() > 3 {
        let parts: Vec<&str> = email.split('@').collect();
        if parts.len() == 2 && !parts[0].is_empty() {
            let first: String = parts[0].chars().take(1).collect();
            format!("{}***@{}", first, parts[1])
        } else {
            "***@***.***".to_string()
        }
    } else {
        "***@***.***".to_string()
    }
}

/// Masks tokens for safe logging
/// Shows only first and last 4 characters
pub fn safe_token_log(token: &str) -> String {
    if token.len() > 8 && token.is_ascii() {
        format!("{}...{}", &token[..4], &token[token.len() - 4..])
    } else {
        "***".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_email_log_masks_local_part() {
        assert_eq!(safe_email_log("ana@example.com"), "a***@example.com");
        assert_eq!(safe_email_log("not-an-email"), "***@***.***");
        assert_eq!(safe_email_log("a@b"), "***@***.***");
    }

    #[test]
    fn test_safe_email_log_handles_multibyte_first_char() {
        assert_eq!(safe_email_log("élodie@example.com"), "é***@example.com");
    }

    #[test]
    fn test_safe_token_log() {
        assert_eq!(safe_token_log("eyJhbGciOiJIUzI1NiJ9"), "eyJh...NiJ9");
        assert_eq!(safe_token_log("short"), "***");
    }
}
