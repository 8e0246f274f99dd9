//! Authentication data models

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// JWT claims structure
///
/// `sid` names the server-side session backing the token.
#[derive(Serialize, Deserialize, Debug)]
pub struct Claims {
    pub sub: String,
    pub sid: String,
    pub exp: usize,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Email and password login form
#[derive(Deserialize, Default)]
pub struct LoginRequest {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub email: String,
    #[serde(default, alias = "senha", deserialize_with = "null_as_empty")]
    pub password: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}
