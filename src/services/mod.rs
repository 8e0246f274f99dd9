// src/services/mod.rs
//
// Shared services used by the registration, auth and diagnostics modules

pub mod password;
pub mod rate_limit;
pub mod sessions;
pub mod users;

// Re-export commonly used types for convenience
pub use password::{Argon2Hasher, CredentialHasher, HashError, PasswordHashConfig};
pub use rate_limit::{RateLimitConfig, RateLimitResult, RateLimitService};
pub use sessions::{Session, SessionConfig, SessionError, SessionStore};
pub use users::{SqliteUserStore, StoreError, StoredUser, UserStore, UserSummary};
