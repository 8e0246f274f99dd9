// src/services/password.rs
//! Password hashing for credential storage.
//!
//! Argon2id with a fresh random salt per password. Digests are PHC strings,
//! so verification reads the algorithm parameters back from the digest and
//! keeps working after the configured costs change.

use argon2::password_hash::{
    Error as PasswordHashError, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::rngs::OsRng;
use std::env;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HashError {
    #[error("Invalid hashing parameters: {0}")]
    InvalidParams(String),

    #[error("Password hashing failed: {0}")]
    HashingFailed(String),

    #[error("Stored password digest is malformed")]
    MalformedDigest,

    #[error("Hashing task failed: {0}")]
    TaskFailed(String),
}

/// One-way password hashing used for registration and login
pub trait CredentialHasher: Send + Sync {
    fn hash(&self, plain: &str) -> Result<String, HashError>;
    fn verify(&self, plain: &str, digest: &str) -> Result<bool, HashError>;
}

#[derive(Debug, Clone)]
pub struct PasswordHashConfig {
    pub time_cost: u32,
    pub memory_kib: u32,
    pub parallelism: u32,
}

impl Default for PasswordHashConfig {
    fn default() -> Self {
        Self {
            time_cost: 2,
            memory_kib: 19 * 1024,
            parallelism: 1,
        }
    }
}

impl PasswordHashConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(value) = env::var("PASSWORD_HASH_TIME_COST") {
            if let Ok(val) = value.parse::<u32>() {
                config.time_cost = val;
            }
        }

        if let Ok(value) = env::var("PASSWORD_HASH_MEMORY_KIB") {
            if let Ok(val) = value.parse::<u32>() {
                config.memory_kib = val;
            }
        }

        if let Ok(value) = env::var("PASSWORD_HASH_PARALLELISM") {
            if let Ok(val) = value.parse::<u32>() {
                config.parallelism = val;
            }
        }

        config
    }
}

pub struct Argon2Hasher {
    params: Params,
}

impl std::fmt::Debug for Argon2Hasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Argon2Hasher")
            .field("t_cost", &self.params.t_cost())
            .field("m_cost", &self.params.m_cost())
            .field("p_cost", &self.params.p_cost())
            .finish()
    }
}

impl Argon2Hasher {
    pub fn new(config: &PasswordHashConfig) -> Result<Self, HashError> {
        let params = Params::new(config.memory_kib, config.time_cost, config.parallelism, None)
            .map_err(|e| HashError::InvalidParams(e.to_string()))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, plain: &str) -> Result<String, HashError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2()
            .hash_password(plain.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| HashError::HashingFailed(e.to_string()))
    }

    fn verify(&self, plain: &str, digest: &str) -> Result<bool, HashError> {
        let parsed = PasswordHash::new(digest).map_err(|_| HashError::MalformedDigest)?;
        match self.argon2().verify_password(plain.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(PasswordHashError::Password) => Ok(false),
            Err(e) => Err(HashError::HashingFailed(e.to_string())),
        }
    }
}

/// Hash on the blocking pool so Argon2 never stalls the async workers
pub async fn hash_blocking(
    hasher: Arc<dyn CredentialHasher>,
    plain: String,
) -> Result<String, HashError> {
    tokio::task::spawn_blocking(move || hasher.hash(&plain))
        .await
        .map_err(|e| HashError::TaskFailed(e.to_string()))?
}

pub async fn verify_blocking(
    hasher: Arc<dyn CredentialHasher>,
    plain: String,
    digest: String,
) -> Result<bool, HashError> {
    tokio::task::spawn_blocking(move || hasher.verify(&plain, &digest))
        .await
        .map_err(|e| HashError::TaskFailed(e.to_string()))?
}

#[cfg(test)]
pub(crate) fn test_hasher() -> Arc<dyn CredentialHasher> {
    let config = PasswordHashConfig {
        time_cost: 1,
        memory_kib: 8,
        parallelism: 1,
    };
    Arc::new(Argon2Hasher::new(&config).expect("valid test params"))
}
