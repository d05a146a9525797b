//! One-way credential hashing and random secret generation.
//!
//! Argon2id with a per-call random salt is the sole authority for login
//! decisions; the reversible encryption in [`super::secrets`] is never
//! consulted for verification.

use anyhow::Result;
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use tokio::task;

use crate::config::SecurityConfig;

/// Hash a password using Argon2id with the configured cost parameters.
pub fn hash_password(password: &str, config: &SecurityConfig) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let params = Params::new(
        config.argon2_memory_cost_kib,
        config.argon2_time_cost,
        config.argon2_parallelism,
        None,
    )
    .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}

/// True iff `password` matches `hash`, whatever salt the hash embeds.
/// An unparseable hash string verifies as false rather than erroring.
#[must_use]
pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash).is_ok_and(|parsed| {
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    })
}

/// Hashing is CPU-intensive and would stall the async runtime if run inline.
pub async fn hash_password_blocking(password: String, config: SecurityConfig) -> Result<String> {
    task::spawn_blocking(move || hash_password(&password, &config))
        .await
        .map_err(|e| anyhow::anyhow!("Password hashing task panicked: {e}"))?
}

pub async fn verify_password_blocking(password: String, hash: String) -> Result<bool> {
    task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| anyhow::anyhow!("Password verification task panicked: {e}"))
}

/// Generate a random bearer token (64-char hex string, 256 bits of entropy).
#[must_use]
pub fn generate_token() -> String {
    use rand::Rng;

    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();

    bytes.iter().fold(String::with_capacity(64), |mut acc, b| {
        use std::fmt::Write;
        let _ = write!(acc, "{b:02x}");
        acc
    })
}

/// Random mixed-case alphanumeric string of the given length.
fn generate_alphanumeric(len: usize) -> String {
    use rand::Rng;
    use rand::distr::Alphanumeric;

    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Temp-password plaintext handed to admins: 14 alphanumeric chars.
#[must_use]
pub fn generate_temp_password() -> String {
    generate_alphanumeric(14)
}

/// Synthesized password for admin force-resets without an explicit one.
#[must_use]
pub fn generate_reset_password() -> String {
    generate_alphanumeric(16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let config = SecurityConfig::default();
        for password in ["hunter2", "", "pälÿ-üñïcødé-🔑"] {
            let hash = hash_password(password, &config).unwrap();
            assert!(verify_password(password, &hash));
            assert!(!verify_password("not-the-password", &hash));
        }
    }

    #[test]
    fn hashing_is_salted() {
        let config = SecurityConfig::default();
        let a = hash_password("same-password", &config).unwrap();
        let b = hash_password("same-password", &config).unwrap();
        assert_ne!(a, b);
        assert!(verify_password("same-password", &a));
        assert!(verify_password("same-password", &b));
    }

    #[test]
    fn garbage_hash_verifies_false() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }

    #[test]
    fn generated_secrets_have_expected_shape() {
        let token = generate_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));

        let temp = generate_temp_password();
        assert_eq!(temp.len(), 14);
        assert!(temp.chars().all(|c| c.is_ascii_alphanumeric()));

        assert_ne!(generate_token(), generate_token());
    }
}
