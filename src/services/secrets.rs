//! Reversible encryption for administrative recovery display.
//!
//! A long-lived ChaCha20-Poly1305 key encrypts password copies and temp
//! passwords so an admin can show a plaintext once. This is a convenience and
//! audit feature, never the security boundary: login decisions only ever
//! consult the Argon2 hash in [`super::password`]. If the key file is lost,
//! previously encrypted values become permanently undecryptable, which is
//! accepted.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use base64ct::{Base64, Encoding};
use chacha20poly1305::{
    ChaCha20Poly1305, Key, KeyInit, Nonce,
    aead::{Aead, AeadCore, OsRng},
};
use tracing::info;

const NONCE_SIZE: usize = 12;

#[derive(Clone)]
pub struct SecretStore {
    cipher: Arc<ChaCha20Poly1305>,
}

impl SecretStore {
    /// Loads the key from `path`, generating and persisting a fresh one with
    /// owner-only permissions on first run. Idempotent across restarts.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        let key = if path.exists() {
            let encoded = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read key file: {}", path.display()))?;
            let bytes = Base64::decode_vec(encoded.trim())
                .map_err(|e| anyhow::anyhow!("Malformed key file {}: {e}", path.display()))?;
            anyhow::ensure!(
                bytes.len() == 32,
                "Key file {} has wrong length",
                path.display()
            );
            *Key::from_slice(&bytes)
        } else {
            let key = ChaCha20Poly1305::generate_key(&mut OsRng);
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, Base64::encode_string(&key))
                .with_context(|| format!("Failed to write key file: {}", path.display()))?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
            }
            info!("Generated new secret key at {}", path.display());
            key
        };

        Ok(Self::from_key(&key.into()))
    }

    /// Builds a store from raw key bytes. Used by tests to avoid the filesystem.
    #[must_use]
    pub fn from_key(key: &[u8; 32]) -> Self {
        Self {
            cipher: Arc::new(ChaCha20Poly1305::new(Key::from_slice(key))),
        }
    }

    /// Encrypts to a Base64 token of `nonce || ciphertext`. The AEAD tag makes
    /// tampering detectable at decryption time.
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| anyhow::anyhow!("Encryption failure: {e}"))?;

        let mut framed = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        framed.extend_from_slice(&nonce);
        framed.extend_from_slice(&ciphertext);

        Ok(Base64::encode_string(&framed))
    }

    /// Decrypts a token produced by [`Self::encrypt`]. A corrupted or foreign
    /// token fails here rather than yielding garbage plaintext.
    pub fn decrypt(&self, token: &str) -> Result<String> {
        let framed =
            Base64::decode_vec(token).map_err(|e| anyhow::anyhow!("Malformed ciphertext: {e}"))?;
        anyhow::ensure!(framed.len() > NONCE_SIZE, "Ciphertext too short");

        let (nonce_bytes, ciphertext) = framed.split_at(NONCE_SIZE);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| anyhow::anyhow!("Ciphertext failed authentication"))?;

        String::from_utf8(plaintext).context("Decrypted value is not valid UTF-8")
    }
}
