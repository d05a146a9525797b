//! User directory operations: registration, login verification, password
//! changes, self-service recovery and admin credential administration.

use chrono::Utc;
use tracing::info;

use crate::config::SecurityConfig;
use crate::db::repositories::temp_password::ACTION_FORCE_RESET;
use crate::db::{DeleteOutcome, Store};
use crate::entities::{downloads, users};
use crate::services::error::AuthError;
use crate::services::password;
use crate::services::secrets::SecretStore;

#[derive(Clone)]
pub struct AccountService {
    store: Store,
    secrets: SecretStore,
    security: SecurityConfig,
}

impl AccountService {
    #[must_use]
    pub const fn new(store: Store, secrets: SecretStore, security: SecurityConfig) -> Self {
        Self {
            store,
            secrets,
            security,
        }
    }

    /// Registers a new account. The very first user in an empty directory
    /// becomes admin; that decision is made atomically in the store.
    pub async fn register(
        &self,
        username: &str,
        password: &str,
        reset_word: Option<&str>,
    ) -> Result<users::Model, AuthError> {
        let password_hash =
            password::hash_password_blocking(password.to_string(), self.security.clone()).await?;

        let reset_word_hash = match reset_word {
            Some(word) => Some(
                password::hash_password_blocking(word.to_string(), self.security.clone()).await?,
            ),
            None => None,
        };

        let enc_password = self
            .secrets
            .encrypt(password)
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        let user = self
            .store
            .create_user(username, password_hash, Some(enc_password), reset_word_hash)
            .await?
            .ok_or_else(|| AuthError::Conflict("Username already exists".to_string()))?;

        info!(username, is_admin = user.is_admin, "User registered");
        Ok(user)
    }

    /// Verifies login credentials against the live password hash, the sole
    /// authority for authentication.
    pub async fn verify_login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<users::Model, AuthError> {
        let invalid = || AuthError::Unauthorized("Invalid credentials".to_string());

        let user = self
            .store
            .get_user_by_username(username)
            .await?
            .ok_or_else(invalid)?;

        let ok = password::verify_password_blocking(
            password.to_string(),
            user.password_hash.clone(),
        )
        .await?;

        if ok { Ok(user) } else { Err(invalid()) }
    }

    pub async fn list_users(&self) -> Result<Vec<users::Model>, AuthError> {
        Ok(self.store.list_users().await?)
    }

    /// Changes the caller's own password after re-verifying the current one.
    pub async fn change_password(
        &self,
        user: &users::Model,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let ok = password::verify_password_blocking(
            current_password.to_string(),
            user.password_hash.clone(),
        )
        .await?;

        if !ok {
            return Err(AuthError::BadRequest(
                "Current password incorrect".to_string(),
            ));
        }

        self.rewrite_credentials(&user.username, new_password)
            .await?;
        info!(username = user.username, "Password changed");
        Ok(())
    }

    /// Token-less recovery: succeeds on the configured master override word
    /// or on the user's registered recovery word.
    pub async fn self_reset(
        &self,
        username: &str,
        word: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let user = self
            .store
            .get_user_by_username(username)
            .await?
            .ok_or_else(|| AuthError::NotFound("User not found".to_string()))?;

        let master_match = self
            .security
            .master_reset_word
            .as_deref()
            .is_some_and(|master| word == master);

        let word_match = if master_match {
            true
        } else if let Some(hash) = &user.reset_word_hash {
            password::verify_password_blocking(word.to_string(), hash.clone()).await?
        } else {
            false
        };

        if !word_match {
            return Err(AuthError::Forbidden("Secret word incorrect".to_string()));
        }

        self.rewrite_credentials(username, new_password).await?;
        info!(username, master = master_match, "Self-service password reset");
        Ok(())
    }

    /// Admin force-reset. Synthesizes a random password when none is given or
    /// generation is requested, and returns the new plaintext to the caller
    /// as an immediate one-shot disclosure (not gated by the temp-password
    /// reveal mechanism). Appends a `force_reset` audit entry.
    pub async fn admin_reset_password(
        &self,
        admin: &users::Model,
        target_username: &str,
        new_password: Option<&str>,
        generate: bool,
    ) -> Result<String, AuthError> {
        if !admin.is_admin {
            return Err(AuthError::Forbidden("Admins only".to_string()));
        }

        self.store
            .get_user_by_username(target_username)
            .await?
            .ok_or_else(|| AuthError::NotFound("User not found".to_string()))?;

        let new_password = match new_password {
            Some(p) if !generate => p.to_string(),
            _ => password::generate_reset_password(),
        };

        self.rewrite_credentials(target_username, &new_password)
            .await?;

        self.store
            .append_pw_audit(
                target_username,
                ACTION_FORCE_RESET,
                &admin.username,
                None,
                Utc::now(),
            )
            .await?;

        info!(
            target = target_username,
            actor = admin.username,
            "Admin force-reset password"
        );
        Ok(new_password)
    }

    /// Deletes a user, refusing to remove the last admin. The guard and the
    /// delete are one transaction in the store, so concurrent deletions
    /// cannot leave the directory without admins. Returns the removed
    /// download rows so the caller can clean up the files they point at.
    pub async fn delete_user(
        &self,
        admin: &users::Model,
        target_username: &str,
    ) -> Result<Vec<downloads::Model>, AuthError> {
        if !admin.is_admin {
            return Err(AuthError::Forbidden("Admins only".to_string()));
        }

        match self.store.delete_user(target_username).await? {
            DeleteOutcome::NotFound => {
                return Err(AuthError::NotFound("User not found".to_string()));
            }
            DeleteOutcome::LastAdmin => {
                return Err(AuthError::BadRequest(
                    "Cannot delete the only admin".to_string(),
                ));
            }
            DeleteOutcome::Deleted => {}
        }

        let removed = self.store.delete_downloads_for_owner(target_username).await?;

        info!(
            target = target_username,
            actor = admin.username,
            downloads = removed.len(),
            "User deleted"
        );
        Ok(removed)
    }

    /// Rewrites `password_hash` and `enc_password` together, the same way for
    /// change-password, self-reset and admin force-reset.
    async fn rewrite_credentials(
        &self,
        username: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let hash =
            password::hash_password_blocking(new_password.to_string(), self.security.clone())
                .await?;
        let enc = self
            .secrets
            .encrypt(new_password)
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        let updated = self
            .store
            .update_user_credentials(username, hash, enc)
            .await?;

        if updated {
            Ok(())
        } else {
            Err(AuthError::NotFound("User not found".to_string()))
        }
    }
}
