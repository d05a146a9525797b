//! Admin-issued, time-boxed, single-reveal temporary passwords.
//!
//! A temp password is an auditable hand-off artifact: issuing one never
//! touches the user's live `password_hash`, it only records an encrypted
//! plaintext an admin may reveal exactly once before expiry. Every generate,
//! reveal and force-reset is written to the append-only audit log.
//!
//! Per-user state machine: none -> active -> revealed, with `expired` as a
//! lazily observed terminal state (no timer; expiry is checked at access).

use chrono::{DateTime, Duration, Utc};
use tracing::info;

use crate::db::{RevealOutcome, Store};
use crate::entities::{pw_audit, temp_passwords, users};
use crate::services::error::AuthError;
use crate::services::password::generate_temp_password;
use crate::services::secrets::SecretStore;

/// How many audit entries `audit` returns, newest first.
const AUDIT_TAIL: u64 = 200;

/// Plaintext handed back from generate/reveal, with its expiry.
#[derive(Debug)]
pub struct IssuedTempPassword {
    pub username: String,
    pub temp_password: String,
    pub expires_at: DateTime<Utc>,
}

/// Non-secret listing row; `status` is computed, never stored.
pub struct TempPasswordOverview {
    pub username: String,
    pub expires_at: String,
    pub revealed: bool,
    pub created_by: String,
    pub created_at: String,
    pub status: &'static str,
}

#[derive(Clone)]
pub struct TempPasswordService {
    store: Store,
    secrets: SecretStore,
}

impl TempPasswordService {
    #[must_use]
    pub const fn new(store: Store, secrets: SecretStore) -> Self {
        Self { store, secrets }
    }

    /// Issues a temp password for `target_username`, superseding any prior
    /// one. Returns the plaintext directly to the requesting admin; this is
    /// the one channel where the admin legitimately sees it without reveal.
    pub async fn generate(
        &self,
        admin: &users::Model,
        target_username: &str,
        ttl_minutes: i64,
        now: DateTime<Utc>,
    ) -> Result<IssuedTempPassword, AuthError> {
        if !admin.is_admin {
            return Err(AuthError::Forbidden("Admins only".to_string()));
        }

        self.store
            .get_user_by_username(target_username)
            .await?
            .ok_or_else(|| AuthError::NotFound("User not found".to_string()))?;

        let expires_at = now + Duration::minutes(ttl_minutes.max(1));
        let plaintext = generate_temp_password();
        let enc = self
            .secrets
            .encrypt(&plaintext)
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        self.store
            .issue_temp_password(target_username, enc, expires_at, &admin.username, now)
            .await?;

        info!(
            target = target_username,
            actor = admin.username,
            %expires_at,
            "Temp password generated"
        );

        Ok(IssuedTempPassword {
            username: target_username.to_string(),
            temp_password: plaintext,
            expires_at,
        })
    }

    /// Strict one-time reveal: a second call after a success always fails
    /// with `Gone`, regardless of remaining TTL. An expired record is deleted
    /// and reported as `Gone` too.
    pub async fn reveal(
        &self,
        admin: &users::Model,
        target_username: &str,
        now: DateTime<Utc>,
    ) -> Result<IssuedTempPassword, AuthError> {
        if !admin.is_admin {
            return Err(AuthError::Forbidden("Admins only".to_string()));
        }

        let rec = match self
            .store
            .reveal_temp_password(target_username, &admin.username, now)
            .await?
        {
            RevealOutcome::NoRecord => {
                return Err(AuthError::NotFound("No temp password".to_string()));
            }
            RevealOutcome::AlreadyRevealed => {
                return Err(AuthError::Gone("Already revealed".to_string()));
            }
            RevealOutcome::Expired => return Err(AuthError::Gone("Expired".to_string())),
            RevealOutcome::Revealed(rec) => rec,
        };

        let plaintext = self
            .secrets
            .decrypt(&rec.enc_temp)
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        let expires_at = DateTime::parse_from_rfc3339(&rec.expires_at)
            .map_err(|e| AuthError::Internal(format!("Bad stored expiry: {e}")))?
            .with_timezone(&Utc);

        info!(
            target = target_username,
            actor = admin.username,
            "Temp password revealed"
        );

        Ok(IssuedTempPassword {
            username: target_username.to_string(),
            temp_password: plaintext,
            expires_at,
        })
    }

    pub async fn list(
        &self,
        admin: &users::Model,
        now: DateTime<Utc>,
    ) -> Result<Vec<TempPasswordOverview>, AuthError> {
        if !admin.is_admin {
            return Err(AuthError::Forbidden("Admins only".to_string()));
        }

        let rows = self.store.list_temp_passwords().await?;
        Ok(rows.into_iter().map(|r| overview(r, now)).collect())
    }

    pub async fn audit(&self, admin: &users::Model) -> Result<Vec<pw_audit::Model>, AuthError> {
        if !admin.is_admin {
            return Err(AuthError::Forbidden("Admins only".to_string()));
        }

        Ok(self.store.pw_audit_tail(AUDIT_TAIL).await?)
    }
}

fn overview(rec: temp_passwords::Model, now: DateTime<Utc>) -> TempPasswordOverview {
    let status = if crate::db::repositories::temp_password::is_expired(&rec.expires_at, now) {
        "expired"
    } else if rec.revealed {
        "revealed"
    } else {
        "active"
    };

    TempPasswordOverview {
        username: rec.username,
        expires_at: rec.expires_at,
        revealed: rec.revealed,
        created_by: rec.created_by,
        created_at: rec.created_at,
        status,
    }
}
