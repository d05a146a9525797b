//! Failure taxonomy for the auth and credential subsystem.
//!
//! Every failure is local to a single request; there is no transient class.
//! Messages are safe to show to the caller and never contain hashes, keys or
//! another user's plaintext secrets.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    /// Missing/invalid token, or bad login credentials.
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated but lacking admin privilege, or wrong recovery word.
    #[error("{0}")]
    Forbidden(String),

    /// Referenced user or temp-password record absent.
    #[error("{0}")]
    NotFound(String),

    /// Duplicate username at registration.
    #[error("{0}")]
    Conflict(String),

    /// Temp password already revealed or expired.
    #[error("{0}")]
    Gone(String),

    /// Wrong current password on change, last-admin removal, bad field.
    #[error("{0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(err.to_string())
    }
}
