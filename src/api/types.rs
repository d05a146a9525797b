use serde::{Deserialize, Serialize};

use crate::entities::{downloads, pw_audit, users};
use crate::services::temp_password::TempPasswordOverview;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

// ============================================================================
// Auth
// ============================================================================

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub reset_word: Option<String>,
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub username: String,
    pub is_admin: bool,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: String,
    pub is_admin: bool,
}

#[derive(Serialize)]
pub struct MeResponse {
    pub user: String,
    pub is_admin: bool,
}

#[derive(Serialize)]
pub struct UserDto {
    pub username: String,
    pub is_admin: bool,
    pub created_at: String,
}

impl From<users::Model> for UserDto {
    fn from(model: users::Model) -> Self {
        Self {
            username: model.username,
            is_admin: model.is_admin,
            created_at: model.created_at,
        }
    }
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Deserialize)]
pub struct SelfResetRequest {
    pub username: String,
    pub word: String,
    pub new_password: String,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

// ============================================================================
// Admin credential administration
// ============================================================================

#[derive(Deserialize)]
pub struct AdminResetRequest {
    #[serde(default)]
    pub new_password: Option<String>,
    #[serde(default)]
    pub generate: bool,
}

#[derive(Serialize)]
pub struct AdminResetResponse {
    pub username: String,
    pub temp_password: String,
}

#[derive(Deserialize)]
pub struct GenTempRequest {
    pub username: String,
    #[serde(default = "default_ttl_minutes")]
    pub ttl_minutes: i64,
}

const fn default_ttl_minutes() -> i64 {
    15
}

#[derive(Serialize)]
pub struct TempPasswordResponse {
    pub username: String,
    pub temp_password: String,
    pub expires_at: String,
}

#[derive(Serialize)]
pub struct TempPasswordDto {
    pub username: String,
    pub expires_at: String,
    pub revealed: bool,
    pub created_by: String,
    pub created_at: String,
    pub status: String,
}

impl From<TempPasswordOverview> for TempPasswordDto {
    fn from(row: TempPasswordOverview) -> Self {
        Self {
            username: row.username,
            expires_at: row.expires_at,
            revealed: row.revealed,
            created_by: row.created_by,
            created_at: row.created_at,
            status: row.status.to_string(),
        }
    }
}

#[derive(Serialize)]
pub struct AuditEntryDto {
    pub username: String,
    pub action: String,
    pub actor: String,
    pub at: String,
    pub details: Option<String>,
}

impl From<pw_audit::Model> for AuditEntryDto {
    fn from(model: pw_audit::Model) -> Self {
        Self {
            username: model.username,
            action: model.action,
            actor: model.actor,
            at: model.at,
            details: model.details,
        }
    }
}

#[derive(Serialize)]
pub struct DeleteUserResponse {
    pub deleted_user: String,
    pub deleted_downloads: usize,
}

// ============================================================================
// Downloads
// ============================================================================

#[derive(Deserialize)]
pub struct DownloadRequest {
    pub url: String,
}

#[derive(Serialize)]
pub struct DownloadResponse {
    pub file_id: String,
    pub filename: String,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub ready: bool,
}

#[derive(Serialize)]
pub struct DownloadDto {
    pub id: String,
    pub url: String,
    pub status: String,
    pub filename: Option<String>,
    pub owner_username: String,
    pub created_at: String,
}

impl From<downloads::Model> for DownloadDto {
    fn from(model: downloads::Model) -> Self {
        Self {
            id: model.id,
            url: model.url,
            status: model.status,
            filename: model.filename,
            owner_username: model.owner_username,
            created_at: model.created_at,
        }
    }
}
