//! Admin credential administration: force-resets, temp passwords, the audit
//! trail and user deletion. Admin checks live in the services; these handlers
//! only shape requests and responses.

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use chrono::Utc;
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState};
use crate::api::auth::CurrentUser;
use crate::api::types::{
    AdminResetRequest, AdminResetResponse, AuditEntryDto, DeleteUserResponse, GenTempRequest,
    TempPasswordDto, TempPasswordResponse,
};

/// POST /users/{username}/reset_password
/// Immediate force-reset; the new plaintext is returned once, right here.
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    Path(username): Path<String>,
    Json(payload): Json<AdminResetRequest>,
) -> Result<Json<ApiResponse<AdminResetResponse>>, ApiError> {
    let new_password = state
        .accounts
        .admin_reset_password(
            &admin,
            &username,
            payload.new_password.as_deref(),
            payload.generate,
        )
        .await?;

    Ok(Json(ApiResponse::success(AdminResetResponse {
        username,
        temp_password: new_password,
    })))
}

/// POST /admin/temp_pw/generate
pub async fn generate_temp(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    Json(payload): Json<GenTempRequest>,
) -> Result<Json<ApiResponse<TempPasswordResponse>>, ApiError> {
    if payload.username.is_empty() {
        return Err(ApiError::validation("Username is required"));
    }
    if payload.ttl_minutes < 1 {
        return Err(ApiError::validation("TTL must be at least 1 minute"));
    }

    let issued = state
        .temp_passwords
        .generate(&admin, &payload.username, payload.ttl_minutes, Utc::now())
        .await?;

    Ok(Json(ApiResponse::success(TempPasswordResponse {
        username: issued.username,
        temp_password: issued.temp_password,
        expires_at: issued.expires_at.to_rfc3339(),
    })))
}

/// GET /admin/temp_pw/reveal/{username}
/// One-time reveal; a second call answers 410 Gone.
pub async fn reveal_temp(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    Path(username): Path<String>,
) -> Result<Json<ApiResponse<TempPasswordResponse>>, ApiError> {
    let issued = state
        .temp_passwords
        .reveal(&admin, &username, Utc::now())
        .await?;

    Ok(Json(ApiResponse::success(TempPasswordResponse {
        username: issued.username,
        temp_password: issued.temp_password,
        expires_at: issued.expires_at.to_rfc3339(),
    })))
}

/// GET /admin/temp_pw/list
pub async fn list_temps(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<Vec<TempPasswordDto>>>, ApiError> {
    let rows = state.temp_passwords.list(&admin, Utc::now()).await?;

    Ok(Json(ApiResponse::success(
        rows.into_iter().map(TempPasswordDto::from).collect(),
    )))
}

/// GET /admin/pw_audit
pub async fn pw_audit(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<Vec<AuditEntryDto>>>, ApiError> {
    let rows = state.temp_passwords.audit(&admin).await?;

    Ok(Json(ApiResponse::success(
        rows.into_iter().map(AuditEntryDto::from).collect(),
    )))
}

/// DELETE /admin/delete_user/{username}
/// Removes the user, their sessions, their download rows and the files those
/// rows point at. Refuses to remove the last admin.
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    Path(username): Path<String>,
) -> Result<Json<ApiResponse<DeleteUserResponse>>, ApiError> {
    let removed = state.accounts.delete_user(&admin, &username).await?;
    let deleted_downloads = removed.len();

    for row in removed {
        if let Some(filename) = row.filename {
            state.extractor.remove_file(&filename).await;
        }
    }

    state.sessions.forget_user(&username).await?;

    Ok(Json(ApiResponse::success(DeleteUserResponse {
        deleted_user: username,
        deleted_downloads,
    })))
}
