use axum::{
    Extension, Json,
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::IntoResponse,
};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState};
use crate::api::types::{
    ChangePasswordRequest, LoginRequest, LoginResponse, MeResponse, MessageResponse,
    RegisterRequest, RegisterResponse, SelfResetRequest, UserDto,
};
use crate::entities::users;

/// Authenticated caller, resolved by the middleware and attached to the
/// request extensions for handlers to extract.
#[derive(Clone)]
pub struct CurrentUser(pub users::Model);

/// Bearer-token middleware guarding all protected routes. Resolves the
/// `Authorization` header to a live user record or answers 401.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<impl IntoResponse, ApiError> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let user = state.sessions.authenticate_header(header).await?;

    request.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(request).await)
}

/// POST /register
/// Create an account. The very first account ever registered becomes admin.
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<ApiResponse<RegisterResponse>>, ApiError> {
    if payload.username.is_empty() {
        return Err(ApiError::validation("Username is required"));
    }
    if payload.password.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }

    let user = state
        .accounts
        .register(
            &payload.username,
            &payload.password,
            payload.reset_word.as_deref(),
        )
        .await?;

    Ok(Json(ApiResponse::success(RegisterResponse {
        username: user.username,
        is_admin: user.is_admin,
    })))
}

/// POST /login
/// Verify credentials and issue a bearer token.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    if payload.username.is_empty() {
        return Err(ApiError::validation("Username is required"));
    }
    if payload.password.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }

    let user = state
        .accounts
        .verify_login(&payload.username, &payload.password)
        .await?;

    let token = state.sessions.issue(&user.username).await?;

    Ok(Json(ApiResponse::success(LoginResponse {
        token,
        user: user.username,
        is_admin: user.is_admin,
    })))
}

/// GET /me
pub async fn me(
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Json<ApiResponse<MeResponse>> {
    Json(ApiResponse::success(MeResponse {
        user: user.username,
        is_admin: user.is_admin,
    }))
}

/// GET /users
/// Any authenticated caller may list accounts; hashes and recovery words are
/// never included.
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Extension(_user): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<Vec<UserDto>>>, ApiError> {
    let users = state.accounts.list_users().await?;

    Ok(Json(ApiResponse::success(
        users.into_iter().map(UserDto::from).collect(),
    )))
}

/// POST /change_password
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    if payload.new_password.is_empty() {
        return Err(ApiError::validation("New password is required"));
    }

    state
        .accounts
        .change_password(&user, &payload.current_password, &payload.new_password)
        .await?;

    Ok(Json(ApiResponse::success(MessageResponse {
        message: "Password updated successfully".to_string(),
    })))
}

/// POST /self_reset
/// Token-less password recovery via the registered secret word, or the
/// configured master override word.
pub async fn self_reset(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SelfResetRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    if payload.username.is_empty() {
        return Err(ApiError::validation("Username is required"));
    }
    if payload.new_password.is_empty() {
        return Err(ApiError::validation("New password is required"));
    }

    state
        .accounts
        .self_reset(&payload.username, &payload.word, &payload.new_password)
        .await?;

    Ok(Json(ApiResponse::success(MessageResponse {
        message: "Password reset successfully".to_string(),
    })))
}
