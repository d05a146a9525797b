//! Audio download endpoints: the yt-dlp pipeline plus file serving.
//!
//! `GET /download/{id}` lives outside the auth middleware because browsers
//! cannot attach headers to plain downloads; it accepts either a bearer
//! header or (when enabled in config) a `?token=` query parameter.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, header},
    response::IntoResponse,
};
use serde::Deserialize;
use std::sync::Arc;
use tower::ServiceExt;
use tower_http::services::ServeFile;

use super::{ApiError, ApiResponse, AppState};
use crate::api::auth::CurrentUser;
use crate::api::types::{DownloadDto, DownloadRequest, DownloadResponse, StatusResponse};

/// POST /download
/// Runs the extraction synchronously and returns the resulting filename.
pub async fn start_download(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(payload): Json<DownloadRequest>,
) -> Result<Json<ApiResponse<DownloadResponse>>, ApiError> {
    if payload.url.is_empty() {
        return Err(ApiError::validation("URL is required"));
    }

    let id = uuid::Uuid::new_v4().to_string();
    state
        .store
        .insert_download(&id, &payload.url, &user.username)
        .await?;

    match state.extractor.extract(&id, &payload.url).await {
        Ok(filename) => {
            state.store.set_download_ready(&id, &filename).await?;
            Ok(Json(ApiResponse::success(DownloadResponse {
                file_id: id,
                filename,
            })))
        }
        Err(e) => {
            state.store.set_download_error(&id).await?;
            tracing::warn!(id, error = %e, "Download failed");
            Err(ApiError::internal("Download failed"))
        }
    }
}

/// GET /status/{id}
pub async fn status(
    State(state): State<Arc<AppState>>,
    Extension(_user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<StatusResponse>>, ApiError> {
    let ready = match state.store.get_download(&id).await? {
        Some(row) => match row.filename {
            Some(filename) => state.extractor.audio_path(&filename).exists(),
            None => false,
        },
        None => false,
    };

    Ok(Json(ApiResponse::success(StatusResponse { ready })))
}

#[derive(Deserialize)]
pub struct FetchParams {
    token: Option<String>,
}

/// GET /download/{id}
/// Serves the finished MP3 as an attachment.
pub async fn fetch_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<FetchParams>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    authenticate_fetch(&state, &headers, params.token.as_deref()).await?;

    let row = state
        .store
        .get_download(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound("File not found".to_string()))?;

    let filename = row
        .filename
        .ok_or_else(|| ApiError::NotFound("File not found".to_string()))?;

    let path = state.extractor.audio_path(&filename);
    if !path.exists() {
        return Err(ApiError::NotFound("File not found".to_string()));
    }

    let req = axum::http::Request::builder()
        .body(axum::body::Body::empty())
        .map_err(|e| ApiError::internal(format!("Failed to build request: {e}")))?;

    let mut res = ServeFile::new(path)
        .oneshot(req)
        .await
        .map_err(|e| ApiError::internal(format!("File serving error: {e}")))?;

    res.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("audio/mpeg"),
    );
    if let Ok(disposition) =
        HeaderValue::from_str(&format!("attachment; filename=\"{filename}\""))
    {
        res.headers_mut()
            .insert(header::CONTENT_DISPOSITION, disposition);
    }

    Ok(res)
}

/// DELETE /delete/{id}
/// Owner or admin only.
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<crate::api::types::MessageResponse>>, ApiError> {
    let row = state
        .store
        .get_download(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Download not found".to_string()))?;

    if row.owner_username != user.username && !user.is_admin {
        return Err(ApiError::Forbidden("Not allowed".to_string()));
    }

    if let Some(filename) = &row.filename {
        state.extractor.remove_file(filename).await;
    }
    state.store.delete_download(&id).await?;

    Ok(Json(ApiResponse::success(
        crate::api::types::MessageResponse {
            message: "Deleted".to_string(),
        },
    )))
}

/// GET /videos
/// Any authenticated user can list all downloads; source URLs are included
/// only for the owner's own listings, not here.
pub async fn list_all(
    State(state): State<Arc<AppState>>,
    Extension(_user): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<Vec<DownloadDto>>>, ApiError> {
    let rows = state.store.list_downloads().await?;

    Ok(Json(ApiResponse::success(
        rows.into_iter()
            .map(|mut r| {
                r.url = String::new();
                DownloadDto::from(r)
            })
            .collect(),
    )))
}

/// GET /my_downloads
pub async fn my_downloads(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<Vec<DownloadDto>>>, ApiError> {
    let rows = state.store.list_downloads_for_owner(&user.username).await?;

    Ok(Json(ApiResponse::success(
        rows.into_iter().map(DownloadDto::from).collect(),
    )))
}

/// GET /user_downloads/{username}
pub async fn user_downloads(
    State(state): State<Arc<AppState>>,
    Extension(_user): Extension<CurrentUser>,
    Path(username): Path<String>,
) -> Result<Json<ApiResponse<Vec<DownloadDto>>>, ApiError> {
    let rows = state.store.list_downloads_for_owner(&username).await?;

    Ok(Json(ApiResponse::success(
        rows.into_iter().map(DownloadDto::from).collect(),
    )))
}

async fn authenticate_fetch(
    state: &Arc<AppState>,
    headers: &HeaderMap,
    query_token: Option<&str>,
) -> Result<(), ApiError> {
    let header = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    if header.is_some() {
        state.sessions.authenticate_header(header).await?;
        return Ok(());
    }

    if let Some(token) = query_token {
        let allow_query = state.config.read().await.server.allow_token_in_query;
        if allow_query {
            state.sessions.authenticate_token(token).await?;
            return Ok(());
        }
    }

    Err(ApiError::Unauthorized("Missing token".to_string()))
}
