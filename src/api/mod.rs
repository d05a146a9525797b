use axum::{
    Json, Router,
    http::HeaderValue,
    middleware,
    routing::{delete, get, post},
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::db::Store;
use crate::services::{
    AccountService, ExtractorService, SecretStore, SessionService, TempPasswordService, TokenCache,
};

mod admin;
pub mod auth;
pub mod downloads;
mod error;
mod types;

pub use error::ApiError;
pub use types::*;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RwLock<Config>>,

    pub store: Store,

    pub sessions: SessionService,

    pub accounts: AccountService,

    pub temp_passwords: TempPasswordService,

    pub extractor: ExtractorService,
}

pub async fn create_app_state_from_config(config: Config) -> anyhow::Result<Arc<AppState>> {
    let store = Store::with_pool_options(
        &config.general.database_path,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await?;

    let secrets = SecretStore::load_or_create(std::path::Path::new(&config.security.key_path))?;

    let sessions = SessionService::new(store.clone(), TokenCache::new());
    let accounts = AccountService::new(store.clone(), secrets.clone(), config.security.clone());
    let temp_passwords = TempPasswordService::new(store.clone(), secrets);
    let extractor = ExtractorService::new(config.downloads.clone());

    Ok(Arc::new(AppState {
        config: Arc::new(RwLock::new(config)),
        store,
        sessions,
        accounts,
        temp_passwords,
        extractor,
    }))
}

pub async fn router(state: Arc<AppState>) -> Router {
    let cors_origins = {
        let config = state.config.read().await;
        config.server.cors_allowed_origins.clone()
    };

    let protected_routes = create_protected_router(state.clone());

    let cors_layer = if cors_origins.contains(&"*".to_string()) {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .merge(protected_routes)
        .route("/", get(liveness))
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/self_reset", post(auth::self_reset))
        .route("/download/{id}", get(downloads::fetch_file))
        .with_state(state)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
}

fn create_protected_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/me", get(auth::me))
        .route("/users", get(auth::list_users))
        .route("/change_password", post(auth::change_password))
        .route(
            "/users/{username}/reset_password",
            post(admin::reset_password),
        )
        .route("/admin/temp_pw/generate", post(admin::generate_temp))
        .route("/admin/temp_pw/reveal/{username}", get(admin::reveal_temp))
        .route("/admin/temp_pw/list", get(admin::list_temps))
        .route("/admin/pw_audit", get(admin::pw_audit))
        .route("/admin/delete_user/{username}", delete(admin::delete_user))
        .route("/download", post(downloads::start_download))
        .route("/status/{id}", get(downloads::status))
        .route("/delete/{id}", delete(downloads::delete_file))
        .route("/videos", get(downloads::list_all))
        .route("/my_downloads", get(downloads::my_downloads))
        .route(
            "/user_downloads/{username}",
            get(downloads::user_downloads),
        )
        .route_layer(middleware::from_fn_with_state(state, auth::auth_middleware))
}

async fn liveness() -> Json<ApiResponse<MessageResponse>> {
    Json(ApiResponse::success(MessageResponse {
        message: "ok".to_string(),
    }))
}
