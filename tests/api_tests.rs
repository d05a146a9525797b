use audiarr::config::Config;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

const MASTER_WORD: &str = "override-word-for-tests";

async fn spawn_app() -> (Router, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");

    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    config.security.key_path = dir
        .path()
        .join("secret.key")
        .to_string_lossy()
        .into_owned();
    config.security.master_reset_word = Some(MASTER_WORD.to_string());
    // Keep test hashing cheap.
    config.security.argon2_memory_cost_kib = 1024;
    config.security.argon2_time_cost = 1;
    config.downloads.audio_dir = dir.path().join("audio").to_string_lossy().into_owned();

    let state = audiarr::api::create_app_state_from_config(config)
        .await
        .expect("Failed to create app state");
    (audiarr::api::router(state).await, dir)
}

async fn request(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }

    let request = match body {
        Some(json) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

async fn register(app: &Router, username: &str, password: &str, reset_word: Option<&str>) -> Value {
    let mut payload = json!({ "username": username, "password": password });
    if let Some(word) = reset_word {
        payload["reset_word"] = json!(word);
    }
    let (status, body) = request(app, "POST", "/register", None, Some(payload)).await;
    assert_eq!(status, StatusCode::OK);
    body
}

async fn login(app: &Router, username: &str, password: &str) -> String {
    let (status, body) = request(
        app,
        "POST",
        "/login",
        None,
        Some(json!({ "username": username, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["data"]["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn liveness_endpoint_is_public() {
    let (app, _dir) = spawn_app().await;

    let (status, body) = request(&app, "GET", "/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
}

#[tokio::test]
async fn first_registered_user_becomes_admin() {
    let (app, _dir) = spawn_app().await;

    let body = register(&app, "alice", "alice-pass", None).await;
    assert_eq!(body["data"]["is_admin"], json!(true));

    let body = register(&app, "bob", "bob-pass", None).await;
    assert_eq!(body["data"]["is_admin"], json!(false));
}

#[tokio::test]
async fn duplicate_username_is_rejected() {
    let (app, _dir) = spawn_app().await;
    register(&app, "alice", "alice-pass", None).await;

    let (status, body) = request(
        &app,
        "POST",
        "/register",
        None,
        Some(json!({ "username": "alice", "password": "other" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], json!(false));
}

#[tokio::test]
async fn login_and_me() {
    let (app, _dir) = spawn_app().await;
    register(&app, "alice", "alice-pass", None).await;

    let token = login(&app, "alice", "alice-pass").await;

    let (status, body) = request(&app, "GET", "/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["user"], json!("alice"));
    assert_eq!(body["data"]["is_admin"], json!(true));

    let (status, _) = request(
        &app,
        "POST",
        "/login",
        None,
        Some(json!({ "username": "alice", "password": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn protected_routes_reject_missing_or_bogus_tokens() {
    let (app, _dir) = spawn_app().await;
    register(&app, "alice", "alice-pass", None).await;

    let (status, _) = request(&app, "GET", "/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = request(&app, "GET", "/me", Some("deadbeef"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = request(&app, "GET", "/users", Some("deadbeef"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn change_password_requires_current_password() {
    let (app, _dir) = spawn_app().await;
    register(&app, "alice", "old-pass", None).await;
    let token = login(&app, "alice", "old-pass").await;

    let (status, _) = request(
        &app,
        "POST",
        "/change_password",
        Some(&token),
        Some(json!({ "current_password": "wrong", "new_password": "new-pass" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = request(
        &app,
        "POST",
        "/change_password",
        Some(&token),
        Some(json!({ "current_password": "old-pass", "new_password": "new-pass" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Old password no longer works, new one does.
    let (status, _) = request(
        &app,
        "POST",
        "/login",
        None,
        Some(json!({ "username": "alice", "password": "old-pass" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    login(&app, "alice", "new-pass").await;
}

#[tokio::test]
async fn self_reset_with_recovery_word() {
    let (app, _dir) = spawn_app().await;
    register(&app, "alice", "old-pass", Some("my-secret-word")).await;

    let (status, _) = request(
        &app,
        "POST",
        "/self_reset",
        None,
        Some(json!({ "username": "alice", "word": "wrong-word", "new_password": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = request(
        &app,
        "POST",
        "/self_reset",
        None,
        Some(json!({
            "username": "alice",
            "word": "my-secret-word",
            "new_password": "reset-pass"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    login(&app, "alice", "reset-pass").await;
}

#[tokio::test]
async fn self_reset_with_master_word() {
    let (app, _dir) = spawn_app().await;
    register(&app, "alice", "old-pass", None).await;

    // No recovery word registered; only the master override can reset.
    let (status, _) = request(
        &app,
        "POST",
        "/self_reset",
        None,
        Some(json!({ "username": "alice", "word": "guess", "new_password": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = request(
        &app,
        "POST",
        "/self_reset",
        None,
        Some(json!({
            "username": "alice",
            "word": MASTER_WORD,
            "new_password": "master-reset"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    login(&app, "alice", "master-reset").await;
}

#[tokio::test]
async fn admin_force_reset_returns_usable_password() {
    let (app, _dir) = spawn_app().await;
    register(&app, "alice", "alice-pass", None).await;
    register(&app, "bob", "bob-pass", None).await;
    let admin_token = login(&app, "alice", "alice-pass").await;

    let (status, body) = request(
        &app,
        "POST",
        "/users/bob/reset_password",
        Some(&admin_token),
        Some(json!({ "generate": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let new_password = body["data"]["temp_password"].as_str().unwrap().to_string();
    login(&app, "bob", &new_password).await;

    // Non-admins may not force-reset.
    let bob_token = login(&app, "bob", &new_password).await;
    let (status, _) = request(
        &app,
        "POST",
        "/users/alice/reset_password",
        Some(&bob_token),
        Some(json!({ "generate": true })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn temp_password_generate_reveal_once() {
    let (app, _dir) = spawn_app().await;
    register(&app, "alice", "alice-pass", None).await;
    register(&app, "bob", "bob-pass", None).await;
    let admin_token = login(&app, "alice", "alice-pass").await;

    // Nothing to reveal yet.
    let (status, _) = request(
        &app,
        "GET",
        "/admin/temp_pw/reveal/bob",
        Some(&admin_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = request(
        &app,
        "POST",
        "/admin/temp_pw/generate",
        Some(&admin_token),
        Some(json!({ "username": "bob", "ttl_minutes": 15 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let generated = body["data"]["temp_password"].as_str().unwrap().to_string();
    assert_eq!(generated.len(), 14);

    // First reveal returns the same plaintext.
    let (status, body) = request(
        &app,
        "GET",
        "/admin/temp_pw/reveal/bob",
        Some(&admin_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["temp_password"], json!(generated));

    // Second reveal is gone for good.
    let (status, _) = request(
        &app,
        "GET",
        "/admin/temp_pw/reveal/bob",
        Some(&admin_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::GONE);

    // Issuing a temp password never touches the live credential.
    login(&app, "bob", "bob-pass").await;
}

#[tokio::test]
async fn temp_password_endpoints_are_admin_only() {
    let (app, _dir) = spawn_app().await;
    register(&app, "alice", "alice-pass", None).await;
    register(&app, "bob", "bob-pass", None).await;
    let bob_token = login(&app, "bob", "bob-pass").await;

    let (status, _) = request(
        &app,
        "POST",
        "/admin/temp_pw/generate",
        Some(&bob_token),
        Some(json!({ "username": "alice", "ttl_minutes": 15 })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = request(
        &app,
        "GET",
        "/admin/temp_pw/list",
        Some(&bob_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = request(&app, "GET", "/admin/pw_audit", Some(&bob_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn temp_password_list_and_audit_reflect_activity() {
    let (app, _dir) = spawn_app().await;
    register(&app, "alice", "alice-pass", None).await;
    register(&app, "bob", "bob-pass", None).await;
    let admin_token = login(&app, "alice", "alice-pass").await;

    request(
        &app,
        "POST",
        "/admin/temp_pw/generate",
        Some(&admin_token),
        Some(json!({ "username": "bob", "ttl_minutes": 15 })),
    )
    .await;
    request(
        &app,
        "GET",
        "/admin/temp_pw/reveal/bob",
        Some(&admin_token),
        None,
    )
    .await;

    let (status, body) = request(
        &app,
        "GET",
        "/admin/temp_pw/list",
        Some(&admin_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let rows = body["data"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["username"], json!("bob"));
    assert_eq!(rows[0]["status"], json!("revealed"));
    assert!(rows[0].get("temp_password").is_none());

    let (status, body) = request(&app, "GET", "/admin/pw_audit", Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::OK);
    let entries = body["data"].as_array().unwrap();
    let actions: Vec<&str> = entries
        .iter()
        .filter_map(|e| e["action"].as_str())
        .collect();
    assert!(actions.contains(&"generate_temp"));
    assert!(actions.contains(&"reveal_temp"));
}

#[tokio::test]
async fn delete_user_guards_last_admin() {
    let (app, _dir) = spawn_app().await;
    register(&app, "alice", "alice-pass", None).await;
    register(&app, "bob", "bob-pass", None).await;
    let admin_token = login(&app, "alice", "alice-pass").await;
    let bob_token = login(&app, "bob", "bob-pass").await;

    // The only admin cannot be deleted.
    let (status, _) = request(
        &app,
        "DELETE",
        "/admin/delete_user/alice",
        Some(&admin_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Non-admins cannot delete anyone.
    let (status, _) = request(
        &app,
        "DELETE",
        "/admin/delete_user/alice",
        Some(&bob_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = request(
        &app,
        "DELETE",
        "/admin/delete_user/bob",
        Some(&admin_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["deleted_user"], json!("bob"));

    // Bob's session died with him.
    let (status, _) = request(&app, "GET", "/me", Some(&bob_token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = request(
        &app,
        "DELETE",
        "/admin/delete_user/bob",
        Some(&admin_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn user_listing_exposes_no_secrets() {
    let (app, _dir) = spawn_app().await;
    register(&app, "alice", "alice-pass", Some("word-of-alice")).await;
    register(&app, "bob", "bob-pass", None).await;
    let token = login(&app, "bob", "bob-pass").await;

    let (status, body) = request(&app, "GET", "/users", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let users = body["data"].as_array().unwrap();
    assert_eq!(users.len(), 2);
    for user in users {
        assert!(user.get("password_hash").is_none());
        assert!(user.get("reset_word_hash").is_none());
        assert!(user.get("enc_password").is_none());
    }
}

#[tokio::test]
async fn download_listing_and_missing_files() {
    let (app, _dir) = spawn_app().await;
    register(&app, "alice", "alice-pass", None).await;
    let token = login(&app, "alice", "alice-pass").await;

    let (status, body) = request(&app, "GET", "/my_downloads", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 0);

    let (status, body) = request(&app, "GET", "/status/no-such-id", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["ready"], json!(false));

    let (status, _) = request(
        &app,
        "GET",
        &format!("/download/no-such-id?token={token}"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Unauthenticated fetch never reaches the lookup.
    let (status, _) = request(&app, "GET", "/download/no-such-id", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
