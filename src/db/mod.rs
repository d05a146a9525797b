use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::entities::{downloads, pw_audit, temp_passwords, users};

pub mod migrator;
pub mod repositories;

pub use repositories::temp_password::RevealOutcome;
pub use repositories::user::DeleteOutcome;

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn session_repo(&self) -> repositories::session::SessionRepository {
        repositories::session::SessionRepository::new(self.conn.clone())
    }

    fn temp_password_repo(&self) -> repositories::temp_password::TempPasswordRepository {
        repositories::temp_password::TempPasswordRepository::new(self.conn.clone())
    }

    fn download_repo(&self) -> repositories::download::DownloadRepository {
        repositories::download::DownloadRepository::new(self.conn.clone())
    }

    // ========== Users ==========

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<users::Model>> {
        self.user_repo().get_by_username(username).await
    }

    pub async fn create_user(
        &self,
        username: &str,
        password_hash: String,
        enc_password: Option<String>,
        reset_word_hash: Option<String>,
    ) -> Result<Option<users::Model>> {
        self.user_repo()
            .create(username, password_hash, enc_password, reset_word_hash)
            .await
    }

    pub async fn list_users(&self) -> Result<Vec<users::Model>> {
        self.user_repo().list().await
    }

    pub async fn update_user_credentials(
        &self,
        username: &str,
        password_hash: String,
        enc_password: String,
    ) -> Result<bool> {
        self.user_repo()
            .update_credentials(username, password_hash, enc_password)
            .await
    }

    pub async fn delete_user(&self, username: &str) -> Result<DeleteOutcome> {
        self.user_repo().delete_guarded(username).await
    }

    // ========== Sessions ==========

    pub async fn insert_token(&self, token: &str, username: &str) -> Result<()> {
        self.session_repo().insert(token, username).await
    }

    pub async fn find_token_username(&self, token: &str) -> Result<Option<String>> {
        self.session_repo().find_username(token).await
    }

    pub async fn delete_tokens_for_user(&self, username: &str) -> Result<u64> {
        self.session_repo().delete_for_user(username).await
    }

    // ========== Temp passwords & audit ==========

    pub async fn issue_temp_password(
        &self,
        username: &str,
        enc_temp: String,
        expires_at: DateTime<Utc>,
        created_by: &str,
        now: DateTime<Utc>,
    ) -> Result<temp_passwords::Model> {
        self.temp_password_repo()
            .issue(username, enc_temp, expires_at, created_by, now)
            .await
    }

    pub async fn reveal_temp_password(
        &self,
        username: &str,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<RevealOutcome> {
        self.temp_password_repo().reveal(username, actor, now).await
    }

    pub async fn list_temp_passwords(&self) -> Result<Vec<temp_passwords::Model>> {
        self.temp_password_repo().list_all().await
    }

    pub async fn append_pw_audit(
        &self,
        username: &str,
        action: &str,
        actor: &str,
        details: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.temp_password_repo()
            .append_audit(username, action, actor, details, now)
            .await
    }

    pub async fn pw_audit_tail(&self, limit: u64) -> Result<Vec<pw_audit::Model>> {
        self.temp_password_repo().audit_tail(limit).await
    }

    // ========== Downloads ==========

    pub async fn insert_download(&self, id: &str, url: &str, owner: &str) -> Result<()> {
        self.download_repo().insert(id, url, owner).await
    }

    pub async fn get_download(&self, id: &str) -> Result<Option<downloads::Model>> {
        self.download_repo().get(id).await
    }

    pub async fn set_download_ready(&self, id: &str, filename: &str) -> Result<()> {
        self.download_repo().set_ready(id, filename).await
    }

    pub async fn set_download_error(&self, id: &str) -> Result<()> {
        self.download_repo().set_error(id).await
    }

    pub async fn list_downloads(&self) -> Result<Vec<downloads::Model>> {
        self.download_repo().list_all().await
    }

    pub async fn list_downloads_for_owner(&self, owner: &str) -> Result<Vec<downloads::Model>> {
        self.download_repo().list_for_owner(owner).await
    }

    pub async fn delete_download(&self, id: &str) -> Result<bool> {
        self.download_repo().delete(id).await
    }

    pub async fn delete_downloads_for_owner(&self, owner: &str) -> Result<Vec<downloads::Model>> {
        self.download_repo().delete_for_owner(owner).await
    }
}
