use anyhow::{Context, Result};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use crate::entities::tokens;

/// Durable side of the session registry. Tokens are insert-only; the
/// in-memory cache in front of this repository lives in the session service.
pub struct SessionRepository {
    conn: DatabaseConnection,
}

impl SessionRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn insert(&self, token: &str, username: &str) -> Result<()> {
        tokens::ActiveModel {
            token: Set(token.to_string()),
            username: Set(username.to_string()),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
        }
        .insert(&self.conn)
        .await
        .context("Failed to persist token")?;

        Ok(())
    }

    pub async fn find_username(&self, token: &str) -> Result<Option<String>> {
        let row = tokens::Entity::find_by_id(token)
            .one(&self.conn)
            .await
            .context("Failed to look up token")?;

        Ok(row.map(|r| r.username))
    }

    pub async fn delete_for_user(&self, username: &str) -> Result<u64> {
        let res = tokens::Entity::delete_many()
            .filter(tokens::Column::Username.eq(username))
            .exec(&self.conn)
            .await
            .context("Failed to delete tokens")?;

        Ok(res.rows_affected)
    }
}
