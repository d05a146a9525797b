use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::entities::downloads;

pub struct DownloadRepository {
    conn: DatabaseConnection,
}

impl DownloadRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn insert(&self, id: &str, url: &str, owner: &str) -> Result<()> {
        downloads::ActiveModel {
            id: Set(id.to_string()),
            url: Set(url.to_string()),
            status: Set("processing".to_string()),
            filename: Set(None),
            owner_username: Set(owner.to_string()),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
        }
        .insert(&self.conn)
        .await
        .context("Failed to insert download")?;

        Ok(())
    }

    pub async fn get(&self, id: &str) -> Result<Option<downloads::Model>> {
        let row = downloads::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query download")?;

        Ok(row)
    }

    pub async fn set_ready(&self, id: &str, filename: &str) -> Result<()> {
        self.set_status(id, "ready", Some(filename)).await
    }

    pub async fn set_error(&self, id: &str) -> Result<()> {
        self.set_status(id, "error", None).await
    }

    async fn set_status(&self, id: &str, status: &str, filename: Option<&str>) -> Result<()> {
        let row = downloads::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query download for status update")?
            .ok_or_else(|| anyhow::anyhow!("Download not found: {id}"))?;

        let mut active: downloads::ActiveModel = row.into();
        active.status = Set(status.to_string());
        if let Some(filename) = filename {
            active.filename = Set(Some(filename.to_string()));
        }
        active.update(&self.conn).await?;

        Ok(())
    }

    pub async fn list_all(&self) -> Result<Vec<downloads::Model>> {
        let rows = downloads::Entity::find()
            .order_by_desc(downloads::Column::CreatedAt)
            .all(&self.conn)
            .await
            .context("Failed to list downloads")?;

        Ok(rows)
    }

    pub async fn list_for_owner(&self, owner: &str) -> Result<Vec<downloads::Model>> {
        let rows = downloads::Entity::find()
            .filter(downloads::Column::OwnerUsername.eq(owner))
            .order_by_desc(downloads::Column::CreatedAt)
            .all(&self.conn)
            .await
            .context("Failed to list downloads for owner")?;

        Ok(rows)
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        let res = downloads::Entity::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("Failed to delete download")?;

        Ok(res.rows_affected > 0)
    }

    /// Removes all download rows for `owner` and returns them so the caller
    /// can clean up the files on disk.
    pub async fn delete_for_owner(&self, owner: &str) -> Result<Vec<downloads::Model>> {
        let rows = self.list_for_owner(owner).await?;

        downloads::Entity::delete_many()
            .filter(downloads::Column::OwnerUsername.eq(owner))
            .exec(&self.conn)
            .await
            .context("Failed to delete downloads for owner")?;

        Ok(rows)
    }
}
