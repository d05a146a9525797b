use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};

use crate::entities::users;

/// Outcome of a guarded delete. `LastAdmin` means removing the target would
/// have left the directory without admins, so nothing was removed.
#[derive(Debug, PartialEq, Eq)]
pub enum DeleteOutcome {
    NotFound,
    LastAdmin,
    Deleted,
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<users::Model>> {
        let user = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query user by username")?;

        Ok(user)
    }

    /// Creates a user, returning `None` if the username is taken.
    ///
    /// The duplicate check, the user count and the insert run in one
    /// transaction so the very first registration is the only one that can
    /// observe an empty table and claim the admin flag.
    pub async fn create(
        &self,
        username: &str,
        password_hash: String,
        enc_password: Option<String>,
        reset_word_hash: Option<String>,
    ) -> Result<Option<users::Model>> {
        let txn = self.conn.begin().await?;

        let existing = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&txn)
            .await
            .context("Failed to check username availability")?;

        if existing.is_some() {
            txn.rollback().await?;
            return Ok(None);
        }

        let count = users::Entity::find().count(&txn).await?;

        let user = users::ActiveModel {
            username: Set(username.to_string()),
            password_hash: Set(password_hash),
            enc_password: Set(enc_password),
            reset_word_hash: Set(reset_word_hash),
            is_admin: Set(count == 0),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .context("Failed to insert user")?;

        txn.commit().await?;

        Ok(Some(user))
    }

    pub async fn list(&self) -> Result<Vec<users::Model>> {
        let users = users::Entity::find()
            .order_by_asc(users::Column::CreatedAt)
            .all(&self.conn)
            .await
            .context("Failed to list users")?;

        Ok(users)
    }

    /// Rewrites the live credential fields. Returns false if the user is gone.
    pub async fn update_credentials(
        &self,
        username: &str,
        password_hash: String,
        enc_password: String,
    ) -> Result<bool> {
        let user = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query user for credential update")?;

        let Some(user) = user else {
            return Ok(false);
        };

        let mut active: users::ActiveModel = user.into();
        active.password_hash = Set(password_hash);
        active.enc_password = Set(Some(enc_password));
        active.update(&self.conn).await?;

        Ok(true)
    }

    /// Deletes a user unless that would leave the directory without admins.
    ///
    /// The admin count and the delete share one transaction, so two
    /// concurrent deletions of the two remaining admins cannot both pass the
    /// guard and drop the admin count to zero.
    pub async fn delete_guarded(&self, username: &str) -> Result<DeleteOutcome> {
        let txn = self.conn.begin().await?;

        let target = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&txn)
            .await
            .context("Failed to query user for deletion")?;

        let Some(target) = target else {
            txn.rollback().await?;
            return Ok(DeleteOutcome::NotFound);
        };

        if target.is_admin {
            let admins = users::Entity::find()
                .filter(users::Column::IsAdmin.eq(true))
                .count(&txn)
                .await
                .context("Failed to count admins")?;

            if admins <= 1 {
                txn.rollback().await?;
                return Ok(DeleteOutcome::LastAdmin);
            }
        }

        users::Entity::delete_by_id(target.id)
            .exec(&txn)
            .await
            .context("Failed to delete user")?;

        txn.commit().await?;

        Ok(DeleteOutcome::Deleted)
    }
}
