use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};

use crate::entities::{pw_audit, temp_passwords};

pub const ACTION_GENERATE: &str = "generate_temp";
pub const ACTION_REVEAL: &str = "reveal_temp";
pub const ACTION_FORCE_RESET: &str = "force_reset";

/// Outcome of a reveal attempt. At most one concurrent caller can see
/// `Revealed` for a given row; everyone else gets one of the failure states.
pub enum RevealOutcome {
    NoRecord,
    AlreadyRevealed,
    Expired,
    Revealed(temp_passwords::Model),
}

pub struct TempPasswordRepository {
    conn: DatabaseConnection,
}

impl TempPasswordRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Issues a new temp password for `username`, discarding prior rows.
    ///
    /// The delete, the insert and the audit append share one transaction so
    /// two concurrent issuances leave exactly one winning row.
    pub async fn issue(
        &self,
        username: &str,
        enc_temp: String,
        expires_at: DateTime<Utc>,
        created_by: &str,
        now: DateTime<Utc>,
    ) -> Result<temp_passwords::Model> {
        let txn = self.conn.begin().await?;

        temp_passwords::Entity::delete_many()
            .filter(temp_passwords::Column::Username.eq(username))
            .exec(&txn)
            .await
            .context("Failed to discard previous temp passwords")?;

        let rec = temp_passwords::ActiveModel {
            username: Set(username.to_string()),
            enc_temp: Set(enc_temp),
            expires_at: Set(expires_at.to_rfc3339()),
            revealed: Set(false),
            created_by: Set(created_by.to_string()),
            created_at: Set(now.to_rfc3339()),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .context("Failed to insert temp password")?;

        append_audit_on(
            &txn,
            username,
            ACTION_GENERATE,
            created_by,
            Some(format!("expires={}", expires_at.to_rfc3339())),
            now,
        )
        .await?;

        txn.commit().await?;

        Ok(rec)
    }

    /// One-time reveal of the most recent temp password for `username`.
    ///
    /// The `revealed = false` precondition is part of the UPDATE itself, so
    /// two concurrent reveal attempts cannot both succeed. Expired rows are
    /// deleted on sight.
    pub async fn reveal(
        &self,
        username: &str,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<RevealOutcome> {
        let txn = self.conn.begin().await?;

        let rec = temp_passwords::Entity::find()
            .filter(temp_passwords::Column::Username.eq(username))
            .order_by_desc(temp_passwords::Column::CreatedAt)
            .order_by_desc(temp_passwords::Column::Id)
            .one(&txn)
            .await
            .context("Failed to query temp password")?;

        let Some(rec) = rec else {
            txn.rollback().await?;
            return Ok(RevealOutcome::NoRecord);
        };

        if rec.revealed {
            txn.rollback().await?;
            return Ok(RevealOutcome::AlreadyRevealed);
        }

        if is_expired(&rec.expires_at, now) {
            temp_passwords::Entity::delete_by_id(rec.id)
                .exec(&txn)
                .await
                .context("Failed to delete expired temp password")?;
            txn.commit().await?;
            return Ok(RevealOutcome::Expired);
        }

        let res = temp_passwords::Entity::update_many()
            .col_expr(temp_passwords::Column::Revealed, Expr::value(true))
            .filter(temp_passwords::Column::Id.eq(rec.id))
            .filter(temp_passwords::Column::Revealed.eq(false))
            .exec(&txn)
            .await
            .context("Failed to mark temp password revealed")?;

        if res.rows_affected == 0 {
            // Lost the race to a concurrent reveal.
            txn.rollback().await?;
            return Ok(RevealOutcome::AlreadyRevealed);
        }

        append_audit_on(&txn, username, ACTION_REVEAL, actor, None, now).await?;

        txn.commit().await?;

        Ok(RevealOutcome::Revealed(rec))
    }

    pub async fn list_all(&self) -> Result<Vec<temp_passwords::Model>> {
        let rows = temp_passwords::Entity::find()
            .order_by_desc(temp_passwords::Column::CreatedAt)
            .order_by_desc(temp_passwords::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list temp passwords")?;

        Ok(rows)
    }

    pub async fn append_audit(
        &self,
        username: &str,
        action: &str,
        actor: &str,
        details: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        append_audit_on(&self.conn, username, action, actor, details, now).await
    }

    /// The most recent `limit` audit entries, newest first.
    pub async fn audit_tail(&self, limit: u64) -> Result<Vec<pw_audit::Model>> {
        let rows = pw_audit::Entity::find()
            .order_by_desc(pw_audit::Column::At)
            .order_by_desc(pw_audit::Column::Id)
            .limit(limit)
            .all(&self.conn)
            .await
            .context("Failed to read audit log")?;

        Ok(rows)
    }
}

/// Timestamps are RFC 3339 in UTC; an unparseable one counts as expired
/// rather than revealable forever.
pub fn is_expired(expires_at: &str, now: DateTime<Utc>) -> bool {
    DateTime::parse_from_rfc3339(expires_at)
        .map_or(true, |t| now > t.with_timezone(&Utc))
}

async fn append_audit_on<C: ConnectionTrait>(
    conn: &C,
    username: &str,
    action: &str,
    actor: &str,
    details: Option<String>,
    now: DateTime<Utc>,
) -> Result<()> {
    pw_audit::ActiveModel {
        username: Set(username.to_string()),
        action: Set(action.to_string()),
        actor: Set(actor.to_string()),
        at: Set(now.to_rfc3339()),
        details: Set(details),
        ..Default::default()
    }
    .insert(conn)
    .await
    .context("Failed to append audit entry")?;

    Ok(())
}
