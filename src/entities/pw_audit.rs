use sea_orm::entity::prelude::*;

/// Append-only audit trail of credential-administration actions.
/// `details` is free-form but must never contain plaintext secrets.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "pw_audit")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Subject username.
    pub username: String,

    /// One of `generate_temp`, `reveal_temp`, `force_reset`.
    pub action: String,

    /// Acting admin username.
    pub actor: String,

    pub at: String,

    pub details: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
