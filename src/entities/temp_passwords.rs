use sea_orm::entity::prelude::*;

/// One outstanding admin-issued temporary credential per user. Issuing a new
/// one discards prior rows; `revealed` only ever flips false -> true.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "temp_passwords")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub username: String,

    /// AEAD-encrypted temp-password plaintext.
    pub enc_temp: String,

    /// RFC 3339 expiry timestamp (UTC).
    pub expires_at: String,

    pub revealed: bool,

    /// Username of the issuing admin.
    pub created_by: String,

    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
