use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub username: String,

    /// Argon2id password hash. The only field consulted for login.
    pub password_hash: String,

    /// AEAD-encrypted copy of the last set password, kept so an admin can
    /// display it for recovery. Never used for verification.
    pub enc_password: Option<String>,

    /// Argon2id hash of the self-service recovery word, if registered.
    pub reset_word_hash: Option<String>,

    pub is_admin: bool,

    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
