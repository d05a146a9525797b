pub use super::downloads::Entity as Downloads;
pub use super::pw_audit::Entity as PwAudit;
pub use super::temp_passwords::Entity as TempPasswords;
pub use super::tokens::Entity as Tokens;
pub use super::users::Entity as Users;
