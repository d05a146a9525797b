pub mod prelude;

pub mod downloads;
pub mod pw_audit;
pub mod temp_passwords;
pub mod tokens;
pub mod users;
