pub mod download;
pub mod session;
pub mod temp_password;
pub mod user;
