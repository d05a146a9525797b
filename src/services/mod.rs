pub mod account;
pub mod error;
pub mod extractor;
pub mod password;
pub mod secrets;
pub mod session;
pub mod temp_password;

pub use account::AccountService;
pub use error::AuthError;
pub use extractor::ExtractorService;
pub use secrets::SecretStore;
pub use session::{SessionService, TokenCache};
pub use temp_password::TempPasswordService;
