//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument, or a `&mut Transaction` where
//! the operation must commit atomically with its caller's ledger append.

pub mod access_token_repo;
pub mod auth_code_repo;
pub mod device_repo;
pub mod faucet_repo;
pub mod ledger_repo;
pub mod oauth_client_repo;
pub mod user_repo;

pub use access_token_repo::AccessTokenRepo;
pub use auth_code_repo::AuthCodeRepo;
pub use device_repo::DeviceRepo;
pub use faucet_repo::FaucetRepo;
pub use ledger_repo::LedgerRepo;
pub use oauth_client_repo::OAuthClientRepo;
pub use user_repo::UserRepo;
