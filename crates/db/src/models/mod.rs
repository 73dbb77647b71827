//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A `Deserialize` create DTO for inserts where the entity is writable
//!
//! Ledger entries deliberately have no update DTO.

pub mod access_token;
pub mod auth_code;
pub mod device;
pub mod faucet;
pub mod ledger;
pub mod oauth_client;
pub mod user;
