//! Session tokens and OAuth client credential hashing.

pub mod client_secret;
pub mod session;
