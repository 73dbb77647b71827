//! Domain logic for the sigil authorization core.
//!
//! This crate is pure: no I/O, no database, no async. It holds the crypto
//! codec used to mint and verify signed tokens, the hash-chain math behind
//! the tamper-evident ledger, device fingerprint derivation, and the OAuth
//! helper logic (credential generation, redirect matching, scope checks).
//! Persistence lives in `sigil-db`; the HTTP surface lives in `sigil-api`.

pub mod codec;
pub mod device;
pub mod error;
pub mod hashing;
pub mod ledger;
pub mod oauth;
pub mod types;
