//! HTTP request handlers, grouped by resource.

pub mod faucet;
pub mod ledger;
pub mod oauth;
