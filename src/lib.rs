//! Ethereum wallet service: HD key material, native transfers, and
//! transaction history with an enriched-first, indexer-fallback policy.

pub mod blockchain;
pub mod core;
pub mod logging;
pub mod security;
pub mod service;

pub use crate::core::config::ServiceConfig;
pub use crate::core::errors::WalletError;
pub use crate::service::EthereumService;
