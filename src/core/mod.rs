pub mod config;
pub mod derivation;
pub mod errors;
pub mod records;
pub mod validation;

pub use config::{Environment, ServiceConfig};
pub use derivation::WalletHandle;
pub use errors::WalletError;
pub use records::{HistoryCursor, HistoryPage, TransactionRecord};
