pub mod alchemy;
pub mod enrichment;
pub mod ethereum;
pub mod traits;

pub use alchemy::AlchemyClient;
pub use enrichment::{EnrichmentClient, TransactionOptions};
pub use ethereum::{CostEstimate, EthereumClient, PendingTransfer};
pub use traits::{ConfirmationStatus, HistorySource, TransferIndexer};
