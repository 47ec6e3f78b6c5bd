//! Service facade composing key derivation, transfers and history.

pub mod discovery;
pub mod history;

use ethers::providers::{Http, JsonRpcClient, Provider, Ws};
use ethers::types::U256;
use tracing::info;

use crate::blockchain::alchemy::AlchemyClient;
use crate::blockchain::enrichment::EnrichmentClient;
use crate::blockchain::ethereum::{connect_websocket, CostEstimate, EthereumClient, PendingTransfer};
use crate::blockchain::traits::{ConfirmationStatus, HistorySource, TransferIndexer};
use crate::core::config::{Environment, ServiceConfig};
use crate::core::derivation::{self, WalletHandle};
use crate::core::errors::WalletError;
use crate::core::records::{HistoryCursor, HistoryPage, TransactionRecord};
use crate::security::SecretVec;

pub use history::HistoryAggregator;

/// One instance per application, owned by the caller's composition root.
pub struct EthereumService<P: JsonRpcClient + Clone = Http, I = AlchemyClient> {
    config: ServiceConfig,
    ethereum: EthereumClient<P>,
    history: HistoryAggregator<I>,
}

impl EthereumService<Http, AlchemyClient> {
    /// Build every client from `config`. No network I/O happens here.
    pub fn new(config: ServiceConfig) -> Result<Self, WalletError> {
        let ethereum = EthereumClient::connect(&config.node_url(), config.environment.chain_id())?;
        let indexer = AlchemyClient::new(config.indexer_url());
        info!(
            network = config.environment.network_name(),
            enrichment = config.enrichment.is_configured(),
            "Ethereum service initialised"
        );
        Ok(Self::from_parts(config, ethereum, indexer))
    }
}

impl<P, I> EthereumService<P, I>
where
    P: JsonRpcClient + Clone + Send + Sync + 'static,
    I: TransferIndexer,
{
    /// Assemble from pre-built node and indexer clients.
    pub fn from_parts(config: ServiceConfig, ethereum: EthereumClient<P>, indexer: I) -> Self {
        let ethereum = ethereum.with_confirmation(config.confirmation.clone());
        let enrichment = EnrichmentClient::new(&config.enrichment);
        Self { history: HistoryAggregator::new(enrichment, indexer), ethereum, config }
    }

    pub fn environment(&self) -> Environment {
        self.config.environment
    }

    pub fn ethereum(&self) -> &EthereumClient<P> {
        &self.ethereum
    }

    pub fn history(&self) -> &HistoryAggregator<I> {
        &self.history
    }

    // Key material

    pub fn create_random_wallet(&self) -> Result<WalletHandle, WalletError> {
        derivation::create_random()
    }

    pub fn restore_from_phrase(&self, phrase: &str) -> Result<WalletHandle, WalletError> {
        derivation::restore_from_phrase(phrase)
    }

    pub fn derive_at_index(&self, phrase: &str, index: u32) -> Result<WalletHandle, WalletError> {
        derivation::derive_at_index(phrase, index)
    }

    pub fn derive_private_key(&self, phrase: &str, path: &str) -> Result<SecretVec, WalletError> {
        derivation::derive_private_key(phrase, path)
    }

    // Transfers

    pub async fn estimate_cost(&self, to: &str, amount: &str) -> Result<CostEstimate, WalletError> {
        self.ethereum.estimate_cost(to, amount).await
    }

    pub async fn send(
        &self,
        to: &str,
        private_key: &[u8],
        amount: &str,
    ) -> Result<PendingTransfer, WalletError> {
        self.ethereum.send(to, private_key, amount).await
    }

    pub async fn wait_for_confirmation(&self, tx_hash: &str) -> ConfirmationStatus {
        self.ethereum.wait_for_confirmation(tx_hash).await
    }

    pub async fn confirm(&self, tx_hash: &str) -> bool {
        self.ethereum.confirm(tx_hash).await
    }

    pub async fn get_balance(&self, address: &str) -> Option<U256> {
        self.ethereum.get_balance(address).await
    }

    pub async fn connect_websocket(&self) -> Result<Provider<Ws>, WalletError> {
        connect_websocket(&self.config.socket_url()).await
    }

    // History

    pub async fn fetch_history(
        &self,
        address: &str,
        cursor: Option<&HistoryCursor>,
    ) -> Result<HistoryPage, WalletError> {
        self.history.fetch_history(address, cursor).await
    }

    pub async fn transaction_details(&self, tx_hash: &str) -> Result<TransactionRecord, WalletError> {
        self.history.transaction_details(tx_hash).await
    }

    // Address discovery

    pub async fn find_next_unused_index(&self, phrase: &str, start: u32) -> Result<u32, WalletError> {
        discovery::find_next_unused_index(&self.history, phrase, start).await
    }

    pub fn collect_used_addresses(
        &self,
        phrase: &str,
        unused_index: u32,
    ) -> Result<Vec<WalletHandle>, WalletError> {
        discovery::collect_used_addresses(phrase, unused_index)
    }

    pub async fn import_all_active_addresses(
        &self,
        phrase: &str,
        index: Option<u32>,
    ) -> Result<Vec<WalletHandle>, WalletError> {
        discovery::import_all_active_addresses(&self.history, phrase, index).await
    }
}
