use ethers::{
    prelude::*,
    providers::{Http, JsonRpcClient, Provider, Ws},
    signers::{LocalWallet, Signer},
    types::{
        transaction::eip2718::TypedTransaction, Address, Eip1559TransactionRequest,
        NameOrAddress, H256, U256, U64,
    },
    utils::{format_ether, parse_ether, to_checksum},
};
use std::{fmt::Display, str::FromStr, time::Duration};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::traits::ConfirmationStatus;
use crate::core::config::ConfirmationConfig;
use crate::core::errors::WalletError;
use crate::security::{redact_url, redact_urls_in};

/// Gas limit for a plain value transfer.
pub const TRANSFER_GAS_LIMIT: u64 = 21_000;

const MIN_PRIORITY_FEE_WEI: u64 = 1_000_000_000;

/// Fee parameters derived from the node's current gas price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeData {
    pub gas_price: U256,
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
}

impl FeeData {
    /// `max_fee = 2 * gas_price`, priority fee is a tenth of gas price but at least 1 gwei.
    pub fn from_gas_price(gas_price: U256) -> Self {
        Self {
            gas_price,
            max_fee_per_gas: gas_price.saturating_mul(U256::from(2u64)),
            max_priority_fee_per_gas: (gas_price / U256::from(10u64))
                .max(U256::from(MIN_PRIORITY_FEE_WEI)),
        }
    }
}

/// Cost breakdown for a prospective transfer. Amounts are decimal ETH strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CostEstimate {
    /// `gas_limit * gas_fee`, in ETH.
    pub gas_estimate: String,
    /// Amount plus fee.
    pub total_cost: String,
    /// Amount minus fee; negative values carry a leading `-`.
    pub total_cost_minus_gas: String,
    /// Max fee per gas, wei.
    pub gas_fee: U256,
    /// Gas units reported by the node.
    pub gas_limit: U256,
}

impl CostEstimate {
    pub fn compute(amount: U256, gas_limit: U256, max_fee_per_gas: U256) -> Self {
        let fee = gas_limit.saturating_mul(max_fee_per_gas);
        let total_cost_minus_gas = if amount >= fee {
            format_ether(amount - fee)
        } else {
            format!("-{}", format_ether(fee - amount))
        };

        Self {
            gas_estimate: format_ether(fee),
            total_cost: format_ether(amount.saturating_add(fee)),
            total_cost_minus_gas,
            gas_fee: max_fee_per_gas,
            gas_limit,
        }
    }
}

/// A transfer accepted by the node but not necessarily mined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTransfer {
    pub hash: String,
    pub from: String,
    pub to: String,
    pub value: U256,
    pub nonce: U256,
}

/// Native ETH transfers over an `ethers` provider.
#[derive(Clone)]
pub struct EthereumClient<P: JsonRpcClient + Clone = Http> {
    provider: Provider<P>,
    chain_id: u64,
    confirmation: ConfirmationConfig,
}

impl EthereumClient<Http> {
    /// HTTP provider for `rpc_url`. No request is made until first use.
    pub fn connect(rpc_url: &str, chain_id: u64) -> Result<Self, WalletError> {
        let parsed = reqwest::Url::parse(rpc_url.trim())
            .map_err(|e| WalletError::Config(format!("Invalid node URL: {}", e)))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| WalletError::Config(format!("Failed to build HTTP client: {}", e)))?;

        info!(endpoint = %redact_url(parsed.as_str()), chain_id, "Configured Ethereum provider");
        let provider = Provider::new(Http::new_with_client(parsed, client));
        Ok(Self::new_with_provider(provider, chain_id))
    }
}

impl<P> EthereumClient<P>
where
    P: JsonRpcClient + Clone + Send + Sync + 'static,
{
    /// Wrap an existing provider; tests pass a `MockProvider` here.
    pub fn new_with_provider(provider: Provider<P>, chain_id: u64) -> Self {
        Self { provider, chain_id, confirmation: ConfirmationConfig::default() }
    }

    pub fn with_confirmation(mut self, confirmation: ConfirmationConfig) -> Self {
        self.confirmation = confirmation;
        self
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn provider(&self) -> &Provider<P> {
        &self.provider
    }

    fn create_wallet_from_private_key(&self, private_key: &[u8]) -> Result<LocalWallet, WalletError> {
        if private_key.len() != 32 {
            return Err(WalletError::InvalidPrivateKey("Private key must be 32 bytes".to_string()));
        }

        let wallet = LocalWallet::from_bytes(private_key)
            .map_err(|e| WalletError::InvalidPrivateKey(format!("Invalid private key: {}", e)))?
            .with_chain_id(self.chain_id);

        Ok(wallet)
    }

    async fn fetch_fee_data(&self) -> Result<FeeData, ProviderError> {
        let gas_price = self.provider.get_gas_price().await?;
        debug!("gas_price = 0x{:x}", gas_price);
        Ok(FeeData::from_gas_price(gas_price))
    }

    pub async fn fee_data(&self) -> Result<FeeData, WalletError> {
        self.fetch_fee_data()
            .await
            .map_err(|e| WalletError::Network(format!("Failed to get fee data: {}", node_error(e))))
    }

    /// Estimate the cost of sending `amount` ETH to `to`.
    pub async fn estimate_cost(&self, to: &str, amount: &str) -> Result<CostEstimate, WalletError> {
        let to_address = parse_address(to)?;
        let amount_wei = parse_amount(amount)?;

        let request: TypedTransaction = Eip1559TransactionRequest {
            to: Some(NameOrAddress::Address(to_address)),
            value: Some(amount_wei),
            ..Default::default()
        }
        .into();

        let gas_limit = self
            .provider
            .estimate_gas(&request, None)
            .await
            .map_err(|e| WalletError::EstimationFailed(node_error(e)))?;
        let fees = self
            .fetch_fee_data()
            .await
            .map_err(|e| WalletError::EstimationFailed(node_error(e)))?;

        let estimate = CostEstimate::compute(amount_wei, gas_limit, fees.max_fee_per_gas);
        debug!(to = %to, gas_limit = %gas_limit, fee = %estimate.gas_estimate, "Estimated transfer cost");
        Ok(estimate)
    }

    /// Sign and submit a native transfer. A caller retry after a transient
    /// failure may submit twice; there is no idempotency key.
    pub async fn send(
        &self,
        to: &str,
        private_key: &[u8],
        amount: &str,
    ) -> Result<PendingTransfer, WalletError> {
        let wallet = self.create_wallet_from_private_key(private_key)?;
        let to_address = parse_address(to)?;
        let amount_wei = parse_amount(amount)?;
        let from = wallet.address();

        info!(to = %to, amount = %amount, "Sending ETH");

        let fees = self
            .fetch_fee_data()
            .await
            .map_err(|e| WalletError::SubmissionFailed(node_error(e)))?;
        let nonce = self
            .provider
            .get_transaction_count(from, None)
            .await
            .map_err(|e| WalletError::SubmissionFailed(node_error(e)))?;
        debug!("send: nonce = 0x{:x}", nonce);

        let tx = Eip1559TransactionRequest {
            from: Some(from),
            to: Some(NameOrAddress::Address(to_address)),
            value: Some(amount_wei),
            gas: Some(U256::from(TRANSFER_GAS_LIMIT)),
            nonce: Some(nonce),
            max_fee_per_gas: Some(fees.max_fee_per_gas),
            max_priority_fee_per_gas: Some(fees.max_priority_fee_per_gas),
            chain_id: Some(U64::from(self.chain_id)),
            ..Default::default()
        };

        let client = SignerMiddleware::new(self.provider.clone(), wallet);
        let pending_tx = client
            .send_transaction(tx, None)
            .await
            .map_err(|e| WalletError::SubmissionFailed(node_error(e)))?;

        let tx_hash = format!("0x{}", hex::encode(pending_tx.tx_hash().as_bytes()));
        info!(tx_hash = %tx_hash, "Transaction sent");

        Ok(PendingTransfer {
            hash: tx_hash,
            from: to_checksum(&from, None),
            to: to_checksum(&to_address, None),
            value: amount_wei,
            nonce,
        })
    }

    /// Poll for the receipt of `tx_hash` until mined or the configured timeout.
    pub async fn wait_for_confirmation(&self, tx_hash: &str) -> ConfirmationStatus {
        let hash = match H256::from_str(tx_hash) {
            Ok(h) => h,
            Err(e) => {
                warn!(tx_hash = %tx_hash, error = %e, "Invalid transaction hash");
                return ConfirmationStatus::Failed;
            }
        };

        let deadline = Instant::now() + self.confirmation.timeout;
        loop {
            match self.provider.get_transaction_receipt(hash).await {
                Ok(Some(receipt)) => {
                    let status = if receipt.status == Some(U64::from(1)) {
                        ConfirmationStatus::Confirmed
                    } else {
                        ConfirmationStatus::Failed
                    };
                    info!(tx_hash = %tx_hash, status = ?status, "Transaction mined");
                    return status;
                }
                Ok(None) => {
                    if Instant::now() >= deadline {
                        debug!(tx_hash = %tx_hash, "No receipt before deadline");
                        return ConfirmationStatus::Pending;
                    }
                    tokio::time::sleep(self.confirmation.poll_interval).await;
                }
                Err(e) => {
                    warn!(tx_hash = %tx_hash, error = %node_error(e), "Failed to get transaction receipt");
                    return ConfirmationStatus::Unreachable;
                }
            }
        }
    }

    /// True only when the transfer was mined successfully.
    pub async fn confirm(&self, tx_hash: &str) -> bool {
        self.wait_for_confirmation(tx_hash).await.is_confirmed()
    }

    /// Balance in wei, or `None` when the address is invalid or the node fails.
    pub async fn get_balance(&self, address: &str) -> Option<U256> {
        let address = match Address::from_str(address) {
            Ok(a) => a,
            Err(e) => {
                warn!(address = %address, error = %e, "Invalid address for balance query");
                return None;
            }
        };

        match self.provider.get_balance(address, None).await {
            Ok(balance) => {
                debug!(balance = %format_ether(balance), "Fetched balance");
                Some(balance)
            }
            Err(e) => {
                warn!(error = %node_error(e), "Failed to get balance");
                None
            }
        }
    }
}

/// Open a WebSocket provider against `url`.
pub async fn connect_websocket(url: &str) -> Result<Provider<Ws>, WalletError> {
    info!(endpoint = %redact_url(url), "Opening WebSocket provider");
    let ws = Ws::connect(url)
        .await
        .map_err(|e| WalletError::Network(format!("WebSocket connection failed: {}", node_error(e))))?;
    Ok(Provider::new(ws))
}

/// Node error text with provider keys masked out of any URL.
fn node_error(e: impl Display) -> String {
    redact_urls_in(&e.to_string())
}

fn parse_address(address: &str) -> Result<Address, WalletError> {
    Address::from_str(address.trim())
        .map_err(|e| WalletError::InvalidAddress(format!("Invalid recipient address: {}", e)))
}

fn parse_amount(amount: &str) -> Result<U256, WalletError> {
    parse_ether(amount.trim())
        .map_err(|e| WalletError::Validation(format!("Invalid amount: {}", e)))
}
