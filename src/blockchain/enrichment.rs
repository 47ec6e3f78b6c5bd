//! Enrichment (transaction translation) API client.
//!
//! Every request is bounded by the configured timeout, covering both the
//! send and the body read. A missing API key yields
//! [`WalletError::NotConfigured`] before any I/O.

use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::core::config::EnrichmentConfig;
use crate::core::errors::WalletError;
use crate::core::records::{
    decimal_from_f64, EnrichedMetadata, NftInfo, RecordDetail, TokenInfo, TokenMovement,
    TransactionRecord, TxStatus,
};
use crate::core::validation::{is_valid_tx_hash, validate_ethereum_address};
use crate::security::redact_body;

/// Page size used when the caller does not set one.
pub const DEFAULT_LIMIT: u32 = 50;

const TRANSLATE_PATH: &str = "/v1/ethereum/translate";

/// Query options for [`EnrichmentClient::fetch`].
#[derive(Debug, Clone, Default)]
pub struct TransactionOptions {
    pub limit: Option<u32>,
    pub before: Option<String>,
    pub after: Option<String>,
    pub types: Option<Vec<String>>,
    pub include_metadata: Option<bool>,
}

impl TransactionOptions {
    fn query_pairs(&self, address: &str) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("address", address.to_string()),
            ("limit", self.limit.unwrap_or(DEFAULT_LIMIT).to_string()),
        ];
        if let Some(before) = &self.before {
            pairs.push(("before", before.clone()));
        }
        if let Some(after) = &self.after {
            pairs.push(("after", after.clone()));
        }
        if let Some(types) = &self.types {
            pairs.push(("types", types.join(",")));
        }
        if let Some(include) = self.include_metadata {
            pairs.push(("include_metadata", include.to_string()));
        }
        pairs
    }
}

#[derive(Debug, Deserialize)]
struct TranslateListResponse {
    transactions: Option<Vec<EnrichedTransaction>>,
}

#[derive(Debug, Deserialize)]
struct TranslateOneResponse {
    transaction: Option<EnrichedTransaction>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Raw enriched transaction.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedTransaction {
    pub hash: String,
    pub timestamp: f64,
    pub from: String,
    pub to: Option<String>,
    #[serde(rename = "type")]
    pub tx_type: String,
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub value: f64,
    pub token: Option<EnrichedToken>,
    pub metadata: Option<EnrichedTxMetadata>,
    pub status: TxStatus,
    pub gas_used: Option<f64>,
    pub gas_price: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnrichedToken {
    pub symbol: String,
    pub decimals: u32,
    pub address: String,
    pub name: String,
    pub logo: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnrichedTxMetadata {
    pub protocol: Option<String>,
    pub action: Option<String>,
    #[serde(default)]
    pub tokens: Vec<EnrichedTokenAmount>,
    pub nft: Option<EnrichedNft>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnrichedTokenAmount {
    pub amount: f64,
    pub symbol: String,
    pub address: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedNft {
    pub token_id: String,
    pub collection: String,
    pub name: Option<String>,
    pub image: Option<String>,
}

/// Client for the enrichment API.
#[derive(Clone)]
pub struct EnrichmentClient {
    client: Client,
    api_key: Option<SecretString>,
    base_url: String,
    timeout: Duration,
}

impl EnrichmentClient {
    pub fn new(config: &EnrichmentConfig) -> Self {
        Self {
            client: Client::new(),
            api_key: config.api_key.clone().filter(|k| !k.expose_secret().trim().is_empty()),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: config.timeout,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Enriched history for `address`.
    pub async fn fetch(
        &self,
        address: &str,
        options: &TransactionOptions,
    ) -> Result<Vec<TransactionRecord>, WalletError> {
        validate_ethereum_address(address)?;

        let body: TranslateListResponse =
            self.get_json(TRANSLATE_PATH, &options.query_pairs(address)).await?;
        let transactions = body.transactions.ok_or_else(|| {
            WalletError::MalformedResponse("Invalid response format: missing transactions".into())
        })?;

        debug!(address = %address, count = transactions.len(), "Fetched enriched transactions");
        Ok(transactions.into_iter().map(normalize_enriched).collect())
    }

    /// Enriched details for a single transaction.
    pub async fn fetch_one(&self, tx_hash: &str) -> Result<TransactionRecord, WalletError> {
        if !is_valid_tx_hash(tx_hash) {
            return Err(WalletError::Validation(format!("Invalid transaction hash: {}", tx_hash)));
        }
        let path = format!("{}/{}", TRANSLATE_PATH, tx_hash);
        let body: TranslateOneResponse = self.get_json(&path, &[]).await?;
        body.transaction.map(normalize_enriched).ok_or_else(|| {
            WalletError::MalformedResponse("Invalid response format: missing transaction".into())
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&'static str, String)],
    ) -> Result<T, WalletError> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| WalletError::NotConfigured("Enrichment API key is not configured".into()))?;

        let url = format!("{}{}", self.base_url, path);
        let request = self
            .client
            .get(&url)
            .query(query)
            .bearer_auth(api_key.expose_secret())
            .header(reqwest::header::CONTENT_TYPE, "application/json");

        let exchange = async {
            let response = request.send().await?;
            let status = response.status();
            let body = response.text().await?;
            Ok::<_, WalletError>((status, body))
        };

        let (status, body) = tokio::time::timeout(self.timeout, exchange).await.map_err(|_| {
            WalletError::RequestTimeout(format!(
                "Enrichment API request timed out after {:?}",
                self.timeout
            ))
        })??;

        if !status.is_success() {
            warn!(status = %status, body = %redact_body(&body), "Enrichment API returned error status");
            return Err(WalletError::UpstreamError(error_message(status, &body)));
        }

        serde_json::from_str(&body)
            .map_err(|e| WalletError::MalformedResponse(format!("Enrichment response: {}", e)))
    }
}

/// Message from the error body when it parses, else the status reason.
fn error_message(status: StatusCode, body: &str) -> String {
    let reason = || status.canonical_reason().unwrap_or("Unknown status").to_string();
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(reason);
    format!("Enrichment API error: {}", message)
}

/// Map one raw enriched transaction into the normalized record shape.
pub fn normalize_enriched(tx: EnrichedTransaction) -> TransactionRecord {
    let token = tx.token.map(|t| TokenInfo {
        symbol: Some(t.symbol),
        name: Some(t.name),
        address: Some(t.address),
        decimals: Some(t.decimals),
        logo: t.logo,
        token_id: None,
    });

    let metadata = tx.metadata.map(|m| EnrichedMetadata {
        protocol: m.protocol,
        action: m.action,
        tokens: m
            .tokens
            .into_iter()
            .map(|t| TokenMovement {
                amount: decimal_from_f64(t.amount),
                symbol: t.symbol,
                address: t.address,
            })
            .collect(),
        nft: m.nft.map(|n| NftInfo {
            token_id: n.token_id,
            collection: n.collection,
            name: n.name,
            image: n.image,
        }),
    });

    TransactionRecord {
        unique_id: Uuid::new_v4(),
        hash: tx.hash,
        timestamp: tx.timestamp as i64,
        from: tx.from,
        to: tx.to,
        value: decimal_from_f64(tx.value),
        token,
        status: tx.status,
        detail: RecordDetail::Enriched {
            tx_type: tx.tx_type,
            category: tx.category,
            description: tx.description,
            metadata,
            gas_used: tx.gas_used.map(decimal_from_f64),
            gas_price: tx.gas_price.map(decimal_from_f64),
        },
    }
}
