//! Alchemy asset-transfer indexer client.
//!
//! Speaks the `alchemy_getAssetTransfers` JSON-RPC method and maps raw
//! transfers into [`TransactionRecord`]s.

use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::blockchain::traits::TransferIndexer;
use crate::core::errors::WalletError;
use crate::core::records::{
    truncate_value, Direction, RecordDetail, TokenInfo, TransactionRecord, TxStatus,
};
use crate::security::{redact_body, redact_url};

/// Transfer categories understood by the indexer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransferCategory {
    Internal,
    External,
    Erc20,
    Erc721,
    Erc1155,
    Specialnft,
}

impl TransferCategory {
    pub const ALL: [TransferCategory; 6] = [
        TransferCategory::Internal,
        TransferCategory::External,
        TransferCategory::Erc20,
        TransferCategory::Erc721,
        TransferCategory::Erc1155,
        TransferCategory::Specialnft,
    ];
}

/// Request parameters for `alchemy_getAssetTransfers`.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AssetTransferParams {
    pub from_block: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_address: Option<String>,
    pub exclude_zero_value: bool,
    pub with_metadata: bool,
    pub category: Vec<TransferCategory>,
    /// Hex page size, e.g. `0x3e8`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_count: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_key: Option<String>,
}

impl AssetTransferParams {
    /// Every category from genesis, zero-value transfers included.
    pub fn all_from_genesis() -> Self {
        Self {
            from_block: "0x0".to_string(),
            from_address: None,
            to_address: None,
            exclude_zero_value: false,
            with_metadata: true,
            category: TransferCategory::ALL.to_vec(),
            max_count: None,
            page_key: None,
        }
    }

    /// Transfers sent by `address`, optionally resuming at `page_key`.
    pub fn outbound(address: &str, page_key: Option<String>) -> Self {
        Self { from_address: Some(address.to_string()), page_key, ..Self::all_from_genesis() }
    }

    /// Transfers received by `address`, optionally resuming at `page_key`.
    pub fn inbound(address: &str, page_key: Option<String>) -> Self {
        Self { to_address: Some(address.to_string()), page_key, ..Self::all_from_genesis() }
    }
}

/// One page of indexer results.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AssetTransfersPage {
    #[serde(default)]
    pub transfers: Vec<AssetTransfer>,
    pub page_key: Option<String>,
}

/// Raw transfer as returned by the indexer.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetTransfer {
    pub block_num: Option<String>,
    pub unique_id: Option<String>,
    pub hash: String,
    pub from: String,
    pub to: Option<String>,
    pub value: Option<f64>,
    pub erc721_token_id: Option<String>,
    pub token_id: Option<String>,
    pub asset: Option<String>,
    pub category: String,
    pub raw_contract: Option<RawContract>,
    pub metadata: Option<TransferMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawContract {
    pub value: Option<String>,
    pub address: Option<String>,
    /// Hex-encoded decimals.
    pub decimal: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferMetadata {
    pub block_timestamp: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

/// Indexer client bound to one network endpoint.
#[derive(Clone)]
pub struct AlchemyClient {
    client: Client,
    url: String,
}

impl AlchemyClient {
    /// `url` is the full endpoint including the API key.
    pub fn new(url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client, url: url.into() }
    }

    pub fn with_client(client: Client, url: impl Into<String>) -> Self {
        Self { client, url: url.into() }
    }
}

#[async_trait]
impl TransferIndexer for AlchemyClient {
    async fn get_asset_transfers(
        &self,
        params: &AssetTransferParams,
    ) -> Result<AssetTransfersPage, WalletError> {
        debug!(
            endpoint = %redact_url(&self.url),
            from = ?params.from_address,
            to = ?params.to_address,
            page_key = ?params.page_key,
            "Querying asset transfers"
        );

        let payload = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "alchemy_getAssetTransfers",
            "params": [params],
        });

        let response = self.client.post(&self.url).json(&payload).send().await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            warn!(status = %status, body = %redact_body(&body), "Indexer returned error status");
            return Err(WalletError::UpstreamError(format!("Indexer API error {}", status)));
        }

        let parsed: RpcResponse<AssetTransfersPage> = serde_json::from_str(&body)
            .map_err(|e| WalletError::MalformedResponse(format!("Indexer response: {}", e)))?;

        if let Some(err) = parsed.error {
            return Err(WalletError::UpstreamError(format!(
                "Indexer rpc error {}: {}",
                err.code, err.message
            )));
        }

        parsed
            .result
            .ok_or_else(|| WalletError::MalformedResponse("Indexer response has no result".into()))
    }
}

/// Map one raw transfer into the normalized record shape.
pub fn normalize_transfer(transfer: AssetTransfer, direction: Direction) -> TransactionRecord {
    let timestamp = transfer
        .metadata
        .as_ref()
        .and_then(|m| m.block_timestamp.as_deref())
        .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
        .map(|dt| dt.timestamp())
        .unwrap_or_else(|| {
            warn!(hash = %transfer.hash, "Transfer has no usable block timestamp");
            0
        });

    let token = transfer.raw_contract.as_ref().and_then(|raw| {
        raw.address.as_ref().map(|address| TokenInfo {
            symbol: transfer.asset.clone(),
            name: None,
            address: Some(address.clone()),
            decimals: raw
                .decimal
                .as_deref()
                .and_then(|d| u32::from_str_radix(d.trim_start_matches("0x"), 16).ok()),
            logo: None,
            token_id: transfer.erc721_token_id.clone().or_else(|| transfer.token_id.clone()),
        })
    });

    TransactionRecord {
        unique_id: Uuid::new_v4(),
        hash: transfer.hash,
        timestamp,
        from: transfer.from,
        to: transfer.to,
        value: truncate_value(transfer.value.unwrap_or(0.0)),
        token,
        status: TxStatus::Success,
        detail: RecordDetail::Indexed {
            direction,
            category: transfer.category,
            asset: transfer.asset,
            block_num: transfer.block_num,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn raw_transfer(value: serde_json::Value) -> AssetTransfer {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn params_serialize_camel_case() {
        let params = AssetTransferParams::outbound("0xabc", Some("key-1".into()));
        let v = serde_json::to_value(&params).unwrap();
        assert_eq!(v["fromBlock"], "0x0");
        assert_eq!(v["fromAddress"], "0xabc");
        assert_eq!(v["excludeZeroValue"], false);
        assert_eq!(v["withMetadata"], true);
        assert_eq!(v["pageKey"], "key-1");
        assert!(v.get("toAddress").is_none());
        assert_eq!(
            v["category"],
            json!(["internal", "external", "erc20", "erc721", "erc1155", "specialnft"])
        );
    }

    #[test]
    fn normalize_external_transfer() {
        let t = raw_transfer(json!({
            "blockNum": "0xc5f4b1",
            "hash": "0x01",
            "from": "0xaaa",
            "to": "0xbbb",
            "value": 0.123456789,
            "asset": "ETH",
            "category": "external",
            "rawContract": { "value": "0x1b69b4ba630f34e", "address": null, "decimal": "0x12" },
            "metadata": { "blockTimestamp": "2021-05-08T18:46:13.000Z" }
        }));
        let rec = normalize_transfer(t, Direction::Received);
        assert_eq!(rec.timestamp, 1620499573);
        assert_eq!(rec.value, Decimal::from_str("0.123456").unwrap());
        assert_eq!(rec.direction(), Some(Direction::Received));
        assert_eq!(rec.category(), "external");
        assert!(rec.token.is_none());
        assert!(!rec.is_enriched());
    }

    #[test]
    fn normalize_nft_transfer_without_value() {
        let t = raw_transfer(json!({
            "hash": "0x02",
            "from": "0xaaa",
            "to": null,
            "value": null,
            "erc721TokenId": "0x01",
            "asset": "PUNK",
            "category": "erc721",
            "rawContract": { "value": null, "address": "0xccc", "decimal": null },
            "metadata": { "blockTimestamp": "not a date" }
        }));
        let rec = normalize_transfer(t, Direction::Sent);
        assert_eq!(rec.timestamp, 0);
        assert_eq!(rec.value, Decimal::ZERO);
        let token = rec.token.unwrap();
        assert_eq!(token.address.as_deref(), Some("0xccc"));
        assert_eq!(token.token_id.as_deref(), Some("0x01"));
        assert_eq!(token.symbol.as_deref(), Some("PUNK"));
    }

    #[test]
    fn huge_token_value_keeps_magnitude() {
        let t = raw_transfer(json!({
            "hash": "0x03",
            "from": "0xaaa",
            "to": "0xbbb",
            "value": 1.5e29,
            "asset": "SHIB",
            "category": "erc20",
            "rawContract": { "value": null, "address": "0xddd", "decimal": "0x12" },
            "metadata": { "blockTimestamp": "2021-05-08T18:46:13.000Z" }
        }));
        let rec = normalize_transfer(t, Direction::Received);
        assert_eq!(rec.value, Decimal::MAX);
    }
}
