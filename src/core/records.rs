//! Normalized transaction history types.
//!
//! Both history sources map into [`TransactionRecord`]; the source-specific
//! part lives in [`RecordDetail`].

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

/// Fractional digits kept on indexer transfer values.
pub const VALUE_SCALE: u32 = 6;

/// Settlement status of a transaction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Success,
    Failed,
    Pending,
    #[serde(other)]
    Unknown,
}

/// Direction of an indexed transfer relative to the queried address.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Sent,
    Received,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Sent => "sent",
            Direction::Received => "received",
        }
    }
}

/// Token attached to a record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct TokenInfo {
    pub symbol: Option<String>,
    pub name: Option<String>,
    pub address: Option<String>,
    pub decimals: Option<u32>,
    pub logo: Option<String>,
    /// Token id for NFT transfers.
    pub token_id: Option<String>,
}

/// A token movement described by the enrichment source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenMovement {
    pub amount: Decimal,
    pub symbol: String,
    pub address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NftInfo {
    pub token_id: String,
    pub collection: String,
    pub name: Option<String>,
    pub image: Option<String>,
}

/// Protocol-level annotations from the enrichment source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct EnrichedMetadata {
    pub protocol: Option<String>,
    pub action: Option<String>,
    pub tokens: Vec<TokenMovement>,
    pub nft: Option<NftInfo>,
}

/// Source-specific fields of a record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum RecordDetail {
    /// From the enrichment API.
    Enriched {
        tx_type: String,
        category: String,
        description: String,
        metadata: Option<EnrichedMetadata>,
        gas_used: Option<Decimal>,
        gas_price: Option<Decimal>,
    },
    /// From the raw indexer.
    Indexed {
        direction: Direction,
        category: String,
        asset: Option<String>,
        block_num: Option<String>,
    },
}

/// Transaction shape returned to callers regardless of source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransactionRecord {
    /// Generated locally for every record.
    pub unique_id: Uuid,
    pub hash: String,
    /// Unix seconds.
    pub timestamp: i64,
    pub from: String,
    pub to: Option<String>,
    pub value: Decimal,
    pub token: Option<TokenInfo>,
    pub status: TxStatus,
    pub detail: RecordDetail,
}

impl TransactionRecord {
    pub fn direction(&self) -> Option<Direction> {
        match &self.detail {
            RecordDetail::Indexed { direction, .. } => Some(*direction),
            RecordDetail::Enriched { .. } => None,
        }
    }

    pub fn category(&self) -> &str {
        match &self.detail {
            RecordDetail::Enriched { category, .. } | RecordDetail::Indexed { category, .. } => {
                category
            }
        }
    }

    pub fn is_enriched(&self) -> bool {
        matches!(self.detail, RecordDetail::Enriched { .. })
    }
}

/// Continuation pair for the indexer path: one cursor per transfer stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct IndexerCursors {
    pub outbound: Option<String>,
    pub inbound: Option<String>,
}

impl IndexerCursors {
    /// Positional form: index 0 is outbound, index 1 is inbound.
    pub fn from_pair(pair: [Option<String>; 2]) -> Self {
        let [outbound, inbound] = pair;
        Self { outbound, inbound }
    }

    pub fn into_pair(self) -> [Option<String>; 2] {
        [self.outbound, self.inbound]
    }

    /// True when neither stream has more pages.
    pub fn is_exhausted(&self) -> bool {
        self.outbound.is_none() && self.inbound.is_none()
    }
}

/// History continuation token, tagged by the source that understands it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum HistoryCursor {
    Indexer(IndexerCursors),
    /// Forwarded as the enrichment `before` parameter.
    Enriched { before: Option<String> },
}

impl HistoryCursor {
    pub fn indexer(&self) -> Option<&IndexerCursors> {
        match self {
            HistoryCursor::Indexer(c) => Some(c),
            HistoryCursor::Enriched { .. } => None,
        }
    }
}

/// One page of merged history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryPage {
    pub records: Vec<TransactionRecord>,
    pub next_cursor: Option<HistoryCursor>,
}

/// Decimal from a float reported by an upstream API. Non-finite values map to
/// zero; magnitudes beyond the decimal range saturate at its bounds.
pub fn decimal_from_f64(value: f64) -> Decimal {
    if !value.is_finite() {
        return Decimal::ZERO;
    }
    Decimal::from_f64(value).unwrap_or_else(|| {
        if value.abs() < 1.0 {
            Decimal::ZERO
        } else {
            warn!(value, "Value exceeds decimal range, saturating");
            if value.is_sign_negative() {
                Decimal::MIN
            } else {
                Decimal::MAX
            }
        }
    })
}

/// Truncate toward zero to [`VALUE_SCALE`] fractional digits.
pub fn truncate_value(value: f64) -> Decimal {
    decimal_from_f64(value)
        .round_dp_with_strategy(VALUE_SCALE, RoundingStrategy::ToZero)
        .normalize()
}

/// Stable sort, newest first.
pub fn sort_newest_first(records: &mut [TransactionRecord]) {
    records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}
