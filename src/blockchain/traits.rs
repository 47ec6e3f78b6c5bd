use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::blockchain::alchemy::{AssetTransferParams, AssetTransfersPage};
use crate::core::errors::WalletError;
use crate::core::records::{HistoryCursor, HistoryPage};

/// Outcome of waiting for a submitted transfer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ConfirmationStatus {
    /// Mined with a success receipt.
    Confirmed,
    /// Mined and reverted.
    Failed,
    /// No receipt before the deadline.
    Pending,
    /// The node could not be queried.
    Unreachable,
}

impl ConfirmationStatus {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, ConfirmationStatus::Confirmed)
    }
}

/// Raw categorized asset-transfer listing.
#[async_trait]
pub trait TransferIndexer: Send + Sync {
    /// Fetch one page of transfers matching `params`.
    async fn get_asset_transfers(
        &self,
        params: &AssetTransferParams,
    ) -> Result<AssetTransfersPage, WalletError>;
}

/// Anything that can answer "what is the history of this address".
///
/// The address discovery walk is written against this trait so it can be
/// driven by a synthetic source.
#[async_trait]
pub trait HistorySource: Send + Sync {
    async fn fetch_history(
        &self,
        address: &str,
        cursor: Option<&HistoryCursor>,
    ) -> Result<HistoryPage, WalletError>;
}
