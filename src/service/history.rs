//! History with an enriched-first, indexer-fallback policy.

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::blockchain::alchemy::{normalize_transfer, AssetTransferParams};
use crate::blockchain::enrichment::{EnrichmentClient, TransactionOptions};
use crate::blockchain::traits::{HistorySource, TransferIndexer};
use crate::core::errors::WalletError;
use crate::core::records::{
    sort_newest_first, Direction, HistoryCursor, HistoryPage, IndexerCursors, TransactionRecord,
};
use crate::core::validation::validate_ethereum_address;

pub struct HistoryAggregator<I> {
    enrichment: EnrichmentClient,
    indexer: I,
}

impl<I: TransferIndexer> HistoryAggregator<I> {
    pub fn new(enrichment: EnrichmentClient, indexer: I) -> Self {
        Self { enrichment, indexer }
    }

    pub fn enrichment(&self) -> &EnrichmentClient {
        &self.enrichment
    }

    /// Enriched details for one transaction. No fallback.
    pub async fn transaction_details(&self, tx_hash: &str) -> Result<TransactionRecord, WalletError> {
        self.enrichment.fetch_one(tx_hash).await
    }

    async fn fetch_enriched(
        &self,
        address: &str,
        cursor: Option<&HistoryCursor>,
    ) -> Result<HistoryPage, WalletError> {
        let before = match cursor {
            Some(HistoryCursor::Enriched { before }) => before.clone(),
            _ => None,
        };
        let options = TransactionOptions { before, ..Default::default() };
        let records = self.enrichment.fetch(address, &options).await?;
        Ok(HistoryPage { records, next_cursor: cursor.cloned() })
    }

    /// Outbound and inbound transfers, fetched concurrently and merged.
    async fn fetch_indexed(
        &self,
        address: &str,
        cursors: IndexerCursors,
    ) -> Result<HistoryPage, WalletError> {
        let outbound = AssetTransferParams::outbound(address, cursors.outbound);
        let inbound = AssetTransferParams::inbound(address, cursors.inbound);

        let (sent, received) = tokio::try_join!(
            self.indexer.get_asset_transfers(&outbound),
            self.indexer.get_asset_transfers(&inbound),
        )
        .map_err(|e| WalletError::HistoryFetchFailed(e.to_string()))?;

        let next = IndexerCursors { outbound: sent.page_key, inbound: received.page_key };

        let mut records: Vec<TransactionRecord> = sent
            .transfers
            .into_iter()
            .map(|t| normalize_transfer(t, Direction::Sent))
            .chain(received.transfers.into_iter().map(|t| normalize_transfer(t, Direction::Received)))
            .collect();
        sort_newest_first(&mut records);

        info!(address = %address, count = records.len(), "Fetched indexed history");
        Ok(HistoryPage { records, next_cursor: Some(HistoryCursor::Indexer(next)) })
    }
}

#[async_trait]
impl<I: TransferIndexer> HistorySource for HistoryAggregator<I> {
    async fn fetch_history(
        &self,
        address: &str,
        cursor: Option<&HistoryCursor>,
    ) -> Result<HistoryPage, WalletError> {
        validate_ethereum_address(address)?;

        if self.enrichment.is_configured() {
            match self.fetch_enriched(address, cursor).await {
                Ok(page) => return Ok(page),
                Err(e) => warn!(
                    address = %address,
                    error = %e,
                    source_unavailable = e.is_source_unavailable(),
                    "Enriched history failed, using indexer"
                ),
            }
        } else {
            debug!("Enrichment not configured, using indexer");
        }

        // An enriched cursor means nothing to the indexer; restart from genesis.
        let cursors = cursor.and_then(HistoryCursor::indexer).cloned().unwrap_or_default();
        self.fetch_indexed(address, cursors).await
    }
}
