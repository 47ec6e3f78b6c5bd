//! tests/history_fallback_tests.rs
//!
//! `HistoryAggregator` wired to a mocked enrichment API and a mocked
//! `alchemy_getAssetTransfers` endpoint.

use eth_wallet_service::blockchain::alchemy::AlchemyClient;
use eth_wallet_service::blockchain::enrichment::EnrichmentClient;
use eth_wallet_service::blockchain::traits::HistorySource;
use eth_wallet_service::core::config::EnrichmentConfig;
use eth_wallet_service::core::records::{Direction, HistoryCursor, IndexerCursors};
use eth_wallet_service::service::HistoryAggregator;
use eth_wallet_service::WalletError;
use httpmock::{
    Method::{GET, POST},
    Mock, MockServer,
};
use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::json;
use std::time::Duration;

const ADDR: &str = "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed";
const INDEXER_PATH: &str = "/v2/test-key";

fn aggregator(
    enrichment: &MockServer,
    indexer: &MockServer,
    configured: bool,
) -> HistoryAggregator<AlchemyClient> {
    let config = EnrichmentConfig {
        api_key: configured.then(|| SecretString::new("noves-key".to_string())),
        base_url: enrichment.base_url(),
        timeout: Duration::from_secs(5),
    };
    HistoryAggregator::new(EnrichmentClient::new(&config), AlchemyClient::new(indexer.url(INDEXER_PATH)))
}

fn transfer(hash: &str, ts: &str, value: f64) -> serde_json::Value {
    json!({
        "blockNum": "0x10",
        "uniqueId": format!("{}:external", hash),
        "hash": hash,
        "from": "0x1111111111111111111111111111111111111111",
        "to": "0x2222222222222222222222222222222222222222",
        "value": value,
        "asset": "ETH",
        "category": "external",
        "rawContract": { "value": null, "address": null, "decimal": "0x12" },
        "metadata": { "blockTimestamp": ts }
    })
}

async fn mock_indexer<'a>(server: &'a MockServer) -> (Mock<'a>, Mock<'a>) {
    let outbound = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(INDEXER_PATH)
                .body_contains("alchemy_getAssetTransfers")
                .body_contains("\"fromAddress\"");
            then.status(200).json_body(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": {
                    "transfers": [
                        transfer("0xa1", "2023-03-01T00:00:00.000Z", 1.23456789),
                        transfer("0xa2", "2023-01-01T00:00:00.000Z", 0.5)
                    ],
                    "pageKey": "out-next"
                }
            }));
        })
        .await;
    let inbound = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(INDEXER_PATH)
                .body_contains("alchemy_getAssetTransfers")
                .body_contains("\"toAddress\"");
            then.status(200).json_body(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": {
                    "transfers": [transfer("0xb1", "2023-02-01T00:00:00.000Z", 2.0)]
                }
            }));
        })
        .await;
    (outbound, inbound)
}

#[tokio::test]
async fn unconfigured_enrichment_goes_straight_to_indexer() {
    let enrichment = MockServer::start_async().await;
    let indexer = MockServer::start_async().await;
    let enrich_mock = enrichment
        .mock_async(|when, then| {
            when.method(GET).path("/v1/ethereum/translate");
            then.status(200).json_body(json!({ "transactions": [] }));
        })
        .await;
    let (outbound, inbound) = mock_indexer(&indexer).await;

    let page = aggregator(&enrichment, &indexer, false).fetch_history(ADDR, None).await.unwrap();

    enrich_mock.assert_hits_async(0).await;
    outbound.assert_hits_async(1).await;
    inbound.assert_hits_async(1).await;
    assert_eq!(page.records.len(), 3);
    assert!(page.records.iter().all(|r| !r.is_enriched()));
}

#[tokio::test]
async fn enrichment_failure_falls_back_to_indexer_records() {
    let enrichment = MockServer::start_async().await;
    let indexer = MockServer::start_async().await;
    let enrich_mock = enrichment
        .mock_async(|when, then| {
            when.method(GET).path("/v1/ethereum/translate");
            then.status(500).json_body(json!({ "message": "internal" }));
        })
        .await;
    mock_indexer(&indexer).await;

    let page = aggregator(&enrichment, &indexer, true).fetch_history(ADDR, None).await.unwrap();

    enrich_mock.assert_hits_async(1).await;
    let hashes: Vec<_> = page.records.iter().map(|r| r.hash.as_str()).collect();
    assert_eq!(hashes, vec!["0xa1", "0xb1", "0xa2"]);
    assert!(page.records.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
    assert_eq!(page.records[0].direction(), Some(Direction::Sent));
    assert_eq!(page.records[1].direction(), Some(Direction::Received));
    assert_eq!(page.records[0].value.to_string(), "1.234567");
    assert_eq!(
        page.next_cursor,
        Some(HistoryCursor::Indexer(IndexerCursors::from_pair([Some("out-next".into()), None])))
    );
}

#[tokio::test]
async fn enrichment_success_skips_indexer_and_keeps_cursor() {
    let enrichment = MockServer::start_async().await;
    let indexer = MockServer::start_async().await;
    enrichment
        .mock_async(|when, then| {
            when.method(GET).path("/v1/ethereum/translate").query_param("before", "page-2");
            then.status(200).json_body(json!({
                "transactions": [{
                    "hash": "0xe1",
                    "timestamp": 1_690_000_000,
                    "from": ADDR,
                    "to": null,
                    "type": "swap",
                    "category": "dex",
                    "description": "Swapped ETH for USDC",
                    "value": 0,
                    "status": "success"
                }]
            }));
        })
        .await;
    let (outbound, inbound) = mock_indexer(&indexer).await;

    let cursor = HistoryCursor::Enriched { before: Some("page-2".into()) };
    let page = aggregator(&enrichment, &indexer, true)
        .fetch_history(ADDR, Some(&cursor))
        .await
        .unwrap();

    outbound.assert_hits_async(0).await;
    inbound.assert_hits_async(0).await;
    assert_eq!(page.records.len(), 1);
    assert!(page.records[0].is_enriched());
    assert_eq!(page.records[0].category(), "dex");
    assert_eq!(page.next_cursor, Some(cursor));
}

#[tokio::test]
async fn indexer_cursor_halves_are_forwarded() {
    let enrichment = MockServer::start_async().await;
    let indexer = MockServer::start_async().await;
    let outbound = indexer
        .mock_async(|when, then| {
            when.method(POST).path(INDEXER_PATH).body_contains("\"pageKey\":\"out-1\"");
            then.status(200).json_body(json!({ "jsonrpc": "2.0", "id": 1, "result": { "transfers": [] } }));
        })
        .await;
    let inbound = indexer
        .mock_async(|when, then| {
            when.method(POST).path(INDEXER_PATH).body_contains("\"pageKey\":\"in-1\"");
            then.status(200).json_body(json!({ "jsonrpc": "2.0", "id": 1, "result": { "transfers": [] } }));
        })
        .await;

    let cursor = HistoryCursor::Indexer(IndexerCursors::from_pair([Some("out-1".into()), Some("in-1".into())]));
    let page = aggregator(&enrichment, &indexer, false)
        .fetch_history(ADDR, Some(&cursor))
        .await
        .unwrap();

    outbound.assert_hits_async(1).await;
    inbound.assert_hits_async(1).await;
    assert!(page.records.is_empty());
    assert!(page.next_cursor.as_ref().and_then(HistoryCursor::indexer).unwrap().is_exhausted());
}

#[tokio::test]
async fn indexer_failure_is_history_fetch_failed() {
    let enrichment = MockServer::start_async().await;
    let indexer = MockServer::start_async().await;
    indexer
        .mock_async(|when, then| {
            when.method(POST).path(INDEXER_PATH);
            then.status(503).body("unavailable");
        })
        .await;

    let err = aggregator(&enrichment, &indexer, false).fetch_history(ADDR, None).await.unwrap_err();
    assert!(matches!(err, WalletError::HistoryFetchFailed(_)), "{:?}", err);
}

#[tokio::test]
async fn indexer_rpc_error_is_history_fetch_failed() {
    let enrichment = MockServer::start_async().await;
    let indexer = MockServer::start_async().await;
    indexer
        .mock_async(|when, then| {
            when.method(POST).path(INDEXER_PATH);
            then.status(200).json_body(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "error": { "code": -32602, "message": "invalid params" }
            }));
        })
        .await;

    let err = aggregator(&enrichment, &indexer, false).fetch_history(ADDR, None).await.unwrap_err();
    match err {
        WalletError::HistoryFetchFailed(msg) => assert!(msg.contains("invalid params"), "{}", msg),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn invalid_address_never_reaches_upstreams() {
    let enrichment = MockServer::start_async().await;
    let indexer = MockServer::start_async().await;
    let any = indexer
        .mock_async(|when, then| {
            when.method(POST);
            then.status(200);
        })
        .await;

    let err = aggregator(&enrichment, &indexer, true).fetch_history("0x12", None).await.unwrap_err();
    assert!(matches!(err, WalletError::InvalidAddress(_)));
    any.assert_hits_async(0).await;
}

#[tokio::test]
async fn indexer_transport_error_does_not_leak_provider_key() {
    let aggregator = HistoryAggregator::new(
        EnrichmentClient::new(&EnrichmentConfig::default()),
        AlchemyClient::new("http://127.0.0.1:1/v2/SUPERSECRETKEY"),
    );

    let err = aggregator.fetch_history(ADDR, None).await.unwrap_err();
    assert!(matches!(err, WalletError::HistoryFetchFailed(_)), "{:?}", err);
    assert!(!err.to_string().contains("SUPERSECRETKEY"), "{}", err);
}
