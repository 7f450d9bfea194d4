/*
[INPUT]:  Mock HTTP responses
[OUTPUT]: Test results for info queries and signed exchange actions
[POS]:    Integration tests - HTTP endpoints
[UPDATE]: When HTTP endpoints change
*/

mod common;

use std::str::FromStr;
use std::sync::Arc;

use common::{TEST_PRIVATE_KEY, meta_fixture, setup_mock_server, spot_meta_fixture};
use hyperliquid_adapter::{
    ClientConfig, EvmWalletSigner, Exchange, HyperliquidClient, HyperliquidError, Network,
    OrderRequest, OrderStatus, TimeInForce, WalletSigner,
};
use rust_decimal::Decimal;
use serde_json::{Value, json};
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn dec(value: &str) -> Decimal {
    Decimal::from_str(value).unwrap()
}

async fn mount_info(server: &MockServer, request: Value, response: Value) {
    Mock::given(method("POST"))
        .and(path("/info"))
        .and(body_json(request))
        .respond_with(ResponseTemplate::new(200).set_body_json(response))
        .mount(server)
        .await;
}

async fn mount_exchange(server: &MockServer, response: Value) {
    Mock::given(method("POST"))
        .and(path("/exchange"))
        .respond_with(ResponseTemplate::new(200).set_body_json(response))
        .mount(server)
        .await;
}

async fn exchange_for(server: &MockServer) -> Exchange {
    mount_info(server, json!({"type": "meta"}), meta_fixture()).await;
    mount_info(server, json!({"type": "spotMeta"}), spot_meta_fixture()).await;

    let client = assert_ok!(HyperliquidClient::with_base_url(Network::Mainnet, &server.uri()));
    let wallet: Arc<dyn WalletSigner> = Arc::new(assert_ok!(EvmWalletSigner::new(TEST_PRIVATE_KEY)));
    assert_ok!(Exchange::new(client, wallet).await)
}

async fn posted_exchange_bodies(server: &MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|request| request.url.path() == "/exchange")
        .map(|request| serde_json::from_slice(&request.body).unwrap())
        .collect()
}

#[test]
fn test_client_creation() {
    let client = assert_ok!(HyperliquidClient::new());
    assert_eq!(client.network(), Network::Mainnet);
    assert_eq!(client.base_url().as_str(), "https://api.hyperliquid.xyz/");
}

#[test]
fn test_client_with_config() {
    let config = ClientConfig {
        network: Network::Testnet,
        ..ClientConfig::default()
    };
    let client = assert_ok!(HyperliquidClient::with_config(config));
    assert_eq!(client.base_url().as_str(), "https://api.hyperliquid-testnet.xyz/");
}

#[tokio::test]
async fn test_all_mids() {
    let server = setup_mock_server().await;
    mount_info(
        &server,
        json!({"type": "allMids"}),
        json!({"BTC": "64000.5", "ETH": "3100.25", "@107": "0.5"}),
    )
    .await;

    let client = assert_ok!(HyperliquidClient::with_base_url(Network::Mainnet, &server.uri()));
    let mids = assert_ok!(client.all_mids().await);
    assert_eq!(mids.get("ETH"), Some(dec("3100.25")));
    assert_eq!(mids.get("@107"), Some(dec("0.5")));
    assert_eq!(mids.get("DOGE"), None);
}

#[tokio::test]
async fn test_client_fault_is_not_retryable() {
    let server = setup_mock_server().await;
    Mock::given(method("POST"))
        .and(path("/info"))
        .respond_with(ResponseTemplate::new(422).set_body_string("Failed to deserialize the JSON body"))
        .mount(&server)
        .await;

    let client = assert_ok!(HyperliquidClient::with_base_url(Network::Mainnet, &server.uri()));
    let err = assert_err!(client.meta().await);
    assert!(matches!(err, HyperliquidError::ClientFault { status: 422, .. }));
    assert!(err.is_client_fault());
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_server_fault_is_retryable() {
    let server = setup_mock_server().await;
    Mock::given(method("POST"))
        .and(path("/info"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .mount(&server)
        .await;

    let client = assert_ok!(HyperliquidClient::with_base_url(Network::Mainnet, &server.uri()));
    let err = assert_err!(client.all_mids().await);
    assert!(matches!(err, HyperliquidError::ServerFault { status: 503, .. }));
    assert!(err.is_server_fault());
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_exchange_loads_asset_map() {
    let server = setup_mock_server().await;
    let exchange = exchange_for(&server).await;

    assert_eq!(assert_ok!(exchange.assets().asset("ETH")), 1);
    assert_eq!(assert_ok!(exchange.assets().asset("PURR/USDC")), 10_000);
    assert_eq!(exchange.assets().sz_decimals(1), Some(4));
    assert!(matches!(
        exchange.assets().asset("NOPE"),
        Err(HyperliquidError::UnknownAsset(_))
    ));
}

#[tokio::test]
async fn test_signed_order_payload() {
    let server = setup_mock_server().await;
    let exchange = exchange_for(&server).await;
    mount_exchange(
        &server,
        json!({
            "status": "ok",
            "response": {"type": "order", "data": {"statuses": [{"resting": {"oid": 77}}]}}
        }),
    )
    .await;

    let order = OrderRequest::limit("ETH", true, dec("0.2"), dec("1100.0"), TimeInForce::Gtc);
    let data = assert_ok!(exchange.order(order).await);
    assert_eq!(data.kind, "order");
    assert!(matches!(
        data.order_statuses().as_slice(),
        [OrderStatus::Resting(resting)] if resting.oid == 77
    ));

    let bodies = posted_exchange_bodies(&server).await;
    assert_eq!(bodies.len(), 1);
    let body = &bodies[0];
    assert_eq!(
        body["action"],
        json!({
            "type": "order",
            "orders": [{
                "a": 1,
                "b": true,
                "p": "1100",
                "s": "0.2",
                "r": false,
                "t": {"limit": {"tif": "Gtc"}}
            }],
            "grouping": "na"
        })
    );
    assert!(body["nonce"].as_u64().unwrap() > 1_600_000_000_000);
    assert_eq!(body["vaultAddress"], Value::Null);

    let signature = &body["signature"];
    assert!(signature["r"].as_str().unwrap().starts_with("0x"));
    assert!(signature["s"].as_str().unwrap().starts_with("0x"));
    let v = signature["v"].as_u64().unwrap();
    assert!(v == 27 || v == 28);
}

#[tokio::test]
async fn test_market_open_uses_mid_with_slippage() {
    let server = setup_mock_server().await;
    let exchange = exchange_for(&server).await;
    mount_info(&server, json!({"type": "allMids"}), json!({"ETH": "2000"})).await;
    mount_exchange(
        &server,
        json!({
            "status": "ok",
            "response": {"type": "order", "data": {"statuses": [{
                "filled": {"totalSz": "0.1235", "avgPx": "2001.5", "oid": 9}
            }]}}
        }),
    )
    .await;

    let data = assert_ok!(
        exchange
            .market_open("ETH", true, dec("0.123456"), None, dec("0.05"), None)
            .await
    );
    assert!(matches!(
        data.order_statuses().as_slice(),
        [OrderStatus::Filled(filled)] if filled.avg_px == dec("2001.5")
    ));

    let bodies = posted_exchange_bodies(&server).await;
    let order = &bodies[0]["action"]["orders"][0];
    assert_eq!(order["p"], "2100");
    assert_eq!(order["s"], "0.1235");
    assert_eq!(order["t"], json!({"limit": {"tif": "Ioc"}}));
}

#[tokio::test]
async fn test_rejected_action_surfaces_message() {
    let server = setup_mock_server().await;
    let exchange = exchange_for(&server).await;
    mount_exchange(&server, json!({"status": "err", "response": "User or API Wallet does not exist."})).await;

    let err = assert_err!(exchange.cancel("ETH", 12345).await);
    assert!(matches!(
        err,
        HyperliquidError::ActionRejected(ref message) if message.contains("does not exist")
    ));

    let bodies = posted_exchange_bodies(&server).await;
    assert_eq!(
        bodies[0]["action"],
        json!({"type": "cancel", "cancels": [{"a": 1, "o": 12345}]})
    );
}

#[tokio::test]
async fn test_usd_transfer_is_user_signed() {
    let server = setup_mock_server().await;
    let exchange = exchange_for(&server).await;
    mount_exchange(&server, json!({"status": "ok", "response": {"type": "default"}})).await;

    let destination = "0x5e9ee1089755c3435139848e47e6635505d5a13a";
    assert_ok!(exchange.usd_transfer(dec("12.50"), destination).await);

    let bodies = posted_exchange_bodies(&server).await;
    let body = &bodies[0];
    let action = &body["action"];
    assert_eq!(action["type"], "usdSend");
    assert_eq!(action["signatureChainId"], "0x66eee");
    assert_eq!(action["hyperliquidChain"], "Mainnet");
    assert_eq!(action["destination"], destination);
    assert_eq!(action["amount"], "12.5");
    assert_eq!(action["time"], body["nonce"]);
}

#[tokio::test]
async fn test_user_spot_transfer_rounds_to_cents() {
    let server = setup_mock_server().await;
    let exchange = exchange_for(&server).await;
    mount_exchange(&server, json!({"status": "ok", "response": {"type": "default"}})).await;

    assert_ok!(exchange.user_spot_transfer(dec("1.234"), true).await);

    let bodies = posted_exchange_bodies(&server).await;
    assert_eq!(
        bodies[0]["action"],
        json!({"type": "spotUser", "classTransfer": {"usdc": 1_230_000, "toPerp": true}})
    );
}
