/*
[INPUT]:  Test configuration and mock server requirements
[OUTPUT]: Shared test utilities, fixtures, and mock helpers
[POS]:    Test infrastructure - shared across all test modules
[UPDATE]: When adding new test patterns or fixtures
*/

//! Common test utilities for hyperliquid-adapter tests

#![allow(dead_code)]

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{sink, stream};
use hyperliquid_adapter::ws::{FrameSink, FrameStream, Transport};
use hyperliquid_adapter::{
    ConnectionState, HyperliquidError, HyperliquidWebSocket, ReconnectPolicy, Result, WsConfig,
};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use wiremock::MockServer;

/// Well-known development key (first anvil/hardhat account)
pub const TEST_PRIVATE_KEY: &str =
    "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const TEST_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

const WAIT_LIMIT: Duration = Duration::from_secs(5);

/// Route `tracing` output through the test harness (`RUST_LOG` filters it)
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Setup a mock HTTP server for testing
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

pub fn meta_fixture() -> Value {
    json!({
        "universe": [
            {"name": "BTC", "szDecimals": 5, "maxLeverage": 50},
            {"name": "ETH", "szDecimals": 4, "maxLeverage": 50}
        ]
    })
}

pub fn spot_meta_fixture() -> Value {
    json!({
        "universe": [
            {"name": "PURR/USDC", "tokens": [1, 0], "index": 0, "isCanonical": true}
        ],
        "tokens": [
            {"name": "USDC", "szDecimals": 8, "weiDecimals": 8, "index": 0,
             "tokenId": "0x6d1e7cde53ba9467b783cb7c530ce054", "isCanonical": true},
            {"name": "PURR", "szDecimals": 0, "weiDecimals": 5, "index": 1,
             "tokenId": "0xc1fb593aeffbeb02f85e0308e9956a90", "isCanonical": true}
        ]
    })
}

#[derive(Default)]
struct MockState {
    /// (connection number, frame) for every frame written
    sent: Vec<(usize, String)>,
    connections: usize,
    inbound: Option<mpsc::UnboundedSender<Result<String>>>,
    refuse_next: usize,
}

/// In-memory transport: records outbound frames and lets tests push
/// inbound frames or drop the socket
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `count` connect attempts
    pub fn refuse_next(&self, count: usize) {
        self.state.lock().unwrap().refuse_next = count;
    }

    pub fn connections(&self) -> usize {
        self.state.lock().unwrap().connections
    }

    /// Deliver a frame on the current socket
    pub fn push(&self, frame: impl Into<String>) -> bool {
        let state = self.state.lock().unwrap();
        match &state.inbound {
            Some(inbound) => inbound.send(Ok(frame.into())).is_ok(),
            None => false,
        }
    }

    pub fn push_json(&self, frame: Value) -> bool {
        self.push(frame.to_string())
    }

    /// End the current socket's inbound stream
    pub fn drop_connection(&self) {
        self.state.lock().unwrap().inbound = None;
    }

    pub fn frames(&self) -> Vec<Value> {
        self.state
            .lock()
            .unwrap()
            .sent
            .iter()
            .map(|(_, frame)| serde_json::from_str(frame).unwrap())
            .collect()
    }

    pub fn frames_on(&self, connection: usize) -> Vec<Value> {
        self.state
            .lock()
            .unwrap()
            .sent
            .iter()
            .filter(|(conn, _)| *conn == connection)
            .map(|(_, frame)| serde_json::from_str(frame).unwrap())
            .collect()
    }

    /// Frames with the given `method`, across all connections
    pub fn frames_with_method(&self, method: &str) -> Vec<Value> {
        self.frames()
            .into_iter()
            .filter(|frame| frame["method"] == method)
            .collect()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self) -> Result<(FrameSink, FrameStream)> {
        let (tx, rx) = mpsc::unbounded_channel();
        let connection = {
            let mut state = self.state.lock().unwrap();
            if state.refuse_next > 0 {
                state.refuse_next -= 1;
                return Err(HyperliquidError::WebSocket("connection refused".to_string()));
            }
            state.connections += 1;
            state.inbound = Some(tx);
            state.connections
        };

        let recorder = Arc::clone(&self.state);
        let frame_sink = sink::unfold(recorder, move |recorder, frame: String| async move {
            recorder.lock().unwrap().sent.push((connection, frame));
            Ok::<_, HyperliquidError>(recorder)
        });
        let frame_stream = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        });

        Ok((Box::pin(frame_sink), Box::pin(frame_stream)))
    }
}

pub fn test_ws_config() -> WsConfig {
    WsConfig {
        url: "ws://mock.invalid/ws".to_string(),
        reconnect: ReconnectPolicy::Fixed(Duration::from_millis(10)),
        request_timeout: Duration::from_secs(2),
        ping_interval: Duration::from_secs(60),
        sweep_interval: Duration::from_millis(20),
    }
}

pub fn mock_client() -> (HyperliquidWebSocket, MockTransport) {
    mock_client_with(test_ws_config())
}

pub fn mock_client_with(config: WsConfig) -> (HyperliquidWebSocket, MockTransport) {
    let transport = MockTransport::new();
    let client = HyperliquidWebSocket::with_transport(config, Arc::new(transport.clone()));
    (client, transport)
}

/// Poll `condition` until it holds or the wait limit passes
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    let waited = tokio::time::timeout(WAIT_LIMIT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "condition not met within {WAIT_LIMIT:?}");
}

pub async fn wait_connected(client: &HyperliquidWebSocket) {
    let mut states = client.state_receiver();
    let reached = tokio::time::timeout(
        WAIT_LIMIT,
        states.wait_for(|state| *state == ConnectionState::Connected),
    )
    .await;
    assert!(matches!(reached, Ok(Ok(_))), "client never connected");
}

pub async fn within<F: Future>(future: F) -> F::Output {
    tokio::time::timeout(WAIT_LIMIT, future)
        .await
        .expect("future did not complete in time")
}

pub fn l2_book_frame(coin: &str) -> Value {
    json!({
        "channel": "l2Book",
        "data": {
            "coin": coin,
            "time": 1_700_000_000_000_u64,
            "levels": [
                [{"px": "2000.5", "sz": "1.25", "n": 3}],
                [{"px": "2001.0", "sz": "0.5", "n": 1}]
            ]
        }
    })
}

pub fn trades_frame(coin: &str) -> Value {
    json!({
        "channel": "trades",
        "data": [{
            "coin": coin,
            "side": "B",
            "px": "64000.0",
            "sz": "0.01",
            "hash": "0x00",
            "time": 1_700_000_000_000_u64,
            "tid": 42,
            "users": ["0x1", "0x2"]
        }]
    })
}

pub fn post_reply(id: u64, kind: &str, payload: Value) -> Value {
    json!({
        "channel": "post",
        "data": {"id": id, "response": {"type": kind, "payload": payload}}
    })
}
