/*
[INPUT]:  Network selection, timeouts, reconnect policy, optional YAML file
[OUTPUT]: ClientConfig / WsConfig values consumed by the HTTP and WebSocket layers
[POS]:    Configuration layer - endpoint and timing settings
[UPDATE]: When adding connection options or changing defaults
*/

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::http::{HyperliquidError, Result};

pub const MAINNET_API_URL: &str = "https://api.hyperliquid.xyz";
pub const TESTNET_API_URL: &str = "https://api.hyperliquid-testnet.xyz";
pub const LOCAL_API_URL: &str = "http://localhost:3001";

const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(50);
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Exchange deployment to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Mainnet,
    Testnet,
    Local,
}

impl Network {
    pub fn api_url(&self) -> &'static str {
        match self {
            Network::Mainnet => MAINNET_API_URL,
            Network::Testnet => TESTNET_API_URL,
            Network::Local => LOCAL_API_URL,
        }
    }

    pub fn ws_url(&self) -> String {
        ws_url_from_api_url(self.api_url())
    }

    /// Only mainnet signs with the mainnet phantom-agent source and chain name
    pub fn is_mainnet(&self) -> bool {
        matches!(self, Network::Mainnet)
    }
}

/// Derive the WebSocket endpoint from an HTTP base URL (`http…` -> `ws…` + `/ws`)
pub fn ws_url_from_api_url(api_url: &str) -> String {
    let trimmed = api_url.trim_end_matches('/');
    match trimmed.strip_prefix("http") {
        Some(rest) => format!("ws{rest}/ws"),
        None => format!("{trimmed}/ws"),
    }
}

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub network: Network,
    /// Overrides the network's API URL (mock servers, proxies)
    pub base_url: Option<String>,
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl ClientConfig {
    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.network.api_url())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            network: Network::Mainnet,
            base_url: None,
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Delay policy between reconnection attempts. Attempts are unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectPolicy {
    Fixed(Duration),
    Exponential { initial: Duration, max: Duration },
}

impl ReconnectPolicy {
    /// Delay before the given (zero-based) retry attempt
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match *self {
            ReconnectPolicy::Fixed(delay) => delay,
            ReconnectPolicy::Exponential { initial, max } => {
                let factor = 2_u32.saturating_pow(attempt.min(16));
                initial.saturating_mul(factor).min(max)
            }
        }
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        ReconnectPolicy::Fixed(DEFAULT_RECONNECT_DELAY)
    }
}

/// WebSocket client configuration
#[derive(Debug, Clone)]
pub struct WsConfig {
    pub url: String,
    pub reconnect: ReconnectPolicy,
    /// Default deadline for `post` requests
    pub request_timeout: Duration,
    /// Interval of application-level `{"method":"ping"}` frames
    pub ping_interval: Duration,
    /// How often expired pending requests are swept
    pub sweep_interval: Duration,
}

impl WsConfig {
    pub fn for_network(network: Network) -> Self {
        Self {
            url: network.ws_url(),
            ..Self::default()
        }
    }
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            url: Network::Mainnet.ws_url(),
            reconnect: ReconnectPolicy::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            ping_interval: DEFAULT_PING_INTERVAL,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

/// File form of the SDK configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SdkConfig {
    pub network: Network,
    pub base_url: Option<String>,
    pub http: HttpSettings,
    pub ws: WsSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpSettings {
    pub timeout_ms: u64,
    pub connect_timeout_ms: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            connect_timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WsSettings {
    pub url: Option<String>,
    pub reconnect_delay_ms: u64,
    /// When set, the delay doubles per attempt up to this cap
    pub max_reconnect_delay_ms: Option<u64>,
    pub request_timeout_ms: u64,
    pub ping_interval_ms: u64,
    /// How often expired `post` requests are swept
    pub sweep_interval_ms: u64,
}

impl Default for WsSettings {
    fn default() -> Self {
        Self {
            url: None,
            reconnect_delay_ms: 5_000,
            max_reconnect_delay_ms: None,
            request_timeout_ms: 30_000,
            ping_interval_ms: 50_000,
            sweep_interval_ms: 1_000,
        }
    }
}

impl SdkConfig {
    /// Parse configuration from a YAML string
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| HyperliquidError::Config(format!("invalid config: {e}")))
    }

    /// Load configuration from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            HyperliquidError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_yaml_str(&content)
    }

    fn api_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| self.network.api_url().to_string())
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            network: self.network,
            base_url: self.base_url.clone(),
            timeout: Duration::from_millis(self.http.timeout_ms),
            connect_timeout: Duration::from_millis(self.http.connect_timeout_ms),
        }
    }

    pub fn ws_config(&self) -> WsConfig {
        let delay = Duration::from_millis(self.ws.reconnect_delay_ms);
        let reconnect = match self.ws.max_reconnect_delay_ms {
            Some(max) => ReconnectPolicy::Exponential {
                initial: delay,
                max: Duration::from_millis(max),
            },
            None => ReconnectPolicy::Fixed(delay),
        };

        WsConfig {
            url: self
                .ws
                .url
                .clone()
                .unwrap_or_else(|| ws_url_from_api_url(&self.api_url())),
            reconnect,
            request_timeout: Duration::from_millis(self.ws.request_timeout_ms),
            ping_interval: Duration::from_millis(self.ws.ping_interval_ms),
            sweep_interval: Duration::from_millis(self.ws.sweep_interval_ms),
        }
    }
}
