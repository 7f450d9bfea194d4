/*
[INPUT]:  HTTP configuration (base URL, timeouts)
[OUTPUT]: Configured reqwest client posting to `/info` and `/exchange`
[POS]:    HTTP layer - core client implementation and fault classification
[UPDATE]: When adding connection options or changing client behavior
*/

use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::{ClientConfig, Network};
use crate::http::{HyperliquidError, Result};

/// Main HTTP client for the Hyperliquid API
#[derive(Debug, Clone)]
pub struct HyperliquidClient {
    http_client: Client,
    base_url: Url,
    network: Network,
}

impl HyperliquidClient {
    /// Create a new mainnet client with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Create a new client with custom configuration
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()?;

        Ok(Self {
            http_client,
            base_url: Url::parse(config.base_url())?,
            network: config.network,
        })
    }

    /// Create a client against an explicit base URL (mock servers, proxies)
    pub fn with_base_url(network: Network, base_url: &str) -> Result<Self> {
        Self::with_config(ClientConfig {
            network,
            base_url: Some(base_url.to_string()),
            ..ClientConfig::default()
        })
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint_url(&self, endpoint: &str) -> Result<Url> {
        Ok(self.base_url.join(endpoint)?)
    }

    /// POST /info with a `{"type": …}` request body
    pub async fn post_info<B, T>(&self, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let builder = self.http_client.post(self.endpoint_url("/info")?).json(body);
        self.send_json(builder).await
    }

    /// POST /exchange with a signed action body
    pub async fn post_exchange<B, T>(&self, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let builder = self
            .http_client
            .post(self.endpoint_url("/exchange")?)
            .json(body);
        self.send_json(builder).await
    }

    pub(crate) async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = builder.send().await?;
        let response = Self::check_status(response).await?;
        let body = response.text().await?;
        debug!(len = body.len(), "http response received");
        Ok(serde_json::from_str(&body)?)
    }

    async fn check_status(response: Response) -> Result<Response> {
        let status = response.status();
        if status.as_u16() < 400 {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let err = classify_failure(status, &body);
        warn!(status = status.as_u16(), error = %err, "http request failed");
        Err(err)
    }
}

/// Map a non-success status and body to a client or server fault
pub(crate) fn classify_failure(status: StatusCode, body: &str) -> HyperliquidError {
    if status.is_server_error() || status.as_u16() >= 500 {
        return HyperliquidError::server_fault(status, body);
    }

    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) if map.contains_key("msg") || map.contains_key("code") => {
            HyperliquidError::ClientFault {
                status: status.as_u16(),
                code: map.get("code").and_then(Value::as_i64),
                message: map
                    .get("msg")
                    .and_then(Value::as_str)
                    .unwrap_or(body)
                    .to_string(),
                data: map.get("data").cloned(),
            }
        }
        _ => HyperliquidError::client_fault(status, body),
    }
}
