/*
[INPUT]:  Error sources (HTTP, exchange replies, serialization, signing, WebSocket)
[OUTPUT]: Structured error types with fault classification and retry hints
[POS]:    Error handling layer - unified error types for entire crate
[UPDATE]: When adding new error sources or changing fault classification
*/

use reqwest::StatusCode;
use thiserror::Error;

/// Main error type for the Hyperliquid adapter
#[derive(Error, Debug)]
pub enum HyperliquidError {
    /// HTTP request failed before a response was received
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Exchange rejected the request as invalid (4xx)
    #[error("client fault (status {status}): {message}")]
    ClientFault {
        status: u16,
        code: Option<i64>,
        message: String,
        data: Option<serde_json::Value>,
    },

    /// Exchange-side failure (5xx)
    #[error("server fault (status {status}): {message}")]
    ServerFault { status: u16, message: String },

    /// Exchange accepted the request but refused the action
    #[error("action rejected: {0}")]
    ActionRejected(String),

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Msgpack encoding of an action failed
    #[error("msgpack encoding error: {0}")]
    MsgPack(#[from] rmp_serde::encode::Error),

    /// URL parsing failed
    #[error("Invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),

    /// WebSocket transport error
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// No live WebSocket link to send on
    #[error("WebSocket not connected")]
    NotConnected,

    /// Inbound frame could not be understood
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Request did not complete before its deadline
    #[error("request timed out after {millis}ms")]
    Timeout { millis: u64 },

    /// Client was closed while the request was in flight
    #[error("request cancelled: client closed")]
    Cancelled,

    /// Signing an action failed
    #[error("signing error: {0}")]
    Signing(String),

    /// Subscription could not be registered
    #[error("subscription error: {0}")]
    Subscription(String),

    /// Coin or asset name is not present in the exchange metadata
    #[error("unknown asset: {0}")]
    UnknownAsset(String),

    /// Number cannot be represented on the wire without rounding
    #[error("invalid number: {0}")]
    InvalidNumber(String),

    /// Client order id is not a 16-byte hex string
    #[error("invalid cloid: {0}")]
    InvalidCloid(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl HyperliquidError {
    /// Check if the error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            HyperliquidError::Http(_)
                | HyperliquidError::ServerFault { .. }
                | HyperliquidError::Timeout { .. }
                | HyperliquidError::WebSocket(_)
                | HyperliquidError::NotConnected
        )
    }

    /// Check if the exchange rejected the request because of the caller
    pub fn is_client_fault(&self) -> bool {
        matches!(
            self,
            HyperliquidError::ClientFault { .. } | HyperliquidError::ActionRejected(_)
        )
    }

    /// Check if the failure was on the exchange side
    pub fn is_server_fault(&self) -> bool {
        matches!(
            self,
            HyperliquidError::ServerFault { .. } | HyperliquidError::Timeout { .. }
        )
    }

    /// Create a client fault from a status code and message
    pub fn client_fault(status: StatusCode, message: impl Into<String>) -> Self {
        HyperliquidError::ClientFault {
            status: status.as_u16(),
            code: None,
            message: message.into(),
            data: None,
        }
    }

    /// Create a server fault from a status code and message
    pub fn server_fault(status: StatusCode, message: impl Into<String>) -> Self {
        HyperliquidError::ServerFault {
            status: status.as_u16(),
            message: message.into(),
        }
    }

    pub(crate) fn timeout(duration: std::time::Duration) -> Self {
        HyperliquidError::Timeout {
            millis: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// Result type alias for Hyperliquid operations
pub type Result<T> = std::result::Result<T, HyperliquidError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_error_retryable() {
        let timeout_err = HyperliquidError::timeout(Duration::from_secs(30));
        assert!(timeout_err.is_retryable());
        assert!(timeout_err.is_server_fault());

        let rejected = HyperliquidError::ActionRejected("Insufficient margin".to_string());
        assert!(!rejected.is_retryable());
        assert!(rejected.is_client_fault());
    }

    #[test]
    fn test_fault_classification() {
        let client = HyperliquidError::client_fault(StatusCode::UNPROCESSABLE_ENTITY, "bad order");
        assert!(client.is_client_fault());
        assert!(!client.is_server_fault());

        let server = HyperliquidError::server_fault(StatusCode::BAD_GATEWAY, "upstream");
        assert!(server.is_server_fault());
        assert!(!server.is_client_fault());
        assert!(server.is_retryable());
    }

    #[test]
    fn test_client_fault_creation() {
        let err = HyperliquidError::client_fault(StatusCode::BAD_REQUEST, "Invalid coin");
        match err {
            HyperliquidError::ClientFault {
                status, message, ..
            } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Invalid coin");
            }
            _ => panic!("Expected ClientFault variant"),
        }
    }

    #[test]
    fn test_timeout_display() {
        let err = HyperliquidError::timeout(Duration::from_millis(1500));
        assert_eq!(err.to_string(), "request timed out after 1500ms");
    }
}
