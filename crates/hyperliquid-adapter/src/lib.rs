/*
[INPUT]:  Crate modules and public type definitions
[OUTPUT]: Public Hyperliquid adapter crate surface
[POS]:    Crate root - module wiring
[UPDATE]: When public modules or exports change
*/

pub mod auth;
pub mod config;
pub mod http;
pub mod types;
pub mod ws;

// Re-export commonly used types from auth
pub use auth::{ActionSignature, EvmWalletSigner, MockWalletSigner, WalletSigner};

// Re-export configuration
pub use config::{ClientConfig, Network, ReconnectPolicy, SdkConfig, WsConfig};

// Re-export commonly used types from http
pub use http::{AssetMap, Exchange, HyperliquidClient, HyperliquidError, Result};

// Re-export all types
pub use types::*;

// Re-export commonly used types from ws
pub use ws::{
    ConnectionState, HyperliquidWebSocket, Message, PendingReply, PostRequest, Subscription,
    SubscriptionHandle, Transport,
};
