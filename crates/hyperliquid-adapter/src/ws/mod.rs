/*
[INPUT]:  WebSocket configuration, subscriptions and post requests
[OUTPUT]: Multiplexed real-time streams with transparent reconnection
[POS]:    WebSocket layer - module wiring
[UPDATE]: When adding WebSocket components or exports
*/

pub mod client;
pub mod connection;
mod dispatcher;
pub mod message;
pub mod pending;
pub mod registry;
pub mod subscription;
pub mod transport;

pub use client::HyperliquidWebSocket;
pub use connection::ConnectionState;
pub use message::{
    ActiveAssetCtxData, ActiveAssetData, AllMidsData, Message, PostReply, PostRequest,
    PostResponse, UserFillsData,
};
pub use pending::PendingReply;
pub use registry::{AckState, Callback, SubscriptionHandle};
pub use subscription::Subscription;
pub use transport::{FrameSink, FrameStream, Transport, TungsteniteTransport};
