/*
[INPUT]:  WebSocket endpoint URL
[OUTPUT]: Boxed text-frame sink and stream for one physical connection
[POS]:    WebSocket layer - transport socket abstraction
[UPDATE]: When changing the socket library or frame handling
*/

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::{Sink, SinkExt, Stream, StreamExt, future};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{self, Message as WsMessage};
use tracing::{debug, info};

use crate::http::{HyperliquidError, Result};

/// Outbound half: accepts text frames
pub type FrameSink = Pin<Box<dyn Sink<String, Error = HyperliquidError> + Send>>;
/// Inbound half: yields text frames until disconnect
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Opens physical connections; one call per (re)connect
#[async_trait]
pub trait Transport: Send + Sync {
    async fn connect(&self) -> Result<(FrameSink, FrameStream)>;
}

/// `tokio-tungstenite` transport
#[derive(Debug, Clone)]
pub struct TungsteniteTransport {
    url: String,
}

impl TungsteniteTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

fn socket_error(err: tungstenite::Error) -> HyperliquidError {
    HyperliquidError::WebSocket(err.to_string())
}

#[async_trait]
impl Transport for TungsteniteTransport {
    async fn connect(&self) -> Result<(FrameSink, FrameStream)> {
        let (socket, _response) = connect_async(self.url.as_str())
            .await
            .map_err(socket_error)?;
        info!(url = %self.url, "ws connected");

        let (write, read) = socket.split();

        let sink = write
            .with(|text: String| future::ready(Ok::<_, tungstenite::Error>(WsMessage::Text(text.into()))))
            .sink_map_err(socket_error);

        let stream = read.filter_map(|incoming| {
            future::ready(match incoming {
                Ok(WsMessage::Text(text)) => Some(Ok(text.as_str().to_string())),
                Ok(WsMessage::Binary(bytes)) => String::from_utf8(bytes.to_vec()).ok().map(Ok),
                Ok(WsMessage::Close(frame)) => {
                    debug!(?frame, "ws close frame received");
                    Some(Err(HyperliquidError::WebSocket(
                        "connection closed by peer".to_string(),
                    )))
                }
                Ok(WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_)) => None,
                Err(err) => Some(Err(socket_error(err))),
            })
        });

        Ok((Box::pin(sink), Box::pin(stream)))
    }
}
