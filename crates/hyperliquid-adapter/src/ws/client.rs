/*
[INPUT]:  WebSocket configuration, subscriptions with callbacks, post requests
[OUTPUT]: Multiplexed real-time streams and request/response over one socket
[POS]:    WebSocket layer - caller-facing client
[UPDATE]: When changing the public WebSocket surface
*/

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::connection::{Command, ConnectionState, Controller, Shared};
use super::dispatcher::log_subscription_sent;
use super::message::{Message, Outbound, PostRequest};
use super::pending::PendingReply;
use super::registry::{Callback, Removal, SubscriptionHandle};
use super::subscription::Subscription;
use super::transport::{Transport, TungsteniteTransport};
use crate::config::{Network, WsConfig};
use crate::http::{HyperliquidError, Result};

struct Running {
    commands: mpsc::UnboundedSender<Command>,
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

impl Running {
    fn is_alive(&self) -> bool {
        !self.task.is_finished()
    }
}

/// WebSocket client multiplexing subscriptions and `post` requests over a
/// single connection that reconnects on its own
pub struct HyperliquidWebSocket {
    shared: Shared,
    config: WsConfig,
    transport: Arc<dyn Transport>,
    state: Arc<watch::Sender<ConnectionState>>,
    runtime: Mutex<Option<Running>>,
}

impl HyperliquidWebSocket {
    pub fn new(config: WsConfig) -> Self {
        let transport = Arc::new(TungsteniteTransport::new(config.url.clone()));
        Self::with_transport(config, transport)
    }

    pub fn for_network(network: Network) -> Self {
        Self::new(WsConfig::for_network(network))
    }

    /// Use a custom transport (in-memory sockets in tests)
    pub fn with_transport(config: WsConfig, transport: Arc<dyn Transport>) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            shared: Shared::default(),
            config,
            transport,
            state: Arc::new(state),
            runtime: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &WsConfig {
        &self.config
    }

    /// Start the background connection task if it is not running.
    /// Returns `false` when called outside a Tokio runtime.
    pub fn connect(&self) -> bool {
        let mut runtime = self.runtime.lock().unwrap_or_else(PoisonError::into_inner);
        if runtime.as_ref().is_some_and(Running::is_alive) {
            return true;
        }

        let Ok(handle) = Handle::try_current() else {
            warn!(url = %self.config.url, "no tokio runtime; ws connection not started");
            return false;
        };

        let (commands, commands_rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();
        let controller = Controller::new(
            self.shared.clone(),
            Arc::clone(&self.transport),
            self.config.clone(),
            Arc::clone(&self.state),
            commands_rx,
            shutdown.clone(),
        );
        let task = handle.spawn(controller.run());
        *runtime = Some(Running {
            commands,
            shutdown,
            task,
        });
        true
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Watch connection state transitions
    pub fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Number of distinct live subscriptions
    pub fn subscription_count(&self) -> usize {
        self.shared.lock().registry.len()
    }

    /// Register `callback` for pushes matching `subscription`.
    ///
    /// A subscribe frame goes out only for the first callback of a routing
    /// key and only while linked; otherwise the next connect replays it.
    /// A socket that died before the controller noticed is treated the
    /// same as no socket.
    pub fn subscribe<F>(&self, subscription: Subscription, callback: F) -> Result<SubscriptionHandle>
    where
        F: Fn(&Message) + Send + Sync + 'static,
    {
        let callback: Callback = Arc::new(callback);
        let (handle, sent) = {
            let mut state = self.shared.lock();
            let (handle, created) = state.registry.subscribe(subscription, callback)?;
            let mut sent = false;
            if created && state.link.is_some() {
                let frame = match (Outbound::Subscribe {
                    subscription: handle.subscription(),
                })
                .to_text()
                {
                    Ok(frame) => frame,
                    Err(err) => {
                        state.registry.unsubscribe(&handle);
                        return Err(err);
                    }
                };
                // A dead link keeps the entry; the next connect replays it.
                sent = state.send(frame).is_ok();
            }
            (handle, sent)
        };

        if sent {
            log_subscription_sent(&Outbound::Subscribe {
                subscription: handle.subscription(),
            });
        } else {
            debug!(key = %handle.routing_key(), "ws subscription registered");
        }
        self.connect();
        Ok(handle)
    }

    /// Remove one callback. `Ok(false)` when the handle was already gone.
    pub fn unsubscribe(&self, handle: &SubscriptionHandle) -> Result<bool> {
        let mut state = self.shared.lock();
        let removal = state.registry.unsubscribe(handle);
        match removal {
            Removal::NotFound => Ok(false),
            Removal::CallbackRemoved => Ok(true),
            Removal::EntryRemoved(subscription) => {
                let frame = Outbound::Unsubscribe {
                    subscription: &subscription,
                };
                if state.link.is_some() && state.send(frame.to_text()?).is_ok() {
                    drop(state);
                    log_subscription_sent(&frame);
                }
                Ok(true)
            }
        }
    }

    /// Queue a `post` request. The frame waits for the next connection
    /// when unlinked; the deadline runs from now either way.
    pub fn send_request(
        &self,
        request: PostRequest,
        timeout: Option<Duration>,
    ) -> Result<PendingReply> {
        let timeout = timeout.unwrap_or(self.config.request_timeout);
        let (id, deadline, rx) = {
            let mut state = self.shared.lock();
            let (id, deadline, rx) = state.correlator.register(timeout);
            let frame = match (Outbound::Post {
                id,
                request: &request,
            })
            .to_text()
            {
                Ok(frame) => frame,
                Err(err) => {
                    state.correlator.remove(id);
                    return Err(err);
                }
            };
            if let Err(frame) = state.send(frame) {
                state.backlog.push((id, frame));
            }
            (id, deadline, rx)
        };

        debug!(id, timeout_ms = timeout.as_millis() as u64, "ws post queued");
        self.connect();
        Ok(PendingReply::new(id, deadline, timeout, rx, self.shared.clone()))
    }

    /// Send an info query over the socket
    pub async fn post_info<T: Serialize>(&self, payload: &T) -> Result<Value> {
        let payload = serde_json::to_value(payload)?;
        self.send_request(PostRequest::Info(payload), None)?.await
    }

    /// Send a signed exchange action payload over the socket
    pub async fn post_action(&self, payload: Value) -> Result<Value> {
        self.send_request(PostRequest::Action(payload), None)?.await
    }

    /// Drop the current socket and resolve once reconnected and replayed
    pub async fn reconnect(&self) -> Result<()> {
        let commands = {
            let runtime = self.runtime.lock().unwrap_or_else(PoisonError::into_inner);
            runtime
                .as_ref()
                .filter(|running| running.is_alive())
                .map(|running| running.commands.clone())
        };

        match commands {
            Some(commands) => {
                let (tx, rx) = oneshot::channel();
                commands
                    .send(Command::Reconnect(tx))
                    .map_err(|_| HyperliquidError::NotConnected)?;
                rx.await.map_err(|_| HyperliquidError::Cancelled)
            }
            None => {
                let mut states = self.state.subscribe();
                if !self.connect() {
                    return Err(HyperliquidError::NotConnected);
                }
                states
                    .wait_for(|state| *state == ConnectionState::Connected)
                    .await
                    .map(|_| ())
                    .map_err(|_| HyperliquidError::Cancelled)
            }
        }
    }

    /// Stop the connection task and fail in-flight requests with
    /// `Cancelled`. Subscriptions are kept for a later `connect`.
    pub async fn close(&self) {
        let running = self
            .runtime
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(running) = running {
            running.shutdown.cancel();
            if let Err(err) = running.task.await {
                warn!(error = %err, "ws connection task ended abnormally");
            }
        }

        self.shared.unlink(|| HyperliquidError::Cancelled);
        self.state.send_replace(ConnectionState::Disconnected);
    }
}

impl Drop for HyperliquidWebSocket {
    fn drop(&mut self) {
        let runtime = self
            .runtime
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(running) = runtime.take() {
            running.shutdown.cancel();
        }
    }
}
