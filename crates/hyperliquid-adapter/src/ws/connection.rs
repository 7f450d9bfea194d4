/*
[INPUT]:  Transport, reconnect policy, control commands from the client
[OUTPUT]: Connection state transitions, replayed subscriptions, session I/O
[POS]:    WebSocket layer - reconnection controller and shared session state
[UPDATE]: When changing reconnect, replay or keep-alive behavior
*/

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::dispatcher::Dispatcher;
use super::message::Outbound;
use super::pending::Correlator;
use super::registry::Registry;
use super::transport::{FrameSink, FrameStream, Transport};
use crate::config::WsConfig;
use crate::http::HyperliquidError;

const MIN_TICK: Duration = Duration::from_millis(10);

/// Lifecycle of the physical connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

/// Everything guarded by the single session lock
#[derive(Default)]
pub(crate) struct SessionState {
    pub(crate) registry: Registry,
    pub(crate) correlator: Correlator,
    /// Outbound queue of the current socket; `None` while unlinked
    pub(crate) link: Option<mpsc::UnboundedSender<String>>,
    /// Post frames queued while unlinked, keyed by request id and
    /// flushed after replay
    pub(crate) backlog: Vec<(u64, String)>,
}

impl SessionState {
    /// Queue a frame on the live link, handing it back when there is none
    pub(crate) fn send(&self, frame: String) -> Result<(), String> {
        match &self.link {
            Some(link) => link.send(frame).map_err(|err| err.0),
            None => Err(frame),
        }
    }

    /// Drop a request and its queued frame so it never reaches the wire
    pub(crate) fn forget(&mut self, id: u64) -> bool {
        self.backlog.retain(|(queued, _)| *queued != id);
        self.correlator.remove(id)
    }

    /// Take queued frames whose request is still awaiting a reply
    fn take_backlog(&mut self) -> Vec<String> {
        let backlog = std::mem::take(&mut self.backlog);
        backlog
            .into_iter()
            .filter(|(id, _)| self.correlator.contains(*id))
            .map(|(_, frame)| frame)
            .collect()
    }

    fn unlink(&mut self, reason: impl Fn() -> HyperliquidError) -> usize {
        self.link = None;
        self.backlog.clear();
        self.registry.mark_all_pending();
        self.correlator.fail_all(reason)
    }
}

#[derive(Clone, Default)]
pub(crate) struct Shared(Arc<Mutex<SessionState>>);

impl Shared {
    pub(crate) fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drop the link and fail in-flight requests
    pub(crate) fn unlink(&self, reason: impl Fn() -> HyperliquidError) -> usize {
        self.lock().unlink(reason)
    }
}

pub(crate) enum Command {
    /// Drop the current socket; the sender fires once Connected again
    Reconnect(oneshot::Sender<()>),
}

enum SessionEnd {
    Shutdown,
    Forced,
    Dropped(HyperliquidError),
}

/// Background task owning the socket for one client
pub(crate) struct Controller {
    shared: Shared,
    transport: Arc<dyn Transport>,
    config: WsConfig,
    state: Arc<watch::Sender<ConnectionState>>,
    commands: mpsc::UnboundedReceiver<Command>,
    shutdown: CancellationToken,
    waiters: Vec<oneshot::Sender<()>>,
}

impl Controller {
    pub(crate) fn new(
        shared: Shared,
        transport: Arc<dyn Transport>,
        config: WsConfig,
        state: Arc<watch::Sender<ConnectionState>>,
        commands: mpsc::UnboundedReceiver<Command>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            shared,
            transport,
            config,
            state,
            commands,
            shutdown,
            waiters: Vec::new(),
        }
    }

    pub(crate) async fn run(mut self) {
        let mut recovering = false;
        let mut attempt: u32 = 0;

        loop {
            self.set_state(if recovering {
                ConnectionState::Reconnecting
            } else {
                ConnectionState::Connecting
            });

            let connected = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                result = self.transport.connect() => result,
            };

            match connected {
                Ok((sink, stream)) => {
                    attempt = 0;
                    let end = self.run_session(sink, stream).await;
                    if matches!(end, SessionEnd::Shutdown) {
                        break;
                    }
                    let failed = self.shared.unlink(|| {
                        HyperliquidError::WebSocket("connection lost before reply".to_string())
                    });
                    if failed > 0 {
                        debug!(failed, "ws pending requests failed on disconnect");
                    }
                    recovering = true;
                    match end {
                        SessionEnd::Shutdown => break,
                        SessionEnd::Forced => {
                            info!("ws reconnect requested");
                            continue;
                        }
                        SessionEnd::Dropped(err) => {
                            warn!(error = %err, "ws connection lost");
                        }
                    }
                }
                Err(err) => {
                    warn!(error = %err, attempt, url = %self.config.url, "ws connect failed");
                    if !recovering {
                        self.set_state(ConnectionState::Disconnected);
                    }
                }
            }

            let delay = self.config.reconnect.delay_for(attempt);
            attempt = attempt.saturating_add(1);
            debug!(delay_ms = delay.as_millis() as u64, attempt, "ws reconnect scheduled");
            if !self.pause(delay).await {
                break;
            }
        }

        self.shared.unlink(|| HyperliquidError::Cancelled);
        self.set_state(ConnectionState::Disconnected);
        info!("ws controller stopped");
    }

    /// Wait out the reconnect delay; `false` on shutdown
    async fn pause(&mut self, delay: Duration) -> bool {
        tokio::select! {
            _ = self.shutdown.cancelled() => false,
            _ = tokio::time::sleep(delay) => true,
            command = self.commands.recv() => match command {
                Some(Command::Reconnect(waiter)) => {
                    self.waiters.push(waiter);
                    true
                }
                None => false,
            },
        }
    }

    async fn run_session(&mut self, mut sink: FrameSink, mut stream: FrameStream) -> SessionEnd {
        let (link_tx, mut link_rx) = mpsc::unbounded_channel();

        // Snapshot and link install happen under one lock so each entry gets
        // exactly one subscribe frame on this socket.
        let (replay, backlog) = {
            let mut state = self.shared.lock();
            state.registry.mark_all_pending();
            state.link = Some(link_tx);
            (state.registry.all_entries(), state.take_backlog())
        };

        for subscription in &replay {
            let frame = match (Outbound::Subscribe { subscription }).to_text() {
                Ok(frame) => frame,
                Err(err) => {
                    warn!(error = %err, channel = subscription.channel(), "ws subscribe frame encode failed");
                    continue;
                }
            };
            if let Err(err) = sink.send(frame).await {
                return SessionEnd::Dropped(err);
            }
        }
        for frame in backlog {
            if let Err(err) = sink.send(frame).await {
                return SessionEnd::Dropped(err);
            }
        }

        info!(subscriptions = replay.len(), "ws subscriptions replayed");
        self.set_state(ConnectionState::Connected);
        for waiter in self.waiters.drain(..) {
            let _ = waiter.send(());
        }

        let dispatcher = Dispatcher::new(self.shared.clone());
        let mut ping = ticker(self.config.ping_interval);
        let mut sweep = ticker(self.config.sweep_interval);

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown.cancelled() => {
                    let _ = sink.close().await;
                    return SessionEnd::Shutdown;
                }
                command = self.commands.recv() => match command {
                    Some(Command::Reconnect(waiter)) => {
                        self.waiters.push(waiter);
                        let _ = sink.close().await;
                        return SessionEnd::Forced;
                    }
                    None => {
                        let _ = sink.close().await;
                        return SessionEnd::Shutdown;
                    }
                },
                Some(frame) = link_rx.recv() => {
                    if let Err(err) = sink.send(frame).await {
                        return SessionEnd::Dropped(err);
                    }
                }
                incoming = stream.next() => match incoming {
                    Some(Ok(text)) => dispatcher.dispatch(&text),
                    Some(Err(err)) => return SessionEnd::Dropped(err),
                    None => {
                        return SessionEnd::Dropped(HyperliquidError::WebSocket(
                            "stream ended".to_string(),
                        ));
                    }
                },
                _ = ping.tick() => {
                    match Outbound::Ping.to_text() {
                        Ok(frame) => {
                            if let Err(err) = sink.send(frame).await {
                                return SessionEnd::Dropped(err);
                            }
                            debug!("ws ping sent");
                        }
                        Err(err) => warn!(error = %err, "ws ping encode failed"),
                    }
                }
                _ = sweep.tick() => {
                    let expired = self.shared.lock().correlator.expire(Instant::now());
                    if expired > 0 {
                        debug!(expired, "ws pending requests expired");
                    }
                }
            }
        }
    }

    fn set_state(&self, next: ConnectionState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            info!(from = ?previous, to = ?next, "ws connection state changed");
        }
    }
}

fn ticker(period: Duration) -> Interval {
    let period = period.max(MIN_TICK);
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}
