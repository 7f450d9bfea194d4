/*
[INPUT]:  Raw inbound text frames from the active socket
[OUTPUT]: Callback invocations, acknowledgements and resolved post replies
[POS]:    WebSocket layer - inbound frame routing
[UPDATE]: When adding channels or changing log sampling
*/

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::{debug, error, info, warn};

use super::connection::Shared;
use super::message::{Inbound, Message, Outbound, classify};
use crate::http::HyperliquidError;

const MESSAGE_SAMPLE_LIMIT: usize = 3;
const SUBSCRIPTION_LOG_LIMIT: usize = 10;
const UNROUTED_LOG_LIMIT: usize = 3;
const PARSE_FAIL_LOG_LIMIT: usize = 3;
const RAW_LOG_MAX_BYTES: usize = 1024;

static MESSAGE_SAMPLE_COUNT: AtomicUsize = AtomicUsize::new(0);
static SUBSCRIBE_LOG_COUNT: AtomicUsize = AtomicUsize::new(0);
static UNROUTED_LOG_COUNT: AtomicUsize = AtomicUsize::new(0);
static PARSE_FAIL_LOG_COUNT: AtomicUsize = AtomicUsize::new(0);

/// Routes inbound frames into the shared session state
#[derive(Clone)]
pub(crate) struct Dispatcher {
    shared: Shared,
}

impl Dispatcher {
    pub(crate) fn new(shared: Shared) -> Self {
        Self { shared }
    }

    /// Handle one frame. Never fails: bad frames are logged and dropped.
    pub(crate) fn dispatch(&self, text: &str) {
        let inbound = match classify(text) {
            Ok(inbound) => inbound,
            Err(err) => {
                log_parse_fail_once(&err, text);
                return;
            }
        };

        match inbound {
            Inbound::Greeting => debug!("ws greeting received"),
            Inbound::Pong => debug!("ws pong received"),
            Inbound::Acknowledged(key) => {
                if self.shared.lock().registry.acknowledge(&key) {
                    debug!(key = %key, "ws subscription acknowledged");
                } else {
                    debug!(key = %key, "ws acknowledgement for unknown subscription");
                }
            }
            Inbound::Post(reply) => {
                let id = reply.id;
                if !self.shared.lock().correlator.resolve(reply) {
                    debug!(id, "ws post reply without pending request dropped");
                }
            }
            Inbound::Error(payload) => {
                let preview = truncate_for_log(&payload.to_string(), RAW_LOG_MAX_BYTES);
                warn!(message = %preview, "ws error frame received");
            }
            Inbound::Empty { channel } => debug!(channel = %channel, "ws empty push ignored"),
            Inbound::Data { key, channel, data } => self.deliver(&key, &channel, data),
        }
    }

    fn deliver(&self, key: &str, channel: &str, data: serde_json::Value) {
        let callbacks = self.shared.lock().registry.callbacks_for(key);
        if callbacks.is_empty() {
            log_unrouted_once(key, channel);
            return;
        }

        let message = match Message::decode(channel, data) {
            Ok(message) => message,
            Err(err) => {
                log_parse_fail_once(&err, channel);
                return;
            }
        };
        log_message_sample_once(key, channel);

        for callback in callbacks {
            if catch_unwind(AssertUnwindSafe(|| callback(&message))).is_err() {
                error!(key = %key, channel = %channel, "ws subscription callback panicked");
            }
        }
    }
}

pub(crate) fn log_subscription_sent(frame: &Outbound<'_>) {
    let count = SUBSCRIBE_LOG_COUNT.fetch_add(1, Ordering::Relaxed);
    if count >= SUBSCRIPTION_LOG_LIMIT {
        return;
    }

    let (action, subscription) = match frame {
        Outbound::Subscribe { subscription } => ("subscribe", *subscription),
        Outbound::Unsubscribe { subscription } => ("unsubscribe", *subscription),
        _ => return,
    };

    if let Some(coin) = subscription.coin() {
        info!(
            sample_index = count + 1,
            sample_limit = SUBSCRIPTION_LOG_LIMIT,
            action,
            channel = subscription.channel(),
            coin,
            "ws subscription sent"
        );
    } else {
        info!(
            sample_index = count + 1,
            sample_limit = SUBSCRIPTION_LOG_LIMIT,
            action,
            channel = subscription.channel(),
            "ws subscription sent"
        );
    }
}

fn log_message_sample_once(key: &str, channel: &str) {
    let count = MESSAGE_SAMPLE_COUNT.fetch_add(1, Ordering::Relaxed);
    if count < MESSAGE_SAMPLE_LIMIT {
        info!(
            sample_index = count + 1,
            sample_limit = MESSAGE_SAMPLE_LIMIT,
            channel,
            key,
            "ws message sample"
        );
    }
}

fn log_unrouted_once(key: &str, channel: &str) {
    let count = UNROUTED_LOG_COUNT.fetch_add(1, Ordering::Relaxed);
    if count < UNROUTED_LOG_LIMIT {
        info!(
            sample_index = count + 1,
            sample_limit = UNROUTED_LOG_LIMIT,
            channel,
            key,
            "ws message without subscriber dropped"
        );
    } else {
        debug!(channel, key, "ws message without subscriber dropped");
    }
}

fn log_parse_fail_once(err: &HyperliquidError, raw: &str) {
    let count = PARSE_FAIL_LOG_COUNT.fetch_add(1, Ordering::Relaxed);
    if count < PARSE_FAIL_LOG_LIMIT {
        info!(
            sample_index = count + 1,
            sample_limit = PARSE_FAIL_LOG_LIMIT,
            error = %err,
            bytes = raw.len(),
            "ws message parse failed"
        );
        let preview = truncate_for_log(raw, RAW_LOG_MAX_BYTES);
        debug!(
            sample_index = count + 1,
            sample_limit = PARSE_FAIL_LOG_LIMIT,
            error = %err,
            bytes = raw.len(),
            message = %preview,
            "ws message parse failed"
        );
    }
}

fn truncate_for_log(value: &str, max_len: usize) -> String {
    if value.len() <= max_len {
        return value.to_string();
    }
    let mut end = max_len;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    let mut out = String::with_capacity(end + 3);
    out.push_str(&value[..end]);
    out.push_str("...");
    out
}
