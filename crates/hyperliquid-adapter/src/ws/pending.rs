/*
[INPUT]:  Outgoing `post` requests and inbound `post` replies
[OUTPUT]: Per-request completion slots with deadlines
[POS]:    WebSocket layer - request/response correlation
[UPDATE]: When changing request deadlines or reply semantics
*/

use std::collections::HashMap;
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::oneshot;
use tokio::time::Instant;

use super::connection::Shared;
use super::message::PostReply;
use crate::http::{HyperliquidError, Result};

struct PendingRequest {
    tx: oneshot::Sender<Result<Value>>,
    deadline: Instant,
    timeout: Duration,
}

/// In-flight `post` requests keyed by correlation id
#[derive(Default)]
pub struct Correlator {
    next_id: u64,
    pending: HashMap<u64, PendingRequest>,
}

impl Correlator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh id; ids are never reused
    pub fn register(&mut self, timeout: Duration) -> (u64, Instant, oneshot::Receiver<Result<Value>>) {
        self.next_id += 1;
        let id = self.next_id;
        let deadline = Instant::now() + timeout;
        let (tx, rx) = oneshot::channel();
        self.pending.insert(
            id,
            PendingRequest {
                tx,
                deadline,
                timeout,
            },
        );
        (id, deadline, rx)
    }

    /// Complete the matching request; `false` for unknown or late ids
    pub fn resolve(&mut self, reply: PostReply) -> bool {
        match self.pending.remove(&reply.id) {
            Some(request) => {
                let _ = request.tx.send(reply.into_result());
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: u64) -> bool {
        self.pending.remove(&id).is_some()
    }

    /// Fail every request whose deadline has passed
    pub fn expire(&mut self, now: Instant) -> usize {
        let expired: Vec<u64> = self
            .pending
            .iter()
            .filter(|(_, request)| request.deadline <= now)
            .map(|(id, _)| *id)
            .collect();
        for id in &expired {
            if let Some(request) = self.pending.remove(id) {
                let _ = request.tx.send(Err(HyperliquidError::timeout(request.timeout)));
            }
        }
        expired.len()
    }

    /// Fail every in-flight request with the error `make_err` builds
    pub fn fail_all(&mut self, make_err: impl Fn() -> HyperliquidError) -> usize {
        let count = self.pending.len();
        for (_, request) in self.pending.drain() {
            let _ = request.tx.send(Err(make_err()));
        }
        count
    }

    pub fn contains(&self, id: u64) -> bool {
        self.pending.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Handle to an in-flight `post` request; await it for the reply
pub struct PendingReply {
    id: u64,
    deadline: Instant,
    timeout: Duration,
    rx: oneshot::Receiver<Result<Value>>,
    shared: Shared,
}

impl PendingReply {
    pub(crate) fn new(
        id: u64,
        deadline: Instant,
        timeout: Duration,
        rx: oneshot::Receiver<Result<Value>>,
        shared: Shared,
    ) -> Self {
        Self {
            id,
            deadline,
            timeout,
            rx,
            shared,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Wait for the reply, the deadline, or cancellation
    pub async fn wait(self) -> Result<Value> {
        let Self {
            id,
            deadline,
            timeout,
            rx,
            shared,
        } = self;

        match tokio::time::timeout_at(deadline, rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(HyperliquidError::Cancelled),
            Err(_) => {
                shared.lock().forget(id);
                Err(HyperliquidError::timeout(timeout))
            }
        }
    }
}

impl IntoFuture for PendingReply {
    type Output = Result<Value>;
    type IntoFuture = Pin<Box<dyn Future<Output = Result<Value>> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.wait())
    }
}
