/*
[INPUT]:  Subscribe/unsubscribe calls and subscription acknowledgements
[OUTPUT]: Routing key -> callbacks map with per-entry acknowledgement state
[POS]:    WebSocket layer - subscription bookkeeping (no I/O)
[UPDATE]: When changing subscription identity or dedupe rules
*/

use std::collections::HashMap;
use std::sync::Arc;

use super::message::Message;
use super::subscription::Subscription;
use crate::http::{HyperliquidError, Result};

/// Callback invoked for every push routed to a subscription
pub type Callback = Arc<dyn Fn(&Message) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckState {
    /// Subscribe frame not yet sent or not yet echoed on the current socket
    Pending,
    Active,
}

/// Returned by `subscribe`, consumed by `unsubscribe`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    id: u64,
    key: String,
    subscription: Subscription,
}

impl SubscriptionHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn routing_key(&self) -> &str {
        &self.key
    }

    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Removal {
    NotFound,
    CallbackRemoved,
    /// Last callback gone; the exchange should be told to unsubscribe
    EntryRemoved(Subscription),
}

struct SubscriptionEntry {
    subscription: Subscription,
    callbacks: Vec<(u64, Callback)>,
    ack: AckState,
}

#[derive(Default)]
pub struct Registry {
    entries: HashMap<String, SubscriptionEntry>,
    order: Vec<String>,
    next_id: u64,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback; `true` when a new entry was created and a
    /// subscribe frame is needed
    pub fn subscribe(
        &mut self,
        subscription: Subscription,
        callback: Callback,
    ) -> Result<(SubscriptionHandle, bool)> {
        let key = subscription.routing_key();

        if let Some(entry) = self.entries.get(&key)
            && subscription.is_single_user()
            && !same_user(&entry.subscription, &subscription)
        {
            return Err(HyperliquidError::Subscription(format!(
                "{} already followed for another user on this connection",
                subscription.channel()
            )));
        }

        self.next_id += 1;
        let id = self.next_id;
        let handle = SubscriptionHandle {
            id,
            key: key.clone(),
            subscription: subscription.clone(),
        };

        if let Some(entry) = self.entries.get_mut(&key) {
            entry.callbacks.push((id, callback));
            return Ok((handle, false));
        }

        self.entries.insert(
            key.clone(),
            SubscriptionEntry {
                subscription,
                callbacks: vec![(id, callback)],
                ack: AckState::Pending,
            },
        );
        self.order.push(key);
        Ok((handle, true))
    }

    pub fn unsubscribe(&mut self, handle: &SubscriptionHandle) -> Removal {
        let Some(entry) = self.entries.get_mut(&handle.key) else {
            return Removal::NotFound;
        };
        let before = entry.callbacks.len();
        entry.callbacks.retain(|(id, _)| *id != handle.id);
        if entry.callbacks.len() == before {
            return Removal::NotFound;
        }
        if !entry.callbacks.is_empty() {
            return Removal::CallbackRemoved;
        }

        self.order.retain(|key| key != &handle.key);
        match self.entries.remove(&handle.key) {
            Some(entry) => Removal::EntryRemoved(entry.subscription),
            None => Removal::NotFound,
        }
    }

    /// Live descriptors in order of first subscription
    pub fn all_entries(&self) -> Vec<Subscription> {
        self.order
            .iter()
            .filter_map(|key| self.entries.get(key))
            .map(|entry| entry.subscription.clone())
            .collect()
    }

    /// Snapshot of callbacks for dispatch, in registration order
    pub fn callbacks_for(&self, key: &str) -> Vec<Callback> {
        self.entries
            .get(key)
            .map(|entry| entry.callbacks.iter().map(|(_, cb)| Arc::clone(cb)).collect())
            .unwrap_or_default()
    }

    pub fn acknowledge(&mut self, key: &str) -> bool {
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.ack = AckState::Active;
                true
            }
            None => false,
        }
    }

    pub fn ack_state(&self, key: &str) -> Option<AckState> {
        self.entries.get(key).map(|entry| entry.ack)
    }

    pub fn mark_all_pending(&mut self) {
        for entry in self.entries.values_mut() {
            entry.ack = AckState::Pending;
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn callback_count(&self, key: &str) -> usize {
        self.entries
            .get(key)
            .map(|entry| entry.callbacks.len())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn same_user(a: &Subscription, b: &Subscription) -> bool {
    match (a.user(), b.user()) {
        (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> Callback {
        Arc::new(|_: &Message| {})
    }

    #[test]
    fn test_dedupe_by_routing_key() {
        let mut registry = Registry::new();
        let (first, created) = registry
            .subscribe(Subscription::l2_book("ETH"), noop())
            .unwrap();
        assert!(created);
        let (second, created) = registry
            .subscribe(Subscription::l2_book("eth"), noop())
            .unwrap();
        assert!(!created);

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.callback_count("l2Book:eth"), 2);
        assert_ne!(first.id(), second.id());
        assert!(second.id() > first.id());
    }

    #[test]
    fn test_unsubscribe_removal_kinds() {
        let mut registry = Registry::new();
        let (a, _) = registry.subscribe(Subscription::trades("BTC"), noop()).unwrap();
        let (b, _) = registry.subscribe(Subscription::trades("BTC"), noop()).unwrap();

        assert_eq!(registry.unsubscribe(&a), Removal::CallbackRemoved);
        assert_eq!(registry.unsubscribe(&a), Removal::NotFound);
        assert_eq!(
            registry.unsubscribe(&b),
            Removal::EntryRemoved(Subscription::trades("BTC"))
        );
        assert!(registry.is_empty());
        assert!(registry.all_entries().is_empty());
    }

    #[test]
    fn test_live_set_matches_callback_counts() {
        let mut registry = Registry::new();
        let subs = [
            Subscription::all_mids(),
            Subscription::l2_book("ETH"),
            Subscription::candle("BTC", "1m"),
        ];
        let handles: Vec<_> = subs
            .iter()
            .map(|s| registry.subscribe(s.clone(), noop()).unwrap().0)
            .collect();
        assert_eq!(registry.all_entries(), subs.to_vec());

        registry.unsubscribe(&handles[1]);
        assert_eq!(
            registry.all_entries(),
            vec![Subscription::all_mids(), Subscription::candle("BTC", "1m")]
        );
        for sub in registry.all_entries() {
            assert!(registry.callback_count(&sub.routing_key()) > 0);
        }
        assert!(!registry.contains("l2Book:eth"));
    }

    #[test]
    fn test_single_user_channels() {
        let mut registry = Registry::new();
        registry
            .subscribe(Subscription::user_events("0xAbC"), noop())
            .unwrap();
        let (_, created) = registry
            .subscribe(Subscription::user_events("0xabc"), noop())
            .unwrap();
        assert!(!created);

        let err = registry
            .subscribe(Subscription::user_events("0xdef"), noop())
            .unwrap_err();
        assert!(matches!(err, HyperliquidError::Subscription(_)));
        assert_eq!(registry.callback_count("userEvents"), 2);
    }

    #[test]
    fn test_ack_state() {
        let mut registry = Registry::new();
        registry.subscribe(Subscription::bbo("SOL"), noop()).unwrap();
        assert_eq!(registry.ack_state("bbo:sol"), Some(AckState::Pending));
        assert!(registry.acknowledge("bbo:sol"));
        assert_eq!(registry.ack_state("bbo:sol"), Some(AckState::Active));
        registry.mark_all_pending();
        assert_eq!(registry.ack_state("bbo:sol"), Some(AckState::Pending));
        assert!(!registry.acknowledge("bbo:eth"));
    }
}
