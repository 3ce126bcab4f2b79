// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process publish/subscribe fabric for mutation events.
//!
//! Each subscriber owns a bounded queue; a slow subscriber never blocks the
//! publisher or other subscribers -- on overflow the oldest queued event is
//! dropped and the drop is logged. Delivery order is preserved per
//! subscriber; no ordering is promised across subscribers.

use bd_core::Event;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Handle returned to a subscriber; dropping it unregisters the subscription.
pub struct Subscription {
    id: u64,
    receiver: broadcast::Receiver<Arc<Event>>,
    bus: EventBus,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Await the next event, skipping over any the broadcast channel
    /// reports as lost to overflow (logged at the publish site already).
    pub async fn recv(&mut self) -> Option<Arc<Event>> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(subscriber = self.id, skipped, "subscriber lagged, dropping oldest events");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.bus.active_subscribers.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Cloneable handle to the bus. Publishing is cheap (a channel send); the
/// bus itself holds no subscriber state beyond the broadcast sender.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Arc<Event>>,
    next_subscriber_id: Arc<AtomicU64>,
    active_subscribers: Arc<AtomicU64>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_QUEUE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            next_subscriber_id: Arc::new(AtomicU64::new(1)),
            active_subscribers: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn subscribe(&self) -> Subscription {
        let id = self.next_subscriber_id.fetch_add(1, Ordering::SeqCst);
        self.active_subscribers.fetch_add(1, Ordering::SeqCst);
        Subscription {
            id,
            receiver: self.sender.subscribe(),
            bus: self.clone(),
        }
    }

    /// Number of currently live subscriptions; used by tests to detect
    /// leaked handles.
    pub fn subscriber_count(&self) -> u64 {
        self.active_subscribers.load(Ordering::SeqCst)
    }

    /// Publish an event. A send with zero receivers is not an error -- the
    /// bus has no subscribers yet, which is routine at startup.
    pub fn publish(&self, event: Event) {
        let event = Arc::new(event);
        if self.sender.send(event.clone()).is_err() {
            tracing::trace!(event = %event.log_summary(), "published with no active subscribers");
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "event_bus_tests.rs"]
mod tests;
