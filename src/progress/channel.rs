//! In-process publish/subscribe channel for progress events.
//!
//! Publishing never waits on observers: every subscriber owns an unbounded queue, so a
//! slow reader only grows its own backlog. Subscribers whose receiving side is gone are
//! dropped on the next emit.

use crate::progress::event::{ProgressEnvelope, ProgressEvent};
use chrono::{SecondsFormat, Utc};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::{Arc, Weak};
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};
use tracing::trace;

pub type SubscriberId = u64;

struct ChannelState {
    next_subscriber: SubscriberId,
    next_seq: u64,
    subscribers: Vec<(SubscriberId, UnboundedSender<ProgressEnvelope>)>,
    history: VecDeque<ProgressEnvelope>,
    history_capacity: usize,
}

/// Cheap to clone; all clones share the same subscriber set.
#[derive(Clone)]
pub struct ProgressChannel {
    state: Arc<Mutex<ChannelState>>,
}

impl Default for ProgressChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressChannel {
    pub fn new() -> Self {
        Self::with_history(0)
    }

    /// Keep the last `capacity` events and replay them to new subscribers.
    pub fn with_history(capacity: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(ChannelState {
                next_subscriber: 1,
                next_seq: 1,
                subscribers: Vec::new(),
                history: VecDeque::with_capacity(capacity),
                history_capacity: capacity,
            })),
        }
    }

    /// Fire and forget. Events emitted with no subscribers (and no history) are dropped.
    pub fn emit(&self, event: ProgressEvent) {
        let mut state = self.state.lock();
        if state.subscribers.is_empty() && state.history_capacity == 0 {
            trace!(event_type = event.event_type(), "No subscribers; event dropped");
            return;
        }

        let envelope = ProgressEnvelope {
            seq: state.next_seq,
            ts: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            event,
        };
        state.next_seq += 1;

        state
            .subscribers
            .retain(|(_, sender)| sender.send(envelope.clone()).is_ok());

        if state.history_capacity > 0 {
            if state.history.len() == state.history_capacity {
                state.history.pop_front();
            }
            state.history.push_back(envelope);
        }
    }

    pub fn subscribe(&self) -> Subscription {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut state = self.state.lock();
        for envelope in &state.history {
            let _ = sender.send(envelope.clone());
        }
        let id = state.next_subscriber;
        state.next_subscriber += 1;
        state.subscribers.push((id, sender));
        Subscription {
            id,
            receiver,
            channel: Arc::downgrade(&self.state),
        }
    }

    /// Remove a subscriber; returns whether it was still registered.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        remove_subscriber(&self.state, id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.state.lock().subscribers.len()
    }
}

fn remove_subscriber(state: &Mutex<ChannelState>, id: SubscriberId) -> bool {
    let mut state = state.lock();
    let before = state.subscribers.len();
    state.subscribers.retain(|(existing, _)| *existing != id);
    state.subscribers.len() != before
}

/// Receiving end of one subscription. Dropping it unsubscribes.
pub struct Subscription {
    id: SubscriberId,
    receiver: UnboundedReceiver<ProgressEnvelope>,
    channel: Weak<Mutex<ChannelState>>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Next event, or `None` once unsubscribed and drained.
    pub async fn recv(&mut self) -> Option<ProgressEnvelope> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<ProgressEnvelope> {
        match self.receiver.try_recv() {
            Ok(envelope) => Some(envelope),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Everything currently queued, without waiting.
    pub fn drain(&mut self) -> Vec<ProgressEnvelope> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(state) = self.channel.upgrade() {
            remove_subscriber(&state, self.id);
        }
    }
}
