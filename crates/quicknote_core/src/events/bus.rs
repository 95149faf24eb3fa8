//! In-process note change bus.
//!
//! # Invariants
//! - Every live subscription receives every event published after it
//!   subscribed, in publish order.
//! - Publishing never blocks and never fails; dropped subscriptions are
//!   pruned on the next publish.

use crate::model::note::NoteId;
use log::debug;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};

/// Channel label used in log events.
pub const BUS_CHANNEL: &str = "db";

/// A committed note mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteEvent {
    Created(NoteId),
    Updated(NoteId),
    Deleted(NoteId),
}

impl NoteEvent {
    pub fn note_id(&self) -> NoteId {
        match self {
            Self::Created(id) | Self::Updated(id) | Self::Deleted(id) => *id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Created(_) => "created",
            Self::Updated(_) => "updated",
            Self::Deleted(_) => "deleted",
        }
    }
}

/// Cloneable publish/subscribe hub; clones share one subscriber list.
#[derive(Debug, Clone, Default)]
pub struct ChangeBus {
    subscribers: Arc<Mutex<Vec<Sender<NoteEvent>>>>,
}

impl ChangeBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener. Drop the returned subscription to unsubscribe.
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = channel();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        Subscription { rx }
    }

    /// Delivers `event` to every live subscription and returns how many
    /// received it.
    pub fn publish(&self, event: NoteEvent) -> usize {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|tx| tx.send(event).is_ok());
        debug!(
            "event=bus_publish module=events channel={BUS_CHANNEL} kind={} note_id={} delivered={}",
            event.kind(),
            event.note_id(),
            subscribers.len()
        );
        subscribers.len()
    }

    /// Number of subscriptions known to be alive at the last publish.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Receiving end of a bus registration.
#[derive(Debug)]
pub struct Subscription {
    rx: Receiver<NoteEvent>,
}

impl Subscription {
    /// Next pending event, without waiting.
    pub fn try_next(&self) -> Option<NoteEvent> {
        self.rx.try_recv().ok()
    }

    /// Every pending event, oldest first.
    pub fn drain(&self) -> Vec<NoteEvent> {
        self.rx.try_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{ChangeBus, NoteEvent};
    use uuid::Uuid;

    #[test]
    fn every_subscriber_sees_every_event_in_order() {
        let bus = ChangeBus::new();
        let first = bus.subscribe();
        let second = bus.subscribe();
        let id = Uuid::new_v4();

        assert_eq!(bus.publish(NoteEvent::Created(id)), 2);
        assert_eq!(bus.publish(NoteEvent::Updated(id)), 2);

        let expected = vec![NoteEvent::Created(id), NoteEvent::Updated(id)];
        assert_eq!(first.drain(), expected);
        assert_eq!(second.drain(), expected);
        assert!(first.try_next().is_none());
    }

    #[test]
    fn late_subscribers_miss_earlier_events() {
        let bus = ChangeBus::new();
        bus.publish(NoteEvent::Deleted(Uuid::new_v4()));
        let late = bus.subscribe();
        assert!(late.try_next().is_none());
    }

    #[test]
    fn dropped_subscriptions_are_pruned_on_publish() {
        let bus = ChangeBus::new();
        let kept = bus.subscribe();
        drop(bus.subscribe());
        assert_eq!(bus.subscriber_count(), 2);

        assert_eq!(bus.publish(NoteEvent::Updated(Uuid::new_v4())), 1);
        assert_eq!(bus.subscriber_count(), 1);
        assert!(kept.try_next().is_some());
    }

    #[test]
    fn clones_share_subscribers() {
        let bus = ChangeBus::new();
        let clone = bus.clone();
        let sub = bus.subscribe();
        clone.publish(NoteEvent::Updated(Uuid::nil()));
        assert_eq!(sub.try_next(), Some(NoteEvent::Updated(Uuid::nil())));
    }
}
