//! # Scene Events
//!
//! Notifications from the scene to whoever renders or scripts it.
//!
//! ```text
//! ┌──────────┐  publish   ┌──────────┐  drain / receiver   ┌──────────┐
//! │  Scene   │──────────> │ EventBus │ ──────────────────> │ observer │
//! └──────────┘            └──────────┘                     └──────────┘
//! ```
//!
//! Delivery is lossless. A contact begin is published after the touch sets
//! already record the contact, so a lost event would never be re-sent.
//! When observers fall behind, the backlog grows and a warning is logged
//! once it passes the configured threshold.

use crate::collision::ContactBegin;
use crossbeam_channel::{unbounded, Receiver, Sender};
use physbridge_shared::EntityId;
use tracing::warn;

/// Something observers may want to react to.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SceneEvent {
    /// The worker finished initializing its world.
    Ready,
    /// The worker created body `0`.
    ObjectReady(EntityId),
    /// A WORLD report was applied; transforms are current.
    Update,
    /// Two bodies started touching.
    Collision(ContactBegin),
}

/// Unbounded queue of [`SceneEvent`]s.
#[derive(Debug)]
pub struct EventBus {
    sender: Sender<SceneEvent>,
    receiver: Receiver<SceneEvent>,
    backlog_warning: usize,
    over_backlog: bool,
}

impl EventBus {
    /// Creates a bus that warns once more than `backlog_warning` events
    /// are waiting.
    #[must_use]
    pub fn new(backlog_warning: usize) -> Self {
        let (sender, receiver) = unbounded();
        Self { sender, receiver, backlog_warning: backlog_warning.max(1), over_backlog: false }
    }

    /// Publishes an event without blocking. Never drops.
    pub fn publish(&mut self, event: SceneEvent) {
        // The bus holds its own receiver, so the channel cannot disconnect.
        let _ = self.sender.send(event);

        let pending = self.receiver.len();
        if pending > self.backlog_warning {
            if !self.over_backlog {
                self.over_backlog = true;
                warn!(pending, threshold = self.backlog_warning, "scene events are not being drained");
            }
        } else {
            self.over_backlog = false;
        }
    }

    /// Takes every pending event.
    #[must_use]
    pub fn drain(&self) -> Vec<SceneEvent> {
        self.receiver.try_iter().collect()
    }

    /// A receiver handle for observers on other threads.
    #[must_use]
    pub fn receiver(&self) -> Receiver<SceneEvent> {
        self.receiver.clone()
    }

    /// Events waiting to be taken.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Whether the backlog passed the warning threshold and has not been
    /// drained below it since.
    #[must_use]
    pub const fn is_backlogged(&self) -> bool {
        self.over_backlog
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_and_drain() {
        let mut bus = EventBus::new(8);
        bus.publish(SceneEvent::Ready);
        bus.publish(SceneEvent::Update);
        assert_eq!(bus.pending_count(), 2);
        assert_eq!(bus.drain(), vec![SceneEvent::Ready, SceneEvent::Update]);
        assert!(bus.drain().is_empty());
    }

    #[test]
    fn test_backlog_past_threshold_is_kept() {
        let mut bus = EventBus::new(1);
        bus.publish(SceneEvent::Update);
        assert!(!bus.is_backlogged());
        for _ in 0..99 {
            bus.publish(SceneEvent::Update);
        }
        assert!(bus.is_backlogged());
        assert_eq!(bus.drain().len(), 100);

        bus.publish(SceneEvent::Ready);
        assert!(!bus.is_backlogged());
    }

    #[test]
    fn test_receiver_sees_events() {
        let mut bus = EventBus::new(4);
        let receiver = bus.receiver();
        bus.publish(SceneEvent::ObjectReady(EntityId::from_raw(5)));
        assert_eq!(receiver.try_recv(), Ok(SceneEvent::ObjectReady(EntityId::from_raw(5))));
    }
}
