//! # Verification Events
//!
//! Notifications for whoever embeds the gate: dashboards, webhooks,
//! persistence of verified identities.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐      ┌─────────────┐      ┌─────────────┐
//! │  Sessions   │─────>│   Event     │─────>│  Embedder   │
//! │ (outcomes)  │      │   Channel   │      │  (drains)   │
//! └─────────────┘      └─────────────┘      └─────────────┘
//!                            ▲
//! ┌─────────────┐            │
//! │  Gatekeeper │────────────┘
//! │  (attacks)  │
//! └─────────────┘
//! ```
//!
//! Sending never blocks: a full channel drops the event so a slow
//! consumer cannot stall verification during a flood.

use std::net::IpAddr;
use std::time::Duration;

use bastion_protocol::ProtocolVersion;
use bastion_security::{AttackStatistics, Fingerprint};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

/// Something the embedder may want to know about.
#[derive(Clone, Debug, PartialEq)]
pub enum VerificationEvent {
    /// A session passed every stage.
    Succeeded {
        /// Peer address.
        address: IpAddr,
        /// Claimed username.
        username: String,
        /// Identity now in the verified store.
        fingerprint: Fingerprint,
        /// Client dialect.
        version: ProtocolVersion,
        /// Time from login to success.
        elapsed: Duration,
    },

    /// A session failed a check.
    Failed {
        /// Peer address.
        address: IpAddr,
        /// Claimed username.
        username: String,
        /// Internal reason; never sent to the peer.
        reason: String,
        /// Blacklist score after this failure.
        score: u32,
    },

    /// An address reached the blacklist threshold.
    Blacklisted {
        /// Peer address.
        address: IpAddr,
        /// Score that crossed the threshold.
        score: u32,
    },

    /// The attack tracker raised the attack flag.
    AttackStarted,

    /// The attack tracker cleared the attack flag.
    AttackStopped {
        /// Figures of the attack that just ended.
        statistics: AttackStatistics,
    },
}

/// Bounded channel carrying [`VerificationEvent`]s.
pub struct EventBus {
    sender: Sender<VerificationEvent>,
    receiver: Receiver<VerificationEvent>,
}

impl EventBus {
    /// Creates a bus holding at most `capacity` undelivered events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self { sender, receiver }
    }

    /// A new sending handle.
    #[must_use]
    pub fn sender(&self) -> EventSender {
        EventSender { sender: self.sender.clone() }
    }

    /// A new receiving handle.
    #[must_use]
    pub fn receiver(&self) -> EventReceiver {
        EventReceiver { receiver: self.receiver.clone() }
    }

    /// Convenience constructor returning both ends.
    #[must_use]
    pub fn create_pair(capacity: usize) -> (EventSender, EventReceiver) {
        let bus = Self::new(capacity);
        (bus.sender(), bus.receiver())
    }
}

/// Sending half; cheap to clone.
#[derive(Clone)]
pub struct EventSender {
    sender: Sender<VerificationEvent>,
}

impl EventSender {
    /// Sends without blocking; returns `false` if the event was dropped.
    #[inline]
    pub fn send(&self, event: VerificationEvent) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                tracing::debug!("event channel full, dropping {:?}", event);
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

/// Receiving half.
#[derive(Clone)]
pub struct EventReceiver {
    receiver: Receiver<VerificationEvent>,
}

impl EventReceiver {
    /// Takes every pending event.
    #[inline]
    pub fn drain(&self) -> Vec<VerificationEvent> {
        let mut events = Vec::with_capacity(self.receiver.len());
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        events
    }

    /// Takes one event if available.
    #[inline]
    pub fn try_recv(&self) -> Option<VerificationEvent> {
        self.receiver.try_recv().ok()
    }

    /// Events waiting to be received.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Whether any event is waiting.
    #[inline]
    #[must_use]
    pub fn has_events(&self) -> bool {
        !self.receiver.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn blacklisted(score: u32) -> VerificationEvent {
        VerificationEvent::Blacklisted { address: IpAddr::V4(Ipv4Addr::LOCALHOST), score }
    }

    #[test]
    fn test_send_and_drain() {
        let (sender, receiver) = EventBus::create_pair(8);
        assert!(!receiver.has_events());

        assert!(sender.send(VerificationEvent::AttackStarted));
        assert!(sender.send(blacklisted(2)));
        assert_eq!(receiver.pending_count(), 2);

        let events = receiver.drain();
        assert_eq!(events, vec![VerificationEvent::AttackStarted, blacklisted(2)]);
        assert!(receiver.try_recv().is_none());
    }

    #[test]
    fn test_full_channel_drops_instead_of_blocking() {
        let (sender, receiver) = EventBus::create_pair(1);
        assert!(sender.send(blacklisted(2)));
        assert!(!sender.send(blacklisted(3)));
        assert_eq!(receiver.drain(), vec![blacklisted(2)]);
    }

    #[test]
    fn test_disconnected_receiver() {
        let bus = EventBus::new(4);
        let sender = bus.sender();
        drop(bus);
        assert!(!sender.send(VerificationEvent::AttackStarted));
    }
}
