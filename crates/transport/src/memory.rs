//! In-process hub transport.
//!
//! Every endpoint owns an inbox inside a shared hub; `send` pushes a record
//! into the destination's inbox and `drain` empties one's own. Records are
//! moved, never copied to multiple peers — broadcast is the dispatcher's
//! job, not the transport's.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use herald_core::error::TransportError;
use herald_core::message::ConnectionId;
use herald_core::transport::{InboundRecord, Transport};
use herald_core::wire::TransportRecord;

#[derive(Default)]
struct HubInner {
    inboxes: HashMap<ConnectionId, VecDeque<InboundRecord>>,
}

/// A shared in-process record switch.
#[derive(Clone, Default)]
pub struct MemoryHub {
    inner: Arc<Mutex<HubInner>>,
}

impl MemoryHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach an endpoint for `id`, creating its inbox.
    pub fn endpoint(&self, id: ConnectionId) -> MemoryEndpoint {
        self.lock().inboxes.entry(id).or_default();
        MemoryEndpoint {
            id,
            inner: self.inner.clone(),
        }
    }

    /// Detach an endpoint, dropping anything still queued for it.
    pub fn disconnect(&self, id: ConnectionId) {
        self.lock().inboxes.remove(&id);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HubInner> {
        // A poisoned hub still holds valid queues; keep going.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// One connection's view of a [`MemoryHub`].
pub struct MemoryEndpoint {
    id: ConnectionId,
    inner: Arc<Mutex<HubInner>>,
}

impl MemoryEndpoint {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HubInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Transport for MemoryEndpoint {
    fn send(&mut self, to: ConnectionId, record: TransportRecord) -> Result<(), TransportError> {
        let from = self.id;
        let mut inner = self.lock();
        let inbox = inner
            .inboxes
            .get_mut(&to)
            .ok_or(TransportError::PeerGone(to.0))?;
        inbox.push_back(InboundRecord { from, record });
        Ok(())
    }

    fn drain(&mut self) -> Vec<InboundRecord> {
        let mut inner = self.lock();
        match inner.inboxes.get_mut(&self.id) {
            Some(inbox) => inbox.drain(..).collect(),
            None => Vec::new(),
        }
    }

    fn peers(&self) -> Vec<ConnectionId> {
        let inner = self.lock();
        let mut peers: Vec<ConnectionId> = inner
            .inboxes
            .keys()
            .copied()
            .filter(|id| *id != self.id)
            .collect();
        peers.sort_by_key(|id| id.0);
        peers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_core::message::{MessageFlags, MessageKind, MessageStatus};
    use herald_core::wire::HeaderUnit;

    fn header(seq: u32) -> TransportRecord {
        TransportRecord::Header(HeaderUnit {
            seq,
            kind: MessageKind::ChatMessage,
            status: MessageStatus::None,
            total_len: 0,
            flags: MessageFlags::empty(),
        })
    }

    #[test]
    fn records_route_to_destination_only() {
        let hub = MemoryHub::new();
        let mut server = hub.endpoint(ConnectionId(0));
        let mut alice = hub.endpoint(ConnectionId(1));
        let mut bob = hub.endpoint(ConnectionId(2));

        alice.send(ConnectionId(0), header(1)).unwrap();
        let received = server.drain();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].from, ConnectionId(1));
        assert!(bob.drain().is_empty());
        // Drained once, gone.
        assert!(server.drain().is_empty());
    }

    #[test]
    fn send_to_unknown_peer_fails() {
        let hub = MemoryHub::new();
        let mut server = hub.endpoint(ConnectionId(0));
        let err = server.send(ConnectionId(9), header(1)).unwrap_err();
        assert!(matches!(err, TransportError::PeerGone(9)));
    }

    #[test]
    fn peers_exclude_self() {
        let hub = MemoryHub::new();
        let server = hub.endpoint(ConnectionId(0));
        let _alice = hub.endpoint(ConnectionId(1));
        let _bob = hub.endpoint(ConnectionId(2));
        assert_eq!(server.peers(), vec![ConnectionId(1), ConnectionId(2)]);
    }

    #[test]
    fn disconnect_drops_queued_records() {
        let hub = MemoryHub::new();
        let mut server = hub.endpoint(ConnectionId(0));
        let _alice = hub.endpoint(ConnectionId(1));
        server.send(ConnectionId(1), header(1)).unwrap();
        hub.disconnect(ConnectionId(1));
        assert!(matches!(
            server.send(ConnectionId(1), header(2)),
            Err(TransportError::PeerGone(1))
        ));
    }
}
