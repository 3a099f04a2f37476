//! Duplex transport over tokio channels.
//!
//! Bridges a Herald engine onto an async host: each side holds the sender
//! half pointing at its peer and drains its own receiver with `try_recv`,
//! so the protocol core never awaits. Suitable for a client/server pair
//! living on different tasks (or threads) of the same process.

use herald_core::error::TransportError;
use herald_core::message::ConnectionId;
use herald_core::transport::{InboundRecord, Transport};
use herald_core::wire::TransportRecord;
use tokio::sync::mpsc;

/// One side of a duplex record link.
pub struct ChannelTransport {
    local: ConnectionId,
    remote: ConnectionId,
    tx: mpsc::UnboundedSender<InboundRecord>,
    rx: mpsc::UnboundedReceiver<InboundRecord>,
}

/// Create a connected pair of transports for `a` and `b`.
pub fn channel_pair(a: ConnectionId, b: ConnectionId) -> (ChannelTransport, ChannelTransport) {
    let (a_tx, b_rx) = mpsc::unbounded_channel();
    let (b_tx, a_rx) = mpsc::unbounded_channel();
    (
        ChannelTransport {
            local: a,
            remote: b,
            tx: a_tx,
            rx: a_rx,
        },
        ChannelTransport {
            local: b,
            remote: a,
            tx: b_tx,
            rx: b_rx,
        },
    )
}

impl ChannelTransport {
    pub fn local(&self) -> ConnectionId {
        self.local
    }
}

impl Transport for ChannelTransport {
    fn send(&mut self, to: ConnectionId, record: TransportRecord) -> Result<(), TransportError> {
        if to != self.remote {
            return Err(TransportError::PeerGone(to.0));
        }
        self.tx
            .send(InboundRecord {
                from: self.local,
                record,
            })
            .map_err(|e| TransportError::Closed(e.to_string()))
    }

    fn drain(&mut self) -> Vec<InboundRecord> {
        let mut records = Vec::new();
        while let Ok(record) = self.rx.try_recv() {
            records.push(record);
        }
        records
    }

    fn peers(&self) -> Vec<ConnectionId> {
        vec![self.remote]
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
            kind: MessageKind::Command,
            status: MessageStatus::None,
            total_len: 0,
            flags: MessageFlags::empty(),
        })
    }

    #[tokio::test]
    async fn records_cross_the_link() {
        let (mut client, mut server) = channel_pair(ConnectionId(1), ConnectionId(0));
        client.send(ConnectionId(0), header(1)).unwrap();
        client.send(ConnectionId(0), header(2)).unwrap();

        let received = server.drain();
        assert_eq!(received.len(), 2);
        assert_eq!(received[0].from, ConnectionId(1));
        assert!(server.drain().is_empty());
    }

    #[tokio::test]
    async fn send_to_wrong_peer_rejected() {
        let (mut client, _server) = channel_pair(ConnectionId(1), ConnectionId(0));
        assert!(matches!(
            client.send(ConnectionId(7), header(1)),
            Err(TransportError::PeerGone(7))
        ));
    }

    #[tokio::test]
    async fn dropped_peer_closes_link() {
        let (mut client, server) = channel_pair(ConnectionId(1), ConnectionId(0));
        drop(server);
        assert!(matches!(
            client.send(ConnectionId(0), header(1)),
            Err(TransportError::Closed(_))
        ));
    }

    #[test]
    fn peers_lists_the_remote() {
        let (client, server) = channel_pair(ConnectionId(1), ConnectionId(0));
        assert_eq!(client.peers(), vec![ConnectionId(0)]);
        assert_eq!(server.peers(), vec![ConnectionId(1)]);
    }
}
