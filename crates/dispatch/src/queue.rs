//! Bounded queue between reassembly and the dispatch pass.
//!
//! Decouples arrival bursts from processing cadence: segments may complete
//! many messages in one drain, but the dispatch pass still sees them one at
//! a time. On overflow the oldest message is dropped, keeping the newest.

use std::collections::VecDeque;

use herald_core::message::Message;
use tracing::warn;

/// Maximum messages held between ticks.
pub const QUEUE_CAPACITY: usize = 10;

/// FIFO of reassembled messages awaiting dispatch.
pub struct ReceivedQueue {
    items: VecDeque<Message>,
    capacity: usize,
}

impl ReceivedQueue {
    pub fn new() -> Self {
        Self::with_capacity(QUEUE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Enqueue a completed message, dropping the oldest on overflow.
    pub fn push(&mut self, message: Message) {
        if self.items.len() == self.capacity {
            if let Some(dropped) = self.items.pop_front() {
                warn!(
                    seq = dropped.seq,
                    sender = %dropped.sender,
                    "received-message queue full, dropping oldest"
                );
            }
        }
        self.items.push_back(message);
    }

    pub fn pop(&mut self) -> Option<Message> {
        self.items.pop_front()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Default for ReceivedQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_core::message::{ConnectionId, MessageFlags, MessageKind, MessageStatus};

    fn msg(seq: u32) -> Message {
        Message::complete(
            seq,
            MessageKind::Command,
            MessageStatus::None,
            ConnectionId(1),
            MessageFlags::empty(),
            "x",
        )
    }

    #[test]
    fn fifo_order() {
        let mut queue = ReceivedQueue::new();
        queue.push(msg(1));
        queue.push(msg(2));
        assert_eq!(queue.pop().unwrap().seq, 1);
        assert_eq!(queue.pop().unwrap().seq, 2);
        assert!(queue.pop().is_none());
    }

    #[test]
    fn overflow_drops_oldest() {
        let mut queue = ReceivedQueue::with_capacity(3);
        for seq in 1..=5 {
            queue.push(msg(seq));
        }
        assert_eq!(queue.len(), 3);
        let remaining: Vec<u32> = std::iter::from_fn(|| queue.pop()).map(|m| m.seq).collect();
        assert_eq!(remaining, vec![3, 4, 5]);
    }
}
