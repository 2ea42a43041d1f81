use relay_wire::{NodeAddr, PacketKind};
use std::collections::VecDeque;
use std::time::Instant;
use thiserror::Error;

/// Returned by [`BoundedQueue::enqueue`] when the queue is at capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("queue full")]
pub struct QueueFull;

/// One queued datagram awaiting its turn on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    /// The datagram exactly as received.
    pub packet: Vec<u8>,
    pub enqueued_at: Instant,
    pub dest: NodeAddr,
    pub next_hop: NodeAddr,
    /// Transport kind, kept so END packets can be exempted from loss.
    pub kind: PacketKind,
}

/// A fixed-capacity FIFO of datagrams.
///
/// Entries are stamped with their enqueue time; the forwarding plane holds
/// the head-of-line entry until its per-destination delay has elapsed.
#[derive(Debug, Clone)]
pub struct BoundedQueue {
    capacity: usize,
    entries: VecDeque<QueueEntry>,
}

impl BoundedQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    /// Appends one datagram, stamping it with `now`. Fails at capacity.
    pub fn enqueue(
        &mut self,
        packet: Vec<u8>,
        dest: NodeAddr,
        next_hop: NodeAddr,
        kind: PacketKind,
        now: Instant,
    ) -> Result<(), QueueFull> {
        if self.entries.len() >= self.capacity {
            return Err(QueueFull);
        }
        self.entries.push_back(QueueEntry {
            packet,
            enqueued_at: now,
            dest,
            next_hop,
            kind,
        });
        Ok(())
    }

    pub fn dequeue(&mut self) -> Option<QueueEntry> {
        self.entries.pop_front()
    }

    pub fn peek(&self) -> Option<&QueueEntry> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
