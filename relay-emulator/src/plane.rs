use crate::queue::{BoundedQueue, QueueEntry};
use crate::rules::ForwardingRules;
use rand::Rng;
use rand::rngs::StdRng;
use relay_wire::{NodeAddr, PacketKind, Priority, wire};
use std::collections::VecDeque;
use std::fmt;
use std::time::Instant;
use tracing::debug;

/// Why the forwarding plane discarded a datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    Malformed,
    NoRoute,
    QueueFull,
    Loss,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DropReason::Malformed => "malformed packet",
            DropReason::NoRoute => "no forwarding entry",
            DropReason::QueueFull => "queue full",
            DropReason::Loss => "loss",
        })
    }
}

/// One drop, carrying everything the emulator's log line records.
///
/// Fields stay `None` when the datagram was too mangled to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropRecord {
    pub reason: DropReason,
    pub priority: Option<Priority>,
    pub src: Option<NodeAddr>,
    pub dest: Option<NodeAddr>,
    pub payload_len: usize,
}

/// Observable outcomes of plane processing, drained by the driver loop.
///
/// Drops are reported only here, never logged by the plane itself; the
/// driver owns the log file and writes one line per [`DropRecord`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaneEvent {
    Dropped(DropRecord),
    Forwarded {
        dest: NodeAddr,
        next_hop: NodeAddr,
        priority: Priority,
    },
}

/// The data-plane forwarder.
///
/// Three bounded priority queues feed a single in-flight slot that models
/// the per-destination propagation delay; a packet leaves the slot only once
/// its delay has elapsed, then survives a loss roll before being handed to
/// the driver for transmission. END packets are exempt from both queue-full
/// drops (they wait in a reserved slot drained ahead of the low-priority
/// queue) and from loss, because END is the transport's only end-of-stream
/// signal.
pub struct ForwardingPlane {
    rules: ForwardingRules,
    high: BoundedQueue,
    medium: BoundedQueue,
    low: BoundedQueue,
    end_slot: VecDeque<QueueEntry>,
    in_flight: Option<QueueEntry>,
    rng: StdRng,
    events: VecDeque<PlaneEvent>,
}

impl ForwardingPlane {
    pub fn new(rules: ForwardingRules, queue_capacity: usize, rng: StdRng) -> Self {
        Self {
            rules,
            high: BoundedQueue::new(queue_capacity),
            medium: BoundedQueue::new(queue_capacity),
            low: BoundedQueue::new(queue_capacity),
            end_slot: VecDeque::new(),
            in_flight: None,
            rng,
            events: VecDeque::new(),
        }
    }

    /// Classifies one received datagram into its priority queue.
    pub fn accept(&mut self, buf: &[u8], now: Instant) {
        let datagram = match wire::decode(buf) {
            Ok(datagram) => datagram,
            Err(_) => {
                self.events.push_back(PlaneEvent::Dropped(DropRecord {
                    reason: DropReason::Malformed,
                    priority: None,
                    src: None,
                    dest: None,
                    payload_len: buf.len(),
                }));
                return;
            }
        };

        let route = datagram.route;
        let record = DropRecord {
            reason: DropReason::NoRoute,
            priority: Some(route.priority),
            src: Some(route.src),
            dest: Some(route.dst),
            payload_len: datagram.payload.len(),
        };

        let Some(rule) = self.rules.lookup(route.dst) else {
            self.events.push_back(PlaneEvent::Dropped(record));
            return;
        };
        let next_hop = rule.next_hop;

        let kind = datagram.segment.kind;
        let queue = match route.priority {
            Priority::High => &mut self.high,
            Priority::Medium => &mut self.medium,
            Priority::Low => &mut self.low,
        };
        if queue
            .enqueue(buf.to_vec(), route.dst, next_hop, kind, now)
            .is_ok()
        {
            return;
        }

        if kind == PacketKind::End {
            // END is guaranteed delivery; park it in the reserved slot.
            debug!(dest = %route.dst, "queue full, END exempted");
            self.end_slot.push_back(QueueEntry {
                packet: buf.to_vec(),
                enqueued_at: now,
                dest: route.dst,
                next_hop,
                kind: PacketKind::End,
            });
        } else {
            self.events.push_back(PlaneEvent::Dropped(DropRecord {
                reason: DropReason::QueueFull,
                ..record
            }));
        }
    }

    /// Produces the next datagram whose delay has elapsed, if any.
    ///
    /// Loads the in-flight slot from the queues in strict priority order,
    /// waits out the per-destination delay, then rolls for loss. Returns the
    /// datagram and the next hop to send it to.
    pub fn poll_transmit(&mut self, now: Instant) -> Option<(Vec<u8>, NodeAddr)> {
        if self.in_flight.is_none() {
            self.in_flight = self.next_queued();
        }

        let entry = self.in_flight.take()?;
        let (delay, loss_percent) = self
            .rules
            .lookup(entry.dest)
            .map(|rule| (rule.delay, rule.loss_percent))
            .unwrap_or_default();
        if now.duration_since(entry.enqueued_at) < delay {
            self.in_flight = Some(entry);
            return None;
        }

        if entry.kind != PacketKind::End
            && loss_percent > 0
            && self.rng.gen_range(1..=100u32) <= u32::from(loss_percent)
        {
            let decoded = wire::decode(&entry.packet).ok();
            self.events.push_back(PlaneEvent::Dropped(DropRecord {
                reason: DropReason::Loss,
                priority: decoded.map(|d| d.route.priority),
                src: decoded.map(|d| d.route.src),
                dest: Some(entry.dest),
                payload_len: decoded.map(|d| d.payload.len()).unwrap_or_default(),
            }));
            return None;
        }

        let priority = wire::decode(&entry.packet)
            .map(|d| d.route.priority)
            .unwrap_or(Priority::Low);
        self.events.push_back(PlaneEvent::Forwarded {
            dest: entry.dest,
            next_hop: entry.next_hop,
            priority,
        });
        debug!(dest = %entry.dest, next_hop = %entry.next_hop, "forwarding");
        Some((entry.packet, entry.next_hop))
    }

    /// Drains one observable event, oldest first.
    pub fn poll_event(&mut self) -> Option<PlaneEvent> {
        self.events.pop_front()
    }

    /// Strict priority: high, then medium, then the reserved END slot, then
    /// low.
    fn next_queued(&mut self) -> Option<QueueEntry> {
        self.high
            .dequeue()
            .or_else(|| self.medium.dequeue())
            .or_else(|| self.end_slot.pop_front())
            .or_else(|| self.low.dequeue())
    }

    /// Depth of the queue serving `priority`, for observability and tests.
    pub fn queue_len(&self, priority: Priority) -> usize {
        match priority {
            Priority::High => self.high.len(),
            Priority::Medium => self.medium.len(),
            Priority::Low => self.low.len(),
        }
    }
}
