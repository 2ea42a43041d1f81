//! # Relay Emulator
//!
//! The software router of the relay stack, split into two planes:
//!
//! - **Forwarding plane** ([`plane`]): classifies data-plane datagrams into
//!   three bounded priority queues, applies a per-destination propagation
//!   delay through a single in-flight slot, drops on overflow or
//!   probabilistic loss (END packets excepted), and emits survivors toward
//!   the next hop from a static rules table.
//! - **Control plane** ([`linkstate`]): HELLO liveness, flooded link-state
//!   messages with sequence suppression and TTL, BFS route recomputation,
//!   and the traceroute responder.
//!
//! Both planes are socket-free state machines fed `(datagram, now)` by a
//! non-blocking driver loop; they queue outbound work and events for the
//! driver to drain.

pub mod error;
pub mod linkstate;
pub mod plane;
pub mod queue;
pub mod routing;
pub mod rules;
pub mod topology;

pub use error::{EmulatorError, EmulatorResult};
pub use linkstate::{
    HELLO_INTERVAL, LSM_INTERVAL, LinkStateNode, NEIGHBOR_TIMEOUT,
};
pub use plane::{DropReason, DropRecord, ForwardingPlane, PlaneEvent};
pub use queue::{BoundedQueue, QueueEntry, QueueFull};
pub use routing::{NextHop, compute_routes};
pub use rules::{ForwardingRules, StaticRoute};
pub use topology::{Adjacency, Topology};
