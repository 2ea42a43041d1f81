//! # Relay Transport
//!
//! The reliable file-transfer layer of the relay stack: a windowed,
//! sequence-numbered datagram protocol with per-packet acknowledgements and a
//! fixed retransmission budget.
//!
//! The protocol state machines ([`window::SendWindow`],
//! [`reassembly::ReorderBuffer`], [`chunk::plan_segments`]) are pure and
//! socket-free; [`sender`] and [`requester`] drive them over UDP.

pub mod chunk;
pub mod error;
pub mod reassembly;
pub mod requester;
pub mod sender;
pub mod tracker;
pub mod window;

pub use chunk::{Segment, SegmentPlan, plan_segments};
pub use error::{TransportError, TransportResult};
pub use reassembly::{Insert, ReorderBuffer};
pub use requester::{PeerSummary, RequesterConfig, SESSION_TIMEOUT};
pub use sender::{REQUEST_TIMEOUT, SenderConfig, SessionSummary};
pub use tracker::{Tracker, TrackerPeer};
pub use window::{RETRY_BUDGET, RetryVerdict, SendWindow};
