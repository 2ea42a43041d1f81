//! # Relay Wire
//!
//! Wire formats shared by every process in the relay stack.
//!
//! Two families of datagrams travel over the same UDP sockets:
//!
//! - **Data-plane datagrams**: a fixed 17-byte routing header wrapping a
//!   fixed 9-byte transport header and an opaque payload. All integers are
//!   big-endian. See [`wire`].
//! - **Control-plane records**: HELLO / LSM / TRACE messages exchanged by
//!   emulators, encoded as MessagePack behind a one-byte marker. See
//!   [`control`].
//!
//! The codec is pure: no sockets, no clocks, no global state.

pub mod addr;
pub mod control;
pub mod wire;

pub use addr::{AddrError, NodeAddr, local_ipv4};
pub use control::{ControlError, ControlKind, ControlPacket, is_control};
pub use wire::{
    Datagram, INNER_HEADER_LEN, MAX_DATAGRAM, OUTER_HEADER_LEN, PacketKind, Priority, RouteHeader,
    SegmentHeader, WireError,
};
