use crate::addr::NodeAddr;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// First byte of every control-plane datagram.
///
/// Data-plane datagrams always begin with an ASCII priority digit, so this
/// marker is enough to tell the two families apart on a shared socket.
pub const CONTROL_MARKER: u8 = 0x00;

/// Errors produced by the control-plane codec.
#[derive(Debug, Error)]
pub enum ControlError {
    #[error("control datagram missing marker byte")]
    BadMarker,
    #[error("encode: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
    #[error("decode: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
}

/// The three control-plane message kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlKind {
    /// Neighbor-liveness beacon.
    Hello,
    /// Link-state message: a node's sequence-numbered neighbor set.
    Lsm,
    /// Path-discovery probe answered by the emulator that zeroes its TTL.
    Trace,
}

/// A self-describing control-plane record.
///
/// Serialized as MessagePack behind [`CONTROL_MARKER`]; unlike data-plane
/// datagrams it is never wrapped in the routing header. Fields a kind does
/// not use stay at their zero values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlPacket {
    pub source: NodeAddr,
    pub kind: ControlKind,
    pub seq_num: u32,
    pub ttl: u32,
    pub neighbors: Vec<NodeAddr>,
    pub destination: Option<NodeAddr>,
}

impl ControlPacket {
    pub fn hello(source: NodeAddr) -> Self {
        Self {
            source,
            kind: ControlKind::Hello,
            seq_num: 0,
            ttl: 0,
            neighbors: Vec::new(),
            destination: None,
        }
    }

    pub fn lsm(source: NodeAddr, seq_num: u32, ttl: u32, neighbors: Vec<NodeAddr>) -> Self {
        Self {
            source,
            kind: ControlKind::Lsm,
            seq_num,
            ttl,
            neighbors,
            destination: None,
        }
    }

    pub fn trace(source: NodeAddr, ttl: u32, destination: NodeAddr) -> Self {
        Self {
            source,
            kind: ControlKind::Trace,
            seq_num: 0,
            ttl,
            neighbors: Vec::new(),
            destination: Some(destination),
        }
    }

    /// Serializes the record behind the control marker.
    pub fn encode(&self) -> Result<Vec<u8>, ControlError> {
        let mut buf = vec![CONTROL_MARKER];
        rmp_serde::encode::write(&mut buf, self)?;
        Ok(buf)
    }

    /// Deserializes a control datagram previously produced by [`encode`].
    ///
    /// [`encode`]: ControlPacket::encode
    pub fn decode(buf: &[u8]) -> Result<Self, ControlError> {
        match buf.split_first() {
            Some((&CONTROL_MARKER, body)) => Ok(rmp_serde::from_slice(body)?),
            _ => Err(ControlError::BadMarker),
        }
    }
}

/// Whether a received datagram belongs to the control plane.
pub fn is_control(buf: &[u8]) -> bool {
    buf.first() == Some(&CONTROL_MARKER)
}
