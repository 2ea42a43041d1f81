use crate::addr::NodeAddr;
use std::net::Ipv4Addr;
use thiserror::Error;

/// Size of the outer routing header.
pub const OUTER_HEADER_LEN: usize = 17;
/// Size of the inner transport header.
pub const INNER_HEADER_LEN: usize = 9;
/// Receive-buffer size used by every process; no datagram is larger.
pub const MAX_DATAGRAM: usize = 8192;

/// Errors produced while decoding a data-plane datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WireError {
    #[error("datagram of {0} bytes is shorter than the two headers")]
    Truncated(usize),
    #[error("inner length {inner_len} overruns datagram of {have} bytes")]
    LengthOverrun { inner_len: u32, have: usize },
    #[error("inner length {0} is shorter than the transport header")]
    BadInnerLength(u32),
    #[error("unknown priority byte {0:#04x}")]
    BadPriority(u8),
    #[error("unknown packet kind {0:#04x}")]
    BadKind(u8),
}

/// Forwarding priority carried in the first byte of the routing header.
///
/// `High` preempts `Medium` preempts `Low` at every emulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    /// The on-wire byte: ASCII `'1'`, `'2'`, or `'3'`.
    pub fn as_wire(self) -> u8 {
        match self {
            Priority::High => b'1',
            Priority::Medium => b'2',
            Priority::Low => b'3',
        }
    }

    pub fn from_wire(byte: u8) -> Result<Self, WireError> {
        match byte {
            b'1' => Ok(Priority::High),
            b'2' => Ok(Priority::Medium),
            b'3' => Ok(Priority::Low),
            other => Err(WireError::BadPriority(other)),
        }
    }

    /// Maps the numeric CLI level (1, 2, 3) onto a priority.
    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            1 => Some(Priority::High),
            2 => Some(Priority::Medium),
            3 => Some(Priority::Low),
            _ => None,
        }
    }
}

/// The transport-level packet kind carried in the inner header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketKind {
    /// Asks a sender for a file; payload is the UTF-8 filename.
    Request,
    /// Carries one file chunk.
    Data,
    /// Signals end of transmission; emulators never drop it.
    End,
    /// Acknowledges one DATA sequence.
    Ack,
}

impl PacketKind {
    pub fn as_wire(self) -> u8 {
        match self {
            PacketKind::Request => b'R',
            PacketKind::Data => b'D',
            PacketKind::End => b'E',
            PacketKind::Ack => b'A',
        }
    }

    pub fn from_wire(byte: u8) -> Result<Self, WireError> {
        match byte {
            b'R' => Ok(PacketKind::Request),
            b'D' => Ok(PacketKind::Data),
            b'E' => Ok(PacketKind::End),
            b'A' => Ok(PacketKind::Ack),
            other => Err(WireError::BadKind(other)),
        }
    }
}

/// The outer routing header prepended to every data-plane datagram.
///
/// 17 bytes on the wire: priority (1), source address (4+2), destination
/// address (4+2), inner length (4). All integers big-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteHeader {
    pub priority: Priority,
    pub src: NodeAddr,
    pub dst: NodeAddr,
    /// Length of the inner header plus payload.
    pub inner_len: u32,
}

/// The inner transport header.
///
/// 9 bytes on the wire: kind (1), sequence (4), length-or-window (4).
/// The third field carries the payload length for DATA, the requester's
/// window size for REQUEST, and zero for END and ACK.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentHeader {
    pub kind: PacketKind,
    pub seq: u32,
    pub length_or_window: u32,
}

/// A fully decoded data-plane datagram, borrowing its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Datagram<'a> {
    pub route: RouteHeader,
    pub segment: SegmentHeader,
    pub payload: &'a [u8],
}

/// Encodes one data-plane datagram.
///
/// The outer `inner_len` field is derived from the payload; callers never
/// supply it.
pub fn encode(
    priority: Priority,
    src: NodeAddr,
    dst: NodeAddr,
    segment: SegmentHeader,
    payload: &[u8],
) -> Vec<u8> {
    let inner_len = (INNER_HEADER_LEN + payload.len()) as u32;
    let mut buf = Vec::with_capacity(OUTER_HEADER_LEN + inner_len as usize);
    buf.push(priority.as_wire());
    buf.extend_from_slice(&src.ip.octets());
    buf.extend_from_slice(&src.port.to_be_bytes());
    buf.extend_from_slice(&dst.ip.octets());
    buf.extend_from_slice(&dst.port.to_be_bytes());
    buf.extend_from_slice(&inner_len.to_be_bytes());
    buf.push(segment.kind.as_wire());
    buf.extend_from_slice(&segment.seq.to_be_bytes());
    buf.extend_from_slice(&segment.length_or_window.to_be_bytes());
    buf.extend_from_slice(payload);
    buf
}

/// Decodes one data-plane datagram.
///
/// Fails when the buffer is shorter than the two headers, when the declared
/// inner length overruns the buffer, or when the priority or kind byte is
/// unknown. Trailing bytes past the declared length are ignored.
pub fn decode(buf: &[u8]) -> Result<Datagram<'_>, WireError> {
    if buf.len() < OUTER_HEADER_LEN + INNER_HEADER_LEN {
        return Err(WireError::Truncated(buf.len()));
    }

    let priority = Priority::from_wire(buf[0])?;
    let src = NodeAddr::new(read_ipv4(&buf[1..5]), read_u16(&buf[5..7]));
    let dst = NodeAddr::new(read_ipv4(&buf[7..11]), read_u16(&buf[11..13]));
    let inner_len = read_u32(&buf[13..17]);

    if (inner_len as usize) < INNER_HEADER_LEN {
        return Err(WireError::BadInnerLength(inner_len));
    }
    let end = OUTER_HEADER_LEN + inner_len as usize;
    if end > buf.len() {
        return Err(WireError::LengthOverrun {
            inner_len,
            have: buf.len(),
        });
    }

    let kind = PacketKind::from_wire(buf[17])?;
    let seq = read_u32(&buf[18..22]);
    let length_or_window = read_u32(&buf[22..26]);

    Ok(Datagram {
        route: RouteHeader {
            priority,
            src,
            dst,
            inner_len,
        },
        segment: SegmentHeader {
            kind,
            seq,
            length_or_window,
        },
        payload: &buf[OUTER_HEADER_LEN + INNER_HEADER_LEN..end],
    })
}

fn read_ipv4(bytes: &[u8]) -> Ipv4Addr {
    Ipv4Addr::new(bytes[0], bytes[1], bytes[2], bytes[3])
}

fn read_u16(bytes: &[u8]) -> u16 {
    u16::from_be_bytes([bytes[0], bytes[1]])
}

fn read_u32(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}
