use crate::error::{TransportError, TransportResult};
use crate::reassembly::{Insert, ReorderBuffer};
use crate::tracker::Tracker;
use relay_wire::{
    MAX_DATAGRAM, NodeAddr, PacketKind, Priority, SegmentHeader, is_control, wire,
};
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::net::UdpSocket;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// How long the requester waits for any datagram mid-session before the
/// session is declared dead.
pub const SESSION_TIMEOUT: Duration = Duration::from_secs(60);

/// Requester-side configuration, one value per CLI flag.
#[derive(Debug, Clone)]
pub struct RequesterConfig {
    /// The requester's own identity: bound locally and stamped as the
    /// routing source of every REQUEST and ACK.
    pub listen: NodeAddr,
    /// The file to request from the tracker's peers.
    pub filename: String,
    /// Where the received payload lands; conventionally the requested
    /// filename in the working directory.
    pub output_path: PathBuf,
    /// The local emulator every outgoing datagram is handed to.
    pub emulator: NodeAddr,
    /// Window size advertised in the REQUEST.
    pub window: u32,
    /// Location of the tracker file.
    pub tracker_path: PathBuf,
}

/// Statistics for one completed peer session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeerSummary {
    pub peer: NodeAddr,
    /// DATA arrivals, duplicates included.
    pub data_packets: u64,
    /// Unique payload bytes written to the output file.
    pub data_bytes: u64,
    /// First DATA arrival to END arrival.
    pub duration: Duration,
}

impl PeerSummary {
    pub fn packets_per_second(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.data_packets as f64 / secs
        } else {
            self.data_packets as f64
        }
    }
}

/// Runs the requester: one session per tracker peer in ascending id order,
/// appending every peer's payload to the output file.
pub fn run(config: &RequesterConfig) -> TransportResult<Vec<PeerSummary>> {
    let tracker = Tracker::load(&config.tracker_path)?;
    let peers = tracker.peers_for(&config.filename);
    if peers.is_empty() {
        return Err(TransportError::NoPeers(config.filename.clone()));
    }

    let socket = UdpSocket::bind(config.listen.socket_addr())?;
    socket.set_read_timeout(Some(SESSION_TIMEOUT))?;
    let mut output = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.output_path)?;

    let mut summaries = Vec::with_capacity(peers.len());
    for peer in peers {
        info!(peer = %peer.addr, filename = config.filename, "requesting file");
        summaries.push(fetch_from_peer(&socket, &mut output, peer.addr, config)?);
    }
    Ok(summaries)
}

/// One transfer session against a single sender.
fn fetch_from_peer(
    socket: &UdpSocket,
    output: &mut File,
    peer: NodeAddr,
    config: &RequesterConfig,
) -> TransportResult<PeerSummary> {
    let request = wire::encode(
        Priority::High,
        config.listen,
        peer,
        SegmentHeader {
            kind: PacketKind::Request,
            seq: 0,
            length_or_window: config.window,
        },
        config.filename.as_bytes(),
    );
    socket.send_to(&request, config.emulator.socket_addr())?;

    let mut buffer = ReorderBuffer::new();
    let mut buf = [0u8; MAX_DATAGRAM];
    let mut data_packets = 0u64;
    let mut first_data: Option<Instant> = None;

    loop {
        let len = match socket.recv_from(&mut buf) {
            Ok((len, _)) => len,
            Err(e) if is_timeout(&e) => return Err(TransportError::SessionTimeout),
            Err(e) => return Err(e.into()),
        };
        if is_control(&buf[..len]) {
            continue;
        }
        let datagram = match wire::decode(&buf[..len]) {
            Ok(datagram) => datagram,
            Err(e) => {
                warn!(error = %e, "dropping malformed datagram");
                continue;
            }
        };
        if datagram.route.dst != config.listen {
            warn!(
                dst = %datagram.route.dst,
                listen = %config.listen,
                "destination mismatch, discarding"
            );
            continue;
        }

        match datagram.segment.kind {
            PacketKind::Data => {
                first_data.get_or_insert_with(Instant::now);
                data_packets += 1;
                match buffer.insert(datagram.segment.seq, datagram.payload.to_vec()) {
                    Insert::Fresh => debug!(seq = datagram.segment.seq, "buffered DATA"),
                    Insert::Duplicate => debug!(seq = datagram.segment.seq, "duplicate DATA"),
                }
                acknowledge(socket, config, &datagram)?;
            }
            PacketKind::End => {
                debug!(seq = datagram.segment.seq, "END received");
                break;
            }
            other => {
                if data_packets == 0 {
                    warn!(kind = ?other, "expected the first packet to be DATA");
                }
            }
        }
    }

    let duration = first_data.map(|t| t.elapsed()).unwrap_or_default();
    let data_bytes = buffer.bytes();
    for (_, payload) in buffer.into_ordered() {
        output.write_all(&payload)?;
    }
    output.flush()?;

    let summary = PeerSummary {
        peer,
        data_packets,
        data_bytes,
        duration,
    };
    info!(
        peer = %peer,
        packets = summary.data_packets,
        bytes = summary.data_bytes,
        duration_ms = summary.duration.as_millis() as u64,
        "session complete"
    );
    Ok(summary)
}

/// Acks one DATA packet back through the emulator, routing header swapped.
fn acknowledge(
    socket: &UdpSocket,
    config: &RequesterConfig,
    datagram: &wire::Datagram<'_>,
) -> TransportResult<()> {
    let ack = wire::encode(
        Priority::High,
        datagram.route.dst,
        datagram.route.src,
        SegmentHeader {
            kind: PacketKind::Ack,
            seq: datagram.segment.seq,
            length_or_window: 0,
        },
        b"",
    );
    socket.send_to(&ack, config.emulator.socket_addr())?;
    Ok(())
}

fn is_timeout(e: &std::io::Error) -> bool {
    matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
}
