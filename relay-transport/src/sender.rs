use crate::chunk::{Segment, plan_segments};
use crate::error::{TransportError, TransportResult};
use crate::window::{RetryVerdict, SendWindow};
use relay_wire::{
    MAX_DATAGRAM, NodeAddr, PacketKind, Priority, SegmentHeader, is_control, wire,
};
use std::fs;
use std::io::ErrorKind;
use std::net::{Ipv4Addr, UdpSocket};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// How long the sender waits for the initial REQUEST before giving up.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Sender-side configuration, one value per CLI flag.
#[derive(Debug, Clone)]
pub struct SenderConfig {
    /// Port the sender listens on for the REQUEST.
    pub listen_port: u16,
    /// Requester port from the legacy flag; the request's routing header is
    /// authoritative and this value is only echoed in logs.
    pub requester_port: u16,
    /// Packets per second; each send is followed by a `1/rate` pacing sleep.
    pub rate: u32,
    /// Sequence number of the first DATA packet.
    pub initial_seq: u32,
    /// Maximum payload bytes per DATA packet.
    pub payload_len: usize,
    /// The local emulator every outgoing datagram is handed to.
    pub emulator: NodeAddr,
    /// Priority stamped on outgoing DATA and END packets.
    pub priority: Priority,
    /// Per-receive ACK timeout.
    pub ack_timeout: Duration,
}

/// Statistics for one completed send session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    pub peer: NodeAddr,
    /// DATA transmissions, retransmissions included.
    pub packets_sent: u64,
    pub retransmits: u64,
    /// Packets abandoned after the retry budget ran out.
    pub abandoned: u64,
}

impl SessionSummary {
    /// Observed loss rate: retransmissions over transmissions.
    pub fn loss_rate(&self) -> f64 {
        if self.packets_sent == 0 {
            0.0
        } else {
            self.retransmits as f64 / self.packets_sent as f64
        }
    }
}

/// Runs one sender session: wait for a REQUEST, stream the file through the
/// emulator in acknowledged windows, close with END.
pub fn run(config: &SenderConfig) -> TransportResult<SessionSummary> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, config.listen_port))?;
    socket.set_read_timeout(Some(REQUEST_TIMEOUT))?;

    let mut buf = [0u8; MAX_DATAGRAM];
    let len = match socket.recv_from(&mut buf) {
        Ok((len, _)) => len,
        Err(e) if is_timeout(&e) => return Err(TransportError::RequestTimeout),
        Err(e) => return Err(e.into()),
    };

    let request = wire::decode(&buf[..len])?;
    if request.segment.kind != PacketKind::Request {
        warn!(kind = ?request.segment.kind, "expected a REQUEST, proceeding anyway");
    }
    let filename =
        std::str::from_utf8(request.payload).map_err(|_| TransportError::BadFilename)?;
    let requester = request.route.src;
    let local = request.route.dst;
    let window = (request.segment.length_or_window as usize).max(1);
    if requester.port != config.requester_port {
        debug!(
            header_port = requester.port,
            configured = config.requester_port,
            "request port differs from the configured one; the header wins"
        );
    }
    info!(%requester, filename, window, "serving request");

    let content = fs::read(filename)?;
    let plan = plan_segments(&content, config.payload_len, config.initial_seq)?;
    let pacing = pacing_interval(config.rate);

    let mut summary = SessionSummary {
        peer: requester,
        packets_sent: 0,
        retransmits: 0,
        abandoned: 0,
    };

    // A zero read timeout is rejected by the socket layer.
    let ack_timeout = config.ack_timeout.max(Duration::from_millis(1));
    socket.set_read_timeout(Some(ack_timeout))?;
    for batch in plan.segments.chunks(window) {
        let mut outstanding = SendWindow::new(batch.iter().map(|segment| segment.seq));

        for segment in batch {
            transmit(&socket, config, local, requester, segment)?;
            summary.packets_sent += 1;
            thread::sleep(pacing);
        }

        while !outstanding.is_settled() {
            match collect_ack(&socket, &mut buf) {
                Ok(Some(seq)) => {
                    if outstanding.record_ack(seq) {
                        debug!(seq, "acked");
                    }
                }
                Ok(None) => {}
                Err(e) if is_timeout(&e) => {
                    for seq in outstanding.unacked() {
                        let Some(segment) = batch.iter().find(|segment| segment.seq == seq)
                        else {
                            continue;
                        };
                        match outstanding.note_retransmit(seq) {
                            RetryVerdict::Retry => {
                                transmit(&socket, config, local, requester, segment)?;
                                summary.packets_sent += 1;
                                summary.retransmits += 1;
                                thread::sleep(pacing);
                            }
                            RetryVerdict::Exhausted => {
                                warn!(seq, "retry budget spent, abandoning packet");
                            }
                        }
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }
        summary.abandoned += outstanding.abandoned() as u64;
    }

    let end = wire::encode(
        config.priority,
        local,
        requester,
        SegmentHeader {
            kind: PacketKind::End,
            seq: plan.end_seq,
            length_or_window: 0,
        },
        b"",
    );
    socket.send_to(&end, config.emulator.socket_addr())?;
    info!(
        peer = %summary.peer,
        packets = summary.packets_sent,
        retransmits = summary.retransmits,
        loss_rate = summary.loss_rate(),
        "transfer finished"
    );
    Ok(summary)
}

fn transmit(
    socket: &UdpSocket,
    config: &SenderConfig,
    local: NodeAddr,
    requester: NodeAddr,
    segment: &Segment,
) -> TransportResult<()> {
    let packet = wire::encode(
        config.priority,
        local,
        requester,
        SegmentHeader {
            kind: PacketKind::Data,
            seq: segment.seq,
            length_or_window: segment.payload.len() as u32,
        },
        &segment.payload,
    );
    socket.send_to(&packet, config.emulator.socket_addr())?;
    debug!(seq = segment.seq, len = segment.payload.len(), "sent DATA");
    Ok(())
}

/// Receives one datagram and extracts an ACK sequence, if that is what it
/// was. Anything undecodable or non-ACK is logged and skipped.
fn collect_ack(socket: &UdpSocket, buf: &mut [u8]) -> std::io::Result<Option<u32>> {
    let (len, _) = socket.recv_from(buf)?;
    if is_control(&buf[..len]) {
        return Ok(None);
    }
    match wire::decode(&buf[..len]) {
        Ok(datagram) if datagram.segment.kind == PacketKind::Ack => Ok(Some(datagram.segment.seq)),
        Ok(datagram) => {
            debug!(kind = ?datagram.segment.kind, "ignoring non-ACK datagram");
            Ok(None)
        }
        Err(e) => {
            warn!(error = %e, "ignoring malformed datagram");
            Ok(None)
        }
    }
}

fn pacing_interval(rate: u32) -> Duration {
    if rate == 0 {
        Duration::ZERO
    } else {
        Duration::from_secs(1) / rate
    }
}

fn is_timeout(e: &std::io::Error) -> bool {
    matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
}
