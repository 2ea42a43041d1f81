use rand::SeedableRng;
use rand::rngs::StdRng;
use relay_emulator::{DropRecord, ForwardingPlane, ForwardingRules, PlaneEvent};
use relay_wire::{MAX_DATAGRAM, NodeAddr, local_ipv4};
use std::error::Error;
use std::io::ErrorKind;
use std::net::{Ipv4Addr, UdpSocket};
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Idle pause at the bottom of the loop; keeps the poll loop off the CPU
/// without blocking the socket.
const IDLE_SLEEP: Duration = Duration::from_micros(500);

/// The static data plane: classify, delay, drop, forward, forever.
pub fn run(port: u16, queue_size: usize, rules_path: &Path) -> Result<(), Box<dyn Error>> {
    let identity = NodeAddr::new(local_ipv4(), port);
    let rules = ForwardingRules::load(rules_path, identity)?;
    if rules.is_empty() {
        warn!(%identity, "no forwarding rules match this emulator");
    }

    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, port))?;
    socket.set_nonblocking(true)?;
    let mut plane = ForwardingPlane::new(rules, queue_size, StdRng::from_entropy());
    info!(port, queue_size, "emulator started");

    let mut buf = [0u8; MAX_DATAGRAM];
    loop {
        let mut idle = true;

        match socket.recv_from(&mut buf) {
            Ok((len, _)) => {
                plane.accept(&buf[..len], Instant::now());
                idle = false;
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => {}
            Err(e) => return Err(e.into()),
        }

        while let Some((packet, next_hop)) = plane.poll_transmit(Instant::now()) {
            socket.send_to(&packet, next_hop.socket_addr())?;
            idle = false;
        }

        while let Some(event) = plane.poll_event() {
            if let PlaneEvent::Dropped(record) = event {
                log_drop(&record);
            }
        }

        if idle {
            thread::sleep(IDLE_SLEEP);
        }
    }
}

/// One log line per drop, with the fields the log file records.
fn log_drop(record: &DropRecord) {
    let or_unknown = |addr: Option<NodeAddr>| {
        addr.map(|a| a.to_string()).unwrap_or_else(|| "?".into())
    };
    info!(
        reason = %record.reason,
        src = %or_unknown(record.src),
        dst = %or_unknown(record.dest),
        priority = record.priority.map(|p| p.as_wire() - b'0').unwrap_or(0),
        payload_size = record.payload_len,
        "packet dropped"
    );
}
