use relay_emulator::{LinkStateNode, Topology};
use relay_wire::{ControlPacket, MAX_DATAGRAM, NodeAddr, is_control, local_ipv4};
use std::error::Error;
use std::io::ErrorKind;
use std::net::{Ipv4Addr, SocketAddr, UdpSocket};
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const IDLE_SLEEP: Duration = Duration::from_micros(500);

/// The link-state control plane: HELLO liveness, LSM flooding, and the
/// traceroute responder, over one non-blocking socket.
pub fn run(port: u16, topology_path: &Path) -> Result<(), Box<dyn Error>> {
    let self_addr = NodeAddr::new(local_ipv4(), port);
    let topology = Topology::load(topology_path)?;
    let mut node = LinkStateNode::new(self_addr, topology, Instant::now())?;

    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, port))?;
    socket.set_nonblocking(true)?;
    info!(%self_addr, "link-state emulator started");

    let mut buf = [0u8; MAX_DATAGRAM];
    loop {
        let now = Instant::now();
        let mut outbound = node.tick(now);
        let mut idle = outbound.is_empty();

        match socket.recv_from(&mut buf) {
            Ok((len, from)) => {
                idle = false;
                if let Some(received) = decode_control(&buf[..len], from) {
                    let (packet, from) = received;
                    outbound.extend(node.handle_control(packet, from, now)?);
                }
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => {}
            Err(e) => return Err(e.into()),
        }

        for (packet, to) in outbound {
            socket.send_to(&packet.encode()?, to.socket_addr())?;
        }

        if idle {
            thread::sleep(IDLE_SLEEP);
        }
    }
}

fn decode_control(buf: &[u8], from: SocketAddr) -> Option<(ControlPacket, NodeAddr)> {
    if !is_control(buf) {
        debug!("ignoring data-plane datagram in control mode");
        return None;
    }
    let SocketAddr::V4(from) = from else {
        warn!(%from, "ignoring non-IPv4 peer");
        return None;
    };
    match ControlPacket::decode(buf) {
        Ok(packet) => Some((packet, NodeAddr::from(from))),
        Err(e) => {
            warn!(error = %e, "undecodable control datagram");
            None
        }
    }
}
