use clap::Parser;
use relay_wire::{ControlKind, ControlPacket, MAX_DATAGRAM, NodeAddr, is_control, local_ipv4};
use std::error::Error;
use std::io::ErrorKind;
use std::net::{Ipv4Addr, UdpSocket};
use std::process::ExitCode;
use std::time::{Duration, Instant};
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// How long to wait for each probe's reply.
const PROBE_TIMEOUT: Duration = Duration::from_secs(2);
/// Cap on the whole trace.
const TRACE_TIMEOUT: Duration = Duration::from_secs(10);

/// Discovers the emulator path from a source to a destination by probing
/// with increasing TTLs and printing each responder.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port the routetrace listens on for replies.
    #[arg(short = 'a')]
    port: u16,

    /// Source (first hop) host name.
    #[arg(short = 'b')]
    source_host: String,

    /// Source port.
    #[arg(short = 'c')]
    source_port: u16,

    /// Destination host name.
    #[arg(short = 'd')]
    dest_host: String,

    /// Destination port.
    #[arg(short = 'e')]
    dest_port: u16,

    /// Debug option: 1 prints each probe and reply.
    #[arg(short = 'f')]
    debug: u8,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("routetrace failed: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), Box<dyn Error>> {
    let listen = NodeAddr::new(local_ipv4(), args.port);
    let source = NodeAddr::resolve(&args.source_host, args.source_port)?;
    let dest = NodeAddr::resolve(&args.dest_host, args.dest_port)?;
    let debug = args.debug != 0;

    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, args.port))?;
    socket.set_read_timeout(Some(PROBE_TIMEOUT))?;

    let started = Instant::now();
    let mut buf = [0u8; MAX_DATAGRAM];
    let mut ttl = 0u32;

    while started.elapsed() < TRACE_TIMEOUT {
        let probe = ControlPacket::trace(listen, ttl, dest);
        socket.send_to(&probe.encode()?, source.socket_addr())?;
        if debug {
            println!("send: ttl={} {} -> {}", ttl, listen, dest);
        }

        let len = match socket.recv_from(&mut buf) {
            Ok((len, _)) => len,
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                // No reply for this probe; try the same TTL again.
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        if !is_control(&buf[..len]) {
            continue;
        }
        let reply = match ControlPacket::decode(&buf[..len]) {
            Ok(reply) if reply.kind == ControlKind::Trace => reply,
            Ok(_) => continue,
            Err(e) => {
                warn!(error = %e, "undecodable reply");
                continue;
            }
        };
        if debug {
            println!("recv: ttl={} from {}", reply.ttl, reply.source);
        }

        println!("{} {} {}", ttl + 1, reply.source.ip, reply.source.port);
        if reply.source == dest {
            return Ok(());
        }
        ttl += 1;
    }

    Err("trace did not reach the destination within 10 s".into())
}
