use clap::Parser;
use relay_transport::sender::{self, SenderConfig, SessionSummary};
use relay_wire::{NodeAddr, Priority};
use std::error::Error;
use std::process::ExitCode;
use std::time::Duration;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Waits for one REQUEST, then streams the file back in acknowledged
/// windows through the local emulator.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port on which the sender waits for requests.
    #[arg(short = 'p')]
    port: u16,

    /// Port on which the requester is waiting (legacy; the request's
    /// routing header is authoritative).
    #[arg(short = 'g')]
    requester_port: u16,

    /// Packets to send per second.
    #[arg(short = 'r')]
    rate: u32,

    /// Initial sequence number of the packet exchange.
    #[arg(short = 'q')]
    initial_seq: u32,

    /// Payload length in bytes per DATA packet.
    #[arg(short = 'l')]
    length: usize,

    /// Host name of the local emulator.
    #[arg(short = 'f')]
    emulator_host: String,

    /// Port of the local emulator.
    #[arg(short = 'e')]
    emulator_port: u16,

    /// Priority of the sent packets (1, 2, or 3).
    #[arg(short = 'i')]
    priority: u8,

    /// Retransmission timeout for lost packets, in milliseconds.
    #[arg(short = 't')]
    timeout_ms: u64,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(summary) => {
            print_summary(&summary);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "sender failed");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<SessionSummary, Box<dyn Error>> {
    let priority =
        Priority::from_level(args.priority).ok_or("priority must be 1, 2, or 3")?;
    let config = SenderConfig {
        listen_port: args.port,
        requester_port: args.requester_port,
        rate: args.rate,
        initial_seq: args.initial_seq,
        payload_len: args.length,
        emulator: NodeAddr::resolve(&args.emulator_host, args.emulator_port)?,
        priority,
        ack_timeout: Duration::from_millis(args.timeout_ms),
    };
    Ok(sender::run(&config)?)
}

fn print_summary(summary: &SessionSummary) {
    println!("Summary");
    println!("  requester addr: {}", summary.peer);
    println!("  total packets sent: {}", summary.packets_sent);
    println!("  total retransmits: {}", summary.retransmits);
    println!("  loss rate: {:.2} %", summary.loss_rate() * 100.0);
}
