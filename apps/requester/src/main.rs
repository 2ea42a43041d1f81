use clap::Parser;
use relay_transport::requester::{self, PeerSummary, RequesterConfig};
use relay_wire::{NodeAddr, local_ipv4};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Requests a file from its tracked senders through the local emulator.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port on which the requester waits for packets.
    #[arg(short = 'p')]
    port: u16,

    /// Name of the file to request.
    #[arg(short = 'o')]
    file: String,

    /// Host name of the local emulator.
    #[arg(short = 'f')]
    emulator_host: String,

    /// Port of the local emulator.
    #[arg(short = 'e')]
    emulator_port: u16,

    /// Window size advertised to senders.
    #[arg(short = 'w')]
    window: u32,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(summaries) => {
            for summary in &summaries {
                print_summary(summary);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "requester failed");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<Vec<PeerSummary>, Box<dyn Error>> {
    let emulator = NodeAddr::resolve(&args.emulator_host, args.emulator_port)?;
    let config = RequesterConfig {
        listen: NodeAddr::new(local_ipv4(), args.port),
        filename: args.file.clone(),
        output_path: PathBuf::from(&args.file),
        emulator,
        window: args.window,
        tracker_path: PathBuf::from("tracker.txt"),
    };
    Ok(requester::run(&config)?)
}

fn print_summary(summary: &PeerSummary) {
    println!("Summary");
    println!("  sender addr: {}", summary.peer);
    println!("  total DATA packets: {}", summary.data_packets);
    println!("  total DATA bytes: {}", summary.data_bytes);
    println!(
        "  average packets/second: {:.0}",
        summary.packets_per_second()
    );
    println!("  duration of the test: {} ms", summary.duration.as_millis());
}
