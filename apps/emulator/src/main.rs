use clap::Parser;
use std::error::Error;
use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod control_plane;
mod data_plane;

/// Network emulator.
///
/// With `-q` it runs the static data plane: three bounded priority queues,
/// per-destination delay, and probabilistic loss, forwarding by a rules
/// file. Without `-q` it runs the link-state control plane over a topology
/// file.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port of the emulator.
    #[arg(short = 'p')]
    port: u16,

    /// Size of each of the three priority queues; selects data-plane mode.
    #[arg(short = 'q', requires = "log_file")]
    queue_size: Option<usize>,

    /// Forwarding-rules file (data plane) or topology file (control plane).
    #[arg(short = 'f')]
    table: PathBuf,

    /// Log file for data-plane drop events.
    #[arg(short = 'l')]
    log_file: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("emulator failed: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), Box<dyn Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match (args.queue_size, &args.log_file) {
        (Some(queue_size), Some(log_file)) => {
            let log = Arc::new(File::create(log_file)?);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(log)
                .with_ansi(false)
                .init();
            data_plane::run(args.port, queue_size, &args.table)
        }
        _ => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
            control_plane::run(args.port, &args.table)
        }
    }
}
