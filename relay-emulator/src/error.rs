use relay_wire::{AddrError, ControlError, NodeAddr};
use std::io;
use thiserror::Error;

/// Errors that can occur in either emulator plane.
#[derive(Debug, Error)]
pub enum EmulatorError {
    #[error("io: {0}")]
    Io(#[from] io::Error),
    #[error("address: {0}")]
    Addr(#[from] AddrError),
    #[error("control codec: {0}")]
    Control(#[from] ControlError),
    #[error("{path}:{line}: {reason}")]
    Config {
        path: String,
        line: usize,
        reason: String,
    },
    #[error("link-state message from unknown source {0}")]
    UnknownLsmSource(NodeAddr),
    #[error("this emulator {0} does not appear in the topology file")]
    NotInTopology(NodeAddr),
}

pub type EmulatorResult<T> = Result<T, EmulatorError>;
