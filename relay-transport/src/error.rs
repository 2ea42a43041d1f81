use relay_wire::{AddrError, WireError};
use std::io;
use thiserror::Error;

/// Errors that can occur in the reliable transport layer.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("io: {0}")]
    Io(#[from] io::Error),
    #[error("wire: {0}")]
    Wire(#[from] WireError),
    #[error("address: {0}")]
    Addr(#[from] AddrError),
    #[error("no request arrived within 60 s")]
    RequestTimeout,
    #[error("no datagram arrived within 60 s of an open session")]
    SessionTimeout,
    #[error("payload length must be at least 1 byte")]
    InvalidPayloadLength,
    #[error("request payload is not a UTF-8 filename")]
    BadFilename,
    #[error("tracker {path}:{line}: {reason}")]
    Tracker {
        path: String,
        line: usize,
        reason: String,
    },
    #[error("tracker lists no peers for {0:?}")]
    NoPeers(String),
}

pub type TransportResult<T> = Result<T, TransportError>;
