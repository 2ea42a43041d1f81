use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, ToSocketAddrs, UdpSocket};
use std::str::FromStr;
use thiserror::Error;

/// Errors produced while resolving or parsing node addresses.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddrError {
    #[error("cannot resolve host {0:?} to an IPv4 address")]
    Unresolved(String),
    #[error("invalid port in {0:?}")]
    BadPort(String),
    #[error("expected `host,port` or `host:port`, got {0:?}")]
    BadFormat(String),
}

/// A node identity on the wire: an IPv4 address plus UDP port.
///
/// Emulators, senders, and requesters are all addressed this way. Equality is
/// structural, and the derived total order (address, then port) is the
/// deterministic iteration key used when computing routes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct NodeAddr {
    pub ip: Ipv4Addr,
    pub port: u16,
}

impl NodeAddr {
    pub fn new(ip: Ipv4Addr, port: u16) -> Self {
        Self { ip, port }
    }

    /// Resolves `host` via the system resolver and pairs it with `port`.
    ///
    /// Only IPv4 results are considered; the first one wins.
    pub fn resolve(host: &str, port: u16) -> Result<Self, AddrError> {
        let candidates = (host, port)
            .to_socket_addrs()
            .map_err(|_| AddrError::Unresolved(host.to_owned()))?;
        for candidate in candidates {
            if let SocketAddr::V4(v4) = candidate {
                return Ok(Self::new(*v4.ip(), port));
            }
        }
        Err(AddrError::Unresolved(host.to_owned()))
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(self.ip, self.port))
    }
}

impl From<SocketAddrV4> for NodeAddr {
    fn from(addr: SocketAddrV4) -> Self {
        Self::new(*addr.ip(), addr.port())
    }
}

impl fmt::Display for NodeAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ip, self.port)
    }
}

/// Parses the `host,port` form used by topology files, as well as the
/// conventional `host:port`.
impl FromStr for NodeAddr {
    type Err = AddrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, port) = s
            .split_once(',')
            .or_else(|| s.split_once(':'))
            .ok_or_else(|| AddrError::BadFormat(s.to_owned()))?;
        let port: u16 = port
            .trim()
            .parse()
            .map_err(|_| AddrError::BadPort(s.to_owned()))?;
        Self::resolve(host.trim(), port)
    }
}

/// Best-effort discovery of the local IPv4 address.
///
/// Routes a throwaway datagram socket toward a documentation address (nothing
/// is transmitted) and reads back the source address the kernel picked. Hosts
/// with no route fall back to loopback.
pub fn local_ipv4() -> Ipv4Addr {
    fn probe() -> Option<Ipv4Addr> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).ok()?;
        socket.connect(("203.0.113.1", 9)).ok()?;
        match socket.local_addr().ok()? {
            SocketAddr::V4(v4) if !v4.ip().is_unspecified() => Some(*v4.ip()),
            _ => None,
        }
    }
    probe().unwrap_or(Ipv4Addr::LOCALHOST)
}
