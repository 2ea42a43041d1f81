use crate::error::{EmulatorError, EmulatorResult};
use relay_wire::NodeAddr;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// One static forwarding rule: where datagrams for `dest` go next, and what
/// the link to them looks like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticRoute {
    pub dest: NodeAddr,
    pub next_hop: NodeAddr,
    pub delay: Duration,
    /// Probability of dropping a delayed packet, in whole percent.
    pub loss_percent: u8,
}

/// The static forwarding table of a data-plane emulator.
///
/// Loaded once at startup and never mutated while the plane runs.
#[derive(Debug, Clone, Default)]
pub struct ForwardingRules {
    routes: Vec<StaticRoute>,
}

impl ForwardingRules {
    pub fn new(routes: Vec<StaticRoute>) -> Self {
        Self { routes }
    }

    /// Loads the rules file, keeping only rows whose first two fields match
    /// `identity`.
    ///
    /// Row format, whitespace-separated:
    /// `self_host self_port dest_host dest_port next_hop_host next_hop_port
    /// delay_ms loss_percent`.
    pub fn load(path: &Path, identity: NodeAddr) -> EmulatorResult<Self> {
        let text = fs::read_to_string(path)?;
        let mut routes = Vec::new();

        for (index, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let config_err = |reason: String| EmulatorError::Config {
                path: path.display().to_string(),
                line: index + 1,
                reason,
            };

            let fields: Vec<&str> = line.split_whitespace().collect();
            let [self_host, self_port, dest_host, dest_port, hop_host, hop_port, delay, loss] =
                fields.as_slice()
            else {
                return Err(config_err(format!("expected 8 fields, got {}", fields.len())));
            };

            // Cheap port comparison first so foreign rows with unresolvable
            // hosts do not fail the load.
            let self_port: u16 = self_port
                .parse()
                .map_err(|_| config_err(format!("bad port {self_port:?}")))?;
            if self_port != identity.port {
                continue;
            }
            let row_identity = NodeAddr::resolve(self_host, self_port)
                .map_err(|e| config_err(e.to_string()))?;
            if row_identity != identity {
                continue;
            }

            let parse_port = |s: &str| -> EmulatorResult<u16> {
                s.parse().map_err(|_| config_err(format!("bad port {s:?}")))
            };
            let dest = NodeAddr::resolve(dest_host, parse_port(dest_port)?)
                .map_err(|e| config_err(e.to_string()))?;
            let next_hop = NodeAddr::resolve(hop_host, parse_port(hop_port)?)
                .map_err(|e| config_err(e.to_string()))?;
            let delay_ms: u64 = delay
                .parse()
                .map_err(|_| config_err(format!("bad delay {delay:?}")))?;
            let loss_percent: u8 = loss
                .parse()
                .ok()
                .filter(|&p| p <= 100)
                .ok_or_else(|| config_err(format!("bad loss percentage {loss:?}")))?;

            routes.push(StaticRoute {
                dest,
                next_hop,
                delay: Duration::from_millis(delay_ms),
                loss_percent,
            });
        }

        Ok(Self { routes })
    }

    pub fn lookup(&self, dest: NodeAddr) -> Option<&StaticRoute> {
        self.routes.iter().find(|route| route.dest == dest)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
