use crate::error::{EmulatorError, EmulatorResult};
use relay_wire::NodeAddr;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

/// Adjacency map over the whole network: every known node to its direct
/// neighbor set. Ordered maps keep neighbor iteration deterministic, which
/// route computation relies on for reproducible tie-breaking.
pub type Adjacency = BTreeMap<NodeAddr, BTreeSet<NodeAddr>>;

/// The static topology read at control-plane startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    pub adjacency: Adjacency,
}

impl Topology {
    pub fn new(adjacency: Adjacency) -> Self {
        Self { adjacency }
    }

    /// Loads a topology file of whitespace-separated rows
    /// `node neighbor1 neighbor2 …`, each address in `host,port` form. The
    /// first field names the node whose neighbor set the row defines.
    pub fn load(path: &Path) -> EmulatorResult<Self> {
        let text = fs::read_to_string(path)?;
        let mut adjacency = Adjacency::new();

        for (index, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let config_err = |reason: String| EmulatorError::Config {
                path: path.display().to_string(),
                line: index + 1,
                reason,
            };

            let mut fields = line.split_whitespace();
            let Some(first) = fields.next() else {
                continue;
            };
            let node: NodeAddr = first
                .parse()
                .map_err(|e: relay_wire::AddrError| config_err(e.to_string()))?;
            let mut neighbors = BTreeSet::new();
            for field in fields {
                let neighbor: NodeAddr = field
                    .parse()
                    .map_err(|e: relay_wire::AddrError| config_err(e.to_string()))?;
                neighbors.insert(neighbor);
            }
            adjacency.insert(node, neighbors);
        }

        Ok(Self { adjacency })
    }

    /// Number of nodes in the topology.
    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }
}
