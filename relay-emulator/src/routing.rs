use crate::topology::Adjacency;
use relay_wire::NodeAddr;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Next-hop resolution for one destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextHop {
    /// The direct neighbor on a shortest path to the destination.
    Via(NodeAddr),
    /// The destination is currently unreachable.
    Offline,
}

/// Computes the forwarding table: for every known node other than `origin`,
/// the first hop on a shortest path from `origin`.
///
/// Breadth-first search over the adjacency map with unit edge cost. Neighbor
/// iteration follows the ordered set, so shortest-path ties always break the
/// same way: toward the lowest address.
pub fn compute_routes(origin: NodeAddr, adjacency: &Adjacency) -> BTreeMap<NodeAddr, NextHop> {
    // Every node the topology mentions starts out unreachable.
    let mut routes: BTreeMap<NodeAddr, NextHop> = adjacency
        .keys()
        .copied()
        .chain(adjacency.values().flatten().copied())
        .filter(|&node| node != origin)
        .map(|node| (node, NextHop::Offline))
        .collect();

    let mut visited: BTreeSet<NodeAddr> = BTreeSet::from([origin]);
    let mut first_hop: BTreeMap<NodeAddr, NodeAddr> = BTreeMap::new();
    let mut frontier: VecDeque<NodeAddr> = VecDeque::from([origin]);

    while let Some(node) = frontier.pop_front() {
        let Some(neighbors) = adjacency.get(&node) else {
            continue;
        };
        for &next in neighbors {
            if !visited.insert(next) {
                continue;
            }
            let hop = if node == origin {
                next
            } else {
                first_hop[&node]
            };
            first_hop.insert(next, hop);
            routes.insert(next, NextHop::Via(hop));
            frontier.push_back(next);
        }
    }

    routes
}
