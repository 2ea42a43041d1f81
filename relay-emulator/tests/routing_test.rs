use proptest::prelude::*;
use relay_emulator::{Adjacency, NextHop, compute_routes};
use relay_wire::NodeAddr;
use std::collections::BTreeSet;
use std::net::Ipv4Addr;

fn addr(port: u16) -> NodeAddr {
    NodeAddr::new(Ipv4Addr::LOCALHOST, port)
}

fn graph(edges: &[(u16, u16)]) -> Adjacency {
    let mut adjacency = Adjacency::new();
    for &(a, b) in edges {
        adjacency.entry(addr(a)).or_default().insert(addr(b));
        adjacency.entry(addr(b)).or_default().insert(addr(a));
    }
    adjacency
}

#[test]
fn test_line_routes_through_first_hop() {
    // 1 - 2 - 3 - 4
    let adjacency = graph(&[(1, 2), (2, 3), (3, 4)]);
    let routes = compute_routes(addr(1), &adjacency);

    assert_eq!(routes[&addr(2)], NextHop::Via(addr(2)));
    assert_eq!(routes[&addr(3)], NextHop::Via(addr(2)));
    assert_eq!(routes[&addr(4)], NextHop::Via(addr(2)));
    assert!(!routes.contains_key(&addr(1)), "no route to self");
}

#[test]
fn test_ring_splits_both_ways() {
    // 1 - 2 - 3 - 4 - 5 - 1
    let adjacency = graph(&[(1, 2), (2, 3), (3, 4), (4, 5), (5, 1)]);
    let routes = compute_routes(addr(1), &adjacency);

    assert_eq!(routes[&addr(2)], NextHop::Via(addr(2)));
    assert_eq!(routes[&addr(3)], NextHop::Via(addr(2)));
    assert_eq!(routes[&addr(5)], NextHop::Via(addr(5)));
    assert_eq!(routes[&addr(4)], NextHop::Via(addr(5)));
}

#[test]
fn test_equal_cost_tie_breaks_toward_lowest_address() {
    // Two 2-hop paths to 4: via 2 and via 3.
    let adjacency = graph(&[(1, 2), (1, 3), (2, 4), (3, 4)]);
    let routes = compute_routes(addr(1), &adjacency);
    assert_eq!(routes[&addr(4)], NextHop::Via(addr(2)));
}

#[test]
fn test_unreachable_nodes_are_offline() {
    let adjacency = graph(&[(1, 2), (3, 4)]);
    let routes = compute_routes(addr(1), &adjacency);

    assert_eq!(routes[&addr(2)], NextHop::Via(addr(2)));
    assert_eq!(routes[&addr(3)], NextHop::Offline);
    assert_eq!(routes[&addr(4)], NextHop::Offline);
}

#[test]
fn test_isolated_origin_sees_everything_offline() {
    let mut adjacency = graph(&[(2, 3)]);
    adjacency.entry(addr(1)).or_default();
    let routes = compute_routes(addr(1), &adjacency);
    assert!(routes.values().all(|hop| *hop == NextHop::Offline));
}

#[test]
fn test_determinism_across_runs() {
    let adjacency = graph(&[(1, 2), (1, 3), (2, 4), (3, 4), (4, 5), (2, 5)]);
    let first = compute_routes(addr(1), &adjacency);
    for _ in 0..10 {
        assert_eq!(compute_routes(addr(1), &adjacency), first);
    }
}

fn hop_count(adjacency: &Adjacency, from: NodeAddr, to: NodeAddr) -> Option<usize> {
    use std::collections::VecDeque;
    let mut seen = BTreeSet::from([from]);
    let mut frontier = VecDeque::from([(from, 0)]);
    while let Some((node, dist)) = frontier.pop_front() {
        if node == to {
            return Some(dist);
        }
        if let Some(neighbors) = adjacency.get(&node) {
            for &next in neighbors {
                if seen.insert(next) {
                    frontier.push_back((next, dist + 1));
                }
            }
        }
    }
    None
}

proptest! {
    /// On random connected-ish graphs, every reachable destination's next
    /// hop is a direct neighbor of the origin that lies on a shortest path.
    #[test]
    fn next_hop_is_a_neighbor_on_a_shortest_path(
        edges in proptest::collection::vec((1u16..=12, 1u16..=12), 1..40)
    ) {
        let edges: Vec<(u16, u16)> = edges.into_iter().filter(|(a, b)| a != b).collect();
        prop_assume!(!edges.is_empty());
        let adjacency = graph(&edges);
        let origin = *adjacency.keys().next().unwrap();
        let routes = compute_routes(origin, &adjacency);

        for (&dest, &hop) in &routes {
            match hop {
                NextHop::Offline => prop_assert!(hop_count(&adjacency, origin, dest).is_none()),
                NextHop::Via(via) => {
                    prop_assert!(adjacency[&origin].contains(&via), "next hop must be adjacent");
                    let total = hop_count(&adjacency, origin, dest).unwrap();
                    if via == dest {
                        prop_assert_eq!(total, 1);
                    } else {
                        let rest = hop_count(&adjacency, via, dest).unwrap();
                        prop_assert_eq!(rest + 1, total, "first hop must stay on a shortest path");
                    }
                }
            }
        }
    }
}
