use relay_emulator::{EmulatorError, ForwardingRules, Topology};
use relay_wire::NodeAddr;
use std::io::Write;
use std::net::Ipv4Addr;
use std::time::Duration;
use tempfile::NamedTempFile;

fn file_with(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

fn addr(port: u16) -> NodeAddr {
    NodeAddr::new(Ipv4Addr::LOCALHOST, port)
}

#[test]
fn test_rules_load_only_own_rows() {
    let file = file_with(
        "127.0.0.1 4000 127.0.0.1 5000 127.0.0.1 5000 10 5\n\
         127.0.0.1 4000 127.0.0.1 6000 127.0.0.1 7000 0 0\n\
         127.0.0.1 9999 127.0.0.1 5000 127.0.0.1 5000 10 5\n",
    );
    let rules = ForwardingRules::load(file.path(), addr(4000)).unwrap();

    assert_eq!(rules.len(), 2);
    let route = rules.lookup(addr(5000)).unwrap();
    assert_eq!(route.next_hop, addr(5000));
    assert_eq!(route.delay, Duration::from_millis(10));
    assert_eq!(route.loss_percent, 5);
    assert!(rules.lookup(addr(9999)).is_none());
}

#[test]
fn test_rules_skip_foreign_rows_without_resolving() {
    // A row for another emulator may name a host this machine cannot
    // resolve; it must not break the load.
    let file = file_with(
        "no-such-host-xyz 4001 127.0.0.1 5000 127.0.0.1 5000 0 0\n\
         127.0.0.1 4000 127.0.0.1 5000 127.0.0.1 5000 0 0\n",
    );
    let rules = ForwardingRules::load(file.path(), addr(4000)).unwrap();
    assert_eq!(rules.len(), 1);
}

#[test]
fn test_rules_reject_bad_rows() {
    let short = file_with("127.0.0.1 4000 127.0.0.1 5000\n");
    assert!(matches!(
        ForwardingRules::load(short.path(), addr(4000)),
        Err(EmulatorError::Config { line: 1, .. })
    ));

    let bad_loss = file_with("127.0.0.1 4000 127.0.0.1 5000 127.0.0.1 5000 10 101\n");
    assert!(matches!(
        ForwardingRules::load(bad_loss.path(), addr(4000)),
        Err(EmulatorError::Config { .. })
    ));

    let bad_delay = file_with("127.0.0.1 4000 127.0.0.1 5000 127.0.0.1 5000 soon 0\n");
    assert!(matches!(
        ForwardingRules::load(bad_delay.path(), addr(4000)),
        Err(EmulatorError::Config { .. })
    ));
}

#[test]
fn test_topology_round_trip() {
    let file = file_with(
        "127.0.0.1,1 127.0.0.1,2 127.0.0.1,5\n\
         127.0.0.1,2 127.0.0.1,1 127.0.0.1,3\n\
         127.0.0.1,3 127.0.0.1,2\n\
         127.0.0.1,5 127.0.0.1,1\n\
         \n",
    );
    let topology = Topology::load(file.path()).unwrap();

    assert_eq!(topology.node_count(), 4);
    let neighbors = &topology.adjacency[&addr(1)];
    assert!(neighbors.contains(&addr(2)));
    assert!(neighbors.contains(&addr(5)));
    assert_eq!(topology.adjacency[&addr(3)].len(), 1);
}

#[test]
fn test_topology_rejects_bad_address() {
    let file = file_with("127.0.0.1,1 127.0.0.1\n");
    assert!(matches!(
        Topology::load(file.path()),
        Err(EmulatorError::Config { line: 1, .. })
    ));
}
