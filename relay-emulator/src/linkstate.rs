use crate::error::{EmulatorError, EmulatorResult};
use crate::routing::{NextHop, compute_routes};
use crate::topology::{Adjacency, Topology};
use relay_wire::{ControlKind, ControlPacket, NodeAddr};
use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// How often a node beacons HELLO to its live neighbors.
pub const HELLO_INTERVAL: Duration = Duration::from_millis(1500);
/// How often a node floods a fresh link-state message.
pub const LSM_INTERVAL: Duration = Duration::from_millis(1500);
/// Silence after which a neighbor is declared down.
pub const NEIGHBOR_TIMEOUT: Duration = Duration::from_millis(3500);

/// One emulator's view of the link-state protocol.
///
/// A pure state machine: the driver feeds it received control packets and
/// periodic `tick`s, and it answers with `(packet, destination)` pairs to
/// put on the wire. Route recomputation happens on every adjacency change.
pub struct LinkStateNode {
    self_addr: NodeAddr,
    adjacency: Adjacency,
    /// Last HELLO arrival per live direct neighbor.
    alive: BTreeMap<NodeAddr, Instant>,
    /// Highest LSM sequence accepted per remote node.
    seq_seen: BTreeMap<NodeAddr, u32>,
    local_seq: u32,
    ttl_init: u32,
    routes: BTreeMap<NodeAddr, NextHop>,
    last_hello: Option<Instant>,
    last_lsm: Option<Instant>,
}

impl LinkStateNode {
    /// Builds the node from the static topology. Configured neighbors start
    /// out provisionally alive; the liveness sweep reaps any that never
    /// actually beacon.
    pub fn new(self_addr: NodeAddr, topology: Topology, now: Instant) -> EmulatorResult<Self> {
        let adjacency = topology.adjacency;
        let neighbors = adjacency
            .get(&self_addr)
            .cloned()
            .ok_or(EmulatorError::NotInTopology(self_addr))?;

        let ttl_init = adjacency.len() as u32 + 1;
        let alive = neighbors.iter().map(|&n| (n, now)).collect();
        let routes = compute_routes(self_addr, &adjacency);

        Ok(Self {
            self_addr,
            adjacency,
            alive,
            seq_seen: BTreeMap::new(),
            local_seq: 0,
            ttl_init,
            routes,
            last_hello: None,
            last_lsm: None,
        })
    }

    pub fn self_addr(&self) -> NodeAddr {
        self.self_addr
    }

    /// The current forwarding table.
    pub fn routes(&self) -> &BTreeMap<NodeAddr, NextHop> {
        &self.routes
    }

    /// Next hop toward `dest`; `Offline` when unknown or unreachable.
    pub fn route_to(&self, dest: NodeAddr) -> NextHop {
        self.routes.get(&dest).copied().unwrap_or(NextHop::Offline)
    }

    /// The live direct neighbors, in address order.
    pub fn live_neighbors(&self) -> Vec<NodeAddr> {
        self.alive.keys().copied().collect()
    }

    /// Drives periodic work: the liveness sweep, HELLO beacons, and LSM
    /// floods. Returns the packets to transmit.
    pub fn tick(&mut self, now: Instant) -> Vec<(ControlPacket, NodeAddr)> {
        let mut out = Vec::new();

        let dead: Vec<NodeAddr> = self
            .alive
            .iter()
            .filter(|&(_, &last)| now.duration_since(last) > NEIGHBOR_TIMEOUT)
            .map(|(&neighbor, _)| neighbor)
            .collect();
        if !dead.is_empty() {
            for neighbor in &dead {
                warn!(%neighbor, "neighbor timed out");
                self.alive.remove(neighbor);
                if let Some(set) = self.adjacency.get_mut(&self.self_addr) {
                    set.remove(neighbor);
                }
                if let Some(set) = self.adjacency.get_mut(neighbor) {
                    set.remove(&self.self_addr);
                }
            }
            self.rebuild_routes();
            out.extend(self.flood_own_lsm());
        }

        if self.due(self.last_hello, HELLO_INTERVAL, now) {
            self.last_hello = Some(now);
            for neighbor in self.live_neighbors() {
                out.push((ControlPacket::hello(self.self_addr), neighbor));
            }
        }

        if self.due(self.last_lsm, LSM_INTERVAL, now) {
            self.last_lsm = Some(now);
            out.extend(self.flood_own_lsm());
        }

        out
    }

    /// Handles one received control packet. `from` is the datagram's socket
    /// source, used to exclude the arrival link when reflooding.
    pub fn handle_control(
        &mut self,
        packet: ControlPacket,
        from: NodeAddr,
        now: Instant,
    ) -> EmulatorResult<Vec<(ControlPacket, NodeAddr)>> {
        match packet.kind {
            ControlKind::Hello => Ok(self.on_hello(packet.source, now)),
            ControlKind::Lsm => self.on_lsm(packet, from),
            ControlKind::Trace => Ok(self.on_trace(packet, from)),
        }
    }

    fn on_hello(&mut self, source: NodeAddr, now: Instant) -> Vec<(ControlPacket, NodeAddr)> {
        self.alive.insert(source, now);

        let known = self
            .adjacency
            .get(&self.self_addr)
            .is_some_and(|set| set.contains(&source));
        if !known {
            info!(neighbor = %source, "neighbor up");
            self.adjacency
                .entry(self.self_addr)
                .or_default()
                .insert(source);
            self.adjacency
                .entry(source)
                .or_default()
                .insert(self.self_addr);
            // A returning neighbor restarts its sequence space.
            self.seq_seen.insert(source, 0);
            self.rebuild_routes();
        }
        Vec::new()
    }

    fn on_lsm(
        &mut self,
        packet: ControlPacket,
        from: NodeAddr,
    ) -> EmulatorResult<Vec<(ControlPacket, NodeAddr)>> {
        if packet.source == self.self_addr {
            return Ok(Vec::new());
        }
        if !self.adjacency.contains_key(&packet.source) {
            return Err(EmulatorError::UnknownLsmSource(packet.source));
        }
        if packet.ttl == 0 {
            return Ok(Vec::new());
        }
        let seen = self.seq_seen.get(&packet.source).copied().unwrap_or(0);
        if seen >= packet.seq_num {
            debug!(source = %packet.source, seq = packet.seq_num, "suppressed stale LSM");
            return Ok(Vec::new());
        }
        self.seq_seen.insert(packet.source, packet.seq_num);

        let advertised: BTreeSet<NodeAddr> = packet.neighbors.iter().copied().collect();
        if self.adjacency.get(&packet.source) != Some(&advertised) {
            debug!(source = %packet.source, "adjacency changed, recomputing routes");
            self.adjacency.insert(packet.source, advertised);
            self.rebuild_routes();
        }

        let mut relay = packet;
        relay.ttl -= 1;
        Ok(self
            .live_neighbors()
            .into_iter()
            .filter(|&neighbor| neighbor != from)
            .map(|neighbor| (relay.clone(), neighbor))
            .collect())
    }

    /// TRACE handling: forward while TTL lasts, answer once it hits zero.
    ///
    /// A probe hands its packet to the trace's source emulator, which puts
    /// it on the path untouched; TTL accounting starts at the next hop, so
    /// the first reply names the hop *after* the source. The reply carries
    /// this emulator as its source (the probe prints it and terminates when
    /// it equals the trace destination) and goes straight back to the
    /// originator, which lives outside the routed topology.
    fn on_trace(&mut self, packet: ControlPacket, from: NodeAddr) -> Vec<(ControlPacket, NodeAddr)> {
        let Some(dest) = packet.destination else {
            warn!(source = %packet.source, "TRACE without destination");
            return Vec::new();
        };

        let from_probe = !self.adjacency.contains_key(&from);
        if from_probe || packet.ttl > 0 {
            let mut forwarded = packet;
            if !from_probe {
                forwarded.ttl -= 1;
            }
            match self.route_to(dest) {
                NextHop::Via(hop) => return vec![(forwarded, hop)],
                NextHop::Offline => {
                    warn!(%dest, "trace destination offline");
                    return Vec::new();
                }
            }
        }

        let reply = ControlPacket::trace(self.self_addr, 0, packet.source);
        vec![(reply, packet.source)]
    }

    /// Floods this node's own link-state to every live neighbor.
    fn flood_own_lsm(&mut self) -> Vec<(ControlPacket, NodeAddr)> {
        self.local_seq += 1;
        let neighbors: Vec<NodeAddr> = self
            .adjacency
            .get(&self.self_addr)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        let lsm = ControlPacket::lsm(self.self_addr, self.local_seq, self.ttl_init, neighbors);
        self.live_neighbors()
            .into_iter()
            .map(|neighbor| (lsm.clone(), neighbor))
            .collect()
    }

    fn rebuild_routes(&mut self) {
        self.routes = compute_routes(self.self_addr, &self.adjacency);
    }

    fn due(&self, last: Option<Instant>, interval: Duration, now: Instant) -> bool {
        last.is_none_or(|t| now.duration_since(t) >= interval)
    }
}
