use rand::SeedableRng;
use rand::rngs::StdRng;
use relay_emulator::{
    DropReason, ForwardingPlane, ForwardingRules, PlaneEvent, StaticRoute,
};
use relay_wire::{NodeAddr, PacketKind, Priority, SegmentHeader, wire};
use std::net::Ipv4Addr;
use std::time::{Duration, Instant};

fn addr(port: u16) -> NodeAddr {
    NodeAddr::new(Ipv4Addr::LOCALHOST, port)
}

fn route(dest: u16, next_hop: u16, delay_ms: u64, loss_percent: u8) -> StaticRoute {
    StaticRoute {
        dest: addr(dest),
        next_hop: addr(next_hop),
        delay: Duration::from_millis(delay_ms),
        loss_percent,
    }
}

fn datagram(priority: Priority, dest: u16, kind: PacketKind, payload: &[u8]) -> Vec<u8> {
    wire::encode(
        priority,
        addr(1000),
        addr(dest),
        SegmentHeader {
            kind,
            seq: 1,
            length_or_window: payload.len() as u32,
        },
        payload,
    )
}

fn plane(routes: Vec<StaticRoute>, capacity: usize) -> ForwardingPlane {
    ForwardingPlane::new(ForwardingRules::new(routes), capacity, StdRng::seed_from_u64(7))
}

#[test]
fn test_forwards_to_next_hop_without_delay() {
    let now = Instant::now();
    let mut plane = plane(vec![route(2000, 3000, 0, 0)], 10);

    let packet = datagram(Priority::High, 2000, PacketKind::Data, b"abc");
    plane.accept(&packet, now);
    let (sent, next_hop) = plane.poll_transmit(now).expect("zero delay forwards at once");
    assert_eq!(sent, packet);
    assert_eq!(next_hop, addr(3000));
    assert!(matches!(
        plane.poll_event(),
        Some(PlaneEvent::Forwarded { .. })
    ));
}

#[test]
fn test_delay_holds_the_packet() {
    let now = Instant::now();
    let mut plane = plane(vec![route(2000, 3000, 50, 0)], 10);

    plane.accept(&datagram(Priority::High, 2000, PacketKind::Data, b"x"), now);
    assert!(plane.poll_transmit(now).is_none());
    assert!(
        plane
            .poll_transmit(now + Duration::from_millis(49))
            .is_none()
    );
    assert!(
        plane
            .poll_transmit(now + Duration::from_millis(50))
            .is_some()
    );
}

#[test]
fn test_malformed_datagram_is_dropped() {
    let now = Instant::now();
    let mut plane = plane(vec![route(2000, 3000, 0, 0)], 10);

    plane.accept(b"garbage", now);
    match plane.poll_event() {
        Some(PlaneEvent::Dropped(record)) => {
            assert_eq!(record.reason, DropReason::Malformed);
            assert_eq!(record.payload_len, 7);
        }
        other => panic!("expected a drop event, got {other:?}"),
    }
    assert!(plane.poll_transmit(now).is_none());
}

#[test]
fn test_unroutable_destination_is_dropped() {
    let now = Instant::now();
    let mut plane = plane(vec![route(2000, 3000, 0, 0)], 10);

    plane.accept(&datagram(Priority::Low, 9999, PacketKind::Data, b"x"), now);
    match plane.poll_event() {
        Some(PlaneEvent::Dropped(record)) => {
            assert_eq!(record.reason, DropReason::NoRoute);
            assert_eq!(record.dest, Some(addr(9999)));
        }
        other => panic!("expected a drop event, got {other:?}"),
    }
}

#[test]
fn test_queue_full_drops_data_but_not_end() {
    let now = Instant::now();
    let mut plane = plane(vec![route(2000, 3000, 100, 0)], 2);

    plane.accept(&datagram(Priority::Low, 2000, PacketKind::Data, b"1"), now);
    plane.accept(&datagram(Priority::Low, 2000, PacketKind::Data, b"2"), now);
    assert_eq!(plane.queue_len(Priority::Low), 2);

    // Queue is full: DATA drops, END survives in the reserved slot.
    plane.accept(&datagram(Priority::Low, 2000, PacketKind::Data, b"3"), now);
    plane.accept(&datagram(Priority::Low, 2000, PacketKind::End, b""), now);
    assert_eq!(plane.queue_len(Priority::Low), 2);

    let drops: Vec<_> = std::iter::from_fn(|| plane.poll_event()).collect();
    let queue_full: Vec<_> = drops
        .iter()
        .filter(|event| {
            matches!(
                event,
                PlaneEvent::Dropped(record) if record.reason == DropReason::QueueFull
            )
        })
        .collect();
    assert_eq!(queue_full.len(), 1, "only the DATA overflow drops");

    // The END parked in the reserved slot still comes out.
    let mut kinds = Vec::new();
    let mut at = now + Duration::from_millis(100);
    while let Some((packet, _)) = plane.poll_transmit(at) {
        kinds.push(wire::decode(&packet).unwrap().segment.kind);
        at += Duration::from_millis(100);
    }
    assert!(kinds.contains(&PacketKind::End));
}

#[test]
fn test_strict_priority_order() {
    let now = Instant::now();
    let mut plane = plane(vec![route(2000, 3000, 0, 0)], 10);

    plane.accept(&datagram(Priority::Low, 2000, PacketKind::Data, b"low"), now);
    plane.accept(&datagram(Priority::Medium, 2000, PacketKind::Data, b"med"), now);
    plane.accept(&datagram(Priority::High, 2000, PacketKind::Data, b"high"), now);

    let mut order = Vec::new();
    while let Some((packet, _)) = plane.poll_transmit(now) {
        order.push(wire::decode(&packet).unwrap().route.priority);
    }
    assert_eq!(order, vec![Priority::High, Priority::Medium, Priority::Low]);
}

#[test]
fn test_end_slot_drains_ahead_of_low_priority() {
    let now = Instant::now();
    let mut plane = plane(vec![route(2000, 3000, 0, 0)], 1);

    plane.accept(&datagram(Priority::Low, 2000, PacketKind::Data, b"d"), now);
    // Low queue is now full; the END overflows into the reserved slot.
    plane.accept(&datagram(Priority::Low, 2000, PacketKind::End, b""), now);

    let (first, _) = plane.poll_transmit(now).unwrap();
    assert_eq!(wire::decode(&first).unwrap().segment.kind, PacketKind::End);
    let (second, _) = plane.poll_transmit(now).unwrap();
    assert_eq!(wire::decode(&second).unwrap().segment.kind, PacketKind::Data);
}

#[test]
fn test_certain_loss_drops_data() {
    let now = Instant::now();
    let mut plane = plane(vec![route(2000, 3000, 0, 100)], 10);

    plane.accept(&datagram(Priority::High, 2000, PacketKind::Data, b"x"), now);
    assert!(plane.poll_transmit(now).is_none());
    let drops: Vec<_> = std::iter::from_fn(|| plane.poll_event()).collect();
    assert!(drops.iter().any(|event| matches!(
        event,
        PlaneEvent::Dropped(record) if record.reason == DropReason::Loss
    )));
}

#[test]
fn test_end_is_never_lost() {
    let now = Instant::now();
    let mut plane = plane(vec![route(2000, 3000, 0, 100)], 10);

    plane.accept(&datagram(Priority::High, 2000, PacketKind::End, b""), now);
    let (packet, _) = plane
        .poll_transmit(now)
        .expect("END must survive certain loss");
    assert_eq!(wire::decode(&packet).unwrap().segment.kind, PacketKind::End);
}

#[test]
fn test_zero_loss_never_drops() {
    let now = Instant::now();
    let mut plane = plane(vec![route(2000, 3000, 0, 0)], 10);

    for i in 0..100u32 {
        let payload = i.to_be_bytes();
        plane.accept(
            &datagram(Priority::Medium, 2000, PacketKind::Data, &payload),
            now,
        );
        assert!(plane.poll_transmit(now).is_some());
    }
}
