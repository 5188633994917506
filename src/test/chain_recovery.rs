use std::net::Ipv4Addr;

use crate::net::{
    EventSink, FlowId, GosLevel, NetEvent, PacketId, Pdu, PduKind, SimReport, TickedEvent,
};
use crate::sim::{Coordinator, SimTime, TickConfig};
use crate::topo::{Chain, ChainOpts, build_chain};
use crate::viz::EventLog;

fn addr(last: u8) -> Ipv4Addr {
    Ipv4Addr::new(10, 0, 0, last)
}

fn chain_with(opts: &ChainOpts) -> (Chain, EventLog) {
    let (events, rx) = EventSink::channel();
    let chain = build_chain(opts, events).expect("valid chain options");
    (chain, EventLog::new(rx))
}

fn run(chain: Chain, tick_ns: u64, ticks: u64) -> SimReport {
    let cfg = TickConfig::new(SimTime(tick_ns)).expect("non-zero tick");
    Coordinator::new(cfg)
        .run(chain.nodes, ticks)
        .expect("clean run")
}

fn events_at(log: &EventLog, node: usize) -> Vec<TickedEvent> {
    log.drain()
        .into_iter()
        .filter(|ev| match &ev.event {
            NetEvent::Enqueued { node: n, .. }
            | NetEvent::Dequeued { node: n, .. }
            | NetEvent::Delivered { node: n, .. }
            | NetEvent::Dropped { node: n, .. }
            | NetEvent::CongestionChanged { node: n, .. }
            | NetEvent::RequestCreated { node: n, .. }
            | NetEvent::RequestRetried { node: n, .. }
            | NetEvent::RequestRecovered { node: n, .. }
            | NetEvent::RequestPurged { node: n, .. } => *n == node,
        })
        .collect()
}

#[test]
fn clean_chain_delivers_every_packet() {
    let opts = ChainOpts {
        interior: 1,
        ..ChainOpts::default()
    };
    let (mut chain, _log) = chain_with(&opts);
    for i in 0..3 {
        chain.injector.inject_data(i * 2, 1_500, Some(GosLevel::Level1));
    }

    let report = run(chain, 1_000, 20);
    assert_eq!(report.total_delivered(), 3);
    assert_eq!(report.total_dropped(), 0);
    assert_eq!(report.nodes[2].stats.delivered, 3);
    assert_eq!(report.nodes[0].stats.switched, 3);
    assert_eq!(report.nodes[1].stats.switched, 3);
}

#[test]
fn switching_budget_spreads_work_across_ticks() {
    let opts = ChainOpts {
        interior: 1,
        switch_octets_per_tick: 1_500,
        ..ChainOpts::default()
    };
    let (mut chain, log) = chain_with(&opts);
    chain.injector.inject_data(0, 1_500, None);
    chain.injector.inject_data(0, 1_500, None);

    let report = run(chain, 1_000, 10);
    assert_eq!(report.total_delivered(), 2);

    // One packet switched per tick at the ingress, the second waits.
    let dequeue_ticks: Vec<u64> = events_at(&log, 0)
        .into_iter()
        .filter(|ev| matches!(ev.event, NetEvent::Dequeued { .. }))
        .map(|ev| ev.tick)
        .collect();
    assert_eq!(dequeue_ticks, vec![0, 1]);
}

#[test]
fn congested_active_lsr_recovers_a_lost_gos_packet() {
    let opts = ChainOpts {
        interior: 1,
        ..ChainOpts::default()
    };
    let (mut chain, log) = chain_with(&opts);
    chain.nodes[1].ports_mut().set_artificially_congested(true);
    let lost = chain.injector.inject_data(0, 1_500, Some(GosLevel::Level1));

    // Tick lasts a full timeout so the first retry fires one tick
    // after the loss is recorded.
    let report = run(chain, 50_000, 12);

    assert_eq!(report.nodes[2].stats.delivered, 1);
    let lsr = &report.nodes[1].stats;
    assert_eq!(lsr.drops_congestion, 1);
    assert_eq!(lsr.requests_created, 1);
    assert_eq!(lsr.retries_sent, 1);
    assert_eq!(lsr.recovered, 1);

    let events = events_at(&log, 1);
    let created = events
        .iter()
        .position(|ev| matches!(ev.event, NetEvent::RequestCreated { lost_packet, .. } if lost_packet == lost.0));
    let retried = events.iter().position(|ev| {
        matches!(ev.event, NetEvent::RequestRetried { lost_packet, target, .. }
            if lost_packet == lost.0 && target == addr(1))
    });
    let recovered = events
        .iter()
        .position(|ev| matches!(ev.event, NetEvent::RequestRecovered { lost_packet, .. } if lost_packet == lost.0));
    assert!(created.expect("created event") < retried.expect("retried event"));
    assert!(retried.expect("retried event") < recovered.expect("recovered event"));
}

#[test]
fn losses_are_retried_in_arrival_order() {
    let opts = ChainOpts {
        interior: 1,
        ..ChainOpts::default()
    };
    let (mut chain, log) = chain_with(&opts);
    chain.nodes[1].ports_mut().set_artificially_congested(true);
    let mut injected = Vec::new();
    for i in 0..3 {
        injected.push(chain.injector.inject_data(i * 2, 1_500, Some(GosLevel::Level1)));
    }

    let report = run(chain, 50_000, 24);
    assert_eq!(report.nodes[2].stats.delivered, 3);
    assert_eq!(report.nodes[1].stats.requests_created, 3);
    assert_eq!(report.nodes[1].stats.recovered, 3);

    // Earlier-detected losses retry before later ones.
    let retried: Vec<u32> = events_at(&log, 1)
        .into_iter()
        .filter_map(|ev| match ev.event {
            NetEvent::RequestRetried { lost_packet, .. } => Some(lost_packet),
            _ => None,
        })
        .collect();
    let expected: Vec<u32> = injected.iter().map(|id| id.0).collect();
    assert_eq!(retried, expected);
}

#[test]
fn broken_link_loss_is_terminal_when_requests_cannot_leave() {
    let opts = ChainOpts {
        interior: 1,
        ..ChainOpts::default()
    };
    let (mut chain, log) = chain_with(&opts);
    chain.links[1].set_broken(true);
    chain.injector.inject_data(0, 1_500, Some(GosLevel::Level1));

    let report = run(chain, 50_000, 10);

    assert_eq!(report.total_delivered(), 0);
    let lsr = &report.nodes[1].stats;
    // The data packet and the retransmission request both die on the
    // broken link.
    assert_eq!(lsr.drops_link, 2);
    assert_eq!(lsr.requests_created, 1);
    assert_eq!(lsr.retries_sent, 1);
    assert_eq!(lsr.recovered, 0);
    assert_eq!(report.nodes[2].stats.received, 0);

    let purged = events_at(&log, 1)
        .into_iter()
        .find_map(|ev| match ev.event {
            NetEvent::RequestPurged { exhausted, .. } => Some(exhausted),
            _ => None,
        });
    assert_eq!(purged, Some(false)); // candidates ran out, budget did not
}

#[test]
fn unmarked_traffic_is_dropped_without_recovery() {
    let opts = ChainOpts {
        interior: 1,
        ..ChainOpts::default()
    };
    let (mut chain, log) = chain_with(&opts);
    chain.nodes[1].ports_mut().set_artificially_congested(true);
    chain.injector.inject_data(0, 1_500, None);

    let report = run(chain, 50_000, 8);
    assert_eq!(report.total_delivered(), 0);
    assert_eq!(report.nodes[1].stats.drops_congestion, 1);
    assert_eq!(report.nodes[1].stats.requests_created, 0);
    assert!(
        events_at(&log, 1)
            .iter()
            .all(|ev| !matches!(ev.event, NetEvent::RequestCreated { .. }))
    );
}

#[test]
fn ttl_expiry_drops_at_the_first_hop() {
    let opts = ChainOpts {
        interior: 1,
        ..ChainOpts::default()
    };
    let (mut chain, _log) = chain_with(&opts);
    let mut pdu = Pdu::data(
        PacketId(99),
        FlowId(1),
        addr(1),
        addr(3),
        100,
        Some(GosLevel::Level1),
    );
    if let PduKind::Data { ttl, .. } = &mut pdu.kind {
        *ttl = 1;
    }
    chain.injector.inject(0, pdu);

    let report = run(chain, 1_000, 4);
    assert_eq!(report.total_delivered(), 0);
    assert_eq!(report.nodes[0].stats.drops_ttl, 1);
    // TTL expiry is never recovered, GoS marking or not.
    assert_eq!(report.nodes[0].stats.requests_created, 0);
}

#[test]
fn unroutable_destination_is_a_counted_drop() {
    let opts = ChainOpts {
        interior: 1,
        ..ChainOpts::default()
    };
    let (mut chain, _log) = chain_with(&opts);
    let pdu = Pdu::data(
        PacketId(99),
        FlowId(1),
        addr(1),
        Ipv4Addr::new(10, 9, 9, 9),
        100,
        Some(GosLevel::Level1),
    );
    chain.injector.inject(0, pdu);

    let report = run(chain, 1_000, 4);
    assert_eq!(report.nodes[0].stats.drops_no_route, 1);
    assert_eq!(report.nodes[0].stats.requests_created, 0);
}
