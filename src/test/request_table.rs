use std::net::Ipv4Addr;

use crate::gpsrp::{DEFAULT_ATTEMPTS, DEFAULT_TIMEOUT_NS, RequestEntry, RequestTable};
use crate::net::{FlowId, PacketId, PortId};

fn addr(last: u8) -> Ipv4Addr {
    Ipv4Addr::new(10, 0, 0, last)
}

fn entry(order: u32, packet: u32, crossed: &[u8]) -> RequestEntry {
    let mut entry = RequestEntry::new(order);
    entry.set_flow_id(FlowId(1));
    entry.set_packet_id(PacketId(packet));
    entry.set_outgoing_port(PortId(1));
    for &last in crossed {
        entry.push_crossed_node(addr(last));
    }
    entry
}

#[test]
fn insert_requires_a_packet_id() {
    let mut table = RequestTable::default();
    assert!(table.insert(RequestEntry::new(0)).is_err());
    assert!(table.insert(entry(0, 7, &[2])).is_ok());
    assert!(table.contains(PacketId(7)));
    assert_eq!(table.len(), 1);
}

#[test]
fn retries_are_serviced_in_ascending_arrival_order() {
    let mut table = RequestTable::default();
    // Inserted out of order on purpose.
    table.insert(entry(9, 300, &[4])).expect("entry");
    table.insert(entry(2, 100, &[2])).expect("entry");
    table.insert(entry(5, 200, &[3])).expect("entry");

    table.decrease_timeouts(DEFAULT_TIMEOUT_NS);
    let orders = table.take_retriable();
    let packets: Vec<u32> = orders.iter().map(|o| o.lost_packet.0).collect();
    assert_eq!(packets, vec![100, 200, 300]);
}

#[test]
fn servicing_pops_nearest_candidate_and_consumes_an_attempt() {
    let mut table = RequestTable::default();
    table.insert(entry(1, 7, &[2, 3])).expect("entry");

    table.decrease_timeouts(DEFAULT_TIMEOUT_NS);
    let orders = table.take_retriable();
    assert_eq!(orders.len(), 1);
    // Most recently recorded crossing first.
    assert_eq!(orders[0].target, addr(3));
    assert_eq!(orders[0].outgoing_port, PortId(1));
    assert_eq!(orders[0].attempts_left, DEFAULT_ATTEMPTS - 1);

    let entry = table.entry_mut(PacketId(7)).expect("still present");
    assert_eq!(entry.timeout_ns(), DEFAULT_TIMEOUT_NS);
    assert_eq!(entry.crossed_nodes_remaining(), 1);

    // Timeout was reset, nothing fires until it expires again.
    assert!(table.take_retriable().is_empty());
}

#[test]
fn purge_removes_entries_without_candidates() {
    let mut table = RequestTable::default();
    table.insert(entry(1, 7, &[2])).expect("entry");

    table.decrease_timeouts(DEFAULT_TIMEOUT_NS);
    let _ = table.take_retriable(); // consumes the only candidate

    let purged = table.purge();
    assert_eq!(purged.len(), 1);
    assert_eq!(purged[0].lost_packet, PacketId(7));
    assert!(!purged[0].exhausted);
    assert!(table.is_empty());
    assert!(!table.contains(PacketId(7)));
}

#[test]
fn purge_flags_exhausted_budget() {
    let mut table = RequestTable::default();
    table.insert(entry(1, 7, &[2, 3])).expect("entry");

    let e = table.entry_mut(PacketId(7)).expect("present");
    for _ in 0..DEFAULT_ATTEMPTS {
        e.force_timeout_reset();
    }

    let purged = table.purge();
    assert_eq!(purged.len(), 1);
    assert!(purged[0].exhausted);
    assert!(table.is_empty());
}

#[test]
fn remove_by_packet_confirms_recovery() {
    let mut table = RequestTable::default();
    table.insert(entry(1, 7, &[2])).expect("entry");
    assert!(table.remove_by_packet(PacketId(7)).is_some());
    assert!(table.remove_by_packet(PacketId(7)).is_none());
    assert!(table.is_empty());
}

#[test]
fn timeouts_decrease_for_every_entry() {
    let mut table = RequestTable::default();
    table.insert(entry(1, 7, &[2])).expect("entry");
    table.insert(entry(2, 8, &[3])).expect("entry");

    table.decrease_timeouts(DEFAULT_TIMEOUT_NS / 2);
    assert_eq!(
        table.entry_mut(PacketId(7)).expect("present").timeout_ns(),
        DEFAULT_TIMEOUT_NS / 2
    );
    assert_eq!(
        table.entry_mut(PacketId(8)).expect("present").timeout_ns(),
        DEFAULT_TIMEOUT_NS / 2
    );
    assert!(table.take_retriable().is_empty());
}
