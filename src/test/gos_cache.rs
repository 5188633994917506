use std::net::Ipv4Addr;

use crate::gpsrp::GosPacketCache;
use crate::net::{FlowId, GosLevel, PacketId, Pdu};

fn gos_pdu(id: u32, size_octets: u32) -> Pdu {
    Pdu::data(
        PacketId(id),
        FlowId(1),
        Ipv4Addr::new(10, 0, 0, 1),
        Ipv4Addr::new(10, 0, 0, 3),
        size_octets,
        Some(GosLevel::Level1),
    )
}

#[test]
fn stored_packets_are_found_by_id() {
    let mut cache = GosPacketCache::new(10_000);
    cache.store(gos_pdu(1, 1_500));
    cache.store(gos_pdu(2, 1_500));
    assert_eq!(cache.len(), 2);
    assert_eq!(cache.used_octets(), 3_000);
    assert_eq!(cache.lookup(PacketId(1)).expect("present").id, PacketId(1));
    assert_eq!(cache.lookup(PacketId(2)).expect("present").id, PacketId(2));
    assert!(cache.lookup(PacketId(3)).is_none());
}

#[test]
fn cache_evicts_oldest_first_when_full() {
    let mut cache = GosPacketCache::new(3_000);
    cache.store(gos_pdu(1, 1_500));
    cache.store(gos_pdu(2, 1_500));
    cache.store(gos_pdu(3, 1_500));
    assert_eq!(cache.len(), 2);
    assert!(cache.lookup(PacketId(1)).is_none());
    assert!(cache.lookup(PacketId(2)).is_some());
    assert!(cache.lookup(PacketId(3)).is_some());
}

#[test]
fn oversized_packet_is_not_retained() {
    let mut cache = GosPacketCache::new(1_000);
    cache.store(gos_pdu(1, 1_500));
    assert!(cache.is_empty());
    assert_eq!(cache.used_octets(), 0);
}

#[test]
fn zero_capacity_cache_retains_nothing_of_size() {
    let mut cache = GosPacketCache::new(0);
    cache.store(gos_pdu(1, 1));
    assert!(cache.is_empty());
}
