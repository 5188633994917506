use std::net::Ipv4Addr;

use crate::net::{
    FlowId, Forwarding, GosLevel, Label, LabelOp, LabelTable, PacketId, Pdu, PduKind, PortId,
};

fn addr(last: u8) -> Ipv4Addr {
    Ipv4Addr::new(10, 0, 0, last)
}

fn unlabeled(dst: Ipv4Addr) -> Pdu {
    Pdu::data(PacketId(1), FlowId(1), addr(1), dst, 100, Some(GosLevel::Level1))
}

fn labeled(dst: Ipv4Addr, label: Label) -> Pdu {
    let mut pdu = unlabeled(dst);
    if let PduKind::Data { labels, .. } = &mut pdu.kind {
        labels.push(label);
    }
    pdu
}

#[test]
fn unlabeled_data_is_classified_by_destination() {
    let mut table = LabelTable::default();
    table.insert_fec(addr(3), Label(101), PortId(1));

    let forwarding = table.lookup_data(&unlabeled(addr(3))).expect("fec hit");
    assert_eq!(
        forwarding,
        Forwarding {
            op: LabelOp::Push(Label(101)),
            out_port: PortId(1)
        }
    );
    assert!(table.lookup_data(&unlabeled(addr(9))).is_none());
}

#[test]
fn labeled_data_is_switched_on_the_top_label() {
    let mut table = LabelTable::default();
    table.insert_ilm(Label(101), LabelOp::Swap(Label(102)), PortId(1));
    table.insert_fec(addr(3), Label(201), PortId(0));

    // The top label wins over destination classification.
    let forwarding = table
        .lookup_data(&labeled(addr(3), Label(101)))
        .expect("ilm hit");
    assert_eq!(forwarding.op, LabelOp::Swap(Label(102)));
    assert_eq!(forwarding.out_port, PortId(1));

    assert!(table.lookup_data(&labeled(addr(3), Label(999))).is_none());
}

#[test]
fn control_pdus_route_by_address() {
    let mut table = LabelTable::default();
    table.insert_route(addr(1), PortId(0));
    table.insert_route(addr(3), PortId(1));

    assert_eq!(table.route(addr(1)), Some(PortId(0)));
    assert_eq!(table.route(addr(3)), Some(PortId(1)));
    assert_eq!(table.route(addr(9)), None);

    let request = Pdu::request(PacketId(2), FlowId(1), addr(2), addr(1), PacketId(1));
    assert!(table.lookup_data(&request).is_none());
}
