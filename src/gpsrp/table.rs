//! 重传请求表
//!
//! 每个活动节点一张表：丢失包 ID 到表项的映射，按到达序号升序服务。
//! 先登记的丢失先重试，这是公平性裁决，不是优先级。

use std::collections::{BTreeMap, HashMap};
use std::net::Ipv4Addr;

use tracing::trace;

use crate::net::{FlowId, PacketId, PortId, UninitializedState};

use super::entry::RequestEntry;

/// 一次应当发出的重试：由表在服务时弹出最近穿越节点后给出。
#[derive(Debug, Clone)]
pub struct RetryOrder {
    pub lost_packet: PacketId,
    pub flow_id: FlowId,
    pub outgoing_port: PortId,
    pub target: Ipv4Addr,
    pub attempts_left: u32,
}

/// 一条被清除的表项。
#[derive(Debug, Clone)]
pub struct PurgedEntry {
    pub lost_packet: PacketId,
    /// 因重试预算耗尽而清除（否则是候选节点用尽）。
    pub exhausted: bool,
}

/// 重传请求表。
#[derive(Debug, Default)]
pub struct RequestTable {
    entries: BTreeMap<u32, RequestEntry>,
    by_packet: HashMap<PacketId, u32>,
}

impl RequestTable {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, packet: PacketId) -> bool {
        self.by_packet.contains_key(&packet)
    }

    /// 登记一条表项。packet id 必须已经写入（作为映射键）。
    pub fn insert(&mut self, entry: RequestEntry) -> Result<(), UninitializedState> {
        let packet = entry.packet_id()?;
        self.by_packet.insert(packet, entry.arrival_order());
        self.entries.insert(entry.arrival_order(), entry);
        Ok(())
    }

    pub fn entry_mut(&mut self, packet: PacketId) -> Option<&mut RequestEntry> {
        let order = *self.by_packet.get(&packet)?;
        self.entries.get_mut(&order)
    }

    /// 按丢失包 ID 移除（恢复确认时调用）。
    pub fn remove_by_packet(&mut self, packet: PacketId) -> Option<RequestEntry> {
        let order = self.by_packet.remove(&packet)?;
        self.entries.remove(&order)
    }

    /// 每 tick 调用：所有表项的超时按 tick 时长递减，钳在 0。
    pub fn decrease_timeouts(&mut self, nanoseconds: u64) {
        for entry in self.entries.values_mut() {
            entry.decrease_timeout(nanoseconds);
        }
    }

    /// 按到达序号升序服务可重试表项：弹出最近穿越节点地址、
    /// 重置超时并消费一次尝试，给出应发出的重试指令。
    pub fn take_retriable(&mut self) -> Vec<RetryOrder> {
        let mut orders = Vec::new();
        for entry in self.entries.values_mut() {
            if !entry.is_retriable() {
                continue;
            }
            let target = entry
                .pop_nearest_crossed_node()
                .expect("retriable entry has crossed nodes");
            entry.reset_timeout_and_decrease_attempts();
            let order = RetryOrder {
                lost_packet: entry.packet_id().expect("entry stored with packet id"),
                flow_id: entry.flow_id().expect("entry stored with flow id"),
                outgoing_port: entry
                    .outgoing_port()
                    .expect("entry stored with outgoing port"),
                target,
                attempts_left: entry.attempts(),
            };
            trace!(
                lost_packet = order.lost_packet.0,
                target = %order.target,
                attempts_left = order.attempts_left,
                "服务重传表项"
            );
            orders.push(order);
        }
        orders
    }

    /// 清除所有满足清除条件的表项，按到达序号升序报告。
    pub fn purge(&mut self) -> Vec<PurgedEntry> {
        let doomed: Vec<u32> = self
            .entries
            .iter()
            .filter(|(_, e)| e.can_be_purged())
            .map(|(&order, _)| order)
            .collect();
        let mut purged = Vec::with_capacity(doomed.len());
        for order in doomed {
            let entry = self.entries.remove(&order).expect("doomed entry exists");
            let lost_packet = entry.packet_id().expect("entry stored with packet id");
            self.by_packet.remove(&lost_packet);
            purged.push(PurgedEntry {
                lost_packet,
                exhausted: entry.attempts() == 0 && entry.timeout_ns() == 0,
            });
        }
        purged
    }
}
