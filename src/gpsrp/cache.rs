//! 已转发 GoS 包缓存
//!
//! 活动节点为最近转发过的 GoS 数据包保留副本，用来应答下游的
//! 重传请求。按八位组设界，满了从最旧的开始淘汰。

use std::collections::VecDeque;

use crate::net::{PacketId, Pdu};

/// 默认缓存容量（八位组）。
pub const DEFAULT_CACHE_OCTETS: u64 = 1_048_576;

#[derive(Debug)]
pub struct GosPacketCache {
    capacity_octets: u64,
    used_octets: u64,
    q: VecDeque<Pdu>,
}

impl GosPacketCache {
    pub fn new(capacity_octets: u64) -> GosPacketCache {
        GosPacketCache {
            capacity_octets,
            used_octets: 0,
            q: VecDeque::new(),
        }
    }

    pub fn used_octets(&self) -> u64 {
        self.used_octets
    }

    pub fn len(&self) -> usize {
        self.q.len()
    }

    pub fn is_empty(&self) -> bool {
        self.q.is_empty()
    }

    /// 留存一个数据包副本；必要时淘汰最旧的。比整个缓存还大的包
    /// 直接不留。
    pub fn store(&mut self, pdu: Pdu) {
        let size = u64::from(pdu.size_octets);
        if size > self.capacity_octets {
            return;
        }
        while self.used_octets.saturating_add(size) > self.capacity_octets {
            match self.q.pop_front() {
                Some(old) => {
                    self.used_octets = self.used_octets.saturating_sub(u64::from(old.size_octets));
                }
                None => break,
            }
        }
        self.used_octets = self.used_octets.saturating_add(size);
        self.q.push_back(pdu);
    }

    /// 按全局唯一 ID 查找留存的包。
    pub fn lookup(&self, packet: PacketId) -> Option<&Pdu> {
        self.q.iter().find(|pdu| pdu.id == packet)
    }
}
