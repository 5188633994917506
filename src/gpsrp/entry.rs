//! 重传请求表项
//!
//! 活动节点上每个在途恢复尝试对应一条表项：到达序号是唯一排序键；
//! 穿越节点栈从最近端严格消费；超时与剩余尝试次数构成重试状态机。

use std::cmp::Ordering;
use std::net::Ipv4Addr;

use crate::net::{FlowId, PacketId, PortId, UninitializedState};

/// 重试超时默认值（虚拟纳秒）。
pub const DEFAULT_TIMEOUT_NS: u64 = 50_000;

/// 默认重试预算。
pub const DEFAULT_ATTEMPTS: u32 = 8;

/// 一条未决的重传请求。
///
/// flow/packet/port 三个字段在读取前必须先显式写入；
/// 先读后写是上游时序错误，以 `UninitializedState` 立即失败。
#[derive(Debug, Clone)]
pub struct RequestEntry {
    arrival_order: u32,
    flow_id: Option<FlowId>,
    packet_id: Option<PacketId>,
    outgoing_port: Option<PortId>,
    crossed_nodes: Vec<Ipv4Addr>,
    timeout_ns: u64,
    attempts: u32,
}

impl RequestEntry {
    /// 以到达序号创建表项，其余字段处于未初始化状态。
    pub fn new(arrival_order: u32) -> RequestEntry {
        RequestEntry {
            arrival_order,
            flow_id: None,
            packet_id: None,
            outgoing_port: None,
            crossed_nodes: Vec::new(),
            timeout_ns: DEFAULT_TIMEOUT_NS,
            attempts: DEFAULT_ATTEMPTS,
        }
    }

    pub fn arrival_order(&self) -> u32 {
        self.arrival_order
    }

    pub fn set_flow_id(&mut self, flow_id: FlowId) {
        self.flow_id = Some(flow_id);
    }

    pub fn flow_id(&self) -> Result<FlowId, UninitializedState> {
        self.flow_id.ok_or(UninitializedState)
    }

    pub fn set_packet_id(&mut self, packet_id: PacketId) {
        self.packet_id = Some(packet_id);
    }

    pub fn packet_id(&self) -> Result<PacketId, UninitializedState> {
        self.packet_id.ok_or(UninitializedState)
    }

    pub fn set_outgoing_port(&mut self, port: PortId) {
        self.outgoing_port = Some(port);
    }

    pub fn outgoing_port(&self) -> Result<PortId, UninitializedState> {
        self.outgoing_port.ok_or(UninitializedState)
    }

    /// 记录一次穿越：后压入的地址离丢失点更近。
    pub fn push_crossed_node(&mut self, address: Ipv4Addr) {
        self.crossed_nodes.push(address);
    }

    /// 弹出离丢失点最近的穿越节点地址（严格按压入的逆序）。
    /// 栈空时读取失败。
    pub fn pop_nearest_crossed_node(&mut self) -> Result<Ipv4Addr, UninitializedState> {
        self.crossed_nodes.pop().ok_or(UninitializedState)
    }

    pub fn crossed_nodes_remaining(&self) -> usize {
        self.crossed_nodes.len()
    }

    pub fn timeout_ns(&self) -> u64 {
        self.timeout_ns
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// 超时倒计时，饱和在 0。
    pub fn decrease_timeout(&mut self, nanoseconds: u64) {
        self.timeout_ns = self.timeout_ns.saturating_sub(nanoseconds);
    }

    /// 超时归零后的常规重置：恢复超时并消费一次尝试。
    /// 超时未归零或预算已耗尽时不做任何事。
    pub fn reset_timeout_and_decrease_attempts(&mut self) {
        if self.timeout_ns == 0 && self.attempts > 0 {
            self.timeout_ns = DEFAULT_TIMEOUT_NS;
            self.attempts -= 1;
        }
    }

    /// 强制重置：无条件消费一次尝试。消费掉最后一次尝试时，
    /// 超时与尝试一并钳到 0，此后永久失效（再调用无效果）。
    pub fn force_timeout_reset(&mut self) {
        self.attempts = self.attempts.saturating_sub(1);
        if self.attempts == 0 {
            self.timeout_ns = 0;
        } else {
            self.timeout_ns = DEFAULT_TIMEOUT_NS;
        }
    }

    /// 是否应当发起一次重试。
    pub fn is_retriable(&self) -> bool {
        self.attempts > 0 && self.timeout_ns == 0 && !self.crossed_nodes.is_empty()
    }

    /// 是否应当从表中清除。
    pub fn can_be_purged(&self) -> bool {
        self.crossed_nodes.is_empty() || (self.attempts == 0 && self.timeout_ns == 0)
    }
}

// 到达序号是唯一排序键：先到先服务，同表内不会出现相同序号。
impl Ord for RequestEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.arrival_order.cmp(&other.arrival_order)
    }
}

impl PartialOrd for RequestEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for RequestEntry {
    fn eq(&self, other: &Self) -> bool {
        self.arrival_order == other.arrival_order
    }
}

impl Eq for RequestEntry {}
