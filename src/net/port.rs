//! 端口与端口组
//!
//! 节点的物理接入点集合。缓冲按八位组在端口组级共享记账，
//! 每端口一条 FIFO 队列和至多一条链路；读指针轮转保证交换公平，
//! 每 tick 受可交换八位组预算约束。

use std::collections::VecDeque;
use std::sync::Arc;

use thiserror::Error;

use super::error::InvalidArgument;
use super::id::PortId;
use super::link::{Link, PortLink};
use super::packet::Pdu;

/// 默认缓冲大小（MB）。
pub const DEFAULT_BUFFER_MB: u64 = 1;

const OCTETS_PER_MB: u64 = 1_048_576;

/// 入队被拒：缓冲容量不足。被拒的 PDU 原样交还调用方，
/// 由节点按丢包处理并触发重传子系统，不在端口内部重试。
#[derive(Debug, Error)]
#[error("port buffer capacity exceeded")]
pub struct CapacityExceeded(pub Pdu);

/// 单个端口：FIFO 队列 + 可选链路。
#[derive(Debug, Default)]
pub struct Port {
    queue: VecDeque<Pdu>,
    queued_octets: u64,
    link: Option<PortLink>,
}

impl Port {
    /// 本端口当前缓冲的八位组数。
    pub fn queued_octets(&self) -> u64 {
        self.queued_octets
    }

    pub fn queued_packets(&self) -> usize {
        self.queue.len()
    }
}

/// 端口组：固定数量端口、共享缓冲记账、轮转读指针。
#[derive(Debug)]
pub struct PortSet {
    ports: Vec<Port>,
    occupancy_octets: u64,
    buffer_mb: u64,
    unlimited: bool,
    artificially_congested: bool,
    read_pointer: usize,
}

impl PortSet {
    /// 创建 `num_ports` 个端口的端口组；0 个端口是非法参数。
    pub fn new(num_ports: usize) -> Result<PortSet, InvalidArgument> {
        if num_ports == 0 {
            return Err(InvalidArgument::ZeroPorts);
        }
        let mut ports = Vec::with_capacity(num_ports);
        ports.resize_with(num_ports, Port::default);
        Ok(PortSet {
            ports,
            occupancy_octets: 0,
            buffer_mb: DEFAULT_BUFFER_MB,
            unlimited: false,
            artificially_congested: false,
            read_pointer: 0,
        })
    }

    pub fn number_of_ports(&self) -> usize {
        self.ports.len()
    }

    pub fn port(&self, port: PortId) -> Result<&Port, InvalidArgument> {
        self.ports
            .get(port.0)
            .ok_or(InvalidArgument::PortIndexOutOfRange)
    }

    /// 缓冲大小（MB）。
    pub fn buffer_size_mb(&self) -> u64 {
        self.buffer_mb
    }

    pub fn set_buffer_size_mb(&mut self, mb: u64) {
        self.buffer_mb = mb;
    }

    pub fn is_unlimited_buffer(&self) -> bool {
        self.unlimited
    }

    pub fn set_unlimited_buffer(&mut self, unlimited: bool) {
        self.unlimited = unlimited;
    }

    /// 容量（八位组）；无限缓冲时返回 None。
    pub fn capacity_octets(&self) -> Option<u64> {
        if self.unlimited {
            None
        } else {
            Some(self.buffer_mb.saturating_mul(OCTETS_PER_MB))
        }
    }

    /// 当前共享缓冲占用（八位组）。
    pub fn occupancy(&self) -> u64 {
        self.occupancy_octets
    }

    pub fn increase_occupancy(&mut self, octets: u64) {
        self.occupancy_octets = self.occupancy_octets.saturating_add(octets);
    }

    pub fn decrease_occupancy(&mut self, octets: u64) {
        self.occupancy_octets = self.occupancy_octets.saturating_sub(octets);
    }

    pub fn set_occupancy(&mut self, octets: u64) {
        self.occupancy_octets = octets;
    }

    pub fn is_artificially_congested(&self) -> bool {
        self.artificially_congested
    }

    /// 人工拥塞开关：独立于真实占用，强制拥塞信号拉满。
    pub fn set_artificially_congested(&mut self, congested: bool) {
        self.artificially_congested = congested;
    }

    /// 拥塞程度 0..=100。人工拥塞时恒为 100。
    pub fn congestion_level(&self) -> u64 {
        if self.artificially_congested {
            return 100;
        }
        match self.capacity_octets() {
            None => 0,
            Some(0) => {
                if self.occupancy_octets > 0 {
                    100
                } else {
                    0
                }
            }
            Some(cap) => (self.occupancy_octets.saturating_mul(100) / cap).min(100),
        }
    }

    /// 入队：成功则占用增加 PDU 大小；超出容量且非无限缓冲时拒绝，
    /// 把 PDU 交还给调用方。
    pub fn enqueue(&mut self, port: PortId, pdu: Pdu) -> Result<(), CapacityExceeded> {
        let size = u64::from(pdu.size_octets);
        if let Some(cap) = self.capacity_octets()
            && self.occupancy_octets.saturating_add(size) > cap
        {
            return Err(CapacityExceeded(pdu));
        }
        self.push(port, pdu, size);
        Ok(())
    }

    /// 无视容量入队。控制 PDU 专用：重传协议报文不参与缓冲竞争。
    pub(crate) fn enqueue_unchecked(&mut self, port: PortId, pdu: Pdu) {
        let size = u64::from(pdu.size_octets);
        self.push(port, pdu, size);
    }

    fn push(&mut self, port: PortId, pdu: Pdu, size: u64) {
        let p = &mut self.ports[port.0];
        p.queued_octets = p.queued_octets.saturating_add(size);
        p.queue.push_back(pdu);
        self.occupancy_octets = self.occupancy_octets.saturating_add(size);
    }

    /// 出队指定端口的队首 PDU。
    pub fn dequeue(&mut self, port: PortId) -> Option<Pdu> {
        let p = &mut self.ports[port.0];
        let pdu = p.queue.pop_front()?;
        let size = u64::from(pdu.size_octets);
        p.queued_octets = p.queued_octets.saturating_sub(size);
        self.occupancy_octets = self.occupancy_octets.saturating_sub(size);
        Some(pdu)
    }

    /// 从读指针起找下一个非空端口，不改动任何状态。
    fn next_occupied(&self) -> Option<PortId> {
        let n = self.ports.len();
        (0..n)
            .map(|step| (self.read_pointer + step) % n)
            .find(|&idx| !self.ports[idx].queue.is_empty())
            .map(PortId)
    }

    /// 轮转出队：返回下一个可交付的 PDU 及其来源端口；
    /// 全部队列为空时返回 None。服务过的端口之后的端口下一个被考虑。
    pub fn get_next_packet(&mut self) -> Option<(PortId, Pdu)> {
        let port = self.next_occupied()?;
        let pdu = self.dequeue(port)?;
        self.read_pointer = (port.0 + 1) % self.ports.len();
        Some((port, pdu))
    }

    /// 在剩余预算内是否还能交换下一个 PDU。
    pub fn can_switch_packet(&self, remaining_octets: u64) -> bool {
        match self.next_occupied() {
            Some(port) => {
                let head = self.ports[port.0]
                    .queue
                    .front()
                    .expect("occupied port has a head packet");
                u64::from(head.size_octets) <= remaining_octets
            }
            None => false,
        }
    }

    /// 跳过读指针当前指向的端口，不提供服务。
    pub fn skip_port(&mut self) {
        self.read_pointer = (self.read_pointer + 1) % self.ports.len();
    }

    /// 端口是否空闲可接线（未挂链路）。
    pub fn is_available(&self, port: PortId) -> Result<bool, InvalidArgument> {
        Ok(self.port(port)?.link.is_none())
    }

    /// 把链路的 `end` 端挂到指定端口。
    pub fn connect_link_to_port(
        &mut self,
        link: Arc<Link>,
        end: usize,
        port: PortId,
    ) -> Result<(), InvalidArgument> {
        let p = self
            .ports
            .get_mut(port.0)
            .ok_or(InvalidArgument::PortIndexOutOfRange)?;
        if p.link.is_some() {
            return Err(InvalidArgument::PortAlreadyLinked);
        }
        p.link = Some(PortLink::new(link, end));
        Ok(())
    }

    /// 断开指定端口上的链路。
    pub fn disconnect_link_from_port(&mut self, port: PortId) -> Result<(), InvalidArgument> {
        let p = self
            .ports
            .get_mut(port.0)
            .ok_or(InvalidArgument::PortIndexOutOfRange)?;
        p.link = None;
        Ok(())
    }

    pub(crate) fn link(&self, port: PortId) -> Option<&PortLink> {
        self.ports.get(port.0).and_then(|p| p.link.as_ref())
    }
}
