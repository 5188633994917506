//! 标签交换节点
//!
//! 每个节点是独立调度的执行单元，每 tick 做一个单位的工作：
//! 排空收件箱、把到期的 Transfer 送进输入端口、在八位组预算内
//! 轮转交换、跑一轮重传表 housekeeping。节点的端口队列与计数
//! 只被自己改动，跨节点只通过链路投递通信。

use std::net::Ipv4Addr;
use std::sync::mpsc::{Receiver, Sender, channel};

use tracing::{debug, info, trace};

use crate::gpsrp::{GosPacketCache, RequestEntry, RequestTable};
use crate::sim::TickConfig;

use super::error::InvalidArgument;
use super::event::{DropReason, EventSink, NetEvent};
use super::id::{NodeId, PacketId, PortId, RotaryIdGenerator};
use super::label::{LabelOp, LabelTable};
use super::link::{Transfer, TransmitError};
use super::packet::{Pdu, PduKind};
use super::port::PortSet;
use super::stats::{NodeReport, NodeStats};

/// 默认每 tick 可交换八位组预算。
pub const DEFAULT_SWITCH_OCTETS_PER_TICK: u64 = 10_240;

/// 节点角色：边缘（入口压标签/出口摘标签）或内部（交换栈顶标签）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    Edge,
    Switch,
}

/// 标签交换节点。
pub struct SwitchingNode {
    id: NodeId,
    address: Ipv4Addr,
    role: NodeRole,
    active: bool,
    ports: PortSet,
    labels: LabelTable,
    requests: RequestTable,
    cache: GosPacketCache,
    arrival_orders: RotaryIdGenerator,
    control_ids: RotaryIdGenerator,
    switch_octets_per_tick: u64,
    inbox: Receiver<Transfer>,
    inbox_tx: Sender<Transfer>,
    pending: Vec<Transfer>,
    send_seq: u64,
    events: EventSink,
    stats: NodeStats,
    last_congestion_level: u64,
}

impl SwitchingNode {
    /// 创建节点。`active` 的节点参与 GPSRP（维护重传表和 GoS 缓存）。
    pub fn new(
        id: NodeId,
        address: Ipv4Addr,
        role: NodeRole,
        active: bool,
        num_ports: usize,
        cache_octets: u64,
        events: EventSink,
    ) -> Result<SwitchingNode, InvalidArgument> {
        let ports = PortSet::new(num_ports)?;
        let (inbox_tx, inbox) = channel();
        let mut control_ids = RotaryIdGenerator::new();
        // 控制 PDU 的 ID 在各节点间错开，避免事件流里撞号。
        control_ids.set_identifier((id.0 as u32) << 20);
        Ok(SwitchingNode {
            id,
            address,
            role,
            active,
            ports,
            labels: LabelTable::default(),
            requests: RequestTable::default(),
            cache: GosPacketCache::new(cache_octets),
            arrival_orders: RotaryIdGenerator::new(),
            control_ids,
            switch_octets_per_tick: DEFAULT_SWITCH_OCTETS_PER_TICK,
            inbox,
            inbox_tx,
            pending: Vec::new(),
            send_seq: 0,
            events,
            stats: NodeStats::default(),
            last_congestion_level: 0,
        })
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn address(&self) -> Ipv4Addr {
        self.address
    }

    pub fn role(&self) -> NodeRole {
        self.role
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn ports(&self) -> &PortSet {
        &self.ports
    }

    pub fn ports_mut(&mut self) -> &mut PortSet {
        &mut self.ports
    }

    pub fn labels_mut(&mut self) -> &mut LabelTable {
        &mut self.labels
    }

    pub fn requests(&self) -> &RequestTable {
        &self.requests
    }

    pub fn stats(&self) -> &NodeStats {
        &self.stats
    }

    pub fn set_switch_octets_per_tick(&mut self, octets: u64) {
        self.switch_octets_per_tick = octets;
    }

    /// 节点收件箱的发送端：拓扑接线与流量注入用。
    pub fn inbox_sender(&self) -> Sender<Transfer> {
        self.inbox_tx.clone()
    }

    /// 仿真结束时上交统计报告。
    pub fn into_report(self) -> NodeReport {
        NodeReport::new(self.id, self.address, self.stats)
    }

    /// 一个 tick 的全部工作。协调器释放后调用，过程中不阻塞。
    #[tracing::instrument(skip(self, cfg), fields(node = self.id.0, addr = %self.address))]
    pub fn run_tick(&mut self, tick: u64, cfg: &TickConfig) {
        trace!(tick, "tick 开始");
        self.drain_inbox(tick);
        self.switch(tick, cfg);
        if self.active {
            self.gpsrp_tick(tick, cfg);
        }
        self.note_congestion(tick);
        trace!(tick, "tick 结束");
    }

    /// 排空收件箱，把到期的投递送进输入端口。
    fn drain_inbox(&mut self, tick: u64) {
        while let Ok(transfer) = self.inbox.try_recv() {
            self.pending.push(transfer);
        }
        // 跨发送方的到达顺序不确定，按 (到达 tick, 来源, 序号) 定序。
        self.pending
            .sort_by_key(|t| (t.deliver_at, t.origin.0, t.seq));
        let mut due = Vec::new();
        let mut later = Vec::new();
        for transfer in self.pending.drain(..) {
            if transfer.deliver_at <= tick {
                due.push(transfer);
            } else {
                later.push(transfer);
            }
        }
        self.pending = later;
        for transfer in due {
            self.receive(tick, transfer.port, transfer.pdu);
        }
    }

    /// 一个 PDU 到达输入端口。
    fn receive(&mut self, tick: u64, port: PortId, pdu: Pdu) {
        self.stats.received += 1;
        debug!(pdu = pdu.id.0, port = port.0, "PDU 到达输入端口");

        // 控制 PDU 不参与缓冲竞争：重传协议自身的报文永远收下。
        if !pdu.is_data() {
            self.events.emit(
                tick,
                NetEvent::Enqueued {
                    node: self.id.0,
                    port: port.0,
                    pdu: pdu.id.0,
                    octets: pdu.size_octets,
                },
            );
            self.ports.enqueue_unchecked(port, pdu);
            return;
        }

        if self.ports.is_artificially_congested() {
            self.drop_pdu(tick, pdu, DropReason::ArtificialCongestion, None);
            return;
        }
        let octets = pdu.size_octets;
        let id = pdu.id.0;
        match self.ports.enqueue(port, pdu) {
            Ok(()) => {
                self.events.emit(
                    tick,
                    NetEvent::Enqueued {
                        node: self.id.0,
                        port: port.0,
                        pdu: id,
                        octets,
                    },
                );
            }
            Err(rejected) => {
                self.drop_pdu(tick, rejected.0, DropReason::BufferOverflow, None);
            }
        }
    }

    /// 预算内的轮转交换。预算耗尽后剩下的端口等下一个 tick。
    fn switch(&mut self, tick: u64, cfg: &TickConfig) {
        let mut budget = self.switch_octets_per_tick;
        while self.ports.can_switch_packet(budget) {
            let (port, pdu) = self
                .ports
                .get_next_packet()
                .expect("switchable packet exists");
            budget = budget.saturating_sub(u64::from(pdu.size_octets));
            self.events.emit(
                tick,
                NetEvent::Dequeued {
                    node: self.id.0,
                    port: port.0,
                    pdu: pdu.id.0,
                },
            );
            self.process(tick, port, pdu, cfg);
        }
    }

    fn process(&mut self, tick: u64, in_port: PortId, pdu: Pdu, cfg: &TickConfig) {
        match &pdu.kind {
            PduKind::Data { .. } => self.forward_data(tick, pdu, cfg),
            PduKind::Request { lost_packet } => {
                let lost = *lost_packet;
                if pdu.dst == self.address {
                    self.answer_request(tick, in_port, pdu, lost, cfg);
                } else {
                    self.forward_control(tick, pdu, cfg);
                }
            }
            PduKind::Response { .. } => {
                if pdu.dst == self.address {
                    self.accept_response(tick, pdu, cfg);
                } else {
                    self.forward_control(tick, pdu, cfg);
                }
            }
        }
    }

    /// 数据包转发流水线：TTL、查表、标签操作、留痕/留存、发出。
    fn forward_data(&mut self, tick: u64, mut pdu: Pdu, cfg: &TickConfig) {
        // 出口送达：摘掉残余标签，本地上交。
        if pdu.dst == self.address {
            if let PduKind::Data { labels, .. } = &mut pdu.kind {
                while labels.pop().is_some() {}
            }
            self.stats.delivered += 1;
            info!(pdu = pdu.id.0, "数据包送达目的地");
            self.events.emit(
                tick,
                NetEvent::Delivered {
                    node: self.id.0,
                    pdu: pdu.id.0,
                },
            );
            return;
        }

        let expired = match &mut pdu.kind {
            PduKind::Data { ttl, .. } => {
                if *ttl <= 1 {
                    true
                } else {
                    *ttl -= 1;
                    false
                }
            }
            _ => false,
        };
        if expired {
            self.drop_pdu(tick, pdu, DropReason::TtlExpired, None);
            return;
        }

        let forwarding = match self.labels.lookup_data(&pdu) {
            Some(f) => f,
            None => {
                // 查表落空是路由失败：丢弃并计数，这一层不重试。
                self.drop_pdu(tick, pdu, DropReason::NoRoute, None);
                return;
            }
        };

        if let PduKind::Data {
            labels, crossed, ..
        } = &mut pdu.kind
        {
            match forwarding.op {
                LabelOp::Push(label) => labels.push(label),
                LabelOp::Swap(label) => {
                    labels.pop();
                    labels.push(label);
                }
                LabelOp::Pop => {
                    labels.pop();
                }
            }
            if self.active {
                crossed.push(self.address);
            }
        }
        if self.active && pdu.gos().is_some() {
            self.cache.store(pdu.clone());
        }
        self.stats.switched += 1;
        trace!(
            pdu = pdu.id.0,
            out_port = forwarding.out_port.0,
            "标签操作完成，转发"
        );
        self.transmit(tick, forwarding.out_port, pdu, cfg);
    }

    /// 重传请求到达本节点：查缓存，按原路回送应答或拒绝。
    fn answer_request(
        &mut self,
        tick: u64,
        in_port: PortId,
        request: Pdu,
        lost: PacketId,
        cfg: &TickConfig,
    ) {
        let recovered = self.cache.lookup(lost).cloned();
        debug!(
            lost_packet = lost.0,
            found = recovered.is_some(),
            "收到重传请求"
        );
        let response = Pdu::response(
            PacketId(self.control_ids.next_identifier()),
            request.flow_id,
            self.address,
            request.src,
            lost,
            recovered,
        );
        self.transmit(tick, in_port, response, cfg);
    }

    /// 重传应答到达本节点：确认恢复或换下一个候选节点。
    fn accept_response(&mut self, tick: u64, pdu: Pdu, cfg: &TickConfig) {
        let (lost, recovered) = match pdu.kind {
            PduKind::Response {
                lost_packet,
                recovered,
            } => (lost_packet, recovered),
            _ => return,
        };
        match recovered {
            Some(data) => {
                // 表项可能已经因候选用尽先被清掉了；恢复出的包照样
                // 继续旅程，表项存在则顺手移除。
                let _ = self.requests.remove_by_packet(lost);
                self.stats.recovered += 1;
                info!(lost_packet = lost.0, "丢失包已恢复");
                self.events.emit(
                    tick,
                    NetEvent::RequestRecovered {
                        node: self.id.0,
                        lost_packet: lost.0,
                    },
                );
                self.forward_data(tick, *data, cfg);
            }
            None => {
                if let Some(entry) = self.requests.entry_mut(lost) {
                    // 对端没有：立刻换下一个最近的穿越节点。
                    entry.force_timeout_reset();
                    debug!(lost_packet = lost.0, "重传被拒，强制重置超时");
                }
            }
        }
    }

    /// 控制 PDU 按地址路由转发。
    fn forward_control(&mut self, tick: u64, pdu: Pdu, cfg: &TickConfig) {
        match self.labels.route(pdu.dst) {
            Some(port) => self.transmit(tick, port, pdu, cfg),
            None => self.drop_pdu(tick, pdu, DropReason::NoRoute, None),
        }
    }

    /// 经指定端口的链路发出 PDU；没有链路或链路拒绝即丢包。
    fn transmit(&mut self, tick: u64, out_port: PortId, pdu: Pdu, cfg: &TickConfig) {
        match self.ports.link(out_port) {
            None => self.drop_pdu(tick, pdu, DropReason::LinkMissing, Some(out_port)),
            Some(port_link) => {
                self.send_seq += 1;
                let link = port_link.link().clone();
                let end = port_link.end();
                match link.transmit(end, pdu, tick, cfg, self.id, self.send_seq) {
                    Ok(deliver_at) => {
                        trace!(deliver_at, out_port = out_port.0, "已调度投递");
                    }
                    Err(TransmitError::Broken(pdu)) => {
                        self.drop_pdu(tick, pdu, DropReason::LinkBroken, Some(out_port));
                    }
                    Err(TransmitError::OverMtu(pdu)) => {
                        self.drop_pdu(tick, pdu, DropReason::MtuExceeded, Some(out_port));
                    }
                }
            }
        }
    }

    /// 丢包出口：计数、发事件，符合条件时登记重传表项。
    fn drop_pdu(&mut self, tick: u64, pdu: Pdu, reason: DropReason, out_port: Option<PortId>) {
        self.stats.record_drop(reason);
        debug!(pdu = pdu.id.0, ?reason, "丢弃 PDU");
        self.events.emit(
            tick,
            NetEvent::Dropped {
                node: self.id.0,
                pdu: pdu.id.0,
                reason,
            },
        );
        if self.active && reason.recoverable() && pdu.is_data() && pdu.gos().is_some() {
            self.register_loss(tick, &pdu, out_port);
        }
    }

    /// 为一个丢失的 GoS 包登记恢复尝试。
    fn register_loss(&mut self, tick: u64, pdu: &Pdu, out_port: Option<PortId>) {
        if self.requests.contains(pdu.id) {
            return;
        }
        // 丢在输入侧时出端口还没定：用查表结果补出来；
        // 连表都查不到就退化成普通路由失败，不登记。
        let out_port = match out_port.or_else(|| self.labels.lookup_data(pdu).map(|f| f.out_port)) {
            Some(port) => port,
            None => return,
        };
        let crossed = pdu.crossed();
        if crossed.is_empty() {
            // 没有可以请求的节点。
            return;
        }
        let mut entry = RequestEntry::new(self.arrival_orders.next_identifier());
        entry.set_flow_id(pdu.flow_id);
        entry.set_packet_id(pdu.id);
        entry.set_outgoing_port(out_port);
        for address in crossed {
            entry.push_crossed_node(*address);
        }
        let arrival_order = entry.arrival_order();
        self.requests
            .insert(entry)
            .expect("entry fully populated before insert");
        self.stats.requests_created += 1;
        info!(
            lost_packet = pdu.id.0,
            arrival_order, "登记重传请求表项"
        );
        self.events.emit(
            tick,
            NetEvent::RequestCreated {
                node: self.id.0,
                lost_packet: pdu.id.0,
                arrival_order,
            },
        );
    }

    /// 每 tick 的重传表 housekeeping：倒计时、按到达序号发重试、清表。
    fn gpsrp_tick(&mut self, tick: u64, cfg: &TickConfig) {
        self.requests.decrease_timeouts(cfg.tick_ns());
        for order in self.requests.take_retriable() {
            let request = Pdu::request(
                PacketId(self.control_ids.next_identifier()),
                order.flow_id,
                self.address,
                order.target,
                order.lost_packet,
            );
            self.stats.retries_sent += 1;
            debug!(
                lost_packet = order.lost_packet.0,
                target = %order.target,
                attempts_left = order.attempts_left,
                "发出重传请求"
            );
            self.events.emit(
                tick,
                NetEvent::RequestRetried {
                    node: self.id.0,
                    lost_packet: order.lost_packet.0,
                    target: order.target,
                    attempts_left: order.attempts_left,
                },
            );
            self.transmit(tick, order.outgoing_port, request, cfg);
        }
        for purged in self.requests.purge() {
            if purged.exhausted {
                self.stats.exhausted += 1;
            }
            self.events.emit(
                tick,
                NetEvent::RequestPurged {
                    node: self.id.0,
                    lost_packet: purged.lost_packet.0,
                    exhausted: purged.exhausted,
                },
            );
        }
    }

    /// 拥塞水位变化时发一次事件。
    fn note_congestion(&mut self, tick: u64) {
        let level = self.ports.congestion_level();
        if level != self.last_congestion_level {
            self.last_congestion_level = level;
            self.events.emit(
                tick,
                NetEvent::CongestionChanged {
                    node: self.id.0,
                    level,
                },
            );
        }
    }
}
