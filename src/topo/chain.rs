//! 链式拓扑构建
//!
//! ler0 <-> lsr1 <-> … <-> lerN 的线性标签交换路径：入口压标签、
//! 内部逐跳交换、出口摘标签送达。场景搭建方在这里完成建图、
//! 标签/路由表填充与链路接线，核心只消费建好的节点。

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::sync::mpsc::Sender;

use serde::{Deserialize, Serialize};

use crate::gpsrp::DEFAULT_CACHE_OCTETS;
use crate::net::{
    DEFAULT_SWITCH_OCTETS_PER_TICK, Endpoint, EventSink, FlowId, GosLevel, InvalidArgument, Label,
    LabelOp, Link, LinkId, LinkSpec, NodeId, NodeRole, PacketId, Pdu, PortId, RotaryIdGenerator,
    SwitchingNode, Transfer,
};
use crate::sim::SimTime;

/// 链式拓扑配置选项
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainOpts {
    /// 两个边缘节点之间的 LSR 数量
    pub interior: usize,
    /// 边缘节点是否参与 GPSRP
    pub edge_active: bool,
    /// 内部节点是否参与 GPSRP
    pub interior_active: bool,
    pub buffer_mb: u64,
    pub link_delay_ns: u64,
    pub mtu_octets: u32,
    pub switch_octets_per_tick: u64,
    pub cache_octets: u64,
}

impl Default for ChainOpts {
    fn default() -> Self {
        Self {
            interior: 2,
            edge_active: true,
            interior_active: true,
            buffer_mb: 1,
            link_delay_ns: 1_000,
            mtu_octets: 2_048,
            switch_octets_per_tick: DEFAULT_SWITCH_OCTETS_PER_TICK,
            cache_octets: DEFAULT_CACHE_OCTETS,
        }
    }
}

/// 建好的链式拓扑。
pub struct Chain {
    pub nodes: Vec<SwitchingNode>,
    pub links: Vec<Arc<Link>>,
    pub addresses: Vec<Ipv4Addr>,
    pub injector: Injector,
}

impl Chain {
    /// 入口边缘节点
    pub fn ingress(&self) -> NodeId {
        NodeId(0)
    }

    /// 出口边缘节点
    pub fn egress(&self) -> NodeId {
        NodeId(self.nodes.len() - 1)
    }
}

fn chain_address(index: usize) -> Ipv4Addr {
    Ipv4Addr::new(10, 0, 0, (index + 1) as u8)
}

/// 构建链式拓扑
///
/// 拓扑结构：ler0 <-> lsr1 <-> … <-> lsrK <-> lerN
/// 数据流方向：ler0 -> lerN（入口压 Label(101)，内部逐跳 +1 交换）。
pub fn build_chain(opts: &ChainOpts, events: EventSink) -> Result<Chain, InvalidArgument> {
    let count = opts.interior + 2;
    let addresses: Vec<Ipv4Addr> = (0..count).map(chain_address).collect();
    let egress_addr = addresses[count - 1];

    let mut nodes = Vec::with_capacity(count);
    for (i, &address) in addresses.iter().enumerate() {
        let edge = i == 0 || i == count - 1;
        let role = if edge { NodeRole::Edge } else { NodeRole::Switch };
        let active = if edge {
            opts.edge_active
        } else {
            opts.interior_active
        };
        let mut node = SwitchingNode::new(
            NodeId(i),
            address,
            role,
            active,
            2,
            opts.cache_octets,
            events.clone(),
        )?;
        node.set_switch_octets_per_tick(opts.switch_octets_per_tick);
        node.ports_mut().set_buffer_size_mb(opts.buffer_mb);
        nodes.push(node);
    }

    // 标签编排：入口压 101，第 j 个 LSR 把 100+j 换成 101+j。
    nodes[0]
        .labels_mut()
        .insert_fec(egress_addr, Label(101), PortId(1));
    for j in 1..=opts.interior {
        nodes[j].labels_mut().insert_ilm(
            Label(100 + j as u32),
            LabelOp::Swap(Label(101 + j as u32)),
            PortId(1),
        );
    }

    // 控制面地址路由：上游走端口 0，下游走端口 1。
    for i in 0..count {
        for (m, &address) in addresses.iter().enumerate() {
            if m < i {
                nodes[i].labels_mut().insert_route(address, PortId(0));
            } else if m > i {
                nodes[i].labels_mut().insert_route(address, PortId(1));
            }
        }
    }

    // 链路接线：节点 i 的端口 1 对节点 i+1 的端口 0。
    let spec = LinkSpec::new(SimTime(opts.link_delay_ns), opts.mtu_octets)?;
    let mut links = Vec::with_capacity(count - 1);
    for i in 0..count - 1 {
        let link = Link::new(
            LinkId(i),
            spec,
            [
                Endpoint::new(nodes[i].id(), PortId(1), nodes[i].inbox_sender()),
                Endpoint::new(nodes[i + 1].id(), PortId(0), nodes[i + 1].inbox_sender()),
            ],
        );
        nodes[i]
            .ports_mut()
            .connect_link_to_port(link.clone(), 0, PortId(1))?;
        nodes[i + 1]
            .ports_mut()
            .connect_link_to_port(link.clone(), 1, PortId(0))?;
        links.push(link);
    }

    let injector = Injector {
        node: nodes[0].id(),
        tx: nodes[0].inbox_sender(),
        port: PortId(0),
        src: addresses[0],
        dst: egress_addr,
        flow_id: FlowId(1),
        ids: RotaryIdGenerator::new(),
        seq: 0,
    };

    Ok(Chain {
        nodes,
        links,
        addresses,
        injector,
    })
}

/// 流量注入器：把数据包投进入口节点的主机侧端口。
pub struct Injector {
    node: NodeId,
    tx: Sender<Transfer>,
    port: PortId,
    src: Ipv4Addr,
    dst: Ipv4Addr,
    flow_id: FlowId,
    ids: RotaryIdGenerator,
    seq: u64,
}

impl Injector {
    /// 在指定 tick 注入一个数据包，返回分配的全局 ID。
    pub fn inject_data(
        &mut self,
        deliver_at: u64,
        size_octets: u32,
        gos: Option<GosLevel>,
    ) -> PacketId {
        let id = PacketId(self.ids.next_identifier());
        let pdu = Pdu::data(id, self.flow_id, self.src, self.dst, size_octets, gos);
        self.inject(deliver_at, pdu);
        id
    }

    /// 注入任意 PDU。
    pub fn inject(&mut self, deliver_at: u64, pdu: Pdu) {
        self.seq += 1;
        // 节点还没起跑或已经收尾时静默失败，和链路投递一个待遇。
        let _ = self.tx.send(Transfer {
            deliver_at,
            port: self.port,
            origin: self.node,
            seq: self.seq,
            pdu,
        });
    }
}
