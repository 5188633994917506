//! PDU 类型
//!
//! 定义标签交换网络的协议数据单元：带标签栈的数据包，
//! 以及 GPSRP 重传请求/应答控制包。

use std::net::Ipv4Addr;

use super::id::{FlowId, PacketId};

/// 数据包默认 TTL（每跳递减，归零即丢弃）。
pub const DEFAULT_TTL: u8 = 255;

/// 控制 PDU 的固定大小（八位组）。
pub const CONTROL_PDU_OCTETS: u32 = 64;

/// MPLS 标签
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Label(pub u32);

/// 标签栈：push/pop 只作用于栈顶。
#[derive(Debug, Clone, Default)]
pub struct LabelStack(Vec<Label>);

impl LabelStack {
    pub fn push(&mut self, label: Label) {
        self.0.push(label);
    }

    pub fn pop(&mut self) -> Option<Label> {
        self.0.pop()
    }

    pub fn top(&self) -> Option<Label> {
        self.0.last().copied()
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// 服务等级（GoS）标记。只有带标记的数据包才参与 GPSRP 恢复。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GosLevel {
    Level1,
    Level2,
    Level3,
}

/// PDU 载荷变体
#[derive(Debug, Clone)]
pub enum PduKind {
    /// 数据包：标签栈、TTL、可选 GoS 标记，以及已穿越的活动节点地址
    /// （按穿越顺序追加，最近的在末尾）。
    Data {
        labels: LabelStack,
        ttl: u8,
        gos: Option<GosLevel>,
        crossed: Vec<Ipv4Addr>,
    },
    /// 重传请求：引用丢失数据包的全局唯一 ID。
    Request { lost_packet: PacketId },
    /// 重传应答：携带恢复出的数据包，或为空表示无法恢复。
    Response {
        lost_packet: PacketId,
        recovered: Option<Box<Pdu>>,
    },
}

/// 协议数据单元
#[derive(Debug, Clone)]
pub struct Pdu {
    pub id: PacketId,
    pub flow_id: FlowId,
    pub src: Ipv4Addr,
    pub dst: Ipv4Addr,
    pub size_octets: u32,
    pub kind: PduKind,
}

impl Pdu {
    /// 创建数据包
    pub fn data(
        id: PacketId,
        flow_id: FlowId,
        src: Ipv4Addr,
        dst: Ipv4Addr,
        size_octets: u32,
        gos: Option<GosLevel>,
    ) -> Pdu {
        Pdu {
            id,
            flow_id,
            src,
            dst,
            size_octets,
            kind: PduKind::Data {
                labels: LabelStack::default(),
                ttl: DEFAULT_TTL,
                gos,
                crossed: Vec::new(),
            },
        }
    }

    /// 创建重传请求
    pub fn request(
        id: PacketId,
        flow_id: FlowId,
        src: Ipv4Addr,
        dst: Ipv4Addr,
        lost_packet: PacketId,
    ) -> Pdu {
        Pdu {
            id,
            flow_id,
            src,
            dst,
            size_octets: CONTROL_PDU_OCTETS,
            kind: PduKind::Request { lost_packet },
        }
    }

    /// 创建重传应答
    pub fn response(
        id: PacketId,
        flow_id: FlowId,
        src: Ipv4Addr,
        dst: Ipv4Addr,
        lost_packet: PacketId,
        recovered: Option<Pdu>,
    ) -> Pdu {
        let size_octets = CONTROL_PDU_OCTETS
            + recovered.as_ref().map_or(0, |pdu| pdu.size_octets);
        Pdu {
            id,
            flow_id,
            src,
            dst,
            size_octets,
            kind: PduKind::Response {
                lost_packet,
                recovered: recovered.map(Box::new),
            },
        }
    }

    pub fn is_data(&self) -> bool {
        matches!(self.kind, PduKind::Data { .. })
    }

    /// GoS 标记（非数据包返回 None）
    pub fn gos(&self) -> Option<GosLevel> {
        match &self.kind {
            PduKind::Data { gos, .. } => *gos,
            _ => None,
        }
    }

    /// 已记录的穿越路径（非数据包返回空切片）
    pub fn crossed(&self) -> &[Ipv4Addr] {
        match &self.kind {
            PduKind::Data { crossed, .. } => crossed,
            _ => &[],
        }
    }
}
