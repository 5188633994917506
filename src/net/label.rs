//! 标签/路由表
//!
//! 转发预言机：给定一个 PDU，给出下一跳端口与标签操作。
//! 入口按目的地址分类（FEC）压入标签；内部按栈顶标签交换/弹出；
//! 控制 PDU 按目的地址路由。查不到即路由失败，由调用方按丢包处理。

use std::collections::HashMap;
use std::net::Ipv4Addr;

use super::id::PortId;
use super::packet::{Label, Pdu, PduKind};

/// 标签操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelOp {
    Push(Label),
    Swap(Label),
    Pop,
}

/// 一次查表的结果：标签操作 + 出端口。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Forwarding {
    pub op: LabelOp,
    pub out_port: PortId,
}

/// 标签/路由表。拓扑构建方填充，核心只读。
#[derive(Debug, Default, Clone)]
pub struct LabelTable {
    /// 入口分类：目的地址 -> 压入标签 + 出端口
    fec: HashMap<Ipv4Addr, Forwarding>,
    /// 内部交换：入标签 -> 操作 + 出端口
    ilm: HashMap<Label, Forwarding>,
    /// 控制面：目的地址 -> 出端口
    routes: HashMap<Ipv4Addr, PortId>,
}

impl LabelTable {
    /// 登记一条入口分类规则（标签压入）。
    pub fn insert_fec(&mut self, dst: Ipv4Addr, label: Label, out_port: PortId) {
        self.fec.insert(
            dst,
            Forwarding {
                op: LabelOp::Push(label),
                out_port,
            },
        );
    }

    /// 登记一条内部交换规则。
    pub fn insert_ilm(&mut self, in_label: Label, op: LabelOp, out_port: PortId) {
        self.ilm.insert(in_label, Forwarding { op, out_port });
    }

    /// 登记一条控制面地址路由。
    pub fn insert_route(&mut self, dst: Ipv4Addr, out_port: PortId) {
        self.routes.insert(dst, out_port);
    }

    /// 数据包查表：有栈顶标签走 ILM，否则按目的地址做入口分类。
    pub fn lookup_data(&self, pdu: &Pdu) -> Option<Forwarding> {
        match &pdu.kind {
            PduKind::Data { labels, .. } => match labels.top() {
                Some(label) => self.ilm.get(&label).copied(),
                None => self.fec.get(&pdu.dst).copied(),
            },
            _ => None,
        }
    }

    /// 控制 PDU 按目的地址取出端口。
    pub fn route(&self, dst: Ipv4Addr) -> Option<PortId> {
        self.routes.get(&dst).copied()
    }
}
