//! 链路类型
//!
//! 两个端口之间的定时传输。发送即调度：发起方计算到达 tick 并把
//! Transfer 投递到对端节点的收件箱，立即返回，从不阻塞。
//! 链路可被标记为断开；断开期间拒绝一切传输。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;

use crate::sim::{SimTime, TickConfig};

use super::error::InvalidArgument;
use super::id::{LinkId, NodeId, PortId};
use super::packet::Pdu;

/// 跨节点投递单元：在 `deliver_at` tick 进入接收节点 `port` 的输入队列。
/// (origin, seq) 用于接收侧的确定性排序。
#[derive(Debug)]
pub struct Transfer {
    pub deliver_at: u64,
    pub port: PortId,
    pub origin: NodeId,
    pub seq: u64,
    pub pdu: Pdu,
}

/// 链路参数：传播时延与 MTU。
#[derive(Debug, Clone, Copy)]
pub struct LinkSpec {
    pub delay: SimTime,
    pub mtu_octets: u32,
}

impl LinkSpec {
    pub fn new(delay: SimTime, mtu_octets: u32) -> Result<LinkSpec, InvalidArgument> {
        if mtu_octets == 0 {
            return Err(InvalidArgument::ZeroMtu);
        }
        Ok(LinkSpec { delay, mtu_octets })
    }
}

/// 链路一端：对端节点的收件箱与输入端口。
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub node: NodeId,
    pub port: PortId,
    pub(crate) tx: Sender<Transfer>,
}

impl Endpoint {
    pub fn new(node: NodeId, port: PortId, tx: Sender<Transfer>) -> Endpoint {
        Endpoint { node, port, tx }
    }
}

/// 传输失败：PDU 原样交还，由节点按丢包结果分类。
#[derive(Debug)]
pub enum TransmitError {
    /// 链路断开（或对端已经不存在）。
    Broken(Pdu),
    /// PDU 超过链路 MTU，在发起端口处丢弃。
    OverMtu(Pdu),
}

/// 网络链路。恰好终结于两个端口；被两端节点共享，
/// 但只通过投递调度机制变动，绝不并发写。
#[derive(Debug)]
pub struct Link {
    id: LinkId,
    spec: LinkSpec,
    broken: AtomicBool,
    ends: [Endpoint; 2],
}

impl Link {
    pub fn new(id: LinkId, spec: LinkSpec, ends: [Endpoint; 2]) -> Arc<Link> {
        Arc::new(Link {
            id,
            spec,
            broken: AtomicBool::new(false),
            ends,
        })
    }

    pub fn id(&self) -> LinkId {
        self.id
    }

    pub fn spec(&self) -> LinkSpec {
        self.spec
    }

    pub fn is_broken(&self) -> bool {
        self.broken.load(Ordering::Acquire)
    }

    /// 运维面：标记/恢复断开。断开期间两端都不可用。
    pub fn set_broken(&self, broken: bool) {
        self.broken.store(broken, Ordering::Release);
    }

    /// 端点信息（`end` 为 0 或 1）。
    pub fn endpoint(&self, end: usize) -> &Endpoint {
        &self.ends[end]
    }

    /// 从 `from_end` 端发出 PDU：校验断开与 MTU，计算到达 tick，
    /// 投递到对端收件箱。
    pub fn transmit(
        &self,
        from_end: usize,
        pdu: Pdu,
        now_tick: u64,
        cfg: &TickConfig,
        origin: NodeId,
        seq: u64,
    ) -> Result<u64, TransmitError> {
        if self.is_broken() {
            return Err(TransmitError::Broken(pdu));
        }
        if pdu.size_octets > self.spec.mtu_octets {
            return Err(TransmitError::OverMtu(pdu));
        }
        let peer = &self.ends[1 - from_end];
        let deliver_at = now_tick.saturating_add(cfg.ticks_for(self.spec.delay));
        let transfer = Transfer {
            deliver_at,
            port: peer.port,
            origin,
            seq,
            pdu,
        };
        match peer.tx.send(transfer) {
            Ok(()) => Ok(deliver_at),
            // 对端收件箱已关闭，等同链路不可用。
            Err(err) => Err(TransmitError::Broken(err.0.pdu)),
        }
    }
}

/// 端口上挂的链路引用：`end` 标记本节点位于哪一端。
#[derive(Debug, Clone)]
pub struct PortLink {
    link: Arc<Link>,
    end: usize,
}

impl PortLink {
    pub fn new(link: Arc<Link>, end: usize) -> PortLink {
        PortLink { link, end }
    }

    pub fn link(&self) -> &Arc<Link> {
        &self.link
    }

    pub fn end(&self) -> usize {
        self.end
    }
}
