//! 观察者事件
//!
//! 核心以纯值形式对外发布事件：入队/出队、丢包、拥塞变化、
//! 送达以及重传表项生命周期。有没有人监听核心都照常运行。

use std::net::Ipv4Addr;
use std::sync::mpsc::{Receiver, Sender, channel};

/// 丢包原因。容量/链路类丢失是预期运行时状况，驱动重传子系统；
/// TTL 归零与路由失败只计数，不重试。
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    BufferOverflow,
    ArtificialCongestion,
    LinkBroken,
    LinkMissing,
    MtuExceeded,
    TtlExpired,
    NoRoute,
}

impl DropReason {
    /// 该类丢失是否允许进入重传恢复。
    pub fn recoverable(&self) -> bool {
        !matches!(self, DropReason::TtlExpired | DropReason::NoRoute)
    }
}

/// 网络事件
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NetEvent {
    Enqueued {
        node: usize,
        port: usize,
        pdu: u32,
        octets: u32,
    },
    Dequeued {
        node: usize,
        port: usize,
        pdu: u32,
    },
    Delivered {
        node: usize,
        pdu: u32,
    },
    Dropped {
        node: usize,
        pdu: u32,
        reason: DropReason,
    },
    CongestionChanged {
        node: usize,
        level: u64,
    },
    RequestCreated {
        node: usize,
        lost_packet: u32,
        arrival_order: u32,
    },
    RequestRetried {
        node: usize,
        lost_packet: u32,
        target: Ipv4Addr,
        attempts_left: u32,
    },
    RequestRecovered {
        node: usize,
        lost_packet: u32,
    },
    RequestPurged {
        node: usize,
        lost_packet: u32,
        exhausted: bool,
    },
}

/// 打上 tick 戳的事件记录。
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct TickedEvent {
    pub tick: u64,
    #[serde(flatten)]
    pub event: NetEvent,
}

/// 事件出口。克隆后分发给每个节点；没有接收方时发送静默失败。
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<Sender<TickedEvent>>,
}

impl EventSink {
    /// 不连接任何监听者的出口。
    pub fn disabled() -> EventSink {
        EventSink::default()
    }

    /// 创建带接收端的出口。
    pub fn channel() -> (EventSink, Receiver<TickedEvent>) {
        let (tx, rx) = channel();
        (EventSink { tx: Some(tx) }, rx)
    }

    pub fn emit(&self, tick: u64, event: NetEvent) {
        if let Some(tx) = &self.tx {
            // 接收端可能已经不在了；核心不关心。
            let _ = tx.send(TickedEvent { tick, event });
        }
    }
}
