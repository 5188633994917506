//! 网络模块
//!
//! 标签交换网络的核心组件：PDU、标签表、端口组、链路与交换节点。

// 子模块声明
mod error;
mod event;
mod id;
mod label;
mod link;
mod node;
mod packet;
mod port;
mod stats;

// 重新导出公共接口
pub use error::{InvalidArgument, UninitializedState};
pub use event::{DropReason, EventSink, NetEvent, TickedEvent};
pub use id::{FlowId, LinkId, NodeId, PacketId, PortId, RotaryIdGenerator};
pub use label::{Forwarding, LabelOp, LabelTable};
pub use link::{Endpoint, Link, LinkSpec, PortLink, Transfer, TransmitError};
pub use node::{DEFAULT_SWITCH_OCTETS_PER_TICK, NodeRole, SwitchingNode};
pub use packet::{
    CONTROL_PDU_OCTETS, DEFAULT_TTL, GosLevel, Label, LabelStack, Pdu, PduKind,
};
pub use port::{CapacityExceeded, DEFAULT_BUFFER_MB, Port, PortSet};
pub use stats::{NodeReport, NodeStats, SimReport};
