//! 错误类型
//!
//! 定义调用边界上的快速失败错误。容量溢出、链路不可用等预期运行时
//! 状况不在此处：它们作为丢包结果（DropReason）上报并驱动重传子系统。

use thiserror::Error;

/// 非法参数：调用方责任，边界上立即失败，绝不在内部重试。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvalidArgument {
    #[error("number of ports must be greater than zero")]
    ZeroPorts,
    #[error("port index out of range")]
    PortIndexOutOfRange,
    #[error("port already has an attached link")]
    PortAlreadyLinked,
    #[error("mtu must be greater than zero")]
    ZeroMtu,
    #[error("tick duration must be greater than zero")]
    ZeroTickDuration,
}

/// 读取尚未写入的属性：上游时序/编程错误，立即失败，不可本地恢复。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("attribute read before it was initialized")]
pub struct UninitializedState;
