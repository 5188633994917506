//! 标识符类型
//!
//! 定义节点、端口、链路、流和数据包的唯一标识符，以及回绕式 ID 生成器。

/// 节点标识符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// 端口标识符（PortSet 内 0 起的固定下标）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PortId(pub usize);

/// 链路标识符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkId(pub usize);

/// 流标识符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlowId(pub u32);

/// 数据包全局唯一标识符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PacketId(pub u32);

/// 回绕式 ID 生成器。
///
/// 新生成器第一次返回 1；到达 `u32::MAX` 后下一次返回 0 并重新开始。
/// 用于数据包全局 ID 和重传表项的 arrival order 分配。
#[derive(Debug, Clone, Default)]
pub struct RotaryIdGenerator {
    identifier: u32,
}

impl RotaryIdGenerator {
    pub fn new() -> RotaryIdGenerator {
        RotaryIdGenerator::default()
    }

    /// 回到初始状态（下一次返回 1）。
    pub fn reset(&mut self) {
        self.identifier = 0;
    }

    /// 返回下一个标识符。
    pub fn next_identifier(&mut self) -> u32 {
        if self.identifier >= u32::MAX {
            self.identifier = 0;
        } else {
            self.identifier += 1;
        }
        self.identifier
    }

    /// 覆盖当前计数值；下一次返回 `identifier + 1`（或回绕后的 0）。
    pub fn set_identifier(&mut self, identifier: u32) {
        self.identifier = identifier;
    }
}
