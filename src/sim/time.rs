//! 仿真时间类型
//!
//! 定义仿真时间及 tick 配置（tick 时长与时延量化）。

use crate::net::InvalidArgument;

/// 仿真时间（纳秒）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct SimTime(pub u64);

impl SimTime {
    pub const ZERO: SimTime = SimTime(0);
    pub fn from_micros(us: u64) -> SimTime {
        SimTime(us.saturating_mul(1_000))
    }
    pub fn from_millis(ms: u64) -> SimTime {
        SimTime(ms.saturating_mul(1_000_000))
    }
    pub fn from_secs(s: u64) -> SimTime {
        SimTime(s.saturating_mul(1_000_000_000))
    }
}

/// Tick 配置：每个 tick 的虚拟时长。
///
/// 所有节点以 tick 为步长同步推进；链路时延按 tick 向上取整量化，
/// 且至少为 1 个 tick，发送 tick 内对端不可见。
#[derive(Debug, Clone, Copy)]
pub struct TickConfig {
    tick_ns: u64,
}

impl TickConfig {
    pub fn new(tick: SimTime) -> Result<TickConfig, InvalidArgument> {
        if tick.0 == 0 {
            return Err(InvalidArgument::ZeroTickDuration);
        }
        Ok(TickConfig { tick_ns: tick.0 })
    }

    /// 每个 tick 的纳秒数
    pub fn tick_ns(&self) -> u64 {
        self.tick_ns
    }

    /// 把一段时延量化为 tick 数（向上取整，至少 1）。
    pub fn ticks_for(&self, delay: SimTime) -> u64 {
        delay.0.div_ceil(self.tick_ns).max(1)
    }
}
