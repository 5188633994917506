//! 仿真核心模块
//!
//! 此模块包含 tick 同步仿真的核心组件：仿真时间、tick 配置与协调器。

// 子模块声明
mod coordinator;
mod time;

// 重新导出公共接口
pub use coordinator::{Coordinator, SimError, StopHandle};
pub use time::{SimTime, TickConfig};
