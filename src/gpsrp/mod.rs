//! GPSRP 重传请求子系统
//!
//! 逐跳恢复特定丢失包：表项跟踪每次在途恢复尝试，
//! 请求发往已知转发过该包的最近节点。

mod cache;
mod entry;
mod table;

pub use cache::{DEFAULT_CACHE_OCTETS, GosPacketCache};
pub use entry::{DEFAULT_ATTEMPTS, DEFAULT_TIMEOUT_NS, RequestEntry};
pub use table::{PurgedEntry, RequestTable, RetryOrder};
