//! 拓扑构建模块

mod chain;

pub use chain::{Chain, ChainOpts, Injector, build_chain};
