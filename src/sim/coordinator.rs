//! 仿真协调器
//!
//! 推进全局虚拟 tick 并在每个 tick 释放所有节点各做一个单位的工作，
//! 然后在屏障处等齐全部完成报告再推进。tick 序号对节点只增不回退；
//! 有节点迟迟不报告是致命状况，必须浮出，不允许悄悄跳过。

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender, channel};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::net::{NodeId, NodeReport, SimReport, SwitchingNode};

use super::time::TickConfig;

/// 协调器致命错误。
#[derive(Debug, Error)]
pub enum SimError {
    #[error("tick {tick}: {missing} node(s) never reported completion")]
    NodeStalled { tick: u64, missing: usize },
    #[error("a node thread panicked during the run")]
    NodePanicked,
}

/// 停止句柄：请求停止后，进行中的 tick 照常完成，只是不再释放下一个。
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> StopHandle {
        StopHandle::default()
    }

    pub fn request_stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

enum NodeCtrl {
    Tick(u64),
    Shutdown,
}

struct NodeHandle {
    id: NodeId,
    ctrl: Sender<NodeCtrl>,
    join: JoinHandle<NodeReport>,
}

/// tick 屏障协调器。
#[derive(Debug, Clone, Copy)]
pub struct Coordinator {
    cfg: TickConfig,
    stall_timeout: Duration,
}

impl Coordinator {
    pub fn new(cfg: TickConfig) -> Coordinator {
        Coordinator {
            cfg,
            stall_timeout: Duration::from_secs(5),
        }
    }

    /// 调整判定节点卡死的真实时间阈值。
    pub fn with_stall_timeout(mut self, stall_timeout: Duration) -> Coordinator {
        self.stall_timeout = stall_timeout;
        self
    }

    pub fn tick_config(&self) -> TickConfig {
        self.cfg
    }

    /// 运行 `ticks` 个 tick 后正常收尾。
    pub fn run(&self, nodes: Vec<SwitchingNode>, ticks: u64) -> Result<SimReport, SimError> {
        self.run_with_stop(nodes, ticks, &StopHandle::new())
    }

    /// 同 [`Coordinator::run`]，外加可从别处触发的提前停止。
    #[tracing::instrument(skip(self, nodes, stop), fields(node_count = nodes.len()))]
    pub fn run_with_stop(
        &self,
        nodes: Vec<SwitchingNode>,
        ticks: u64,
        stop: &StopHandle,
    ) -> Result<SimReport, SimError> {
        info!("▶️  仿真开始");
        let (done_tx, done_rx) = channel::<NodeId>();
        let mut handles = Vec::with_capacity(nodes.len());
        for mut node in nodes {
            let id = node.id();
            let (ctrl_tx, ctrl_rx) = channel::<NodeCtrl>();
            let done_tx = done_tx.clone();
            let cfg = self.cfg;
            let join = thread::spawn(move || {
                // 节点线程：被释放则做一个 tick 的工作并报告；
                // 控制通道关闭等同关机。
                while let Ok(msg) = ctrl_rx.recv() {
                    match msg {
                        NodeCtrl::Tick(tick) => {
                            node.run_tick(tick, &cfg);
                            let _ = done_tx.send(node.id());
                        }
                        NodeCtrl::Shutdown => break,
                    }
                }
                node.into_report()
            });
            handles.push(NodeHandle {
                id,
                ctrl: ctrl_tx,
                join,
            });
        }
        drop(done_tx);

        let mut ticks_run = 0;
        for tick in 0..ticks {
            if stop.is_stop_requested() {
                info!(tick, "收到停止请求，不再释放后续 tick");
                break;
            }
            self.barrier_tick(tick, &handles, &done_rx)?;
            ticks_run = tick + 1;
        }

        for handle in &handles {
            let _ = handle.ctrl.send(NodeCtrl::Shutdown);
        }
        let mut reports = Vec::with_capacity(handles.len());
        for handle in handles {
            let report = handle.join.join().map_err(|_| SimError::NodePanicked)?;
            reports.push(report);
        }
        reports.sort_by_key(|r| r.node);

        info!(ticks_run, "✅ 仿真完成");
        Ok(SimReport {
            ticks_run,
            nodes: reports,
        })
    }

    /// 释放一个 tick 并等齐所有节点的完成报告。
    fn barrier_tick(
        &self,
        tick: u64,
        handles: &[NodeHandle],
        done_rx: &Receiver<NodeId>,
    ) -> Result<(), SimError> {
        let mut waiting: HashSet<NodeId> = handles.iter().map(|h| h.id).collect();
        for handle in handles {
            if handle.ctrl.send(NodeCtrl::Tick(tick)).is_err() {
                // 控制通道断了说明节点线程已经没了。
                warn!(node = handle.id.0, tick, "节点不再接受释放");
                return Err(SimError::NodeStalled {
                    tick,
                    missing: waiting.len(),
                });
            }
        }
        while !waiting.is_empty() {
            match done_rx.recv_timeout(self.stall_timeout) {
                Ok(id) => {
                    waiting.remove(&id);
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    warn!(tick, missing = waiting.len(), "节点卡死，终止仿真");
                    return Err(SimError::NodeStalled {
                        tick,
                        missing: waiting.len(),
                    });
                }
            }
        }
        debug!(tick, "屏障通过");
        Ok(())
    }
}
