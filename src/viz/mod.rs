//! 可视化/统计输出
//!
//! 把核心发布的事件流落成 JSON Lines，供外部可视化与报表层消费。
//! 核心不依赖这里：没人排水事件也照常跑。

use std::io::{self, Write};
use std::sync::mpsc::Receiver;

use crate::net::TickedEvent;

/// 事件日志：持有事件通道接收端，按需排水。
pub struct EventLog {
    rx: Receiver<TickedEvent>,
}

impl EventLog {
    pub fn new(rx: Receiver<TickedEvent>) -> EventLog {
        EventLog { rx }
    }

    /// 取出目前积压的全部事件。
    pub fn drain(&self) -> Vec<TickedEvent> {
        let mut events = Vec::new();
        while let Ok(ev) = self.rx.try_recv() {
            events.push(ev);
        }
        events
    }

    /// 把积压事件写成 JSONL，返回写出的行数。
    pub fn drain_to<W: Write>(&self, out: &mut W) -> io::Result<usize> {
        let mut lines = 0;
        while let Ok(ev) = self.rx.try_recv() {
            let line = serde_json::to_string(&ev).map_err(io::Error::other)?;
            writeln!(out, "{line}")?;
            lines += 1;
        }
        Ok(lines)
    }
}
