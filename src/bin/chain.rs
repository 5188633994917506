//! 链式拓扑仿真
//!
//! 运行链式拓扑的单流发包示例，可叠加人工拥塞或断链
//! 来观察 GPSRP 丢包恢复。

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use clap::Parser;
use mplsim_rs::net::{EventSink, GosLevel, SimReport};
use mplsim_rs::sim::{Coordinator, SimTime, TickConfig};
use mplsim_rs::topo::{ChainOpts, build_chain};
use mplsim_rs::viz::EventLog;

#[derive(Debug, Parser)]
#[command(name = "chain", about = "链式拓扑仿真：ler0->lerN 单流发包 + GPSRP 恢复")]
struct Args {
    /// 两个边缘节点之间的 LSR 数量
    #[arg(long, default_value_t = 2)]
    interior: usize,
    #[arg(long, default_value_t = 20)]
    pkts: u64,
    #[arg(long, default_value_t = 1500)]
    pkt_octets: u32,
    /// 两个 packet 注入间隔（tick）
    #[arg(long, default_value_t = 2)]
    gap_ticks: u64,
    /// 每个 tick 的虚拟时长（纳秒）
    #[arg(long, default_value_t = 1_000)]
    tick_ns: u64,
    /// 链路传播时延（纳秒）
    #[arg(long, default_value_t = 1_000)]
    link_delay_ns: u64,
    /// 仿真运行多少 tick
    #[arg(long, default_value_t = 400)]
    ticks: u64,
    /// 人工拥塞中间的 LSR，制造 GoS 丢包
    #[arg(long)]
    congest: bool,
    /// 断开最后一条链路，观察重试预算耗尽
    #[arg(long)]
    break_link: bool,
    /// 把事件流写成 JSONL
    #[arg(long)]
    events_out: Option<PathBuf>,
    /// 从 JSON 文件读取拓扑选项（覆盖 --interior / --link-delay-ns）
    #[arg(long)]
    opts: Option<PathBuf>,
}

fn main() {
    // 初始化 tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();

    let args = Args::parse();

    let opts = match &args.opts {
        Some(path) => {
            let text = std::fs::read_to_string(path).expect("read opts file");
            serde_json::from_str(&text).expect("parse chain options")
        }
        None => ChainOpts {
            interior: args.interior,
            link_delay_ns: args.link_delay_ns,
            ..ChainOpts::default()
        },
    };

    let (events, rx) = EventSink::channel();
    let log = EventLog::new(rx);
    let mut chain = build_chain(&opts, events).expect("valid chain options");

    if args.congest {
        let middle = chain.nodes.len() / 2;
        chain.nodes[middle]
            .ports_mut()
            .set_artificially_congested(true);
        println!("artificially congesting node {middle}");
    }
    if args.break_link {
        let last = chain.links.last().expect("chain has links");
        last.set_broken(true);
        println!("breaking link {}", chain.links.len() - 1);
    }

    for i in 0..args.pkts {
        chain
            .injector
            .inject_data(i * args.gap_ticks, args.pkt_octets, Some(GosLevel::Level1));
    }

    let cfg = TickConfig::new(SimTime(args.tick_ns)).expect("non-zero tick");
    let coordinator = Coordinator::new(cfg);
    let report = match coordinator.run(chain.nodes, args.ticks) {
        Ok(report) => report,
        Err(err) => {
            eprintln!("simulation failed: {err}");
            std::process::exit(1);
        }
    };

    if let Some(path) = &args.events_out {
        let file = File::create(path).expect("create events file");
        let mut out = BufWriter::new(file);
        let lines = log.drain_to(&mut out).expect("write events");
        println!("wrote {lines} events to {}", path.display());
    }

    print_summary(&report);
}

fn print_summary(report: &SimReport) {
    println!(
        "done @ tick {}, delivered={}, dropped={}, recovered={}",
        report.ticks_run,
        report.total_delivered(),
        report.total_dropped(),
        report.total_recovered()
    );
    for node in &report.nodes {
        println!(
            "  node {} ({}) rx={} sw={} dlv={} drop={} req={} retry={} rec={} exh={}",
            node.node,
            node.address,
            node.stats.received,
            node.stats.switched,
            node.stats.delivered,
            node.stats.total_dropped(),
            node.stats.requests_created,
            node.stats.retries_sent,
            node.stats.recovered,
            node.stats.exhausted
        );
    }
}
