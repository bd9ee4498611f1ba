//! One analysis run: open the source, collect, present, export

use netanalyze_capture::{
    build_expression, list_sources, CaptureConfig, CaptureEngine, Snapshot, StatsEngine,
};
use netanalyze_core::Result;
use netanalyze_tui::{format_bytes, format_rate, run_dashboard, DashboardConfig};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::args::Cli;
use crate::export::{export_csv, export_json};

/// Poll interval while waiting for a headless live capture
const HEADLESS_POLL: Duration = Duration::from_millis(200);

/// Process a capture file to completion
///
/// The returned engine is already stopped; the statistics hold every packet
/// the filter let through and a freshly published snapshot.
pub fn replay_file(
    path: &Path,
    config: CaptureConfig,
    stats: &Arc<StatsEngine>,
    top_n: usize,
) -> Result<CaptureEngine> {
    let mut engine = CaptureEngine::with_sources(Vec::new());
    engine.configure(config, stats.clone())?;
    engine.run_offline(path)?;

    stats.refresh_bandwidth();
    stats.refresh_views(top_n);
    Ok(engine)
}

/// Enumerate sources and start a live capture thread
pub fn start_live(config: CaptureConfig, stats: &Arc<StatsEngine>) -> Result<CaptureEngine> {
    let mut engine = CaptureEngine::new();
    engine.initialize()?;
    engine.configure(config, stats.clone())?;
    engine.start_live()?;
    Ok(engine)
}

/// Flag raised by Ctrl+C
///
/// Without a handler the default SIGINT action would end the process before
/// the engine is stopped and the reports are written.
pub fn interrupt_flag() -> Arc<AtomicBool> {
    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&interrupted);
    if let Err(e) = ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
    }) {
        warn!("Error setting Ctrl+C handler: {}", e);
    }
    interrupted
}

/// Block until the capture ends by itself, the time limit passes or the
/// interrupt flag is raised
pub fn wait_for_capture(
    engine: &CaptureEngine,
    stats: &StatsEngine,
    time_limit: Option<Duration>,
    interrupted: &AtomicBool,
) {
    wait_until_done(|| engine.is_running(), stats, time_limit, interrupted);
}

fn wait_until_done(
    is_running: impl Fn() -> bool,
    stats: &StatsEngine,
    time_limit: Option<Duration>,
    interrupted: &AtomicBool,
) {
    let started = Instant::now();
    while is_running() {
        if interrupted.load(Ordering::SeqCst) {
            info!("Interrupted, stopping capture");
            break;
        }
        if time_limit.map_or(false, |limit| started.elapsed() >= limit) {
            debug!("Capture time limit reached");
            break;
        }
        stats.refresh_bandwidth();
        thread::sleep(HEADLESS_POLL);
    }
}

/// Plain-text summary of a snapshot
pub fn format_summary(snapshot: &Snapshot) -> String {
    let mut out = format!(
        "Packets: {}  Bytes: {}  Bandwidth: {} (peak {})\n",
        snapshot.total_packets,
        format_bytes(snapshot.total_bytes),
        format_rate(snapshot.smoothed_bandwidth),
        format_rate(snapshot.max_bandwidth)
    );

    out.push_str("\nTransport:\n");
    for row in &snapshot.transport {
        out.push_str(&format!(
            "  {:<8} {:>10} packets {:>12} {:>6.1}%\n",
            row.protocol.to_string(),
            row.packets,
            format_bytes(row.bytes),
            row.percent
        ));
    }

    out.push_str("\nApplication:\n");
    for row in &snapshot.application {
        out.push_str(&format!(
            "  {:<8} {:>10} packets {:>12} payload\n",
            row.protocol.to_string(),
            row.packets,
            format_bytes(row.bytes)
        ));
    }

    out.push_str("\nTop IPs:\n");
    for host in &snapshot.top_hosts {
        out.push_str(&format!(
            "  {:<40} sent {:>8} recv {:>8}\n",
            host.ip.to_string(),
            host.packets_sent,
            host.packets_received
        ));
    }

    out.push_str("\nTop conversations:\n");
    for pair in &snapshot.top_pairs {
        out.push_str(&format!(
            "  {} -> {}  {} packets, {}\n",
            pair.src,
            pair.dst,
            pair.packets,
            format_bytes(pair.bytes)
        ));
    }

    out
}

/// Run the whole program for parsed arguments
pub fn run(cli: &Cli) -> Result<()> {
    if cli.list_interfaces {
        for source in list_sources()? {
            println!("{}", source.display_line());
        }
        return Ok(());
    }

    let filter = build_expression(cli.filters.as_slice())?;
    let config = cli.capture_config(filter.clone());
    let stats = Arc::new(StatsEngine::new());

    let mut engine = match &cli.pcap {
        Some(path) => replay_file(path, config, &stats, cli.limit)?,
        None => start_live(config, &stats)?,
    };

    if cli.headless {
        let interrupted = interrupt_flag();
        wait_for_capture(&engine, &stats, cli.time_limit(), &interrupted);
        engine.stop()?;
        stats.refresh_bandwidth();
        stats.refresh_views(cli.limit);
        print!("{}", format_summary(&stats.snapshot()));
    } else {
        let dashboard = DashboardConfig {
            source: cli.source_label(),
            filter,
            top_n: cli.limit,
            time_limit: cli.time_limit(),
        };
        run_dashboard(stats.clone(), &mut engine, dashboard)?;
        engine.stop()?;
    }

    info!("Capture diagnostics:\n{}", engine.diagnostics().format());

    let view = stats.export_view();
    if let Some(path) = &cli.csv {
        export_csv(&view, path)?;
    }
    if let Some(path) = &cli.json {
        export_json(&view, path)?;
    }

    Ok(())
}
