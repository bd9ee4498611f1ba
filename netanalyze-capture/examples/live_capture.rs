//! Example: Live capture with a filter
//!
//! Captures TCP traffic to or from port 443 for ten seconds and prints the
//! statistics every two seconds.
//! Note: Requires root/administrator privileges to run.
//!
//! Run with: sudo cargo run --example live_capture -- eth0

use netanalyze_capture::{build_expression, CaptureConfig, CaptureEngine, StatsEngine};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let source = std::env::args().nth(1).unwrap_or_else(|| "any".to_string());
    let filter = build_expression(&["proto:tcp", "port:443"])?;
    println!("Capturing on {} with filter '{}'", source, filter);

    let stats = Arc::new(StatsEngine::new());
    let mut engine = CaptureEngine::new();
    engine.initialize()?;
    engine.configure(
        CaptureConfig::default().with_source(source).with_filter(filter),
        stats.clone(),
    )?;
    engine.start_live()?;

    let start = Instant::now();
    while engine.is_running() && start.elapsed() < Duration::from_secs(10) {
        thread::sleep(Duration::from_secs(2));
        stats.refresh_bandwidth();
        stats.refresh_views(5);

        let snapshot = stats.snapshot();
        println!(
            "[Stats] Packets: {}, Bytes: {}, Bandwidth: {:.0} B/s",
            snapshot.total_packets, snapshot.total_bytes, snapshot.smoothed_bandwidth
        );
        for pair in &snapshot.top_pairs {
            println!("  {} -> {}: {} bytes", pair.src, pair.dst, pair.bytes);
        }
    }

    engine.stop()?;

    println!("\n=== Capture Diagnostics ===");
    println!("{}", engine.diagnostics().format());

    Ok(())
}
