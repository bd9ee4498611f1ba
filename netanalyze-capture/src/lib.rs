//! Capture engine and traffic statistics for netanalyze
//!
//! This crate opens a live interface or a capture file through libpcap, runs
//! every frame through the dissector and folds the resulting packets into a
//! thread-safe [`StatsEngine`].
//!
//! ## Features
//!
//! - **Sources**: enumerate interfaces and look up their netmask
//! - **Filters**: turn `kind:value` tokens into a BPF expression
//! - **Engine**: explicit lifecycle, live capture thread or synchronous file replay
//! - **Statistics**: protocol, host and pair tables, recent packets, smoothed bandwidth
//!
//! ## Example
//!
//! ```no_run
//! use netanalyze_capture::{CaptureConfig, CaptureEngine, StatsEngine};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let stats = Arc::new(StatsEngine::new());
//! let mut engine = CaptureEngine::with_sources(Vec::new());
//! engine.configure(CaptureConfig::default(), stats.clone())?;
//! engine.run_offline(Path::new("trace.pcap"))?;
//!
//! stats.refresh_views(10);
//! println!("{} packets", stats.snapshot().total_packets);
//! # Ok(())
//! # }
//! ```

pub mod capture;
pub mod diagnostics;
pub mod filters;
pub mod interface;
pub mod stats;

#[cfg(test)]
mod tests;

// Re-export main types
pub use capture::{CaptureConfig, CaptureEngine, CaptureState, FrameOutcome, FrameProcessor};
pub use diagnostics::{CaptureDiagnostics, CaptureStats};
pub use filters::{build_expression, FilterKind, FilterToken};
pub use interface::{find_source, list_sources, netmask, SourceInfo};
pub use stats::{
    BandwidthSample, ExportView, HostRow, PacketRow, PacketSink, PairRow, ProtocolRow, Snapshot,
    StatsEngine, BANDWIDTH_ALPHA, BANDWIDTH_INTERVAL, DEFAULT_RECENT_LIMIT,
};
