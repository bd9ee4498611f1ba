//! Capture-loop diagnostics
//!
//! Lock-free counters describing what happened to every frame the source
//! delivered. These never touch the statistics engine's lock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Point-in-time view of the capture-loop counters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaptureStats {
    /// Frames delivered by the capture source
    pub frames_received: u64,
    /// Frames dissected and handed to the statistics sink
    pub frames_recorded: u64,
    /// Non-IP frames (VLAN, ARP, other ethertypes)
    pub frames_skipped: u64,
    /// Frames with truncated or implausible headers
    pub frames_malformed: u64,
    /// Frames that arrived after a stop request
    pub frames_dropped: u64,
    /// Bytes on the wire of all received frames
    pub bytes_received: u64,
    /// Time since the diagnostics were created
    pub duration: Duration,
}

impl CaptureStats {
    /// Malformed frames as percentage of received frames
    pub fn malformed_rate(&self) -> f64 {
        if self.frames_received == 0 {
            return 0.0;
        }
        (self.frames_malformed as f64 / self.frames_received as f64) * 100.0
    }

    /// Frames per second over the whole duration
    pub fn frames_per_second(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.frames_received as f64 / secs
        } else {
            0.0
        }
    }

    /// Format statistics as human-readable string
    pub fn format(&self) -> String {
        format!(
            "Received: {} frames ({} bytes)\n\
             Recorded: {} frames\n\
             Skipped: {} frames\n\
             Malformed: {} frames ({:.2}%)\n\
             Dropped after stop: {} frames\n\
             Duration: {:.2}s ({:.2} fps)",
            self.frames_received,
            self.bytes_received,
            self.frames_recorded,
            self.frames_skipped,
            self.frames_malformed,
            self.malformed_rate(),
            self.frames_dropped,
            self.duration.as_secs_f64(),
            self.frames_per_second()
        )
    }
}

/// Thread-safe counters shared between the engine and its capture thread
#[derive(Debug, Clone)]
pub struct CaptureDiagnostics {
    frames_received: Arc<AtomicU64>,
    frames_recorded: Arc<AtomicU64>,
    frames_skipped: Arc<AtomicU64>,
    frames_malformed: Arc<AtomicU64>,
    frames_dropped: Arc<AtomicU64>,
    bytes_received: Arc<AtomicU64>,
    start_time: Instant,
}

impl CaptureDiagnostics {
    pub fn new() -> Self {
        Self {
            frames_received: Arc::new(AtomicU64::new(0)),
            frames_recorded: Arc::new(AtomicU64::new(0)),
            frames_skipped: Arc::new(AtomicU64::new(0)),
            frames_malformed: Arc::new(AtomicU64::new(0)),
            frames_dropped: Arc::new(AtomicU64::new(0)),
            bytes_received: Arc::new(AtomicU64::new(0)),
            start_time: Instant::now(),
        }
    }

    pub fn record_received(&self, wire_len: u32) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received
            .fetch_add(u64::from(wire_len), Ordering::Relaxed);
    }

    pub fn record_recorded(&self) {
        self.frames_recorded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skipped(&self) {
        self.frames_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_malformed(&self) {
        self.frames_malformed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.frames_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current statistics snapshot
    pub fn snapshot(&self) -> CaptureStats {
        CaptureStats {
            frames_received: self.frames_received.load(Ordering::Relaxed),
            frames_recorded: self.frames_recorded.load(Ordering::Relaxed),
            frames_skipped: self.frames_skipped.load(Ordering::Relaxed),
            frames_malformed: self.frames_malformed.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            duration: self.start_time.elapsed(),
        }
    }
}

impl Default for CaptureDiagnostics {
    fn default() -> Self {
        Self::new()
    }
}
