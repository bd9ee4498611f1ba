//! Capture engine: source lifecycle and the receive loop
//!
//! The engine moves through `Uninitialized -> Initialized -> Configured ->
//! Running -> Stopped`. Live captures run the receive loop on a dedicated
//! thread; offline captures run it on the caller's thread until end of file.
//! Every frame goes through the same [`FrameProcessor`], which dissects it and
//! forwards accepted packets to the configured [`PacketSink`].

use netanalyze_core::{Error, Result};
use netanalyze_packet::{LinkLayer, Packet, RawFrame};
use pcap::{Activated, Capture};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, trace, warn};

use crate::diagnostics::{CaptureDiagnostics, CaptureStats};
use crate::interface::{find_source, list_sources, netmask, SourceInfo};
use crate::stats::{PacketSink, DEFAULT_RECENT_LIMIT};

/// Default snapshot length (maximum bytes per packet)
pub const DEFAULT_SNAPLEN: i32 = 65535;

/// Default read timeout; bounds how long `stop()` waits for the loop
pub const DEFAULT_TIMEOUT_MS: i32 = 250;

/// Configuration for a capture run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConfig {
    /// Source name for live captures
    pub source: String,
    /// Frames to process before stopping (0 = unlimited)
    pub packet_count_limit: u64,
    /// BPF filter expression, empty for none
    pub filter: String,
    /// Recent packets retained by the sink
    pub recent_packet_limit: usize,
    /// Maximum bytes to capture per packet
    pub snaplen: i32,
    /// Read timeout in milliseconds
    pub timeout_ms: i32,
    /// Enable promiscuous mode
    pub promiscuous: bool,
    /// Deliver packets as soon as they arrive
    pub immediate_mode: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            source: "any".to_string(),
            packet_count_limit: 0,
            filter: String::new(),
            recent_packet_limit: DEFAULT_RECENT_LIMIT,
            snaplen: DEFAULT_SNAPLEN,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            promiscuous: true,
            immediate_mode: true,
        }
    }
}

impl CaptureConfig {
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_packet_count_limit(mut self, limit: u64) -> Self {
        self.packet_count_limit = limit;
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    pub fn with_recent_packet_limit(mut self, limit: usize) -> Self {
        self.recent_packet_limit = limit;
        self
    }

    pub fn with_snaplen(mut self, snaplen: i32) -> Self {
        self.snaplen = snaplen;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: i32) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_promiscuous(mut self, promiscuous: bool) -> Self {
        self.promiscuous = promiscuous;
        self
    }

    pub fn with_immediate_mode(mut self, immediate_mode: bool) -> Self {
        self.immediate_mode = immediate_mode;
        self
    }
}

/// Lifecycle state of the capture engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    /// Sources not yet enumerated
    Uninitialized,
    /// Sources enumerated
    Initialized,
    /// Configuration and sink accepted
    Configured,
    /// Receive loop active
    Running,
    /// Capture finished or stopped; handle released
    Stopped,
}

/// What happened to one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Recorded,
    Skipped,
    Malformed,
    /// Arrived while the engine was not running
    Dropped,
}

/// Per-frame processing bound to one capture run
pub struct FrameProcessor {
    link: LinkLayer,
    sink: Arc<dyn PacketSink>,
    running: Arc<AtomicBool>,
    diagnostics: CaptureDiagnostics,
}

impl FrameProcessor {
    pub fn new(
        link: LinkLayer,
        sink: Arc<dyn PacketSink>,
        running: Arc<AtomicBool>,
        diagnostics: CaptureDiagnostics,
    ) -> Self {
        Self {
            link,
            sink,
            running,
            diagnostics,
        }
    }

    pub fn link(&self) -> LinkLayer {
        self.link
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Dissect one frame and forward it. Never fails: malformed frames are
    /// counted and dropped.
    pub fn process(&self, frame: RawFrame<'_>) -> FrameOutcome {
        self.diagnostics.record_received(frame.wire_len);

        if !self.is_running() {
            self.diagnostics.record_dropped();
            return FrameOutcome::Dropped;
        }

        match Packet::parse(self.link, frame) {
            Ok(Some(packet)) => {
                // stop may have been requested while dissecting
                if !self.is_running() {
                    self.diagnostics.record_dropped();
                    return FrameOutcome::Dropped;
                }
                self.sink.record(packet);
                self.diagnostics.record_recorded();
                FrameOutcome::Recorded
            }
            Ok(None) => {
                trace!("Skipped non-IP frame ({} bytes)", frame.wire_len);
                self.diagnostics.record_skipped();
                FrameOutcome::Skipped
            }
            Err(e) => {
                trace!("Discarded malformed frame: {}", e);
                self.diagnostics.record_malformed();
                FrameOutcome::Malformed
            }
        }
    }
}

/// Capture engine owning the packet source and the capture thread
pub struct CaptureEngine {
    state: CaptureState,
    sources: Vec<SourceInfo>,
    config: Option<CaptureConfig>,
    sink: Option<Arc<dyn PacketSink>>,
    running: Arc<AtomicBool>,
    diagnostics: CaptureDiagnostics,
    processor: Option<Arc<FrameProcessor>>,
    handle: Option<JoinHandle<()>>,
}

impl CaptureEngine {
    /// Create an engine that still has to enumerate its sources
    pub fn new() -> Self {
        Self {
            state: CaptureState::Uninitialized,
            sources: Vec::new(),
            config: None,
            sink: None,
            running: Arc::new(AtomicBool::new(false)),
            diagnostics: CaptureDiagnostics::new(),
            processor: None,
            handle: None,
        }
    }

    /// Create an engine over an already known source list
    ///
    /// Offline captures need no enumeration and start from an empty list.
    pub fn with_sources(sources: Vec<SourceInfo>) -> Self {
        let mut engine = Self::new();
        engine.sources = sources;
        engine.state = CaptureState::Initialized;
        engine
    }

    /// Enumerate the available capture sources
    pub fn initialize(&mut self) -> Result<()> {
        self.expect_state(CaptureState::Uninitialized, "initialize")?;

        self.sources = list_sources()?;
        self.state = CaptureState::Initialized;
        info!("Found {} capture sources", self.sources.len());
        Ok(())
    }

    /// Accept the run configuration and the sink receiving packets
    pub fn configure(&mut self, config: CaptureConfig, sink: Arc<dyn PacketSink>) -> Result<()> {
        self.expect_state(CaptureState::Initialized, "configure")?;

        debug!(
            "Capture configured: source={}, count={}, filter='{}', recent={}",
            config.source, config.packet_count_limit, config.filter, config.recent_packet_limit
        );

        sink.set_retention(config.recent_packet_limit);
        self.config = Some(config);
        self.sink = Some(sink);
        self.state = CaptureState::Configured;
        Ok(())
    }

    /// Open the configured source and start the capture thread
    pub fn start_live(&mut self) -> Result<()> {
        self.expect_state(CaptureState::Configured, "start a live capture")?;
        let config = self.configured()?.clone();

        let source = find_source(&self.sources, &config.source)?;
        match netmask(source) {
            Some(mask) => debug!("Netmask of {}: {}", source.name, mask),
            None => warn!(
                "Couldn't get netmask for device {}, capturing without one",
                source.name
            ),
        }

        let capture = Capture::from_device(config.source.as_str())
            .map_err(|e| device_open_error(&config.source, e))?
            .promisc(config.promiscuous)
            .snaplen(config.snaplen)
            .timeout(config.timeout_ms)
            .immediate_mode(config.immediate_mode);

        let mut capture = capture
            .open()
            .map_err(|e| device_open_error(&config.source, e))?;

        let link = link_layer(&capture)?;
        install_filter(&mut capture, &config.filter)?;

        let processor = self.bind_processor(link)?;
        let limit = config.packet_count_limit;
        let running = Arc::clone(&self.running);
        let loop_processor = Arc::clone(&processor);

        self.running.store(true, Ordering::SeqCst);
        let spawned = thread::Builder::new()
            .name("netanalyze-capture".to_string())
            .spawn(move || {
                match receive_loop(&mut capture, &loop_processor, limit) {
                    Ok(frames) => info!("Capture thread finished after {} frames", frames),
                    Err(e) => error!("{}", e),
                }
                running.store(false, Ordering::SeqCst);
            });

        match spawned {
            Ok(handle) => self.handle = Some(handle),
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                return Err(Error::Io(e));
            }
        }

        self.processor = Some(processor);
        self.state = CaptureState::Running;
        info!("Started live capture on {} ({})", config.source, link);
        Ok(())
    }

    /// Process a capture file to completion on the calling thread
    ///
    /// Returns the number of frames read. The engine ends up `Stopped`.
    pub fn run_offline(&mut self, path: &Path) -> Result<u64> {
        self.expect_state(CaptureState::Configured, "run an offline capture")?;
        let config = self.configured()?.clone();

        let mut capture = Capture::from_file(path).map_err(|e| Error::CaptureFile {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let link = link_layer(&capture)?;
        install_filter(&mut capture, &config.filter)?;

        let processor = self.bind_processor(link)?;
        self.processor = Some(Arc::clone(&processor));
        self.running.store(true, Ordering::SeqCst);
        self.state = CaptureState::Running;
        info!("Reading {} ({})", path.display(), link);

        let result = receive_loop(&mut capture, &processor, config.packet_count_limit);

        self.running.store(false, Ordering::SeqCst);
        self.sources.clear();
        self.state = CaptureState::Stopped;

        let frames = result?;
        info!("Finished {} after {} frames", path.display(), frames);
        Ok(frames)
    }

    /// Stop the capture and release the source
    ///
    /// Blocks until the capture thread has exited; no packet reaches the
    /// sink after this returns. Calling it again is a no-op.
    pub fn stop(&mut self) -> Result<()> {
        if self.state != CaptureState::Running {
            return Ok(());
        }

        info!("Stopping packet capture");
        self.running.store(false, Ordering::SeqCst);

        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Capture thread panicked");
            }
        }

        self.sources.clear();
        self.state = CaptureState::Stopped;
        Ok(())
    }

    /// Whether the receive loop is still delivering frames
    ///
    /// Turns false by itself when a live capture reaches its count limit or
    /// its source fails.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn sources(&self) -> &[SourceInfo] {
        &self.sources
    }

    pub fn config(&self) -> Option<&CaptureConfig> {
        self.config.as_ref()
    }

    /// Link layer of the current or last run
    pub fn link_layer(&self) -> Option<LinkLayer> {
        self.processor.as_ref().map(|processor| processor.link())
    }

    /// Capture-loop counters
    pub fn diagnostics(&self) -> CaptureStats {
        self.diagnostics.snapshot()
    }

    /// Feed a frame through the processor of the current or last run
    ///
    /// Returns `None` if no run has started yet.
    pub fn process_frame(&self, frame: RawFrame<'_>) -> Option<FrameOutcome> {
        self.processor
            .as_ref()
            .map(|processor| processor.process(frame))
    }

    fn expect_state(&self, expected: CaptureState, action: &str) -> Result<()> {
        if self.state != expected {
            return Err(Error::invalid_state(format!(
                "cannot {} while {:?}",
                action, self.state
            )));
        }
        Ok(())
    }

    fn configured(&self) -> Result<&CaptureConfig> {
        self.config
            .as_ref()
            .ok_or_else(|| Error::invalid_state("capture is not configured"))
    }

    fn bind_processor(&self, link: LinkLayer) -> Result<Arc<FrameProcessor>> {
        let sink = self
            .sink
            .as_ref()
            .ok_or_else(|| Error::invalid_state("no statistics sink configured"))?;

        Ok(Arc::new(FrameProcessor::new(
            link,
            Arc::clone(sink),
            Arc::clone(&self.running),
            self.diagnostics.clone(),
        )))
    }
}

impl Default for CaptureEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for CaptureEngine {
    fn drop(&mut self) {
        // Ensure the capture thread is joined when dropped
        let _ = self.stop();
    }
}

fn device_open_error(source: &str, e: pcap::Error) -> Error {
    Error::DeviceOpen {
        source_name: source.to_string(),
        reason: e.to_string(),
    }
}

/// Map the source's datalink type to a supported encapsulation
fn link_layer<T: Activated + ?Sized>(capture: &Capture<T>) -> Result<LinkLayer> {
    let datalink = capture.get_datalink();
    LinkLayer::from_datalink(datalink.0).ok_or(Error::UnsupportedDatalink(datalink.0))
}

/// Compile and install a non-empty filter expression
fn install_filter<T: Activated + ?Sized>(capture: &mut Capture<T>, expression: &str) -> Result<()> {
    if expression.is_empty() {
        return Ok(());
    }

    capture
        .compile(expression, true)
        .map_err(|e| Error::FilterCompile {
            expression: expression.to_string(),
            reason: e.to_string(),
        })?;

    capture
        .filter(expression, true)
        .map_err(|e| Error::FilterInstall {
            expression: expression.to_string(),
            reason: e.to_string(),
        })?;

    debug!("Applied filter: {}", expression);
    Ok(())
}

/// Pull frames until the source ends, the limit is hit or the engine stops
fn receive_loop<T: Activated + ?Sized>(
    capture: &mut Capture<T>,
    processor: &FrameProcessor,
    limit: u64,
) -> Result<u64> {
    let mut frames = 0u64;

    while processor.is_running() {
        if limit > 0 && frames >= limit {
            debug!("Packet count limit {} reached", limit);
            break;
        }

        match capture.next_packet() {
            Ok(packet) => {
                processor.process(RawFrame::new(packet.data, packet.header.len));
                frames += 1;
            }
            Err(pcap::Error::TimeoutExpired) => continue,
            Err(pcap::Error::NoMorePackets) => break,
            Err(e) => return Err(Error::capture(e.to_string())),
        }
    }

    Ok(frames)
}
