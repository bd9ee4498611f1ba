//! Traffic statistics engine
//!
//! [`StatsEngine`] folds [`Packet`] records into protocol, host and pair
//! counters, keeps a bounded ring of recent packets and estimates bandwidth.
//! Everything lives behind one mutex; each public operation takes it once and
//! never calls out while holding it.
//!
//! Readers never see the counters themselves. [`StatsEngine::refresh_views`]
//! renders them into an immutable [`Snapshot`] that replaces the previous one
//! as a whole, and [`StatsEngine::export_view`] copies every counter in one
//! lock acquisition for serializers.

use netanalyze_core::{ApplicationProtocol, IpVersion, TransportProtocol};
use netanalyze_packet::Packet;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Smoothing factor of the bandwidth moving average
pub const BANDWIDTH_ALPHA: f64 = 0.2;

/// Minimum interval between two bandwidth samples
pub const BANDWIDTH_INTERVAL: Duration = Duration::from_secs(1);

/// Default number of recent packets retained
pub const DEFAULT_RECENT_LIMIT: usize = 10;

/// Receiver of accepted packets
///
/// The capture engine forwards every dissected packet here from its capture
/// thread, so implementations must be shareable across threads.
pub trait PacketSink: Send + Sync {
    /// Fold one packet into the sink
    fn record(&self, packet: Packet);

    /// Bound the number of recent packets kept
    fn set_retention(&self, _limit: usize) {}
}

/// Packet and byte counters for one protocol or address pair
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProtocolCounters {
    pub packets: u64,
    pub bytes: u64,
}

impl ProtocolCounters {
    fn add(&mut self, bytes: u32) {
        self.packets += 1;
        self.bytes += u64::from(bytes);
    }
}

/// Per-address traffic counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HostCounters {
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub packets_sent: u64,
    pub packets_received: u64,
}

/// One bandwidth measurement
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BandwidthSample {
    /// Seconds since the engine was created
    pub timestamp: f64,
    /// Smoothed bandwidth at that moment
    pub bytes_per_second: f64,
}

/// A ranked protocol table row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProtocolRow<P> {
    pub protocol: P,
    pub packets: u64,
    pub bytes: u64,
    pub percent: f64,
}

/// A host table row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostRow {
    pub ip: IpAddr,
    pub packets_sent: u64,
    pub packets_received: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
}

/// A directional communication pair row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairRow {
    pub src: IpAddr,
    pub dst: IpAddr,
    pub packets: u64,
    pub bytes: u64,
    pub percent: f64,
}

/// A recent packet listing row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PacketRow {
    /// Seconds since the engine was created
    pub time: f64,
    pub ip_version: IpVersion,
    pub transport: TransportProtocol,
    pub application: ApplicationProtocol,
    pub src: IpAddr,
    pub dst: IpAddr,
    pub src_port: u16,
    pub dst_port: u16,
    pub length: u32,
}

/// Immutable, display-ready copy of the statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Snapshot {
    pub total_packets: u64,
    pub total_bytes: u64,
    /// By descending packet count
    pub transport: Vec<ProtocolRow<TransportProtocol>>,
    /// By descending packet count; bytes are payload bytes
    pub application: Vec<ProtocolRow<ApplicationProtocol>>,
    /// Top-N by descending packets sent
    pub top_hosts: Vec<HostRow>,
    /// Top-N by descending bytes
    pub top_pairs: Vec<PairRow>,
    /// Oldest first
    pub recent_packets: Vec<PacketRow>,
    /// Instantaneous bandwidth of the last completed interval
    pub bandwidth: f64,
    pub smoothed_bandwidth: f64,
    pub max_bandwidth: f64,
    pub bandwidth_history: Vec<BandwidthSample>,
}

/// Complete, unranked copy of every counter
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExportView {
    pub total_packets: u64,
    pub total_bytes: u64,
    pub bandwidth: f64,
    pub transport: Vec<ProtocolRow<TransportProtocol>>,
    pub application: Vec<ProtocolRow<ApplicationProtocol>>,
    pub hosts: Vec<HostRow>,
    pub pairs: Vec<PairRow>,
    pub bandwidth_history: Vec<BandwidthSample>,
}

/// Counter map that remembers the order in which keys first appeared
#[derive(Debug)]
struct CounterTable<K, V> {
    index: HashMap<K, usize>,
    entries: Vec<(K, V)>,
}

impl<K: Copy + Eq + Hash, V: Default> CounterTable<K, V> {
    fn new() -> Self {
        Self {
            index: HashMap::new(),
            entries: Vec::new(),
        }
    }

    fn entry(&mut self, key: K) -> &mut V {
        let idx = match self.index.get(&key) {
            Some(&idx) => idx,
            None => {
                self.entries.push((key, V::default()));
                self.index.insert(key, self.entries.len() - 1);
                self.entries.len() - 1
            }
        };
        &mut self.entries[idx].1
    }
}

impl<K, V> CounterTable<K, V> {
    fn iter(&self) -> impl Iterator<Item = &(K, V)> {
        self.entries.iter()
    }
}

/// Exponentially smoothed bandwidth over fixed-minimum intervals
#[derive(Debug)]
struct BandwidthEstimator {
    started_at: Instant,
    last_tick: Instant,
    last_bytes: u64,
    current: f64,
    smoothed: f64,
    max: f64,
    history: Vec<BandwidthSample>,
}

impl BandwidthEstimator {
    fn new(now: Instant) -> Self {
        Self {
            started_at: now,
            last_tick: now,
            last_bytes: 0,
            current: 0.0,
            smoothed: 0.0,
            max: 0.0,
            history: Vec::new(),
        }
    }

    fn tick(&mut self, now: Instant, total_bytes: u64) -> bool {
        let elapsed = now.saturating_duration_since(self.last_tick);
        if elapsed < BANDWIDTH_INTERVAL {
            return false;
        }

        let secs = elapsed.as_secs_f64();
        self.current = total_bytes.saturating_sub(self.last_bytes) as f64 / secs;
        self.smoothed = BANDWIDTH_ALPHA * self.current + (1.0 - BANDWIDTH_ALPHA) * self.smoothed;
        self.max = self.max.max(self.current);
        self.history.push(BandwidthSample {
            timestamp: now.saturating_duration_since(self.started_at).as_secs_f64(),
            bytes_per_second: self.smoothed,
        });

        self.last_tick = now;
        self.last_bytes = total_bytes;
        true
    }
}

#[derive(Debug)]
struct RecentPacket {
    time: f64,
    packet: Packet,
}

#[derive(Debug)]
struct StatsState {
    total_packets: u64,
    total_bytes: u64,
    transport: CounterTable<TransportProtocol, ProtocolCounters>,
    application: CounterTable<ApplicationProtocol, ProtocolCounters>,
    hosts: CounterTable<IpAddr, HostCounters>,
    pairs: CounterTable<(IpAddr, IpAddr), ProtocolCounters>,
    recent: VecDeque<RecentPacket>,
    recent_limit: usize,
    bandwidth: BandwidthEstimator,
    snapshot: Arc<Snapshot>,
}

impl StatsState {
    fn percent(&self, bytes: u64) -> f64 {
        if self.total_bytes == 0 {
            0.0
        } else {
            bytes as f64 / self.total_bytes as f64 * 100.0
        }
    }

    fn protocol_rows<P: Copy>(
        &self,
        table: &CounterTable<P, ProtocolCounters>,
    ) -> Vec<ProtocolRow<P>> {
        table
            .iter()
            .map(|(protocol, counters)| ProtocolRow {
                protocol: *protocol,
                packets: counters.packets,
                bytes: counters.bytes,
                percent: self.percent(counters.bytes),
            })
            .collect()
    }

    fn host_rows(&self) -> Vec<HostRow> {
        self.hosts
            .iter()
            .map(|(ip, counters)| HostRow {
                ip: *ip,
                packets_sent: counters.packets_sent,
                packets_received: counters.packets_received,
                bytes_sent: counters.bytes_sent,
                bytes_received: counters.bytes_received,
            })
            .collect()
    }

    fn pair_rows(&self) -> Vec<PairRow> {
        self.pairs
            .iter()
            .map(|((src, dst), counters)| PairRow {
                src: *src,
                dst: *dst,
                packets: counters.packets,
                bytes: counters.bytes,
                percent: self.percent(counters.bytes),
            })
            .collect()
    }

    fn trim_recent(&mut self) {
        while self.recent.len() > self.recent_limit {
            self.recent.pop_front();
        }
    }
}

/// Thread-safe traffic aggregator
#[derive(Debug)]
pub struct StatsEngine {
    state: Mutex<StatsState>,
}

impl StatsEngine {
    /// Create an engine retaining [`DEFAULT_RECENT_LIMIT`] recent packets
    pub fn new() -> Self {
        Self::with_recent_limit(DEFAULT_RECENT_LIMIT)
    }

    pub fn with_recent_limit(recent_limit: usize) -> Self {
        Self {
            state: Mutex::new(StatsState {
                total_packets: 0,
                total_bytes: 0,
                transport: CounterTable::new(),
                application: CounterTable::new(),
                hosts: CounterTable::new(),
                pairs: CounterTable::new(),
                recent: VecDeque::new(),
                recent_limit,
                bandwidth: BandwidthEstimator::new(Instant::now()),
                snapshot: Arc::new(Snapshot::default()),
            }),
        }
    }

    /// When bandwidth measurement started
    pub fn started_at(&self) -> Instant {
        self.state.lock().bandwidth.started_at
    }

    /// Change how many recent packets are retained, evicting the oldest
    pub fn set_recent_limit(&self, limit: usize) {
        let mut state = self.state.lock();
        state.recent_limit = limit;
        state.trim_recent();
    }

    /// Fold one packet into every counter and the recent-packet ring
    pub fn record(&self, packet: Packet) {
        let mut state = self.state.lock();
        let time = state.bandwidth.started_at.elapsed().as_secs_f64();
        let total_len = packet.total_len();

        state.total_packets += 1;
        state.total_bytes += u64::from(total_len);

        state.transport.entry(packet.transport()).add(total_len);
        state
            .application
            .entry(packet.application())
            .add(packet.payload_len());

        let sender = state.hosts.entry(packet.src_addr());
        sender.packets_sent += 1;
        sender.bytes_sent += u64::from(total_len);

        let receiver = state.hosts.entry(packet.dst_addr());
        receiver.packets_received += 1;
        receiver.bytes_received += u64::from(total_len);

        state
            .pairs
            .entry((packet.src_addr(), packet.dst_addr()))
            .add(total_len);

        if state.recent_limit > 0 {
            state.recent.push_back(RecentPacket { time, packet });
            state.trim_recent();
        }
    }

    /// Take a bandwidth sample if at least one interval has passed
    pub fn refresh_bandwidth(&self) -> bool {
        self.refresh_bandwidth_at(Instant::now())
    }

    /// Same as [`refresh_bandwidth`](Self::refresh_bandwidth) with an explicit clock
    pub fn refresh_bandwidth_at(&self, now: Instant) -> bool {
        let mut state = self.state.lock();
        let total_bytes = state.total_bytes;
        state.bandwidth.tick(now, total_bytes)
    }

    /// Rebuild the ranked tables and publish a new snapshot
    pub fn refresh_views(&self, top_n: usize) {
        let mut state = self.state.lock();

        let mut transport = state.protocol_rows(&state.transport);
        transport.sort_by(|a, b| b.packets.cmp(&a.packets));

        let mut application = state.protocol_rows(&state.application);
        application.sort_by(|a, b| b.packets.cmp(&a.packets));

        let mut top_hosts = state.host_rows();
        top_hosts.sort_by(|a, b| b.packets_sent.cmp(&a.packets_sent));
        top_hosts.truncate(top_n);

        let mut top_pairs = state.pair_rows();
        top_pairs.sort_by(|a, b| b.bytes.cmp(&a.bytes));
        top_pairs.truncate(top_n);

        let recent_packets = state
            .recent
            .iter()
            .map(|recent| PacketRow {
                time: recent.time,
                ip_version: recent.packet.ip_version(),
                transport: recent.packet.transport(),
                application: recent.packet.application(),
                src: recent.packet.src_addr(),
                dst: recent.packet.dst_addr(),
                src_port: recent.packet.src_port(),
                dst_port: recent.packet.dst_port(),
                length: recent.packet.total_len(),
            })
            .collect();

        let snapshot = Snapshot {
            total_packets: state.total_packets,
            total_bytes: state.total_bytes,
            transport,
            application,
            top_hosts,
            top_pairs,
            recent_packets,
            bandwidth: state.bandwidth.current,
            smoothed_bandwidth: state.bandwidth.smoothed,
            max_bandwidth: state.bandwidth.max,
            bandwidth_history: state.bandwidth.history.clone(),
        };

        state.snapshot = Arc::new(snapshot);
    }

    /// The most recently published snapshot
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.state.lock().snapshot)
    }

    /// Copy every counter, in first-seen order
    pub fn export_view(&self) -> ExportView {
        let state = self.state.lock();
        ExportView {
            total_packets: state.total_packets,
            total_bytes: state.total_bytes,
            bandwidth: state.bandwidth.current,
            transport: state.protocol_rows(&state.transport),
            application: state.protocol_rows(&state.application),
            hosts: state.host_rows(),
            pairs: state.pair_rows(),
            bandwidth_history: state.bandwidth.history.clone(),
        }
    }
}

impl Default for StatsEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PacketSink for StatsEngine {
    fn record(&self, packet: Packet) {
        StatsEngine::record(self, packet);
    }

    fn set_retention(&self, limit: usize) {
        self.set_recent_limit(limit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netanalyze_packet::{FrameBuilder, LinkLayer, RawFrame};
    use std::net::Ipv4Addr;

    fn tcp_packet(src: [u8; 4], dst: [u8; 4], dst_port: u16, payload: usize) -> Packet {
        let frame = FrameBuilder::new()
            .ipv4(Ipv4Addr::from(src), Ipv4Addr::from(dst))
            .tcp(50000, dst_port)
            .payload(vec![0; payload])
            .build();
        Packet::parse(LinkLayer::Ethernet, RawFrame::complete(&frame))
            .unwrap()
            .unwrap()
    }

    #[test]
    fn test_record_updates_totals() {
        let engine = StatsEngine::new();
        engine.record(tcp_packet([10, 0, 0, 1], [10, 0, 0, 2], 80, 100));
        engine.record(tcp_packet([10, 0, 0, 1], [10, 0, 0, 3], 22, 0));

        let view = engine.export_view();
        assert_eq!(view.total_packets, 2);
        assert_eq!(view.total_bytes, 154 + 54);
        assert_eq!(view.transport.len(), 1);
        assert_eq!(view.transport[0].packets, 2);
        assert_eq!(view.hosts.len(), 3);
        assert_eq!(view.hosts[0].packets_sent, 2);
        assert_eq!(view.hosts[0].bytes_sent, 208);
        assert_eq!(view.hosts[1].bytes_received, 154);
    }

    #[test]
    fn test_application_counts_payload_bytes() {
        let engine = StatsEngine::new();
        engine.record(tcp_packet([10, 0, 0, 1], [10, 0, 0, 2], 443, 100));

        let view = engine.export_view();
        assert_eq!(view.application[0].protocol, ApplicationProtocol::Https);
        assert_eq!(view.application[0].bytes, 100);
        assert_eq!(view.transport[0].bytes, 154);
    }

    #[test]
    fn test_record_does_not_publish() {
        let engine = StatsEngine::new();
        engine.record(tcp_packet([10, 0, 0, 1], [10, 0, 0, 2], 80, 10));
        assert_eq!(engine.snapshot().total_packets, 0);

        engine.refresh_views(10);
        assert_eq!(engine.snapshot().total_packets, 1);
    }

    #[test]
    fn test_percent_with_no_traffic() {
        let engine = StatsEngine::new();
        engine.refresh_views(10);
        let snapshot = engine.snapshot();
        assert!(snapshot.transport.is_empty());
        assert_eq!(snapshot.total_bytes, 0);

        let state = engine.state.lock();
        assert_eq!(state.percent(0), 0.0);
        assert_eq!(state.percent(1000), 0.0);
    }

    #[test]
    fn test_counter_table_keeps_first_seen_order() {
        let mut table: CounterTable<u8, ProtocolCounters> = CounterTable::new();
        table.entry(3).add(1);
        table.entry(1).add(1);
        table.entry(3).add(1);
        table.entry(2).add(1);

        let keys: Vec<u8> = table.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec![3, 1, 2]);
        assert_eq!(table.entry(3).packets, 2);
    }

    #[test]
    fn test_bandwidth_interval_not_elapsed() {
        let engine = StatsEngine::new();
        let start = engine.started_at();
        engine.record(tcp_packet([10, 0, 0, 1], [10, 0, 0, 2], 80, 10));

        assert!(!engine.refresh_bandwidth_at(start + Duration::from_millis(999)));
        engine.refresh_views(10);
        assert!(engine.snapshot().bandwidth_history.is_empty());
    }

    #[test]
    fn test_bandwidth_smoothing_and_peak() {
        let engine = StatsEngine::new();
        let start = engine.started_at();

        for _ in 0..10 {
            engine.record(tcp_packet([10, 0, 0, 1], [10, 0, 0, 2], 80, 946)); // 1000-byte frames
        }
        assert!(engine.refresh_bandwidth_at(start + Duration::from_secs(1)));
        assert!(engine.refresh_bandwidth_at(start + Duration::from_secs(2)));

        engine.refresh_views(10);
        let snapshot = engine.snapshot();
        assert_eq!(snapshot.bandwidth, 0.0);
        assert_eq!(snapshot.max_bandwidth, 10_000.0);
        assert_eq!(snapshot.bandwidth_history.len(), 2);
        assert!((snapshot.bandwidth_history[0].bytes_per_second - 2_000.0).abs() < 1e-9);
        assert!((snapshot.smoothed_bandwidth - 1_600.0).abs() < 1e-9);
        assert!((snapshot.bandwidth_history[1].timestamp - 2.0).abs() < 1e-9);
    }
}
