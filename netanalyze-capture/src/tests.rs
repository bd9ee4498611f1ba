//! Engine and statistics tests over synthetic traffic

use crate::capture::{CaptureConfig, CaptureEngine, CaptureState, FrameOutcome};
use crate::stats::{PacketSink, StatsEngine};
use netanalyze_core::{ApplicationProtocol, Error, TransportProtocol};
use netanalyze_packet::{FrameBuilder, LinkLayer, Packet, RawFrame};
use std::io::Write;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tempfile::NamedTempFile;

const LINKTYPE_ETHERNET: u32 = 1;
const LINKTYPE_IEEE802_11: u32 = 105;

fn tcp_frame(src_port: u16, dst_port: u16, payload: usize) -> Vec<u8> {
    FrameBuilder::new()
        .ipv4(Ipv4Addr::new(192, 168, 1, 10), Ipv4Addr::new(192, 168, 1, 20))
        .tcp(src_port, dst_port)
        .payload(vec![0x42; payload])
        .build()
}

fn udp_frame(src_port: u16, dst_port: u16, payload: usize) -> Vec<u8> {
    FrameBuilder::new()
        .ipv4(Ipv4Addr::new(192, 168, 1, 10), Ipv4Addr::new(8, 8, 8, 8))
        .udp(src_port, dst_port)
        .payload(vec![0; payload])
        .build()
}

fn packet(frame: &[u8]) -> Packet {
    Packet::parse(LinkLayer::Ethernet, RawFrame::complete(frame))
        .unwrap()
        .unwrap()
}

/// Write a little-endian classic pcap file
fn write_pcap(linktype: u32, frames: &[Vec<u8>]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    let mut header = Vec::with_capacity(24);
    header.extend_from_slice(&0xa1b2_c3d4u32.to_le_bytes());
    header.extend_from_slice(&2u16.to_le_bytes());
    header.extend_from_slice(&4u16.to_le_bytes());
    header.extend_from_slice(&0i32.to_le_bytes());
    header.extend_from_slice(&0u32.to_le_bytes());
    header.extend_from_slice(&65535u32.to_le_bytes());
    header.extend_from_slice(&linktype.to_le_bytes());
    file.write_all(&header).unwrap();

    for (i, frame) in frames.iter().enumerate() {
        let mut record = Vec::with_capacity(16 + frame.len());
        record.extend_from_slice(&(1_700_000_000u32 + i as u32).to_le_bytes());
        record.extend_from_slice(&0u32.to_le_bytes());
        record.extend_from_slice(&(frame.len() as u32).to_le_bytes());
        record.extend_from_slice(&(frame.len() as u32).to_le_bytes());
        record.extend_from_slice(frame);
        file.write_all(&record).unwrap();
    }

    file.flush().unwrap();
    file
}

fn offline_engine(config: CaptureConfig) -> (CaptureEngine, Arc<StatsEngine>) {
    let stats = Arc::new(StatsEngine::new());
    let mut engine = CaptureEngine::with_sources(Vec::new());
    engine.configure(config, stats.clone()).unwrap();
    (engine, stats)
}

#[test]
fn test_totals_independent_of_record_order() {
    let frames = vec![
        tcp_frame(40000, 80, 120),
        udp_frame(5000, 53, 40),
        tcp_frame(40001, 443, 0),
        udp_frame(5001, 123, 48),
    ];

    let forward = StatsEngine::new();
    let backward = StatsEngine::new();
    for frame in &frames {
        forward.record(packet(frame));
    }
    for frame in frames.iter().rev() {
        backward.record(packet(frame));
    }

    let a = forward.export_view();
    let b = backward.export_view();
    assert_eq!(a.total_packets, b.total_packets);
    assert_eq!(a.total_bytes, b.total_bytes);

    let mut a_transport: Vec<_> = a.transport.iter().map(|r| (r.protocol, r.packets, r.bytes)).collect();
    let mut b_transport: Vec<_> = b.transport.iter().map(|r| (r.protocol, r.packets, r.bytes)).collect();
    a_transport.sort_by_key(|row| row.0.to_string());
    b_transport.sort_by_key(|row| row.0.to_string());
    assert_eq!(a_transport, b_transport);
}

#[test]
fn test_snapshot_is_stable_without_new_traffic() {
    let stats = StatsEngine::new();
    stats.record(packet(&tcp_frame(40000, 80, 10)));
    stats.refresh_views(10);
    let first = stats.snapshot();
    stats.refresh_views(10);
    let second = stats.snapshot();

    assert_eq!(*first, *second);
    assert_eq!(*stats.snapshot(), *second);
}

#[test]
fn test_recent_ring_keeps_newest() {
    let stats = StatsEngine::with_recent_limit(10);
    for port in 0..15u16 {
        stats.record(packet(&tcp_frame(30000 + port, 80, 0)));
    }
    stats.refresh_views(10);

    let snapshot = stats.snapshot();
    let ports: Vec<u16> = snapshot.recent_packets.iter().map(|row| row.src_port).collect();
    assert_eq!(ports, (30005..30015).collect::<Vec<_>>());
    assert_eq!(snapshot.total_packets, 15);
}

#[test]
fn test_zero_retention_keeps_no_rows() {
    let stats = StatsEngine::new();
    stats.set_retention(0);
    stats.record(packet(&tcp_frame(30000, 80, 0)));
    stats.refresh_views(10);
    assert!(stats.snapshot().recent_packets.is_empty());
    assert_eq!(stats.snapshot().total_packets, 1);
}

#[test]
fn test_bandwidth_over_two_seconds() {
    let stats = StatsEngine::new();
    let frame = udp_frame(5000, 9999, 100);
    stats.record(packet(&frame));
    let recorded = stats.export_view().total_bytes;

    let big = Packet::parse(
        LinkLayer::Ethernet,
        RawFrame::new(&frame, (1_000_000 - recorded) as u32),
    )
    .unwrap()
    .unwrap();
    stats.record(big);

    assert!(stats.refresh_bandwidth_at(stats.started_at() + Duration::from_secs(2)));
    stats.refresh_views(10);

    let snapshot = stats.snapshot();
    assert_eq!(snapshot.total_bytes, 1_000_000);
    assert!((snapshot.bandwidth - 500_000.0).abs() < 1e-6);
    assert!((snapshot.smoothed_bandwidth - 100_000.0).abs() < 1e-6);
    assert_eq!(snapshot.bandwidth_history.len(), 1);
}

#[test]
fn test_concurrent_record() {
    let stats = Arc::new(StatsEngine::new());
    let frame = tcp_frame(40000, 22, 10);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let stats = Arc::clone(&stats);
            let frame = frame.clone();
            thread::spawn(move || {
                for _ in 0..250 {
                    stats.record(packet(&frame));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let view = stats.export_view();
    assert_eq!(view.total_packets, 1000);
    assert_eq!(view.total_bytes, 1000 * frame.len() as u64);
}

#[test]
fn test_offline_run_processes_whole_file() {
    let file = write_pcap(
        LINKTYPE_ETHERNET,
        &[
            tcp_frame(40000, 80, 100),
            tcp_frame(40001, 443, 100),
            udp_frame(5000, 53, 20),
        ],
    );

    let (mut engine, stats) = offline_engine(CaptureConfig::default());
    let frames = engine.run_offline(file.path()).unwrap();

    assert_eq!(frames, 3);
    assert_eq!(engine.state(), CaptureState::Stopped);
    assert!(!engine.is_running());
    assert_eq!(engine.link_layer(), Some(LinkLayer::Ethernet));

    let view = stats.export_view();
    assert_eq!(view.total_packets, 3);
    let tcp = view
        .transport
        .iter()
        .find(|row| row.protocol == TransportProtocol::Tcp)
        .unwrap();
    assert_eq!(tcp.packets, 2);
    assert!(view
        .application
        .iter()
        .any(|row| row.protocol == ApplicationProtocol::Http && row.bytes == 100));
    assert_eq!(engine.diagnostics().frames_recorded, 3);
}

#[test]
fn test_offline_run_honours_count_limit() {
    let frames: Vec<_> = (0..5).map(|i| tcp_frame(40000 + i, 80, 0)).collect();
    let file = write_pcap(LINKTYPE_ETHERNET, &frames);

    let (mut engine, stats) = offline_engine(CaptureConfig::default().with_packet_count_limit(3));
    assert_eq!(engine.run_offline(file.path()).unwrap(), 3);
    assert_eq!(stats.export_view().total_packets, 3);
}

#[test]
fn test_offline_filter_applies() {
    let file = write_pcap(
        LINKTYPE_ETHERNET,
        &[tcp_frame(40000, 80, 0), udp_frame(5000, 53, 20), tcp_frame(40001, 22, 0)],
    );

    let (mut engine, stats) = offline_engine(CaptureConfig::default().with_filter("udp"));
    engine.run_offline(file.path()).unwrap();

    let view = stats.export_view();
    assert_eq!(view.total_packets, 1);
    assert_eq!(view.transport[0].protocol, TransportProtocol::Udp);
}

#[test]
fn test_offline_invalid_filter() {
    let file = write_pcap(LINKTYPE_ETHERNET, &[tcp_frame(40000, 80, 0)]);
    let (mut engine, stats) = offline_engine(CaptureConfig::default().with_filter("port (("));

    match engine.run_offline(file.path()) {
        Err(Error::FilterCompile { expression, .. }) => assert_eq!(expression, "port (("),
        other => panic!("Expected FilterCompile error, got {:?}", other),
    }
    assert_eq!(stats.export_view().total_packets, 0);
}

#[test]
fn test_offline_unsupported_datalink() {
    let file = write_pcap(LINKTYPE_IEEE802_11, &[tcp_frame(40000, 80, 0)]);
    let (mut engine, _stats) = offline_engine(CaptureConfig::default());

    assert!(matches!(
        engine.run_offline(file.path()),
        Err(Error::UnsupportedDatalink(105))
    ));
}

#[test]
fn test_offline_missing_file() {
    let (mut engine, _stats) = offline_engine(CaptureConfig::default());
    let result = engine.run_offline(std::path::Path::new("/nonexistent/netanalyze/trace.pcap"));
    assert!(matches!(result, Err(Error::CaptureFile { .. })));
}

#[test]
fn test_no_packets_recorded_after_stop() {
    let file = write_pcap(LINKTYPE_ETHERNET, &[tcp_frame(40000, 80, 0)]);
    let (mut engine, stats) = offline_engine(CaptureConfig::default());
    engine.run_offline(file.path()).unwrap();
    engine.stop().unwrap();

    stats.refresh_views(10);
    let before = stats.snapshot();

    let late = tcp_frame(40001, 443, 50);
    assert_eq!(
        engine.process_frame(RawFrame::complete(&late)),
        Some(FrameOutcome::Dropped)
    );

    stats.refresh_views(10);
    assert_eq!(*stats.snapshot(), *before);
    assert_eq!(engine.diagnostics().frames_dropped, 1);
}

#[test]
fn test_run_offline_twice_is_rejected() {
    let file = write_pcap(LINKTYPE_ETHERNET, &[tcp_frame(40000, 80, 0)]);
    let (mut engine, _stats) = offline_engine(CaptureConfig::default());
    engine.run_offline(file.path()).unwrap();

    assert!(matches!(
        engine.run_offline(file.path()),
        Err(Error::InvalidState(_))
    ));
}

fn host_frame(src: [u8; 4], dst: [u8; 4]) -> Vec<u8> {
    FrameBuilder::new()
        .ipv4(Ipv4Addr::from(src), Ipv4Addr::from(dst))
        .udp(5000, 9999)
        .payload(vec![0; 20])
        .build()
}

#[test]
fn test_ranked_tables_order_and_truncation() {
    let stats = StatsEngine::new();
    let sink = [9, 9, 9, 9];
    for src in [[10, 0, 0, 2], [10, 0, 0, 1], [10, 0, 0, 3], [10, 0, 0, 3]] {
        stats.record(packet(&host_frame(src, sink)));
    }

    stats.refresh_views(3);
    let snapshot = stats.snapshot();

    // first seen: .2, 9.9.9.9, .1, .3; equal counts keep that order
    let hosts: Vec<String> = snapshot.top_hosts.iter().map(|h| h.ip.to_string()).collect();
    assert_eq!(hosts, vec!["10.0.0.3", "10.0.0.2", "10.0.0.1"]);
    assert_eq!(snapshot.top_hosts[0].packets_sent, 2);

    let pairs: Vec<(String, u64)> = snapshot
        .top_pairs
        .iter()
        .map(|p| (p.src.to_string(), p.packets))
        .collect();
    assert_eq!(
        pairs,
        vec![
            ("10.0.0.3".to_string(), 2),
            ("10.0.0.2".to_string(), 1),
            ("10.0.0.1".to_string(), 1),
        ]
    );
    assert!(snapshot.top_pairs[0].bytes > snapshot.top_pairs[1].bytes);

    stats.refresh_views(1);
    let snapshot = stats.snapshot();
    assert_eq!(snapshot.top_hosts.len(), 1);
    assert_eq!(snapshot.top_pairs.len(), 1);
    assert_eq!(snapshot.top_hosts[0].ip.to_string(), "10.0.0.3");
}

#[test]
fn test_huge_recent_limit_allocates_lazily() {
    let stats = StatsEngine::with_recent_limit(usize::MAX);
    for port in 0..3u16 {
        stats.record(packet(&tcp_frame(30000 + port, 80, 0)));
    }
    stats.refresh_views(10);
    assert_eq!(stats.snapshot().recent_packets.len(), 3);
}
