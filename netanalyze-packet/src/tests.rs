//! Cross-layer dissection tests over synthetic frames

use crate::builder::{Extension, FrameBuilder};
use crate::dissect::{dissect, Dissection, DissectedPacket, Packet, RawFrame};
use crate::link::{EtherType, LinkLayer};
use netanalyze_core::{ApplicationProtocol, IpVersion, TransportProtocol};
use std::net::{Ipv4Addr, Ipv6Addr};

fn dissect_ok(link: LinkLayer, frame: &[u8]) -> DissectedPacket {
    match dissect(link, RawFrame::complete(frame)) {
        Ok(Dissection::Packet(packet)) => packet,
        other => panic!("expected a dissected packet, got {:?}", other),
    }
}

#[test]
fn test_ipv4_tcp_ports_match_header_bytes() {
    for (src, dst) in [(1u16, 2u16), (50000, 80), (443, 61234), (65535, 0)] {
        let frame = FrameBuilder::new()
            .ipv4(Ipv4Addr::new(172, 16, 0, 1), Ipv4Addr::new(172, 16, 0, 2))
            .tcp(src, dst)
            .build();

        let tcp = &frame[34..];
        let packet = dissect_ok(LinkLayer::Ethernet, &frame);
        assert_eq!(packet.src_port, u16::from_be_bytes([tcp[0], tcp[1]]));
        assert_eq!(packet.dst_port, u16::from_be_bytes([tcp[2], tcp[3]]));
        assert_eq!((packet.src_port, packet.dst_port), (src, dst));
    }
}

#[test]
fn test_ipv6_hop_by_hop_udp_chain_walk() {
    let frame = FrameBuilder::new()
        .ipv6(
            "fe80::1".parse::<Ipv6Addr>().unwrap(),
            "ff02::fb".parse::<Ipv6Addr>().unwrap(),
        )
        .extension(Extension::HopByHop(0))
        .udp(5353, 5353)
        .payload(vec![0; 20])
        .build();

    let packet = dissect_ok(LinkLayer::Ethernet, &frame);
    assert_eq!(packet.ip_version, IpVersion::V6);
    assert_eq!(packet.transport, TransportProtocol::Udp);
    assert_eq!((packet.src_port, packet.dst_port), (5353, 5353));
    assert_eq!(packet.src_addr.to_string(), "fe80::1");
    assert_eq!(packet.dst_addr.to_string(), "ff02::fb");
    assert_eq!(packet.payload_offset, 14 + 40 + 8 + 8);
    assert_eq!(packet.payload_len, 20);
}

#[test]
fn test_ipv6_full_extension_chain() {
    let frame = FrameBuilder::new()
        .ipv6(Ipv6Addr::LOCALHOST, Ipv6Addr::LOCALHOST)
        .extension(Extension::HopByHop(1))
        .extension(Extension::Routing(0))
        .extension(Extension::Fragment)
        .extension(Extension::DestinationOptions(2))
        .tcp(40000, 22)
        .build();

    let packet = dissect_ok(LinkLayer::Ethernet, &frame);
    assert_eq!(packet.transport, TransportProtocol::Tcp);
    assert_eq!(packet.dst_port, 22);
    assert_eq!(packet.payload_offset, 14 + 40 + 16 + 8 + 8 + 24 + 20);
}

#[test]
fn test_ipv6_chain_past_cap_is_unknown() {
    let mut builder = FrameBuilder::new().ipv6(Ipv6Addr::LOCALHOST, Ipv6Addr::LOCALHOST);
    for _ in 0..9 {
        builder = builder.extension(Extension::DestinationOptions(0));
    }
    let frame = builder.udp(1, 2).build();

    let packet = dissect_ok(LinkLayer::Ethernet, &frame);
    assert_eq!(packet.transport, TransportProtocol::Unknown);
    assert_eq!(packet.payload_len, 0);
}

#[test]
fn test_icmpv6_payload_excludes_fixed_header() {
    let frame = FrameBuilder::new()
        .ipv6(Ipv6Addr::LOCALHOST, Ipv6Addr::LOCALHOST)
        .icmpv6()
        .payload(vec![0; 56])
        .build();

    let packet = dissect_ok(LinkLayer::Ethernet, &frame);
    assert_eq!(packet.transport, TransportProtocol::Icmpv6);
    assert_eq!(packet.payload_len, 56);
    assert_eq!((packet.src_port, packet.dst_port), (0, 0));
}

#[test]
fn test_igmp_tagged() {
    let frame = FrameBuilder::new()
        .ipv4(Ipv4Addr::new(192, 168, 0, 1), Ipv4Addr::new(224, 0, 0, 1))
        .igmp()
        .build();

    assert_eq!(
        dissect_ok(LinkLayer::Ethernet, &frame).transport,
        TransportProtocol::Igmp
    );
}

#[test]
fn test_cooked_encapsulations() {
    for link in [LinkLayer::LinuxSll, LinkLayer::LinuxSll2] {
        let frame = FrameBuilder::new()
            .link(link)
            .ipv4(Ipv4Addr::new(10, 1, 1, 1), Ipv4Addr::new(10, 1, 1, 2))
            .tcp(50000, 443)
            .payload(vec![0x16, 0x03, 0x01, 0x00, 0x05])
            .build();

        let packet = dissect_ok(link, &frame);
        assert_eq!(packet.payload_offset, link.header_len() + 40);
        assert_eq!(
            Packet::from_dissected(&packet, &frame).application(),
            ApplicationProtocol::Https
        );
    }
}

#[test]
fn test_ipv4_options_shift_transport() {
    let frame = FrameBuilder::new()
        .ipv4(Ipv4Addr::LOCALHOST, Ipv4Addr::LOCALHOST)
        .ipv4_header_words(7)
        .tcp(2000, 21)
        .tcp_data_offset(8)
        .payload(b"USER anonymous\r\n".to_vec())
        .build();

    let packet = dissect_ok(LinkLayer::Ethernet, &frame);
    assert_eq!(packet.dst_port, 21);
    assert_eq!(packet.payload_offset, 14 + 28 + 32);
    assert_eq!(packet.payload_len, 16);
    assert_eq!(packet.payload(&frame), b"USER anonymous\r\n");
}

#[test]
fn test_vlan_frames_are_skipped() {
    let frame = FrameBuilder::new()
        .ethertype(EtherType::VLAN)
        .payload(vec![0; 46])
        .build();

    assert_eq!(
        dissect(LinkLayer::Ethernet, RawFrame::complete(&frame)),
        Ok(Dissection::Skipped(EtherType::VLAN))
    );
}

#[test]
fn test_malformed_frames_never_panic() {
    let frame = FrameBuilder::new()
        .ipv6(Ipv6Addr::LOCALHOST, Ipv6Addr::LOCALHOST)
        .extension(Extension::HopByHop(3))
        .extension(Extension::Routing(1))
        .tcp(1, 2)
        .payload(vec![0xAA; 40])
        .build();

    // every prefix must either dissect or fail cleanly
    for cut in 0..frame.len() {
        let _ = dissect(LinkLayer::Ethernet, RawFrame::new(&frame[..cut], frame.len() as u32));
        let _ = dissect(LinkLayer::LinuxSll2, RawFrame::complete(&frame[..cut]));
    }
}

#[test]
fn test_dns_classified_regardless_of_content() {
    let frame = FrameBuilder::new()
        .ipv4(Ipv4Addr::new(10, 0, 0, 5), Ipv4Addr::new(10, 0, 0, 53))
        .udp(60000, 53)
        .payload(vec![0xFF; 12])
        .build();

    let packet = Packet::parse(LinkLayer::Ethernet, RawFrame::complete(&frame))
        .unwrap()
        .unwrap();
    assert_eq!(packet.application(), ApplicationProtocol::Dns);
    assert_eq!(packet.payload_len(), 12);
}
