//! Example: Dissecting synthetic frames
//!
//! Builds a DNS query, an HTTPS client hello and an IPv6 frame with a
//! hop-by-hop header, then prints what the dissector makes of each.

use std::net::{Ipv4Addr, Ipv6Addr};
use netanalyze_packet::{Extension, FrameBuilder, LinkLayer, Packet, RawFrame};

fn main() {
    let client = Ipv4Addr::new(192, 168, 1, 100);
    let resolver = Ipv4Addr::new(192, 168, 1, 1);

    // DNS query header (simplified)
    let dns_query = vec![
        0x12, 0x34, // Transaction ID
        0x01, 0x00, // Flags: standard query
        0x00, 0x01, // Questions: 1
        0x00, 0x00, // Answer RRs: 0
        0x00, 0x00, // Authority RRs: 0
        0x00, 0x00, // Additional RRs: 0
    ];

    let frames = vec![
        FrameBuilder::new()
            .ipv4(client, resolver)
            .udp(54321, 53)
            .payload(dns_query)
            .build(),
        FrameBuilder::new()
            .ipv4(client, Ipv4Addr::new(140, 82, 121, 4))
            .tcp(51000, 8443)
            .payload(vec![0x16, 0x03, 0x01, 0x00, 0xC8])
            .build(),
        FrameBuilder::new()
            .ipv6(
                "fe80::1".parse::<Ipv6Addr>().unwrap(),
                "ff02::16".parse::<Ipv6Addr>().unwrap(),
            )
            .extension(Extension::HopByHop(0))
            .icmpv6()
            .payload(vec![0; 20])
            .build(),
    ];

    for frame in &frames {
        match Packet::parse(LinkLayer::Ethernet, RawFrame::complete(frame)) {
            Ok(Some(packet)) => println!(
                "{} {}:{} -> {}:{} {} ({} bytes, {} payload)",
                packet.transport(),
                packet.src_addr(),
                packet.src_port(),
                packet.dst_addr(),
                packet.dst_port(),
                packet.application(),
                packet.total_len(),
                packet.payload_len(),
            ),
            Ok(None) => println!("non-IP frame skipped"),
            Err(e) => println!("malformed frame: {}", e),
        }
    }
}
