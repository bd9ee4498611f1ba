//! Frame dissection and application-protocol guessing for NetAnalyze
//!
//! This crate turns captured link-layer frames into typed packet records:
//!
//! - **Link layer**: Ethernet II and Linux cooked captures (SLL, SLL2)
//! - **IPv4** with options and **IPv6** with a bounded extension-header walk
//! - **TCP/UDP** ports and payload location, ICMP/ICMPv6/IGMP tagging
//! - **Classification** of the application protocol from payload signatures
//!   and well-known ports
//!
//! Dissection never copies the payload and never panics on hostile input;
//! malformed frames come back as [`MalformedPacket`](netanalyze_core::MalformedPacket).
//!
//! # Architecture
//!
//! - [`link`] - datalink types and ethertype extraction
//! - [`ip`] - IPv4/IPv6 headers
//! - [`tcp`] / [`udp`] - transport headers and well-known ports
//! - [`dissect`] - the layered dissector and the owned [`Packet`] record
//! - [`classify`] - application-protocol heuristics
//! - [`builder`] - synthetic frame construction for tests and tooling
//!
//! # Quick Start
//!
//! ```rust
//! use std::net::Ipv4Addr;
//! use netanalyze_core::ApplicationProtocol;
//! use netanalyze_packet::{FrameBuilder, LinkLayer, Packet, RawFrame};
//!
//! let frame = FrameBuilder::new()
//!     .ipv4(Ipv4Addr::new(192, 168, 1, 10), Ipv4Addr::new(93, 184, 216, 34))
//!     .tcp(51000, 80)
//!     .payload(b"GET / HTTP/1.1\r\n\r\n".to_vec())
//!     .build();
//!
//! let packet = Packet::parse(LinkLayer::Ethernet, RawFrame::complete(&frame))
//!     .unwrap()
//!     .unwrap();
//! assert_eq!(packet.application(), ApplicationProtocol::Http);
//! ```

pub mod builder;
pub mod classify;
pub mod dissect;
pub mod ip;
pub mod link;
pub mod tcp;
pub mod udp;

#[cfg(test)]
mod tests;

// Re-export commonly used types for convenience
pub use builder::{Extension, FrameBuilder};
pub use classify::classify;
pub use dissect::{dissect, DissectedPacket, Dissection, Packet, RawFrame};
pub use ip::{IpHeader, Ipv4Header, Ipv6Header, MAX_EXTENSION_HEADERS};
pub use link::{EtherType, LinkLayer};
pub use tcp::{TcpFlags, TcpHeader, TcpPort};
pub use udp::{UdpHeader, UdpPort};
