//! Layered dissection of captured frames
//!
//! [`dissect`] turns a borrowed frame into a [`DissectedPacket`] that only
//! records offsets into the buffer. [`Packet`] is the owned record built from
//! it once the frame is accepted; the application protocol is classified at
//! that point and never again.

use crate::classify::classify;
use crate::ip::{IpHeader, Ipv4Header, Ipv6Header};
use crate::link::{EtherType, LinkLayer};
use crate::tcp::TcpHeader;
use crate::udp::UdpHeader;
use netanalyze_core::{ApplicationProtocol, IpVersion, MalformedPacket, TransportProtocol};
use std::net::IpAddr;

/// Fixed ICMPv6 header size (type, code, checksum, 4 body bytes)
pub const ICMPV6_HEADER_SIZE: usize = 8;

/// A frame as handed over by the capture source
#[derive(Debug, Clone, Copy)]
pub struct RawFrame<'a> {
    /// Captured bytes (may be shorter than the frame on the wire)
    pub data: &'a [u8],
    /// Frame length on the wire
    pub wire_len: u32,
}

impl<'a> RawFrame<'a> {
    pub fn new(data: &'a [u8], wire_len: u32) -> Self {
        RawFrame { data, wire_len }
    }

    /// A frame captured in full
    pub fn complete(data: &'a [u8]) -> Self {
        RawFrame {
            data,
            wire_len: data.len() as u32,
        }
    }
}

/// Header fields of one frame; the payload stays in the frame buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DissectedPacket {
    pub ip_version: IpVersion,
    pub transport: TransportProtocol,
    pub src_addr: IpAddr,
    pub dst_addr: IpAddr,
    /// Zero for transports without ports
    pub src_port: u16,
    pub dst_port: u16,
    /// Frame length on the wire
    pub total_len: u32,
    /// Declared payload length, clamped to `0..=total_len`
    pub payload_len: u32,
    /// Offset of the payload in the frame buffer
    pub payload_offset: usize,
}

impl DissectedPacket {
    /// The captured part of the payload
    pub fn payload<'a>(&self, frame: &'a [u8]) -> &'a [u8] {
        match frame.get(self.payload_offset..) {
            Some(rest) => &rest[..rest.len().min(self.payload_len as usize)],
            None => &[],
        }
    }
}

/// Outcome of dissecting one well-formed frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dissection {
    /// An IPv4 or IPv6 packet
    Packet(DissectedPacket),
    /// A recognized non-IP frame (VLAN, ARP, anything else) that is not counted
    Skipped(EtherType),
}

/// Dissect one frame captured with the given link-layer encapsulation.
///
/// Errors are per-frame: the caller drops the frame and carries on.
pub fn dissect(link: LinkLayer, frame: RawFrame<'_>) -> Result<Dissection, MalformedPacket> {
    let ethertype = link.ethertype(frame.data)?;
    let ip_start = link.header_len();
    let ip_data = &frame.data[ip_start..];

    let header = match ethertype {
        EtherType::IPv4 => IpHeader::V4(Ipv4Header::parse(ip_data)?),
        EtherType::IPv6 => IpHeader::V6(Ipv6Header::parse(ip_data)?),
        other => return Ok(Dissection::Skipped(other)),
    };

    let upper = header.upper_layer(ip_data);
    let transport_start = ip_start + upper.offset;
    let segment = frame.data.get(transport_start..).unwrap_or(&[]);

    let (src_port, dst_port, transport_header_len) = match upper.transport {
        TransportProtocol::Tcp => {
            let tcp = TcpHeader::parse(segment)?;
            (tcp.source_port, tcp.destination_port, Some(tcp.header_len))
        }
        TransportProtocol::Udp => {
            let udp = UdpHeader::parse(segment)?;
            (
                udp.source_port,
                udp.destination_port,
                Some(UdpHeader::HEADER_SIZE),
            )
        }
        TransportProtocol::Icmpv6 => (0, 0, Some(ICMPV6_HEADER_SIZE)),
        TransportProtocol::Icmp | TransportProtocol::Igmp | TransportProtocol::Unknown => {
            (0, 0, None)
        }
    };

    let (payload_offset, payload_len) = match transport_header_len {
        Some(len) => (
            transport_start + len,
            clamp_payload(upper.declared_len - len as i64, frame.wire_len),
        ),
        None => (transport_start, 0),
    };

    Ok(Dissection::Packet(DissectedPacket {
        ip_version: header.version(),
        transport: upper.transport,
        src_addr: header.source(),
        dst_addr: header.destination(),
        src_port,
        dst_port,
        total_len: frame.wire_len,
        payload_len,
        payload_offset,
    }))
}

/// Inconsistent length fields give zero, never a wrapped value
fn clamp_payload(declared: i64, total_len: u32) -> u32 {
    declared.clamp(0, i64::from(total_len)) as u32
}

/// Owned, immutable record of one accepted packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    ip_version: IpVersion,
    transport: TransportProtocol,
    application: ApplicationProtocol,
    src_addr: IpAddr,
    dst_addr: IpAddr,
    src_port: u16,
    dst_port: u16,
    total_len: u32,
    payload_len: u32,
    payload_offset: usize,
}

impl Packet {
    /// Materialize a dissected packet, classifying it from the frame payload
    pub fn from_dissected(dissected: &DissectedPacket, frame: &[u8]) -> Self {
        let application = classify(
            dissected.transport,
            dissected.src_port,
            dissected.dst_port,
            dissected.payload(frame),
        );

        Packet {
            ip_version: dissected.ip_version,
            transport: dissected.transport,
            application,
            src_addr: dissected.src_addr,
            dst_addr: dissected.dst_addr,
            src_port: dissected.src_port,
            dst_port: dissected.dst_port,
            total_len: dissected.total_len,
            payload_len: dissected.payload_len,
            payload_offset: dissected.payload_offset,
        }
    }

    /// Dissect and materialize in one step; `None` for skipped frames
    pub fn parse(link: LinkLayer, frame: RawFrame<'_>) -> Result<Option<Self>, MalformedPacket> {
        Ok(match dissect(link, frame)? {
            Dissection::Packet(dissected) => Some(Packet::from_dissected(&dissected, frame.data)),
            Dissection::Skipped(_) => None,
        })
    }

    pub fn ip_version(&self) -> IpVersion {
        self.ip_version
    }

    pub fn transport(&self) -> TransportProtocol {
        self.transport
    }

    pub fn application(&self) -> ApplicationProtocol {
        self.application
    }

    pub fn src_addr(&self) -> IpAddr {
        self.src_addr
    }

    pub fn dst_addr(&self) -> IpAddr {
        self.dst_addr
    }

    pub fn src_port(&self) -> u16 {
        self.src_port
    }

    pub fn dst_port(&self) -> u16 {
        self.dst_port
    }

    pub fn total_len(&self) -> u32 {
        self.total_len
    }

    pub fn payload_len(&self) -> u32 {
        self.payload_len
    }

    pub fn payload_offset(&self) -> usize {
        self.payload_offset
    }
}
