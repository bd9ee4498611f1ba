//! IPv4 and IPv6 header parsing
//!
//! Both versions are read into a tagged [`IpHeader`] exposing one accessor set.
//! IPv6 additionally walks its extension-header chain to find the upper layer;
//! the walk is capped at [`MAX_EXTENSION_HEADERS`] and bounds-checked before
//! every read, so a hostile chain degrades to an `Unknown` transport.

use netanalyze_core::types::ip_numbers;
use netanalyze_core::{IpVersion, MalformedPacket, TransportProtocol};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Maximum number of IPv6 extension headers walked before giving up
pub const MAX_EXTENSION_HEADERS: usize = 8;

/// Size of the fixed IPv6 fragment header
pub const FRAGMENT_HEADER_SIZE: usize = 8;

/// IPv4 header fields used by the dissector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Header {
    /// Header length in bytes (IHL * 4)
    pub header_len: usize,
    /// Total length (header + data) in bytes
    pub total_length: u16,
    /// Protocol number
    pub protocol: u8,
    /// Source IP address
    pub source: Ipv4Addr,
    /// Destination IP address
    pub destination: Ipv4Addr,
}

impl Ipv4Header {
    /// Minimum IPv4 header size (without options)
    pub const MIN_HEADER_SIZE: usize = 20;

    /// Parse an IPv4 header from the start of `data`
    pub fn parse(data: &[u8]) -> Result<Self, MalformedPacket> {
        if data.len() < Self::MIN_HEADER_SIZE {
            return Err(MalformedPacket::Truncated {
                layer: "IPv4",
                needed: Self::MIN_HEADER_SIZE,
                available: data.len(),
            });
        }

        let header_len = ((data[0] & 0x0F) as usize) * 4;
        if header_len < Self::MIN_HEADER_SIZE {
            return Err(MalformedPacket::HeaderLength {
                layer: "IPv4",
                length: header_len,
            });
        }
        if data.len() < header_len {
            return Err(MalformedPacket::Truncated {
                layer: "IPv4",
                needed: header_len,
                available: data.len(),
            });
        }

        Ok(Ipv4Header {
            header_len,
            total_length: u16::from_be_bytes([data[2], data[3]]),
            protocol: data[9],
            source: Ipv4Addr::new(data[12], data[13], data[14], data[15]),
            destination: Ipv4Addr::new(data[16], data[17], data[18], data[19]),
        })
    }
}

/// IPv6 fixed header fields used by the dissector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv6Header {
    /// Payload length (everything after the fixed header)
    pub payload_length: u16,
    /// First next-header value
    pub next_header: u8,
    /// Source IP address
    pub source: Ipv6Addr,
    /// Destination IP address
    pub destination: Ipv6Addr,
}

impl Ipv6Header {
    /// Fixed IPv6 header size
    pub const HEADER_SIZE: usize = 40;

    /// Parse an IPv6 fixed header from the start of `data`
    pub fn parse(data: &[u8]) -> Result<Self, MalformedPacket> {
        if data.len() < Self::HEADER_SIZE {
            return Err(MalformedPacket::Truncated {
                layer: "IPv6",
                needed: Self::HEADER_SIZE,
                available: data.len(),
            });
        }

        let mut source = [0u8; 16];
        source.copy_from_slice(&data[8..24]);
        let mut destination = [0u8; 16];
        destination.copy_from_slice(&data[24..40]);

        Ok(Ipv6Header {
            payload_length: u16::from_be_bytes([data[4], data[5]]),
            next_header: data[6],
            source: Ipv6Addr::from(source),
            destination: Ipv6Addr::from(destination),
        })
    }
}

/// Where the upper-layer header sits inside an IP packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpperLayer {
    /// Transport protocol, `Unknown` if unrecognized or unreachable
    pub transport: TransportProtocol,
    /// Offset of the transport header from the start of the IP header
    pub offset: usize,
    /// Bytes the IP header declares for the transport header plus payload;
    /// negative when the header fields are inconsistent
    pub declared_len: i64,
}

/// A parsed IP header of either version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpHeader {
    V4(Ipv4Header),
    V6(Ipv6Header),
}

impl IpHeader {
    pub fn version(&self) -> IpVersion {
        match self {
            IpHeader::V4(_) => IpVersion::V4,
            IpHeader::V6(_) => IpVersion::V6,
        }
    }

    pub fn source(&self) -> IpAddr {
        match self {
            IpHeader::V4(h) => IpAddr::V4(h.source),
            IpHeader::V6(h) => IpAddr::V6(h.source),
        }
    }

    pub fn destination(&self) -> IpAddr {
        match self {
            IpHeader::V4(h) => IpAddr::V4(h.destination),
            IpHeader::V6(h) => IpAddr::V6(h.destination),
        }
    }

    /// Locate the transport header. `data` starts at the IP header.
    pub fn upper_layer(&self, data: &[u8]) -> UpperLayer {
        match self {
            IpHeader::V4(h) => UpperLayer {
                transport: TransportProtocol::from_ip_number(h.protocol)
                    .unwrap_or(TransportProtocol::Unknown),
                offset: h.header_len,
                declared_len: i64::from(h.total_length) - h.header_len as i64,
            },
            IpHeader::V6(h) => {
                let (transport, offset) = walk_extension_headers(data, h.next_header);
                let extensions = offset.saturating_sub(Ipv6Header::HEADER_SIZE);
                UpperLayer {
                    transport,
                    offset,
                    declared_len: i64::from(h.payload_length) - extensions as i64,
                }
            }
        }
    }
}

/// Follow the IPv6 next-header chain starting after the fixed header.
///
/// Returns the transport reached and its offset from the start of `data`.
fn walk_extension_headers(data: &[u8], first: u8) -> (TransportProtocol, usize) {
    let mut next = first;
    let mut offset = Ipv6Header::HEADER_SIZE;
    let mut walked = 0;

    loop {
        if let Some(transport) = TransportProtocol::from_ip_number(next) {
            return (transport, offset);
        }

        let fixed_len = match next {
            ip_numbers::HOP_BY_HOP | ip_numbers::ROUTING | ip_numbers::DESTINATION_OPTIONS => None,
            ip_numbers::FRAGMENT => Some(FRAGMENT_HEADER_SIZE),
            _ => return (TransportProtocol::Unknown, offset),
        };

        if walked == MAX_EXTENSION_HEADERS {
            return (TransportProtocol::Unknown, offset);
        }

        // next-header byte, plus the length byte for variable-size headers
        let needed = if fixed_len.is_some() { 1 } else { 2 };
        if data.len() < offset + needed {
            return (TransportProtocol::Unknown, offset);
        }

        let ext_len = fixed_len.unwrap_or_else(|| (data[offset + 1] as usize + 1) * 8);
        next = data[offset];
        offset += ext_len;
        walked += 1;
    }
}
