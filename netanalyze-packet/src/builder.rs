//! Frame builder for constructing synthetic captured frames with a fluent API
//!
//! Frames are assembled from the innermost layer outwards: payload, transport
//! header, IP header (plus IPv6 extension headers), then the link-layer
//! header selected with [`FrameBuilder::link`]. Checksums are left zero since
//! the dissector never verifies them.

use crate::link::{EtherType, LinkLayer};
use bytes::{BufMut, BytesMut};
use netanalyze_core::types::ip_numbers;
use std::net::{Ipv4Addr, Ipv6Addr};

/// IPv6 extension header to insert between the fixed header and the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extension {
    /// Hop-by-hop options with the given length field ((n + 1) * 8 bytes)
    HopByHop(u8),
    /// Routing header with the given length field
    Routing(u8),
    /// Destination options with the given length field
    DestinationOptions(u8),
    /// Fixed 8-byte fragment header
    Fragment,
}

impl Extension {
    fn number(self) -> u8 {
        match self {
            Extension::HopByHop(_) => ip_numbers::HOP_BY_HOP,
            Extension::Routing(_) => ip_numbers::ROUTING,
            Extension::DestinationOptions(_) => ip_numbers::DESTINATION_OPTIONS,
            Extension::Fragment => ip_numbers::FRAGMENT,
        }
    }

    fn len_field(self) -> u8 {
        match self {
            Extension::HopByHop(n) | Extension::Routing(n) | Extension::DestinationOptions(n) => n,
            Extension::Fragment => 0,
        }
    }

    fn size(self) -> usize {
        (self.len_field() as usize + 1) * 8
    }
}

/// Layer 3 packet type
#[derive(Debug, Clone)]
enum Layer3 {
    Ipv4 {
        src: Ipv4Addr,
        dst: Ipv4Addr,
        header_words: u8,
    },
    Ipv6 {
        src: Ipv6Addr,
        dst: Ipv6Addr,
        extensions: Vec<Extension>,
    },
}

/// Layer 4 header type
#[derive(Debug, Clone, Copy)]
enum Layer4 {
    Tcp {
        src_port: u16,
        dst_port: u16,
        data_offset: u8,
    },
    Udp {
        src_port: u16,
        dst_port: u16,
    },
    Icmp,
    Icmpv6,
    Igmp,
    /// No transport header, just the protocol number
    Raw(u8),
}

impl Layer4 {
    fn protocol(self) -> u8 {
        match self {
            Layer4::Tcp { .. } => ip_numbers::TCP,
            Layer4::Udp { .. } => ip_numbers::UDP,
            Layer4::Icmp => ip_numbers::ICMP,
            Layer4::Icmpv6 => ip_numbers::ICMPV6,
            Layer4::Igmp => ip_numbers::IGMP,
            Layer4::Raw(number) => number,
        }
    }
}

/// Builder for synthetic link-layer frames
///
/// # Examples
///
/// ```
/// use std::net::Ipv4Addr;
/// use netanalyze_packet::FrameBuilder;
///
/// let frame = FrameBuilder::new()
///     .ipv4(Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 0, 2))
///     .tcp(50000, 80)
///     .payload(b"GET / HTTP/1.1\r\n".to_vec())
///     .build();
///
/// assert_eq!(frame.len(), 14 + 20 + 20 + 16);
/// ```
#[derive(Debug, Clone)]
pub struct FrameBuilder {
    link: LinkLayer,
    ethertype: Option<EtherType>,
    layer3: Option<Layer3>,
    layer4: Option<Layer4>,
    ip_length: Option<u16>,
    payload: Vec<u8>,
}

impl FrameBuilder {
    /// Create a builder for an Ethernet frame
    pub fn new() -> Self {
        FrameBuilder {
            link: LinkLayer::Ethernet,
            ethertype: None,
            layer3: None,
            layer4: None,
            ip_length: None,
            payload: Vec::new(),
        }
    }

    /// Select the link-layer encapsulation
    pub fn link(mut self, link: LinkLayer) -> Self {
        self.link = link;
        self
    }

    /// Force the link-layer ethertype (defaults to the IP version in use)
    pub fn ethertype(mut self, ethertype: EtherType) -> Self {
        self.ethertype = Some(ethertype);
        self
    }

    /// Add an IPv4 layer with a 20-byte header
    pub fn ipv4(mut self, src: Ipv4Addr, dst: Ipv4Addr) -> Self {
        self.layer3 = Some(Layer3::Ipv4 {
            src,
            dst,
            header_words: 5,
        });
        self
    }

    /// Set the IPv4 header length field in 32-bit words
    ///
    /// Must be called after `ipv4()`. Words above 5 are filled with NOP options.
    pub fn ipv4_header_words(mut self, words: u8) -> Self {
        if let Some(Layer3::Ipv4 {
            ref mut header_words,
            ..
        }) = self.layer3
        {
            *header_words = words;
        }
        self
    }

    /// Add an IPv6 layer
    pub fn ipv6(mut self, src: Ipv6Addr, dst: Ipv6Addr) -> Self {
        self.layer3 = Some(Layer3::Ipv6 {
            src,
            dst,
            extensions: Vec::new(),
        });
        self
    }

    /// Append an IPv6 extension header
    ///
    /// Must be called after `ipv6()`.
    pub fn extension(mut self, extension: Extension) -> Self {
        if let Some(Layer3::Ipv6 {
            ref mut extensions,
            ..
        }) = self.layer3
        {
            extensions.push(extension);
        }
        self
    }

    /// Override the IPv4 total length / IPv6 payload length field
    pub fn ip_length(mut self, length: u16) -> Self {
        self.ip_length = Some(length);
        self
    }

    /// Add a TCP header with a 20-byte header
    pub fn tcp(mut self, src_port: u16, dst_port: u16) -> Self {
        self.layer4 = Some(Layer4::Tcp {
            src_port,
            dst_port,
            data_offset: 5,
        });
        self
    }

    /// Set the TCP data offset in 32-bit words
    ///
    /// Must be called after `tcp()`. Words above 5 are filled with NOP options.
    pub fn tcp_data_offset(mut self, words: u8) -> Self {
        if let Some(Layer4::Tcp {
            ref mut data_offset,
            ..
        }) = self.layer4
        {
            *data_offset = words;
        }
        self
    }

    /// Add a UDP header
    pub fn udp(mut self, src_port: u16, dst_port: u16) -> Self {
        self.layer4 = Some(Layer4::Udp { src_port, dst_port });
        self
    }

    /// Add an ICMP echo request header
    pub fn icmp(mut self) -> Self {
        self.layer4 = Some(Layer4::Icmp);
        self
    }

    /// Add an ICMPv6 echo request header
    pub fn icmpv6(mut self) -> Self {
        self.layer4 = Some(Layer4::Icmpv6);
        self
    }

    /// Add an IGMPv2 membership query
    pub fn igmp(mut self) -> Self {
        self.layer4 = Some(Layer4::Igmp);
        self
    }

    /// Carry the payload directly after the IP header under `protocol`
    pub fn protocol_number(mut self, protocol: u8) -> Self {
        self.layer4 = Some(Layer4::Raw(protocol));
        self
    }

    /// Set the payload data
    pub fn payload(mut self, data: Vec<u8>) -> Self {
        self.payload = data;
        self
    }

    /// Build the complete frame
    pub fn build(self) -> Vec<u8> {
        let layer4 = self.layer4.unwrap_or(Layer4::Raw(59));
        let mut packet_data = build_transport(layer4, &self.payload);

        if let Some(layer3) = &self.layer3 {
            packet_data = build_ip(layer3, layer4.protocol(), self.ip_length, &packet_data);
        }

        let ethertype = self.ethertype.unwrap_or(match self.layer3 {
            Some(Layer3::Ipv4 { .. }) => EtherType::IPv4,
            Some(Layer3::Ipv6 { .. }) => EtherType::IPv6,
            None => EtherType::ARP,
        });

        build_link(self.link, ethertype, &packet_data)
    }
}

impl Default for FrameBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn build_transport(layer4: Layer4, payload: &[u8]) -> Vec<u8> {
    let mut buffer = BytesMut::with_capacity(60 + payload.len());

    match layer4 {
        Layer4::Tcp {
            src_port,
            dst_port,
            data_offset,
        } => {
            buffer.put_u16(src_port);
            buffer.put_u16(dst_port);
            buffer.put_u32(1); // sequence
            buffer.put_u32(0); // acknowledgment
            buffer.put_u8(data_offset << 4);
            buffer.put_u8(0x18); // PSH | ACK
            buffer.put_u16(65535); // window
            buffer.put_u16(0); // checksum
            buffer.put_u16(0); // urgent pointer
            let options = (data_offset as usize * 4).saturating_sub(20);
            buffer.put_bytes(0x01, options);
        }
        Layer4::Udp { src_port, dst_port } => {
            buffer.put_u16(src_port);
            buffer.put_u16(dst_port);
            buffer.put_u16((8 + payload.len()) as u16);
            buffer.put_u16(0);
        }
        Layer4::Icmp => {
            buffer.put_u8(8); // echo request
            buffer.put_u8(0);
            buffer.put_u16(0);
            buffer.put_u32(0x0001_0001);
        }
        Layer4::Icmpv6 => {
            buffer.put_u8(128); // echo request
            buffer.put_u8(0);
            buffer.put_u16(0);
            buffer.put_u32(0x0001_0001);
        }
        Layer4::Igmp => {
            buffer.put_u8(0x11); // membership query
            buffer.put_u8(100);
            buffer.put_u16(0);
            buffer.put_u32(0);
        }
        Layer4::Raw(_) => {}
    }

    buffer.put_slice(payload);
    buffer.to_vec()
}

fn build_ip(layer3: &Layer3, protocol: u8, length: Option<u16>, data: &[u8]) -> Vec<u8> {
    let mut buffer = BytesMut::with_capacity(120 + data.len());

    match layer3 {
        Layer3::Ipv4 {
            src,
            dst,
            header_words,
        } => {
            let header_len = *header_words as usize * 4;
            let total = length.unwrap_or((header_len.max(20) + data.len()) as u16);
            buffer.put_u8(0x40 | (header_words & 0x0F));
            buffer.put_u8(0); // DSCP/ECN
            buffer.put_u16(total);
            buffer.put_u16(0); // identification
            buffer.put_u16(0x4000); // don't fragment
            buffer.put_u8(64); // TTL
            buffer.put_u8(protocol);
            buffer.put_u16(0); // checksum
            buffer.put_slice(&src.octets());
            buffer.put_slice(&dst.octets());
            buffer.put_bytes(0x01, header_len.saturating_sub(20));
        }
        Layer3::Ipv6 {
            src,
            dst,
            extensions,
        } => {
            let extension_bytes: usize = extensions.iter().map(|e| e.size()).sum();
            let first = extensions.first().map_or(protocol, |e| e.number());
            buffer.put_u32(0x6000_0000);
            buffer.put_u16(length.unwrap_or((extension_bytes + data.len()) as u16));
            buffer.put_u8(first);
            buffer.put_u8(64); // hop limit
            buffer.put_slice(&src.octets());
            buffer.put_slice(&dst.octets());

            for (i, extension) in extensions.iter().enumerate() {
                let next = extensions.get(i + 1).map_or(protocol, |e| e.number());
                buffer.put_u8(next);
                buffer.put_u8(extension.len_field());
                buffer.put_bytes(0, extension.size() - 2);
            }
        }
    }

    buffer.put_slice(data);
    buffer.to_vec()
}

fn build_link(link: LinkLayer, ethertype: EtherType, data: &[u8]) -> Vec<u8> {
    const SOURCE_MAC: [u8; 6] = [0x00, 0x11, 0x22, 0x33, 0x44, 0x55];
    const DESTINATION_MAC: [u8; 6] = [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF];

    let mut buffer = BytesMut::with_capacity(link.header_len() + data.len());

    match link {
        LinkLayer::Ethernet => {
            buffer.put_slice(&DESTINATION_MAC);
            buffer.put_slice(&SOURCE_MAC);
            buffer.put_u16(ethertype.to_u16());
        }
        LinkLayer::LinuxSll => {
            buffer.put_u16(0); // packet type: to us
            buffer.put_u16(1); // ARPHRD_ETHER
            buffer.put_u16(6); // address length
            buffer.put_slice(&SOURCE_MAC);
            buffer.put_u16(0); // address padding
            buffer.put_u16(ethertype.to_u16());
        }
        LinkLayer::LinuxSll2 => {
            buffer.put_u16(ethertype.to_u16());
            buffer.put_u16(0); // reserved
            buffer.put_u32(2); // interface index
            buffer.put_u16(1); // ARPHRD_ETHER
            buffer.put_u8(0); // packet type
            buffer.put_u8(6); // address length
            buffer.put_slice(&SOURCE_MAC);
            buffer.put_u16(0);
        }
    }

    buffer.put_slice(data);
    buffer.to_vec()
}
