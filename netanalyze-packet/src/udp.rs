//! UDP header parsing

use netanalyze_core::MalformedPacket;

/// Common UDP port numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UdpPort(pub u16);

impl UdpPort {
    /// DNS (53)
    pub const DNS: UdpPort = UdpPort(53);

    /// NTP (123)
    pub const NTP: UdpPort = UdpPort(123);

    /// QUIC (443)
    pub const QUIC: UdpPort = UdpPort(443);

    pub fn to_u16(self) -> u16 {
        self.0
    }
}

impl From<u16> for UdpPort {
    fn from(port: u16) -> Self {
        UdpPort(port)
    }
}

/// Read-only view of a UDP header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UdpHeader {
    pub source_port: u16,
    pub destination_port: u16,
    /// Length field (header + data) as declared on the wire
    pub length: u16,
}

impl UdpHeader {
    /// UDP header size
    pub const HEADER_SIZE: usize = 8;

    pub fn parse(data: &[u8]) -> Result<Self, MalformedPacket> {
        if data.len() < Self::HEADER_SIZE {
            return Err(MalformedPacket::Truncated {
                layer: "UDP",
                needed: Self::HEADER_SIZE,
                available: data.len(),
            });
        }

        Ok(UdpHeader {
            source_port: u16::from_be_bytes([data[0], data[1]]),
            destination_port: u16::from_be_bytes([data[2], data[3]]),
            length: u16::from_be_bytes([data[4], data[5]]),
        })
    }
}
