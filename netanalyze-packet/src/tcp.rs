//! TCP header parsing
//!
//! Only the fields the dissector needs are read: ports, data offset and flags.

use netanalyze_core::MalformedPacket;

/// Common TCP port numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TcpPort(pub u16);

impl TcpPort {
    /// FTP Control (21)
    pub const FTP: TcpPort = TcpPort(21);

    /// SSH (22)
    pub const SSH: TcpPort = TcpPort(22);

    /// SMTP (25)
    pub const SMTP: TcpPort = TcpPort(25);

    /// DNS over TCP (53)
    pub const DNS: TcpPort = TcpPort(53);

    /// HTTP (80)
    pub const HTTP: TcpPort = TcpPort(80);

    /// HTTPS (443)
    pub const HTTPS: TcpPort = TcpPort(443);

    pub fn to_u16(self) -> u16 {
        self.0
    }
}

impl From<u16> for TcpPort {
    fn from(port: u16) -> Self {
        TcpPort(port)
    }
}

/// TCP control flags as carried in byte 13 of the header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TcpFlags(pub u8);

impl TcpFlags {
    pub const FIN: TcpFlags = TcpFlags(0b0000_0001);
    pub const SYN: TcpFlags = TcpFlags(0b0000_0010);
    pub const RST: TcpFlags = TcpFlags(0b0000_0100);
    pub const PSH: TcpFlags = TcpFlags(0b0000_1000);
    pub const ACK: TcpFlags = TcpFlags(0b0001_0000);
    pub const PSH_ACK: TcpFlags = TcpFlags(0b0001_1000);

    pub fn contains(self, other: TcpFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

/// Read-only view of a TCP header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcpHeader {
    pub source_port: u16,
    pub destination_port: u16,
    /// Header length in bytes (data offset * 4)
    pub header_len: usize,
    pub flags: TcpFlags,
}

impl TcpHeader {
    /// Minimum TCP header size (without options)
    pub const MIN_HEADER_SIZE: usize = 20;

    /// Parse a TCP header from the start of `data`.
    ///
    /// Options are skipped, not validated. A data offset pointing past the
    /// captured bytes is accepted: the payload is simply empty.
    pub fn parse(data: &[u8]) -> Result<Self, MalformedPacket> {
        if data.len() < Self::MIN_HEADER_SIZE {
            return Err(MalformedPacket::Truncated {
                layer: "TCP",
                needed: Self::MIN_HEADER_SIZE,
                available: data.len(),
            });
        }

        let header_len = ((data[12] >> 4) as usize) * 4;
        if header_len < Self::MIN_HEADER_SIZE {
            return Err(MalformedPacket::HeaderLength {
                layer: "TCP",
                length: header_len,
            });
        }

        Ok(TcpHeader {
            source_port: u16::from_be_bytes([data[0], data[1]]),
            destination_port: u16::from_be_bytes([data[2], data[3]]),
            header_len,
            flags: TcpFlags(data[13]),
        })
    }
}
