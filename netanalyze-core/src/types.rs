//! Protocol tags shared by the dissector, the statistics engine and the exporters

use serde::Serialize;
use std::fmt;

/// IP protocol numbers the dissector understands
pub mod ip_numbers {
    pub const HOP_BY_HOP: u8 = 0;
    pub const ICMP: u8 = 1;
    pub const IGMP: u8 = 2;
    pub const TCP: u8 = 6;
    pub const UDP: u8 = 17;
    pub const ROUTING: u8 = 43;
    pub const FRAGMENT: u8 = 44;
    pub const ICMPV6: u8 = 58;
    pub const DESTINATION_OPTIONS: u8 = 60;
}

/// Ethertype constants
pub mod ethertypes {
    pub const IPV4: u16 = 0x0800;
    pub const ARP: u16 = 0x0806;
    pub const DOT1Q: u16 = 0x8100;
    pub const IPV6: u16 = 0x86DD;
    pub const QINQ: u16 = 0x88A8;
}

/// IP version of a dissected packet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum IpVersion {
    #[serde(rename = "IPv4")]
    V4,
    #[serde(rename = "IPv6")]
    V6,
}

impl fmt::Display for IpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpVersion::V4 => write!(f, "IPv4"),
            IpVersion::V6 => write!(f, "IPv6"),
        }
    }
}

/// Transport protocol carried by an IP packet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TransportProtocol {
    #[serde(rename = "TCP")]
    Tcp,
    #[serde(rename = "UDP")]
    Udp,
    #[serde(rename = "ICMP")]
    Icmp,
    #[serde(rename = "ICMPv6")]
    Icmpv6,
    #[serde(rename = "IGMP")]
    Igmp,
    #[serde(rename = "UNKNOWN")]
    Unknown,
}

impl TransportProtocol {
    /// Map an IP protocol / IPv6 next-header number to a transport tag
    ///
    /// Returns `None` for numbers that are not a transport (extension headers and
    /// anything unrecognized); callers decide whether that means `Unknown`.
    pub fn from_ip_number(value: u8) -> Option<Self> {
        match value {
            ip_numbers::TCP => Some(TransportProtocol::Tcp),
            ip_numbers::UDP => Some(TransportProtocol::Udp),
            ip_numbers::ICMP => Some(TransportProtocol::Icmp),
            ip_numbers::ICMPV6 => Some(TransportProtocol::Icmpv6),
            ip_numbers::IGMP => Some(TransportProtocol::Igmp),
            _ => None,
        }
    }

    /// All tags, in display order
    pub const ALL: [TransportProtocol; 6] = [
        TransportProtocol::Tcp,
        TransportProtocol::Udp,
        TransportProtocol::Icmp,
        TransportProtocol::Icmpv6,
        TransportProtocol::Igmp,
        TransportProtocol::Unknown,
    ];
}

impl fmt::Display for TransportProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransportProtocol::Tcp => "TCP",
            TransportProtocol::Udp => "UDP",
            TransportProtocol::Icmp => "ICMP",
            TransportProtocol::Icmpv6 => "ICMPv6",
            TransportProtocol::Igmp => "IGMP",
            TransportProtocol::Unknown => "UNKNOWN",
        };
        f.write_str(name)
    }
}

/// Coarse application protocol guess
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ApplicationProtocol {
    Http,
    Https,
    Dns,
    Ftp,
    Ssh,
    Smtp,
    Quic,
    Ntp,
    Unknown,
}

impl fmt::Display for ApplicationProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ApplicationProtocol::Http => "HTTP",
            ApplicationProtocol::Https => "HTTPS",
            ApplicationProtocol::Dns => "DNS",
            ApplicationProtocol::Ftp => "FTP",
            ApplicationProtocol::Ssh => "SSH",
            ApplicationProtocol::Smtp => "SMTP",
            ApplicationProtocol::Quic => "QUIC",
            ApplicationProtocol::Ntp => "NTP",
            ApplicationProtocol::Unknown => "UNKNOWN",
        };
        f.write_str(name)
    }
}
