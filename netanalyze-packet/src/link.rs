//! Link-layer encapsulations and ethertype extraction
//!
//! The capture source reports a datalink type once, when it is opened. That
//! value picks a [`LinkLayer`], which fixes where the network-layer header
//! starts and where the 2-byte ethertype / protocol field lives for every
//! frame of the capture.

use netanalyze_core::types::ethertypes;
use netanalyze_core::MalformedPacket;
use std::fmt;

/// Common EtherType values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EtherType {
    /// IPv4 (0x0800)
    IPv4,
    /// ARP (0x0806)
    ARP,
    /// VLAN-tagged frame (0x8100)
    VLAN,
    /// IPv6 (0x86DD)
    IPv6,
    /// Q-in-Q/802.1ad (0x88A8)
    QinQ,
    /// Anything else
    Custom(u16),
}

impl EtherType {
    /// Convert EtherType to u16 value
    pub fn to_u16(self) -> u16 {
        match self {
            EtherType::IPv4 => ethertypes::IPV4,
            EtherType::ARP => ethertypes::ARP,
            EtherType::VLAN => ethertypes::DOT1Q,
            EtherType::IPv6 => ethertypes::IPV6,
            EtherType::QinQ => ethertypes::QINQ,
            EtherType::Custom(val) => val,
        }
    }

    /// Create EtherType from u16 value
    pub fn from_u16(value: u16) -> Self {
        match value {
            ethertypes::IPV4 => EtherType::IPv4,
            ethertypes::ARP => EtherType::ARP,
            ethertypes::DOT1Q => EtherType::VLAN,
            ethertypes::IPV6 => EtherType::IPv6,
            ethertypes::QINQ => EtherType::QinQ,
            val => EtherType::Custom(val),
        }
    }
}

impl fmt::Display for EtherType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EtherType::IPv4 => write!(f, "IPv4"),
            EtherType::ARP => write!(f, "ARP"),
            EtherType::VLAN => write!(f, "VLAN"),
            EtherType::IPv6 => write!(f, "IPv6"),
            EtherType::QinQ => write!(f, "Q-in-Q"),
            EtherType::Custom(val) => write!(f, "0x{:04X}", val),
        }
    }
}

/// Datalink type numbers reported by libpcap
pub mod datalink {
    /// DLT_EN10MB
    pub const ETHERNET: i32 = 1;
    /// DLT_LINUX_SLL ("any" device, cooked v1)
    pub const LINUX_SLL: i32 = 113;
    /// DLT_LINUX_SLL2 (cooked v2)
    pub const LINUX_SLL2: i32 = 276;
}

/// Supported link-layer encapsulations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkLayer {
    /// Ethernet II: 14-byte header, ethertype at offset 12
    Ethernet,
    /// Linux cooked capture v1: 16-byte header, protocol at offset 14
    LinuxSll,
    /// Linux cooked capture v2: 20-byte header, protocol at offset 0
    LinuxSll2,
}

impl LinkLayer {
    /// Pick the encapsulation for a datalink type, `None` if unsupported
    pub fn from_datalink(dlt: i32) -> Option<Self> {
        match dlt {
            datalink::ETHERNET => Some(LinkLayer::Ethernet),
            datalink::LINUX_SLL => Some(LinkLayer::LinuxSll),
            datalink::LINUX_SLL2 => Some(LinkLayer::LinuxSll2),
            _ => None,
        }
    }

    /// The datalink type number for this encapsulation
    pub fn datalink(self) -> i32 {
        match self {
            LinkLayer::Ethernet => datalink::ETHERNET,
            LinkLayer::LinuxSll => datalink::LINUX_SLL,
            LinkLayer::LinuxSll2 => datalink::LINUX_SLL2,
        }
    }

    /// Offset of the network-layer header
    pub fn header_len(self) -> usize {
        match self {
            LinkLayer::Ethernet => 14,
            LinkLayer::LinuxSll => 16,
            LinkLayer::LinuxSll2 => 20,
        }
    }

    /// Offset of the 2-byte ethertype / protocol field
    pub fn ethertype_offset(self) -> usize {
        match self {
            LinkLayer::Ethernet => 12,
            LinkLayer::LinuxSll => 14,
            LinkLayer::LinuxSll2 => 0,
        }
    }

    /// Read the ethertype of a frame
    pub fn ethertype(self, frame: &[u8]) -> Result<EtherType, MalformedPacket> {
        let needed = self.header_len();
        if frame.len() < needed {
            return Err(MalformedPacket::Truncated {
                layer: self.name(),
                needed,
                available: frame.len(),
            });
        }
        let at = self.ethertype_offset();
        Ok(EtherType::from_u16(u16::from_be_bytes([
            frame[at],
            frame[at + 1],
        ])))
    }

    /// Short human-readable name
    pub fn name(self) -> &'static str {
        match self {
            LinkLayer::Ethernet => "Ethernet",
            LinkLayer::LinuxSll => "Linux SLL",
            LinkLayer::LinuxSll2 => "Linux SLL2",
        }
    }
}

impl fmt::Display for LinkLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
