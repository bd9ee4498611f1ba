//! Capture source enumeration and information

use netanalyze_core::{Error, Result};
use pcap::Device;
use std::net::IpAddr;

/// Information about a capture source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceInfo {
    /// Source name (e.g., "eth0", "any")
    pub name: String,
    /// Human-readable description, if the platform provides one
    pub description: Option<String>,
    /// Addresses assigned to this source
    pub addresses: Vec<IpAddr>,
    /// Netmask of the first IPv4 address
    pub netmask: Option<IpAddr>,
    /// Whether the source is a loopback
    pub is_loopback: bool,
    /// Whether the source is up
    pub is_up: bool,
}

impl From<&Device> for SourceInfo {
    fn from(device: &Device) -> Self {
        let netmask = device
            .addresses
            .iter()
            .find(|address| address.addr.is_ipv4())
            .and_then(|address| address.netmask);

        SourceInfo {
            name: device.name.clone(),
            description: device.desc.clone(),
            addresses: device.addresses.iter().map(|address| address.addr).collect(),
            netmask,
            is_loopback: device.flags.is_loopback(),
            is_up: device.flags.is_up(),
        }
    }
}

impl SourceInfo {
    /// Create an entry for a source known only by name
    pub fn named(name: &str) -> Self {
        SourceInfo {
            name: name.to_string(),
            description: None,
            addresses: Vec::new(),
            netmask: None,
            is_loopback: false,
            is_up: true,
        }
    }

    /// One-line listing entry: `name (description)`
    pub fn display_line(&self) -> String {
        match &self.description {
            Some(description) => format!("{}  ({})", self.name, description),
            None => self.name.clone(),
        }
    }
}

/// List all capture sources libpcap can open
pub fn list_sources() -> Result<Vec<SourceInfo>> {
    let devices = Device::list().map_err(|e| Error::Enumeration(e.to_string()))?;
    Ok(devices.iter().map(SourceInfo::from).collect())
}

/// Find a source by name in an enumerated list
pub fn find_source<'a>(sources: &'a [SourceInfo], name: &str) -> Result<&'a SourceInfo> {
    sources
        .iter()
        .find(|source| source.name == name)
        .ok_or_else(|| Error::SourceNotFound(name.to_string()))
}

/// Netmask used for filter compilation, if the source has one
pub fn netmask(source: &SourceInfo) -> Option<IpAddr> {
    source.netmask
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn sources() -> Vec<SourceInfo> {
        vec![
            SourceInfo {
                name: "lo".to_string(),
                description: None,
                addresses: vec![IpAddr::V4(Ipv4Addr::LOCALHOST)],
                netmask: Some(IpAddr::V4(Ipv4Addr::new(255, 0, 0, 0))),
                is_loopback: true,
                is_up: true,
            },
            SourceInfo {
                name: "any".to_string(),
                description: Some("Pseudo-device that captures on all interfaces".to_string()),
                addresses: Vec::new(),
                netmask: None,
                is_loopback: false,
                is_up: true,
            },
        ]
    }

    #[test]
    fn test_find_source() {
        let sources = sources();
        assert_eq!(find_source(&sources, "any").unwrap().name, "any");

        match find_source(&sources, "nonexistent_interface_xyz") {
            Err(Error::SourceNotFound(name)) => assert_eq!(name, "nonexistent_interface_xyz"),
            other => panic!("Expected SourceNotFound error, got {:?}", other),
        }
    }

    #[test]
    fn test_netmask() {
        let sources = sources();
        assert_eq!(
            netmask(&sources[0]),
            Some(IpAddr::V4(Ipv4Addr::new(255, 0, 0, 0)))
        );
        assert_eq!(netmask(&sources[1]), None);
    }

    #[test]
    fn test_display_line() {
        let sources = sources();
        assert_eq!(sources[0].display_line(), "lo");
        assert!(sources[1].display_line().starts_with("any  (Pseudo-device"));
    }

    #[test]
    fn test_list_sources() {
        // Enumeration may be empty in sandboxes but must not fail outright
        match list_sources() {
            Ok(sources) => {
                for source in sources {
                    assert!(!source.name.is_empty());
                }
            }
            Err(e) => println!("Could not enumerate sources: {}", e),
        }
    }
}
