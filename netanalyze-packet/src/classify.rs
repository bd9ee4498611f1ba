//! Heuristic application-protocol classification
//!
//! A few cheap payload signatures are tried first; everything else falls back
//! to a well-known-port lookup on the lower of the two ports.

use crate::tcp::TcpPort;
use crate::udp::UdpPort;
use netanalyze_core::{ApplicationProtocol, TransportProtocol};

/// Request/response prefixes that mark a TCP payload as HTTP
const HTTP_PREFIXES: [&[u8; 4]; 5] = [b"GET ", b"POST", b"HEAD", b"PUT ", b"HTTP"];

/// Smallest payload worth inspecting
const MIN_INSPECTED_PAYLOAD: usize = 4;

/// Minimum DNS message size (fixed header)
const DNS_HEADER_SIZE: usize = 12;

/// TLS handshake record: content type 0x16, major version 3
const TLS_HANDSHAKE: [u8; 2] = [0x16, 0x03];

/// Guess the application protocol of a packet.
///
/// `payload` is the captured payload, already bounded by the declared
/// payload length. First match wins.
pub fn classify(
    transport: TransportProtocol,
    src_port: u16,
    dst_port: u16,
    payload: &[u8],
) -> ApplicationProtocol {
    if payload.len() >= MIN_INSPECTED_PAYLOAD {
        if let Some(protocol) = inspect_payload(transport, src_port, dst_port, payload) {
            return protocol;
        }
    }

    by_port(transport, src_port.min(dst_port))
}

fn inspect_payload(
    transport: TransportProtocol,
    src_port: u16,
    dst_port: u16,
    payload: &[u8],
) -> Option<ApplicationProtocol> {
    let is_tcp = transport == TransportProtocol::Tcp;

    if is_tcp && HTTP_PREFIXES.iter().any(|prefix| payload.starts_with(*prefix)) {
        return Some(ApplicationProtocol::Http);
    }

    let dns = UdpPort::DNS.to_u16();
    if (src_port == dns || dst_port == dns) && payload.len() >= DNS_HEADER_SIZE {
        return Some(ApplicationProtocol::Dns);
    }

    if is_tcp && payload.starts_with(&TLS_HANDSHAKE) {
        return Some(ApplicationProtocol::Https);
    }

    None
}

/// Well-known port lookup
pub fn by_port(transport: TransportProtocol, port: u16) -> ApplicationProtocol {
    match transport {
        TransportProtocol::Tcp => match TcpPort(port) {
            TcpPort::FTP => ApplicationProtocol::Ftp,
            TcpPort::SSH => ApplicationProtocol::Ssh,
            TcpPort::SMTP => ApplicationProtocol::Smtp,
            TcpPort::DNS => ApplicationProtocol::Dns,
            TcpPort::HTTP => ApplicationProtocol::Http,
            TcpPort::HTTPS => ApplicationProtocol::Https,
            _ => ApplicationProtocol::Unknown,
        },
        TransportProtocol::Udp => match UdpPort(port) {
            UdpPort::DNS => ApplicationProtocol::Dns,
            UdpPort::NTP => ApplicationProtocol::Ntp,
            UdpPort::QUIC => ApplicationProtocol::Quic,
            _ => ApplicationProtocol::Unknown,
        },
        _ => ApplicationProtocol::Unknown,
    }
}
