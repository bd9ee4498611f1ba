//! netanalyze core library
//!
//! Protocol tags and the error taxonomy shared by the dissector, the capture
//! engine, the statistics engine and the front ends.

pub mod error;
pub mod types;

pub use error::{Error, MalformedPacket, Result};
pub use types::{ApplicationProtocol, IpVersion, TransportProtocol};
