//! Error types for netanalyze

use thiserror::Error;

/// Result type alias for netanalyze operations
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal and configuration errors surfaced by lifecycle operations
#[derive(Error, Debug)]
pub enum Error {
    /// Underlying I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Capture source enumeration failed
    #[error("Failed to enumerate capture sources: {0}")]
    Enumeration(String),

    /// Named capture source does not exist
    #[error("Capture source '{0}' not found")]
    SourceNotFound(String),

    /// Capture source could not be opened
    #[error("Couldn't open device {source_name}: {reason}")]
    DeviceOpen { source_name: String, reason: String },

    /// Datalink type the dissector cannot handle
    #[error("Unsupported datalink type {0}")]
    UnsupportedDatalink(i32),

    /// Filter expression did not compile
    #[error("Couldn't parse filter '{expression}': {reason}")]
    FilterCompile { expression: String, reason: String },

    /// Compiled filter could not be installed
    #[error("Couldn't install filter '{expression}': {reason}")]
    FilterInstall { expression: String, reason: String },

    /// Offline capture file is unreadable
    #[error("Error opening offline file {path}: {reason}")]
    CaptureFile { path: String, reason: String },

    /// Lifecycle operation called in the wrong state
    #[error("Invalid capture state: {0}")]
    InvalidState(String),

    /// User filter token could not be parsed
    #[error("Invalid filter '{0}'")]
    InvalidFilter(String),

    /// Generic capture failure
    #[error("Packet capture error: {0}")]
    Capture(String),

    /// Export failure
    #[error("Export error: {0}")]
    Export(String),
}

impl Error {
    /// Create a capture error with a custom message
    pub fn capture<S: Into<String>>(msg: S) -> Self {
        Error::Capture(msg.into())
    }

    /// Create an invalid state error
    pub fn invalid_state<S: Into<String>>(msg: S) -> Self {
        Error::InvalidState(msg.into())
    }

    /// Whether this error belongs to startup configuration
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::SourceNotFound(_)
                | Error::UnsupportedDatalink(_)
                | Error::FilterCompile { .. }
                | Error::FilterInstall { .. }
                | Error::InvalidFilter(_)
        )
    }
}

/// Per-frame dissection failure
///
/// The capture callback absorbs these: the frame is discarded and capture continues.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedPacket {
    /// Fewer bytes captured than the header needs
    #[error("{layer} header truncated: need {needed} bytes, have {available}")]
    Truncated {
        layer: &'static str,
        needed: usize,
        available: usize,
    },

    /// Header length field is implausible
    #[error("{layer} header length {length} is invalid")]
    HeaderLength { layer: &'static str, length: usize },
}
