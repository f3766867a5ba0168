//! Error types for the jbc-station library.

use thiserror::Error;

use crate::link::{HandshakeStage, LinkId};

/// The main error type for station operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Serial port error.
    #[error("serial port error: {0}")]
    Serial(#[from] tokio_serial::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Frame encoding/decoding error.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// Response payload could not be interpreted.
    #[error("payload error: {0}")]
    Payload(#[from] PayloadError),

    /// The address negotiation received something it did not expect.
    #[error("handshake error: {0}")]
    Handshake(#[from] HandshakeError),

    /// A station could not be built from the identity the device reported.
    #[error("station error: {0}")]
    Station(#[from] StationError),

    /// Connection is not established.
    #[error("not connected")]
    NotConnected,

    /// No link is registered under this id.
    #[error("unknown link {0}")]
    UnknownLink(LinkId),

    /// Channel receive error.
    #[error("channel closed")]
    ChannelClosed,
}

/// Frame-specific errors.
///
/// Every variant is recoverable: the offending frame is dropped and the
/// decoder resumes at the next delimiter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// Frame shorter than the protocol minimum.
    #[error("frame too short: need at least {min} bytes, got {got}")]
    TooShort { min: usize, got: usize },

    /// Frame does not start with START or end with STOP.
    #[error("frame has wrong start or stop delimiter")]
    BadDelimiter,

    /// Length byte disagrees with the number of payload bytes received.
    #[error("payload length mismatch: header says {declared} bytes, frame carries {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    /// Checksum byte does not match the frame contents.
    #[error("checksum mismatch: computed 0x{computed:02x}, frame carries 0x{received:02x}")]
    ChecksumMismatch { computed: u8, received: u8 },

    /// Payload exceeds the single length byte.
    #[error("payload too large: {size} bytes exceeds maximum {max}")]
    TooLarge { size: usize, max: usize },
}

/// A response payload that does not have the shape its command requires.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    /// Wrong number of bytes.
    #[error("{what}: expected {expected} bytes, got {got}")]
    Length {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    /// A byte outside the set of values the field allows.
    #[error("{what}: invalid value 0x{value:02x}")]
    InvalidValue { what: &'static str, value: u8 },
}

/// Unexpected traffic during address negotiation.
///
/// The handshake stalls on these; there is no automatic retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandshakeError {
    /// A packet arrived that the current stage does not accept.
    #[error("unexpected command 0x{command:02x} while {stage:?}")]
    UnexpectedCommand { stage: HandshakeStage, command: u8 },

    /// The final acknowledgement carried a different FID than we sent.
    #[error("acknowledgement FID {received} does not match sent FID {expected}")]
    FidMismatch { expected: u8, received: u8 },

    /// The final acknowledgement carried something other than the ACK marker.
    #[error("acknowledgement payload is not the ACK marker: {payload:02x?}")]
    BadAcknowledgement { payload: Vec<u8> },
}

/// Failures building a station from the identity strings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StationError {
    /// Firmware string did not split into the expected fields.
    #[error("firmware string {raw:?} has {fields} fields, expected 4")]
    MalformedFirmware { raw: String, fields: usize },

    /// Model name does not belong to any known station family.
    #[error("model {model:?} does not match any station family")]
    UnknownFamily { model: String },
}

/// Result type alias for station operations.
pub type Result<T> = std::result::Result<T, Error>;
