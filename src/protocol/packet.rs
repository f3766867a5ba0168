//! Structured packet exchanged with a station.
//!
//! A packet is the logical content of one frame: addressing, sequence id,
//! a raw command byte and up to 255 payload bytes. The command byte is
//! deliberately kept raw here because its meaning depends on the station
//! family (see [`crate::protocol::command`]).

use bytes::Bytes;

/// Maximum payload size (the length field is a single byte).
pub const MAX_PAYLOAD_SIZE: usize = 255;

/// Protocol revision spoken on a link.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ProtocolVersion {
    /// Early revision without the FID byte.
    One,
    /// Current revision with a per-frame sequence id.
    #[default]
    Two,
}

impl ProtocolVersion {
    /// Smallest valid frame for this revision, delimiters and checksum included.
    #[must_use]
    pub const fn min_frame_len(self) -> usize {
        match self {
            // Start + To + From + Cmd + Len=0 + BCC + End
            Self::One => 7,
            // Start + To + From + FID + Cmd + Len=0 + BCC + End
            Self::Two => 8,
        }
    }

    /// Offset of the command byte within the frame.
    #[must_use]
    pub const fn command_offset(self) -> usize {
        match self {
            Self::One => 3,
            Self::Two => 4,
        }
    }
}

/// Which side produced the packet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Built locally, to be sent to the station.
    #[default]
    Outbound,
    /// Decoded from bytes received from the station.
    Inbound,
}

/// One protocol packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Protocol revision (decides whether `fid` goes on the wire).
    pub version: ProtocolVersion,
    /// Frame sequence id.
    pub fid: u8,
    /// Raw command byte.
    pub command: u8,
    /// Sender address.
    pub source: u8,
    /// Receiver address.
    pub target: u8,
    /// Command data.
    pub payload: Bytes,
    /// Whether this packet was received or is about to be sent.
    pub direction: Direction,
}

impl Packet {
    /// Creates an outbound protocol-2 packet.
    #[must_use]
    pub fn new(fid: u8, command: u8, source: u8, target: u8, payload: &[u8]) -> Self {
        Self {
            version: ProtocolVersion::Two,
            fid,
            command,
            source,
            target,
            payload: Bytes::copy_from_slice(payload),
            direction: Direction::Outbound,
        }
    }

    /// Returns the payload as a slice.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.payload
    }

    /// Returns true if the payload is exactly one byte equal to `marker`.
    #[must_use]
    pub fn payload_is(&self, marker: u8) -> bool {
        self.payload.len() == 1 && self.payload[0] == marker
    }
}
