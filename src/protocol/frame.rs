//! Frame encoding and decoding for the station protocol.
//!
//! The logical frame is:
//! ```text
//! ┌───────┬────────┬────────┬─────┬─────┬─────┬─────────────┬─────┬──────┐
//! │ START │ target │ source │ FID │ cmd │ len │ payload...  │ BCC │ STOP │
//! │ 0x02  │   1    │   1    │  1  │  1  │  1  │  len bytes  │  1  │ 0x03 │
//! └───────┴────────┴────────┴─────┴─────┴─────┴─────────────┴─────┴──────┘
//! ```
//! (protocol 1 omits the FID byte).
//!
//! On the wire both delimiters are preceded by an ESCAPE (0x10) byte. Inside
//! the body a literal ESCAPE or START is preceded by one more ESCAPE, while
//! STOP travels bare: only an escape-flagged STOP closes a frame, and once a
//! frame is open an escaped START is just data.
//!
//! The checksum (BCC) is the XOR of every logical frame byte with its own
//! slot zeroed, OR'd with 0x20.

use std::collections::VecDeque;

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::FrameError;
use crate::protocol::packet::{Direction, MAX_PAYLOAD_SIZE, Packet, ProtocolVersion};

/// Start-of-frame delimiter (ASCII STX).
pub const START: u8 = 0x02;

/// End-of-frame delimiter (ASCII ETX).
pub const STOP: u8 = 0x03;

/// Escape byte (ASCII DLE).
pub const ESCAPE: u8 = 0x10;

/// Bit forced on in every checksum byte.
pub const CHECKSUM_MARK: u8 = 0x20;

/// Largest logical frame the decoder will buffer before giving up on it.
pub const MAX_FRAME_SIZE: usize = 8 + MAX_PAYLOAD_SIZE;

/// Computes the checksum of a complete logical frame.
///
/// The byte in the checksum slot (second to last) is ignored, so this can
/// be called on a received frame as well as on one being built.
#[must_use]
pub fn checksum(frame: &[u8]) -> u8 {
    let slot = frame.len().saturating_sub(2);
    frame
        .iter()
        .enumerate()
        .filter(|&(index, _)| index != slot)
        .fold(0u8, |acc, (_, &byte)| acc ^ byte)
        | CHECKSUM_MARK
}

/// Builds the unescaped frame for a packet.
///
/// # Errors
///
/// Returns `FrameError::TooLarge` if the payload does not fit the length byte.
pub fn logical_frame(packet: &Packet) -> Result<BytesMut, FrameError> {
    let payload_len = packet.payload.len();
    let Ok(len_byte) = u8::try_from(payload_len) else {
        return Err(FrameError::TooLarge {
            size: payload_len,
            max: MAX_PAYLOAD_SIZE,
        });
    };

    let mut buf = BytesMut::with_capacity(packet.version.min_frame_len() + payload_len);
    buf.put_u8(START);
    buf.put_u8(packet.target);
    buf.put_u8(packet.source);
    if packet.version == ProtocolVersion::Two {
        buf.put_u8(packet.fid);
    }
    buf.put_u8(packet.command);
    buf.put_u8(len_byte);
    buf.put_slice(&packet.payload);
    buf.put_u8(0); // checksum slot
    buf.put_u8(STOP);

    let slot = buf.len() - 2;
    buf[slot] = checksum(&buf);
    Ok(buf)
}

/// Encodes a packet into the escaped byte sequence sent on the wire.
///
/// # Errors
///
/// Returns `FrameError::TooLarge` if the payload exceeds 255 bytes.
pub fn encode(packet: &Packet) -> Result<Bytes, FrameError> {
    let frame = logical_frame(packet)?;
    let body = &frame[1..frame.len() - 1];

    let mut wire = BytesMut::with_capacity(frame.len() * 2);
    wire.put_u8(ESCAPE);
    wire.put_u8(START);
    for &byte in body {
        if byte == ESCAPE || byte == START {
            wire.put_u8(ESCAPE);
        }
        wire.put_u8(byte);
    }
    wire.put_u8(ESCAPE);
    wire.put_u8(STOP);
    Ok(wire.freeze())
}

/// Parses one complete, unescaped frame into a packet.
///
/// # Errors
///
/// Returns a `FrameError` if the frame is too short, has the wrong
/// delimiters, a length byte that disagrees with its size, or a bad checksum.
pub fn parse_frame(frame: &[u8], version: ProtocolVersion) -> Result<Packet, FrameError> {
    let min = version.min_frame_len();
    if frame.len() < min {
        return Err(FrameError::TooShort {
            min,
            got: frame.len(),
        });
    }
    if frame[0] != START || frame[frame.len() - 1] != STOP {
        return Err(FrameError::BadDelimiter);
    }

    let command_at = version.command_offset();
    let declared = usize::from(frame[command_at + 1]);
    let actual = frame.len() - min;
    if declared != actual {
        return Err(FrameError::LengthMismatch { declared, actual });
    }

    let computed = checksum(frame);
    let received = frame[frame.len() - 2];
    if computed != received {
        return Err(FrameError::ChecksumMismatch { computed, received });
    }

    let payload_at = command_at + 2;
    Ok(Packet {
        version,
        fid: if version == ProtocolVersion::Two {
            frame[3]
        } else {
            0
        },
        command: frame[command_at],
        target: frame[1],
        source: frame[2],
        payload: Bytes::copy_from_slice(&frame[payload_at..payload_at + declared]),
        direction: Direction::Inbound,
    })
}

/// Frame decoder that handles partial data.
///
/// Bytes are unescaped as they arrive; every escape-flagged STOP yields one
/// entry (a packet or the reason it was dropped) for [`FrameDecoder::decode`].
/// Bytes seen while no frame is open are skipped.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    version: ProtocolVersion,
    frame: BytesMut,
    escaped: bool,
    ready: VecDeque<Result<Packet, FrameError>>,
}

impl FrameDecoder {
    /// Creates a new frame decoder for protocol 2.
    #[must_use]
    pub fn new() -> Self {
        Self::with_version(ProtocolVersion::Two)
    }

    /// Creates a new frame decoder for the given protocol revision.
    #[must_use]
    pub fn with_version(version: ProtocolVersion) -> Self {
        Self {
            version,
            frame: BytesMut::with_capacity(MAX_FRAME_SIZE),
            escaped: false,
            ready: VecDeque::new(),
        }
    }

    /// Feeds data into the decoder.
    pub fn feed(&mut self, data: &[u8]) {
        for &byte in data {
            if self.escaped {
                self.escaped = false;
                match byte {
                    START if self.frame.is_empty() => self.frame.put_u8(START),
                    STOP if self.frame.is_empty() => {
                        tracing::trace!("stop outside a frame ignored");
                    }
                    STOP => {
                        self.frame.put_u8(STOP);
                        let frame = self.frame.split();
                        tracing::trace!("received frame: {}", hex::encode(&frame));
                        self.ready.push_back(parse_frame(&frame, self.version));
                    }
                    // Doubled escape, escaped START inside a frame and any
                    // other escaped byte are literal data.
                    other => self.push(other),
                }
            } else if byte == ESCAPE {
                self.escaped = true;
            } else {
                self.push(byte);
            }
        }
    }

    fn push(&mut self, byte: u8) {
        if self.frame.is_empty() {
            return;
        }
        if self.frame.len() >= MAX_FRAME_SIZE {
            let size = self.frame.len() + 1;
            self.frame.clear();
            self.ready.push_back(Err(FrameError::TooLarge {
                size,
                max: MAX_FRAME_SIZE,
            }));
            return;
        }
        self.frame.put_u8(byte);
    }

    /// Returns the next decoded packet.
    ///
    /// Returns `Ok(Some(packet))` if a frame was decoded, `Ok(None)` if more
    /// data is needed, or an error for a frame that was dropped. Decoding may
    /// continue after an error.
    pub fn decode(&mut self) -> Result<Option<Packet>, FrameError> {
        self.ready.pop_front().transpose()
    }

    /// Returns the number of bytes buffered for the frame in progress.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.frame.len()
    }

    /// Clears the internal buffer and any undelivered packets.
    pub fn clear(&mut self) {
        self.frame.clear();
        self.escaped = false;
        self.ready.clear();
    }
}
