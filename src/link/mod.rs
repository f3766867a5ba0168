//! Per-connection link state.
//!
//! A [`Link`] owns everything needed to talk to one station over one byte
//! stream: the negotiated addresses, the FID counter, the inbound frame
//! decoder, the handshake progress and the outbound frame queue. Sending is
//! fire-and-forget; encoded frames are pushed onto an unbounded channel that
//! the transport task drains.

mod handshake;

use std::fmt;

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::error::FrameError;
use crate::protocol::frame::{self, FrameDecoder};
use crate::protocol::packet::{Packet, ProtocolVersion};

pub use handshake::HandshakeStage;

/// Highest FID handed out by the automatic counter before wrapping to 0.
pub const MAX_FID: u8 = 239;

/// Reserved FID used by handshake frames.
pub const HANDSHAKE_FID: u8 = 253;

/// Bit flipped in the station address to form the handshake reply target.
pub const RESPONDER_BIT: u8 = 0x80;

/// Identifier of one attached link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkId(pub u32);

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "link#{}", self.0)
    }
}

/// Lifecycle of a link as seen by observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LinkState {
    /// Attached, nothing received yet.
    #[default]
    Uninitialized,
    /// Handshake or port discovery in progress.
    Initializing,
    /// Handshake finished but the device is not a supported station.
    UnknownDevice,
    /// A station was identified and is being tracked.
    StationFound,
}

/// Addressing, sequencing and framing for one connection.
#[derive(Debug)]
pub struct Link {
    source: u8,
    target: u8,
    last_fid: u8,
    version: ProtocolVersion,
    decoder: FrameDecoder,
    stage: HandshakeStage,
    firmware: Option<String>,
    device_id: Option<String>,
    outbound: mpsc::UnboundedSender<Bytes>,
}

impl Link {
    /// Creates a link that queues encoded frames on `outbound`.
    #[must_use]
    pub fn new(outbound: mpsc::UnboundedSender<Bytes>, version: ProtocolVersion) -> Self {
        Self {
            source: 0,
            target: 0,
            last_fid: 0,
            version,
            decoder: FrameDecoder::with_version(version),
            stage: HandshakeStage::NotStarted,
            firmware: None,
            device_id: None,
            outbound,
        }
    }

    /// Our negotiated address (0 until the handshake completes).
    #[must_use]
    pub const fn source(&self) -> u8 {
        self.source
    }

    /// The station's address.
    #[must_use]
    pub const fn target(&self) -> u8 {
        self.target
    }

    /// FID of the most recently formed packet.
    #[must_use]
    pub const fn last_fid(&self) -> u8 {
        self.last_fid
    }

    /// Current handshake stage.
    #[must_use]
    pub const fn stage(&self) -> HandshakeStage {
        self.stage
    }

    /// Whether address negotiation has finished.
    #[must_use]
    pub fn is_established(&self) -> bool {
        self.stage == HandshakeStage::Complete
    }

    /// Firmware description reported during the handshake.
    #[must_use]
    pub fn firmware(&self) -> Option<&str> {
        self.firmware.as_deref()
    }

    /// Device identifier reported during the handshake.
    #[must_use]
    pub fn device_id(&self) -> Option<&str> {
        self.device_id.as_deref()
    }

    /// Returns true if an established link should act on `packet`.
    #[must_use]
    pub const fn accepts(&self, packet: &Packet) -> bool {
        packet.target == self.source
    }

    /// Allocates the FID for the next outbound packet.
    ///
    /// A pinned id is used verbatim. Otherwise the counter advances by one,
    /// wrapping to 0 once it passes [`MAX_FID`].
    pub fn next_fid(&mut self, pinned: Option<u8>) -> u8 {
        let fid = pinned.unwrap_or(if self.last_fid >= MAX_FID {
            0
        } else {
            self.last_fid + 1
        });
        self.last_fid = fid;
        fid
    }

    /// Builds an outbound packet addressed from us.
    ///
    /// `target` overrides the working target address for this packet only.
    pub fn form(
        &mut self,
        command: u8,
        payload: &[u8],
        fid: Option<u8>,
        target: Option<u8>,
    ) -> Packet {
        let fid = self.next_fid(fid);
        let mut packet = Packet::new(
            fid,
            command,
            self.source,
            target.unwrap_or(self.target),
            payload,
        );
        packet.version = self.version;
        packet
    }

    /// Forms and queues a packet to the station with the next FID.
    pub fn send(&mut self, command: u8, payload: &[u8]) {
        let packet = self.form(command, payload, None, None);
        self.transmit(&packet);
    }

    /// Encodes and queues an already formed packet.
    ///
    /// Failures are logged and otherwise ignored: the protocol has no
    /// delivery guarantees and the poller re-requests anything important.
    pub fn transmit(&self, packet: &Packet) {
        let frame = match frame::encode(packet) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(command = packet.command, "dropping outbound packet: {e}");
                return;
            }
        };
        tracing::trace!(
            command = packet.command,
            fid = packet.fid,
            target = packet.target,
            "queueing frame: {}",
            hex::encode(&frame)
        );
        if self.outbound.send(frame).is_err() {
            tracing::debug!(command = packet.command, "transport gone, frame discarded");
        }
    }

    /// Appends received bytes to the frame decoder.
    pub fn feed(&mut self, data: &[u8]) {
        self.decoder.feed(data);
    }

    /// Returns the next decoded packet, if any.
    pub fn decode(&mut self) -> Result<Option<Packet>, FrameError> {
        self.decoder.decode()
    }
}
