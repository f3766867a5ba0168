//! Address negotiation.
//!
//! A station announces itself by broadcasting a discover frame. We answer
//! with an acknowledgement and a firmware request, ask for the device id,
//! and acknowledge once more. The station's reply to that last ack tells us
//! the address it assigned to us.
//!
//! ```text
//! NotStarted ──discover──▶ WaitingForFirmware ──firmware──▶ WaitingForDeviceId
//!                                                                  │
//!            Complete ◀──matching ack── WaitingForAck ◀──device id─┘
//! ```
//!
//! Anything unexpected stalls the negotiation in its current stage.

use crate::error::HandshakeError;
use crate::link::{HANDSHAKE_FID, Link, RESPONDER_BIT};
use crate::protocol::command::LinkCommand;
use crate::protocol::packet::Packet;
use crate::protocol::parser::parse_string;

/// Progress of address negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HandshakeStage {
    /// Waiting for the station's discover broadcast.
    #[default]
    NotStarted,
    /// Acknowledged the broadcast and asked for the firmware string.
    WaitingForFirmware,
    /// Asked for the device id.
    WaitingForDeviceId,
    /// Sent the final acknowledgement.
    WaitingForAck,
    /// Addresses are negotiated.
    Complete,
}

fn is_discover(packet: &Packet) -> bool {
    let handshake = u8::from(LinkCommand::Handshake);
    let discover = u8::from(LinkCommand::Discover);

    packet.fid == HANDSHAKE_FID
        && packet.target == 0
        && ((packet.command == handshake && packet.payload_is(discover))
            || packet.command == discover)
}

impl Link {
    /// Advances the handshake with one inbound packet.
    ///
    /// Returns the stage reached. On error the stage is unchanged.
    pub fn handshake(&mut self, packet: &Packet) -> Result<HandshakeStage, HandshakeError> {
        let stage = self.stage;
        let command = packet.command;
        let unexpected = move || HandshakeError::UnexpectedCommand { stage, command };

        match self.stage {
            HandshakeStage::NotStarted => {
                if self.source != 0 || self.target != 0 || !is_discover(packet) {
                    return Err(unexpected());
                }
                let responder = packet.source ^ RESPONDER_BIT;
                let ack = self.form(
                    LinkCommand::Handshake.into(),
                    &[LinkCommand::Ack.into()],
                    Some(HANDSHAKE_FID),
                    Some(responder),
                );
                self.transmit(&ack);
                let request = self.form(
                    LinkCommand::Firmware.into(),
                    &[],
                    Some(HANDSHAKE_FID),
                    Some(responder),
                );
                self.transmit(&request);
                self.target = packet.source;
                tracing::debug!(station = self.target, "discover acknowledged");
                self.stage = HandshakeStage::WaitingForFirmware;
            }
            HandshakeStage::WaitingForFirmware => {
                if packet.command != u8::from(LinkCommand::Firmware) {
                    return Err(unexpected());
                }
                let firmware = parse_string(packet.data());
                tracing::debug!(%firmware, "firmware reported");
                self.firmware = Some(firmware);
                self.last_fid = 0;
                let request = self.form(LinkCommand::DeviceId.into(), &[], Some(0), None);
                self.transmit(&request);
                self.stage = HandshakeStage::WaitingForDeviceId;
            }
            HandshakeStage::WaitingForDeviceId => {
                if packet.command != u8::from(LinkCommand::DeviceId) {
                    return Err(unexpected());
                }
                let device_id = parse_string(packet.data());
                tracing::debug!(%device_id, "device id reported");
                self.device_id = Some(device_id);
                let ack = self.form(
                    LinkCommand::Handshake.into(),
                    &[LinkCommand::Ack.into()],
                    Some(HANDSHAKE_FID),
                    None,
                );
                self.transmit(&ack);
                self.stage = HandshakeStage::WaitingForAck;
            }
            HandshakeStage::WaitingForAck => {
                if packet.command != u8::from(LinkCommand::Handshake) {
                    return Err(unexpected());
                }
                if packet.fid != self.last_fid {
                    return Err(HandshakeError::FidMismatch {
                        expected: self.last_fid,
                        received: packet.fid,
                    });
                }
                if !packet.payload_is(LinkCommand::Ack.into()) {
                    return Err(HandshakeError::BadAcknowledgement {
                        payload: packet.data().to_vec(),
                    });
                }
                self.source = packet.target;
                tracing::info!(
                    source = self.source,
                    target = self.target,
                    "handshake complete"
                );
                self.stage = HandshakeStage::Complete;
            }
            HandshakeStage::Complete => {}
        }
        Ok(self.stage)
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use tokio::sync::mpsc;

    use super::*;
    use crate::protocol::frame::FrameDecoder;
    use crate::protocol::packet::ProtocolVersion;

    const STATION: u8 = 0x01;
    const ASSIGNED: u8 = 0x11;

    fn link() -> (Link, mpsc::UnboundedReceiver<Bytes>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Link::new(tx, ProtocolVersion::Two), rx)
    }

    fn sent(rx: &mut mpsc::UnboundedReceiver<Bytes>) -> Vec<Packet> {
        let mut decoder = FrameDecoder::new();
        while let Ok(frame) = rx.try_recv() {
            decoder.feed(&frame);
        }
        std::iter::from_fn(|| decoder.decode().unwrap()).collect()
    }

    fn discover() -> Packet {
        Packet::new(
            HANDSHAKE_FID,
            LinkCommand::Handshake.into(),
            STATION,
            0,
            &[LinkCommand::Discover.into()],
        )
    }

    fn reply(command: LinkCommand, fid: u8, payload: &[u8]) -> Packet {
        Packet::new(fid, command.into(), STATION, 0, payload)
    }

    #[test]
    fn test_full_handshake() {
        let (mut link, mut rx) = link();

        assert_eq!(
            link.handshake(&discover()).unwrap(),
            HandshakeStage::WaitingForFirmware
        );
        let out = sent(&mut rx);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].command, u8::from(LinkCommand::Handshake));
        assert_eq!(out[0].data(), &[u8::from(LinkCommand::Ack)]);
        assert_eq!(out[0].fid, HANDSHAKE_FID);
        assert_eq!(out[0].target, STATION ^ RESPONDER_BIT);
        assert_eq!(out[1].command, u8::from(LinkCommand::Firmware));
        assert_eq!(out[1].fid, HANDSHAKE_FID);
        assert_eq!(out[1].target, STATION ^ RESPONDER_BIT);
        assert_eq!(link.target(), STATION);

        let firmware = reply(LinkCommand::Firmware, HANDSHAKE_FID, b"02:DDE_2C:1:2");
        assert_eq!(
            link.handshake(&firmware).unwrap(),
            HandshakeStage::WaitingForDeviceId
        );
        let out = sent(&mut rx);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].command, u8::from(LinkCommand::DeviceId));
        assert_eq!(out[0].fid, 0);
        assert_eq!(out[0].target, STATION);
        assert_eq!(link.firmware(), Some("02:DDE_2C:1:2"));

        let device_id = reply(LinkCommand::DeviceId, 0, b"ABC123");
        assert_eq!(
            link.handshake(&device_id).unwrap(),
            HandshakeStage::WaitingForAck
        );
        let out = sent(&mut rx);
        assert_eq!(out[0].command, u8::from(LinkCommand::Handshake));
        assert_eq!(out[0].fid, HANDSHAKE_FID);
        assert_eq!(link.device_id(), Some("ABC123"));

        let mut ack = reply(
            LinkCommand::Handshake,
            HANDSHAKE_FID,
            &[LinkCommand::Ack.into()],
        );
        ack.target = ASSIGNED;
        assert_eq!(link.handshake(&ack).unwrap(), HandshakeStage::Complete);
        assert!(link.is_established());
        assert_eq!(link.source(), ASSIGNED);
        assert_eq!(link.target(), STATION);

        // Counter continues from 0 after the pinned handshake id.
        assert_eq!(link.next_fid(None), 0);
    }

    #[test]
    fn test_discover_command_form() {
        let (mut link, _rx) = link();
        let packet = Packet::new(HANDSHAKE_FID, LinkCommand::Discover.into(), STATION, 0, &[]);
        assert_eq!(
            link.handshake(&packet).unwrap(),
            HandshakeStage::WaitingForFirmware
        );
    }

    #[test]
    fn test_discover_with_wrong_fid_ignored() {
        let (mut link, mut rx) = link();
        let mut packet = discover();
        packet.fid = 5;
        assert!(matches!(
            link.handshake(&packet),
            Err(HandshakeError::UnexpectedCommand {
                stage: HandshakeStage::NotStarted,
                ..
            })
        ));
        assert!(sent(&mut rx).is_empty());
    }

    #[test]
    fn test_wrong_reply_stalls() {
        let (mut link, _rx) = link();
        link.handshake(&discover()).unwrap();

        let wrong = reply(LinkCommand::DeviceId, 0, b"x");
        assert!(link.handshake(&wrong).is_err());
        assert_eq!(link.stage(), HandshakeStage::WaitingForFirmware);
        assert!(link.firmware().is_none());
    }

    fn at_ack_stage() -> (Link, mpsc::UnboundedReceiver<Bytes>) {
        let (mut link, rx) = link();
        link.handshake(&discover()).unwrap();
        link.handshake(&reply(LinkCommand::Firmware, 0, b"02:DDE:1:2"))
            .unwrap();
        link.handshake(&reply(LinkCommand::DeviceId, 0, b"id"))
            .unwrap();
        (link, rx)
    }

    #[test]
    fn test_ack_fid_mismatch() {
        let (mut link, _rx) = at_ack_stage();
        let ack = reply(LinkCommand::Handshake, 12, &[LinkCommand::Ack.into()]);
        assert_eq!(
            link.handshake(&ack).unwrap_err(),
            HandshakeError::FidMismatch {
                expected: HANDSHAKE_FID,
                received: 12
            }
        );
        assert_eq!(link.stage(), HandshakeStage::WaitingForAck);
        assert_eq!(link.source(), 0);
    }

    #[test]
    fn test_ack_bad_payload() {
        let (mut link, _rx) = at_ack_stage();
        let nack = reply(
            LinkCommand::Handshake,
            HANDSHAKE_FID,
            &[LinkCommand::Nack.into()],
        );
        assert!(matches!(
            link.handshake(&nack),
            Err(HandshakeError::BadAcknowledgement { .. })
        ));
        assert!(!link.is_established());
    }
}
