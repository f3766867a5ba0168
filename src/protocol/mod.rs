//! Protocol definitions for station communication.
//!
//! This module contains the low-level protocol types including:
//! - Frame encoding/decoding
//! - Packet structure and protocol revisions
//! - Command vocabularies
//! - Binary payload parsing

pub mod command;
pub mod frame;
pub mod packet;
pub mod parser;

pub use command::{BaseCommand, HotAirCommand, LinkCommand, NackCode, SolderCommand};
pub use frame::{FrameDecoder, MAX_FRAME_SIZE, encode as encode_frame};
pub use packet::{Direction, MAX_PAYLOAD_SIZE, Packet, ProtocolVersion};
