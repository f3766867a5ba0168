//! Command vocabularies for the station protocol.
//!
//! The command byte of a packet is interpreted against several tables.
//! Link commands drive address negotiation and are common to every device.
//! Station commands are split into a base table shared by all families and
//! one table per family. Family tables overlap numerically (0x52 is a tip
//! temperature on a soldering station and an air temperature on a hot-air
//! station), so a raw byte only has a meaning once the family is known.

/// Commands used during address negotiation and as payload markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum LinkCommand {
    /// Handshake frame; its payload carries a marker (`Discover` or `Ack`).
    Handshake = 0x00,
    /// End of transmission.
    EndOfTransmission = 0x04,
    /// Positive acknowledgement marker.
    Ack = 0x06,
    /// Negative acknowledgement.
    Nack = 0x15,
    /// Synchronous idle.
    Syn = 0x16,
    /// Discover marker sent in the station's broadcast.
    Discover = 0x1D,
    /// Device identifier request/response.
    DeviceId = 0x1E,
    /// Reset request.
    Reset = 0x20,
    /// Firmware description request/response.
    Firmware = 0x21,
}

impl LinkCommand {
    /// Attempts to parse a link command from a byte.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Self::Handshake),
            0x04 => Some(Self::EndOfTransmission),
            0x06 => Some(Self::Ack),
            0x15 => Some(Self::Nack),
            0x16 => Some(Self::Syn),
            0x1D => Some(Self::Discover),
            0x1E => Some(Self::DeviceId),
            0x20 => Some(Self::Reset),
            0x21 => Some(Self::Firmware),
            _ => None,
        }
    }
}

impl From<LinkCommand> for u8 {
    fn from(cmd: LinkCommand) -> Self {
        cmd as Self
    }
}

/// Station commands understood by every family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BaseCommand {
    /// Negative acknowledgement: `[error code, referenced command]`.
    Nack = 0x15,
    /// Port descriptor for one port index.
    PortInfo = 0x30,
    /// Selected setpoint temperature of a port.
    SelectedTemperature = 0x50,
    /// Tool status byte of a port.
    ToolStatus = 0x57,
    /// Continuous-mode rate table (one rate per port).
    ContinuousMode = 0x80,
    /// Write continuous-mode rate for a port mask.
    ContinuousModeW = 0x81,
    /// Streamed telemetry block.
    ContinuousModeUpdate = 0x82,
    /// Station display name.
    StationName = 0xAC,
}

impl BaseCommand {
    /// Attempts to parse a base command from a byte.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x15 => Some(Self::Nack),
            0x30 => Some(Self::PortInfo),
            0x50 => Some(Self::SelectedTemperature),
            0x57 => Some(Self::ToolStatus),
            0x80 => Some(Self::ContinuousMode),
            0x81 => Some(Self::ContinuousModeW),
            0x82 => Some(Self::ContinuousModeUpdate),
            0xAC => Some(Self::StationName),
            _ => None,
        }
    }
}

impl From<BaseCommand> for u8 {
    fn from(cmd: BaseCommand) -> Self {
        cmd as Self
    }
}

/// Soldering station extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SolderCommand {
    /// Three-level temperature preset bank.
    LevelsTemps = 0x33,
    /// Tip temperature reading(s).
    TipTemp = 0x52,
    /// Heat-sink (MOS) temperature.
    MosTemp = 0x59,
    /// Station maximum temperature.
    MaxTemp = 0xA2,
    /// Station minimum temperature.
    MinTemp = 0xA4,
}

impl SolderCommand {
    /// Attempts to parse a soldering command from a byte.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x33 => Some(Self::LevelsTemps),
            0x52 => Some(Self::TipTemp),
            0x59 => Some(Self::MosTemp),
            0xA2 => Some(Self::MaxTemp),
            0xA4 => Some(Self::MinTemp),
            _ => None,
        }
    }
}

impl From<SolderCommand> for u8 {
    fn from(cmd: SolderCommand) -> Self {
        cmd as Self
    }
}

/// Hot-air station extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum HotAirCommand {
    /// Air temperature reading.
    AirTemp = 0x52,
    /// Heater power reading.
    Power = 0x54,
    /// Tool type currently connected to a port.
    ConnectedTool = 0x55,
    /// Selected airflow of a port.
    SelectedFlow = 0x58,
    /// Station airflow limits.
    FlowLimits = 0xA2,
    /// Streamed telemetry block (single-port layout).
    ContinuousModeUpdate = 0x82,
}

impl HotAirCommand {
    /// Attempts to parse a hot-air command from a byte.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x52 => Some(Self::AirTemp),
            0x54 => Some(Self::Power),
            0x55 => Some(Self::ConnectedTool),
            0x58 => Some(Self::SelectedFlow),
            0xA2 => Some(Self::FlowLimits),
            0x82 => Some(Self::ContinuousModeUpdate),
            _ => None,
        }
    }
}

impl From<HotAirCommand> for u8 {
    fn from(cmd: HotAirCommand) -> Self {
        cmd as Self
    }
}

/// Error codes carried in the first byte of a NACK payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum NackCode {
    /// Checksum failure on the station side.
    Bcc = 0x01,
    /// Frame format not understood.
    FrameFormat = 0x02,
    /// Requested index or value out of range.
    OutOfRange = 0x03,
    /// Command refused in the current state.
    CommandRefused = 0x04,
    /// Command needs the station in control mode.
    ControlModeRequired = 0x05,
}

impl NackCode {
    /// Attempts to parse a NACK code from a byte.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(Self::Bcc),
            0x02 => Some(Self::FrameFormat),
            0x03 => Some(Self::OutOfRange),
            0x04 => Some(Self::CommandRefused),
            0x05 => Some(Self::ControlModeRequired),
            _ => None,
        }
    }
}
