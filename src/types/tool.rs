//! Tools attached to station ports.
//!
//! A port always carries exactly one tool, and the tool's kind follows the
//! station family. Raw tool-type bytes only have a meaning within a family,
//! so [`Tool::from_type`] takes the family alongside the byte.

use crate::types::identity::StationFamily;

/// Soldering station tool catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum SolderingToolType {
    /// Nothing connected.
    #[default]
    None = 0,
    /// T210 micro soldering iron.
    MicroSolderingIron = 1,
    /// T245 soldering iron.
    SolderingIron = 2,
    /// PA120 micro tweezers.
    MicroTweezers = 3,
    /// HT420 tweezers.
    Tweezers = 4,
    /// DS360 micro desoldering iron.
    MicroDesolderingIron = 5,
    /// DR560 desoldering iron.
    DesolderingIron = 6,
    /// NT105 nano soldering iron.
    NanoSolderingIron = 7,
    /// NP105 nano tweezers.
    NanoTweezers = 8,
    /// T470 heavy-duty iron.
    HeavyDutySolderingIron = 9,
}

impl SolderingToolType {
    /// Parses a tool type byte.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::None),
            1 => Some(Self::MicroSolderingIron),
            2 => Some(Self::SolderingIron),
            3 => Some(Self::MicroTweezers),
            4 => Some(Self::Tweezers),
            5 => Some(Self::MicroDesolderingIron),
            6 => Some(Self::DesolderingIron),
            7 => Some(Self::NanoSolderingIron),
            8 => Some(Self::NanoTweezers),
            9 => Some(Self::HeavyDutySolderingIron),
            _ => None,
        }
    }

    /// Tweezers heat two tips and report two readings.
    #[must_use]
    pub const fn has_two_tips(self) -> bool {
        matches!(
            self,
            Self::MicroTweezers | Self::Tweezers | Self::NanoTweezers
        )
    }
}

/// Hot-air station tool catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum HotAirToolType {
    /// Nothing connected.
    #[default]
    None = 0,
    /// Standard hot-air handpiece.
    HotAir = 31,
    /// Precision hot-air handpiece.
    PrecisionHotAir = 32,
    /// Preheater (PHS).
    PreheaterSmall = 33,
    /// Preheater (PHB).
    PreheaterLarge = 34,
}

impl HotAirToolType {
    /// Parses a tool type byte.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::None),
            31 => Some(Self::HotAir),
            32 => Some(Self::PrecisionHotAir),
            33 => Some(Self::PreheaterSmall),
            34 => Some(Self::PreheaterLarge),
            _ => None,
        }
    }
}

/// Operating state of a soldering tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum SolderingStatus {
    Operating = 0,
    Stand = 1,
    Sleep = 2,
    Hibernation = 4,
    Extractor = 8,
    Desolder = 16,
    #[default]
    Unknown = 255,
}

impl SolderingStatus {
    /// Parses a status byte; unrecognised values map to `Unknown`.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Self {
        match byte {
            0 => Self::Operating,
            1 => Self::Stand,
            2 => Self::Sleep,
            4 => Self::Hibernation,
            8 => Self::Extractor,
            16 => Self::Desolder,
            _ => Self::Unknown,
        }
    }
}

/// Hot-air tool status bits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct HotAirStatus(u8);

impl HotAirStatus {
    /// No flags set.
    pub const NONE: Self = Self(0);

    /// Heater is on.
    pub const HEATER: Self = Self(1 << 0);

    /// Heater has been requested.
    pub const HEATER_REQUESTED: Self = Self(1 << 1);

    /// Cool-down in progress.
    pub const COOLING: Self = Self(1 << 2);

    /// Suction is on.
    pub const SUCTION: Self = Self(1 << 3);

    /// Suction has been requested.
    pub const SUCTION_REQUESTED: Self = Self(1 << 4);

    /// A pedal is plugged in.
    pub const PEDAL_CONNECTED: Self = Self(1 << 5);

    /// The pedal is pressed.
    pub const PEDAL_PRESSED: Self = Self(1 << 6);

    /// Handpiece is in its stand.
    pub const STAND: Self = Self(1 << 7);

    /// Creates flags from a raw byte.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Self {
        Self(byte)
    }

    /// Returns the raw byte value.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self.0
    }

    /// Check if a flag is set.
    #[must_use]
    pub const fn contains(self, flag: Self) -> bool {
        (self.0 & flag.0) == flag.0
    }
}

/// Live state of a soldering tool. Temperatures are in UTI.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SolderingTool {
    pub tool_type: SolderingToolType,
    pub status: SolderingStatus,
    pub tip_temperature: u16,
    /// Second tip; only meaningful for tweezers.
    pub secondary_tip_temperature: u16,
}

/// Live state of a hot-air tool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HotAirTool {
    pub tool_type: HotAirToolType,
    pub status: HotAirStatus,
    /// Air temperature in UTI.
    pub air_temperature: u16,
    /// Airflow in station units.
    pub airflow: u16,
    /// Heater power in station units.
    pub power: u16,
}

/// The tool on a port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tool {
    Soldering(SolderingTool),
    HotAir(HotAirTool),
}

impl Tool {
    /// Builds an idle tool of the given raw type for a family.
    ///
    /// Returns `None` if the byte is not in the family's catalog.
    #[must_use]
    pub fn from_type(family: StationFamily, raw: u8) -> Option<Self> {
        match family {
            StationFamily::Soldering => SolderingToolType::from_byte(raw).map(|tool_type| {
                Self::Soldering(SolderingTool {
                    tool_type,
                    ..SolderingTool::default()
                })
            }),
            StationFamily::HotAir => HotAirToolType::from_byte(raw).map(|tool_type| {
                Self::HotAir(HotAirTool {
                    tool_type,
                    ..HotAirTool::default()
                })
            }),
        }
    }

    /// Raw tool-type byte as the station encodes it.
    #[must_use]
    pub const fn raw_type(&self) -> u8 {
        match self {
            Self::Soldering(tool) => tool.tool_type as u8,
            Self::HotAir(tool) => tool.tool_type as u8,
        }
    }

    /// Returns the soldering state, if this is a soldering tool.
    #[must_use]
    pub const fn as_soldering(&self) -> Option<&SolderingTool> {
        match self {
            Self::Soldering(tool) => Some(tool),
            Self::HotAir(_) => None,
        }
    }

    /// Mutable variant of [`as_soldering`](Self::as_soldering).
    pub const fn as_soldering_mut(&mut self) -> Option<&mut SolderingTool> {
        match self {
            Self::Soldering(tool) => Some(tool),
            Self::HotAir(_) => None,
        }
    }

    /// Returns the hot-air state, if this is a hot-air tool.
    #[must_use]
    pub const fn as_hot_air(&self) -> Option<&HotAirTool> {
        match self {
            Self::HotAir(tool) => Some(tool),
            Self::Soldering(_) => None,
        }
    }

    /// Mutable variant of [`as_hot_air`](Self::as_hot_air).
    pub const fn as_hot_air_mut(&mut self) -> Option<&mut HotAirTool> {
        match self {
            Self::HotAir(tool) => Some(tool),
            Self::Soldering(_) => None,
        }
    }

    /// Applies a raw status byte in the tool's own encoding.
    pub const fn set_status(&mut self, raw: u8) {
        match self {
            Self::Soldering(tool) => tool.status = SolderingStatus::from_byte(raw),
            Self::HotAir(tool) => tool.status = HotAirStatus::from_byte(raw),
        }
    }

    /// Applies a primary/secondary temperature pair.
    ///
    /// For hot-air tools the secondary reading has no counterpart and is
    /// ignored.
    pub const fn set_temperatures(&mut self, primary: u16, secondary: u16) {
        match self {
            Self::Soldering(tool) => {
                tool.tip_temperature = primary;
                tool.secondary_tip_temperature = secondary;
            }
            Self::HotAir(tool) => tool.air_temperature = primary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_type_follows_family() {
        let tool = Tool::from_type(StationFamily::Soldering, 4).unwrap();
        assert_eq!(tool.raw_type(), 4);
        assert!(tool.as_hot_air().is_none());
        assert!(
            tool.as_soldering()
                .unwrap()
                .tool_type
                .has_two_tips()
        );

        let tool = Tool::from_type(StationFamily::HotAir, 32).unwrap();
        assert_eq!(
            tool.as_hot_air().unwrap().tool_type,
            HotAirToolType::PrecisionHotAir
        );
        assert!(tool.as_soldering().is_none());
    }

    #[test]
    fn test_unknown_type_per_family() {
        assert!(Tool::from_type(StationFamily::Soldering, 31).is_none());
        assert!(Tool::from_type(StationFamily::HotAir, 2).is_none());
        assert!(Tool::from_type(StationFamily::Soldering, 10).is_none());
    }

    #[test]
    fn test_soldering_status_fallback() {
        assert_eq!(SolderingStatus::from_byte(2), SolderingStatus::Sleep);
        assert_eq!(SolderingStatus::from_byte(3), SolderingStatus::Unknown);
    }

    #[test]
    fn test_hot_air_status_flags() {
        let status = HotAirStatus::from_byte(0b1010_0001);
        assert!(status.contains(HotAirStatus::HEATER));
        assert!(status.contains(HotAirStatus::PEDAL_CONNECTED));
        assert!(status.contains(HotAirStatus::STAND));
        assert!(!status.contains(HotAirStatus::SUCTION));
        assert_eq!(status.as_byte(), 0b1010_0001);
    }

    #[test]
    fn test_set_status_uses_tool_encoding() {
        let mut tool = Tool::from_type(StationFamily::Soldering, 2).unwrap();
        tool.set_status(1);
        assert_eq!(tool.as_soldering().unwrap().status, SolderingStatus::Stand);

        let mut tool = Tool::from_type(StationFamily::HotAir, 31).unwrap();
        tool.set_status(0x81);
        let status = tool.as_hot_air().unwrap().status;
        assert!(status.contains(HotAirStatus::HEATER));
        assert!(status.contains(HotAirStatus::STAND));
    }

    #[test]
    fn test_set_temperatures() {
        let mut tool = Tool::from_type(StationFamily::Soldering, 4).unwrap();
        tool.set_temperatures(3150, 3160);
        let soldering = tool.as_soldering().unwrap();
        assert_eq!(soldering.tip_temperature, 3150);
        assert_eq!(soldering.secondary_tip_temperature, 3160);

        let mut tool = Tool::from_type(StationFamily::HotAir, 31).unwrap();
        tool.set_temperatures(2700, 9999);
        assert_eq!(tool.as_hot_air().unwrap().air_temperature, 2700);
    }
}
