//! Station ports and their streaming rate.

use crate::types::presets::TemperaturePresets;
use crate::types::tool::Tool;

/// Continuous-mode streaming rate of a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum ContinuousModeRate {
    /// Streaming disabled.
    #[default]
    Off = 0,
    Ms10 = 1,
    Ms20 = 2,
    Ms50 = 3,
    Ms100 = 4,
    Ms200 = 5,
    Ms500 = 6,
    Ms1000 = 7,
}

impl ContinuousModeRate {
    /// Parses a rate byte.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::Off),
            1 => Some(Self::Ms10),
            2 => Some(Self::Ms20),
            3 => Some(Self::Ms50),
            4 => Some(Self::Ms100),
            5 => Some(Self::Ms200),
            6 => Some(Self::Ms500),
            7 => Some(Self::Ms1000),
            _ => None,
        }
    }
}

impl From<ContinuousModeRate> for u8 {
    fn from(rate: ContinuousModeRate) -> Self {
        rate as Self
    }
}

/// One port of a station.
///
/// A port is created together with its tool and never exists without one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Port {
    index: u8,
    tool: Tool,
    /// Preset bank (soldering stations only).
    pub presets: Option<TemperaturePresets>,
    /// Selected setpoint temperature in UTI.
    pub selected_temperature: Option<u16>,
    /// Selected airflow (hot-air stations only).
    pub selected_airflow: Option<u16>,
    /// Last streaming rate reported by the station.
    pub continuous_mode: ContinuousModeRate,
    pub(crate) preset_requery_pending: bool,
}

impl Port {
    /// Creates a port holding `tool`.
    #[must_use]
    pub const fn new(index: u8, tool: Tool) -> Self {
        Self {
            index,
            tool,
            presets: None,
            selected_temperature: None,
            selected_airflow: None,
            continuous_mode: ContinuousModeRate::Off,
            preset_requery_pending: false,
        }
    }

    /// Port index on the station.
    #[must_use]
    pub const fn index(&self) -> u8 {
        self.index
    }

    /// The attached tool.
    #[must_use]
    pub const fn tool(&self) -> &Tool {
        &self.tool
    }

    /// Mutable access to the attached tool.
    pub const fn tool_mut(&mut self) -> &mut Tool {
        &mut self.tool
    }

    /// Swaps in a different tool, keeping the port's settings.
    pub fn replace_tool(&mut self, tool: Tool) {
        self.tool = tool;
    }

    /// Whether a delayed preset re-query is already scheduled.
    #[must_use]
    pub const fn preset_requery_pending(&self) -> bool {
        self.preset_requery_pending
    }
}
