//! Three-level temperature presets of a soldering port.

/// Number of preset levels in a bank.
pub const LEVEL_COUNT: usize = 3;

/// Encoded size of a bank: enable, selected, then three `[on, lo, hi]` levels.
pub const PRESETS_LEN: usize = 2 + LEVEL_COUNT * 3;

/// Which of the three levels is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum PresetLevel {
    #[default]
    First = 0,
    Second = 1,
    Third = 2,
}

impl PresetLevel {
    /// Parses a level index; only 0, 1 and 2 are valid.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::First),
            1 => Some(Self::Second),
            2 => Some(Self::Third),
            _ => None,
        }
    }

    /// Position within [`TemperaturePresets::levels`].
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// One preset level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TemperatureLevel {
    /// Whether the level can be selected on the station.
    pub enabled: bool,
    /// Level temperature in UTI.
    pub temperature: u16,
}

/// A port's preset bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TemperaturePresets {
    /// Whether the station is operating from presets.
    pub enabled: bool,
    /// Active level.
    pub selected: PresetLevel,
    /// The three levels in station order.
    pub levels: [TemperatureLevel; LEVEL_COUNT],
}

impl TemperaturePresets {
    /// Decodes the first [`PRESETS_LEN`] bytes of `data`.
    ///
    /// Returns `None` if the buffer is short or a flag byte is not 0/1.
    #[must_use]
    pub fn decode(data: &[u8]) -> Option<Self> {
        let bank = data.get(..PRESETS_LEN)?;
        let enabled = parse_flag(bank[0])?;
        let selected = PresetLevel::from_byte(bank[1])?;

        let mut levels = [TemperatureLevel::default(); LEVEL_COUNT];
        for (level, raw) in levels.iter_mut().zip(bank[2..].chunks_exact(3)) {
            *level = TemperatureLevel {
                enabled: parse_flag(raw[0])?,
                temperature: u16::from_le_bytes([raw[1], raw[2]]),
            };
        }

        Some(Self {
            enabled,
            selected,
            levels,
        })
    }

    /// The currently selected level.
    #[must_use]
    pub const fn selected_level(&self) -> &TemperatureLevel {
        &self.levels[self.selected.index()]
    }

    /// Setpoint dictated by the presets, if presets are in use.
    #[must_use]
    pub const fn active_temperature(&self) -> Option<u16> {
        if self.enabled {
            Some(self.selected_level().temperature)
        } else {
            None
        }
    }
}

const fn parse_flag(byte: u8) -> Option<bool> {
    match byte {
        0 => Some(false),
        1 => Some(true),
        _ => None,
    }
}
