//! Temperature unit conversion.
//!
//! Stations report and accept temperatures in UTI, an internal unit of
//! one ninth of a degree Celsius.

/// UTI counts per degree Celsius.
pub const UTI_PER_CELSIUS: u16 = 9;

/// Converts a raw station temperature to whole degrees Celsius (truncating).
#[must_use]
pub const fn uti_to_celsius(uti: u16) -> u16 {
    uti / UTI_PER_CELSIUS
}

/// Converts degrees Celsius to the station's raw unit.
///
/// Saturates at `u16::MAX` instead of wrapping.
#[must_use]
pub const fn celsius_to_uti(celsius: u16) -> u16 {
    celsius.saturating_mul(UTI_PER_CELSIUS)
}
