//! Data types for station entities.
//!
//! This module contains the station model:
//! - Identity and family selection
//! - Ports and tools
//! - Temperature presets and units

pub mod identity;
pub mod port;
pub mod presets;
pub mod tool;
pub mod units;

pub use identity::{StationFamily, StationIdentity};
pub use port::{ContinuousModeRate, Port};
pub use presets::{PresetLevel, TemperatureLevel, TemperaturePresets};
pub use tool::{
    HotAirStatus, HotAirTool, HotAirToolType, SolderingStatus, SolderingTool, SolderingToolType,
    Tool,
};
pub use units::{celsius_to_uti, uti_to_celsius};
