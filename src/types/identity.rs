//! Station identity and family selection.

use std::fmt;

use crate::error::StationError;

/// Number of `:`-separated fields in a firmware description.
pub const FIRMWARE_FIELDS: usize = 4;

/// Kind of station; decides which command table and tool catalog apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StationFamily {
    /// Soldering/desoldering stations (model prefix `DDE`).
    Soldering,
    /// Hot-air stations (model prefix `JTSE`).
    HotAir,
}

impl StationFamily {
    /// Selects a family from a model prefix.
    #[must_use]
    pub fn from_model(prefix: &str) -> Option<Self> {
        match prefix {
            "DDE" => Some(Self::Soldering),
            "JTSE" => Some(Self::HotAir),
            _ => None,
        }
    }
}

impl fmt::Display for StationFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Soldering => f.write_str("soldering"),
            Self::HotAir => f.write_str("hot-air"),
        }
    }
}

/// What a station reported about itself during the handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationIdentity {
    /// Protocol revision string.
    pub protocol: String,
    /// Model prefix (text before the first `_` of the model field).
    pub model: String,
    /// Full model field, including any variant suffix.
    pub model_variant: String,
    /// Firmware version string.
    pub firmware_version: String,
    /// Hardware version string.
    pub hardware_version: String,
    /// Opaque device identifier.
    pub device_id: String,
}

impl StationIdentity {
    /// Parses `protocol:model:firmware:hardware` and attaches the device id.
    pub fn parse(firmware: &str, device_id: &str) -> Result<Self, StationError> {
        let fields: Vec<&str> = firmware.split(':').collect();
        let [protocol, model_variant, firmware_version, hardware_version] = fields[..] else {
            return Err(StationError::MalformedFirmware {
                raw: firmware.to_owned(),
                fields: fields.len(),
            });
        };

        let model = model_variant
            .split_once('_')
            .map_or(model_variant, |(prefix, _)| prefix);

        Ok(Self {
            protocol: protocol.to_owned(),
            model: model.to_owned(),
            model_variant: model_variant.to_owned(),
            firmware_version: firmware_version.to_owned(),
            hardware_version: hardware_version.to_owned(),
            device_id: device_id.to_owned(),
        })
    }

    /// Family implied by the model prefix.
    pub fn family(&self) -> Result<StationFamily, StationError> {
        StationFamily::from_model(&self.model).ok_or_else(|| StationError::UnknownFamily {
            model: self.model.clone(),
        })
    }
}
