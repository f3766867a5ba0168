//! Binary payload parsing for station responses.
//!
//! Each function checks the payload shape for one response and returns a
//! small typed view of it. Multi-byte integers are little-endian.

use bytes::Buf;

use crate::error::PayloadError;
use crate::protocol::command::NackCode;
use crate::types::presets::{PRESETS_LEN, TemperaturePresets};

/// Size of a port descriptor (`PortInfo` response).
pub const PORT_INFO_LEN: usize = 14;

/// Size of a preset bank response: presets, then port and tool type.
pub const PRESET_BANK_LEN: usize = PRESETS_LEN + 2;

/// Size of one per-port record in a continuous-mode update.
pub const CONTINUOUS_RECORD_LEN: usize = 10;

/// Offset of the status byte within a continuous-mode record.
const RECORD_STATUS_OFFSET: usize = 8;

type Result<T> = std::result::Result<T, PayloadError>;

fn expect_len(what: &'static str, data: &[u8], expected: usize) -> Result<()> {
    if data.len() == expected {
        Ok(())
    } else {
        Err(PayloadError::Length {
            what,
            expected,
            got: data.len(),
        })
    }
}

/// Parses a null-terminated or unterminated ASCII string.
#[must_use]
pub fn parse_string(data: &[u8]) -> String {
    let len = data.iter().position(|&b| b == 0).unwrap_or(data.len());
    String::from_utf8_lossy(&data[..len]).trim().to_owned()
}

/// Port descriptor returned for `PortInfo [index]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortDescriptor {
    /// Raw tool-type byte (family specific).
    pub tool_type: u8,
    /// Port index the descriptor belongs to.
    pub port: u8,
}

/// Parses a port descriptor.
///
/// Format:
/// ```text
/// [tool_type:1] [reserved:12] [port:1]
/// ```
pub fn parse_port_info(data: &[u8]) -> Result<PortDescriptor> {
    expect_len("port info", data, PORT_INFO_LEN)?;
    Ok(PortDescriptor {
        tool_type: data[0],
        port: data[PORT_INFO_LEN - 1],
    })
}

/// A one-byte value tagged with its port: `[value:1] [port:1]`.
///
/// Used by tool status and connected-tool responses.
pub fn parse_port_byte(what: &'static str, data: &[u8]) -> Result<(u8, u8)> {
    expect_len(what, data, 2)?;
    Ok((data[0], data[1]))
}

/// A 16-bit value tagged with its port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortValue {
    pub value: u16,
    pub port: u8,
}

/// Parses `[value:2LE] [port:1]`.
pub fn parse_port_value(what: &'static str, data: &[u8]) -> Result<PortValue> {
    expect_len(what, data, 3)?;
    let mut cursor = data;
    let value = cursor.get_u16_le();
    Ok(PortValue {
        value,
        port: cursor.get_u8(),
    })
}

/// Tip temperature reading(s) of one port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TipReadings {
    pub primary: u16,
    /// Second tip, present on tweezers.
    pub secondary: Option<u16>,
    pub port: u8,
}

/// Parses `[tip:2LE] ([tip2:2LE]) [port:1]`.
pub fn parse_tip_readings(data: &[u8]) -> Result<TipReadings> {
    let mut cursor = data;
    match data.len() {
        3 => Ok(TipReadings {
            primary: cursor.get_u16_le(),
            secondary: None,
            port: cursor.get_u8(),
        }),
        5 => Ok(TipReadings {
            primary: cursor.get_u16_le(),
            secondary: Some(cursor.get_u16_le()),
            port: cursor.get_u8(),
        }),
        got => Err(PayloadError::Length {
            what: "tip temperature",
            expected: 5,
            got,
        }),
    }
}

/// Parses a bare `[value:2LE]`.
pub fn parse_u16(what: &'static str, data: &[u8]) -> Result<u16> {
    expect_len(what, data, 2)?;
    Ok(u16::from_le_bytes([data[0], data[1]]))
}

/// Airflow limits of a hot-air station.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowRange {
    pub min: u16,
    pub max: u16,
}

/// Parses `[min:2LE] [max:2LE]`.
pub fn parse_flow_limits(data: &[u8]) -> Result<FlowRange> {
    expect_len("flow limits", data, 4)?;
    let mut cursor = data;
    let min = cursor.get_u16_le();
    Ok(FlowRange {
        min,
        max: cursor.get_u16_le(),
    })
}

/// Preset bank response for one port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresetBank {
    pub presets: TemperaturePresets,
    pub port: u8,
    pub tool_type: u8,
}

/// Parses a preset bank.
///
/// Format:
/// ```text
/// [enable:1] [selected:1] 3 x ([on:1] [temp:2LE]) [port:1] [tool_type:1]
/// ```
pub fn parse_preset_bank(data: &[u8]) -> Result<PresetBank> {
    expect_len("preset bank", data, PRESET_BANK_LEN)?;
    let presets = TemperaturePresets::decode(data).ok_or(PayloadError::InvalidValue {
        what: "preset bank flag",
        value: data[0],
    })?;
    Ok(PresetBank {
        presets,
        port: data[PRESETS_LEN],
        tool_type: data[PRESETS_LEN + 1],
    })
}

/// One per-port record of a continuous-mode update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContinuousRecord {
    /// Primary temperature (tip, or air on hot-air stations).
    pub temperature: u16,
    /// Secondary temperature (second tip, or airflow on hot-air stations).
    pub secondary: u16,
    /// Third reading (heater power on hot-air stations).
    pub extra: u16,
    pub status: u8,
}

/// Splits a continuous-mode update into per-port records.
///
/// Format:
/// ```text
/// [header:1] N x ([t1:2LE] [t2:2LE] [t3:2LE] [reserved:2] [status:1] [reserved:1])
/// ```
///
/// Record `i` belongs to port `i`. A trailing partial record is ignored.
#[must_use]
pub fn parse_continuous_update(data: &[u8]) -> Vec<ContinuousRecord> {
    let Some(records) = data.get(1..) else {
        return Vec::new();
    };
    records
        .chunks_exact(CONTINUOUS_RECORD_LEN)
        .map(|record| {
            let mut cursor = record;
            ContinuousRecord {
                temperature: cursor.get_u16_le(),
                secondary: cursor.get_u16_le(),
                extra: cursor.get_u16_le(),
                status: record[RECORD_STATUS_OFFSET],
            }
        })
        .collect()
}

/// NACK payload: error code and the command it refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Nack {
    /// Decoded code, if known.
    pub code: Option<NackCode>,
    pub raw_code: u8,
    pub command: u8,
}

/// Parses `[code:1] [command:1]`.
pub fn parse_nack(data: &[u8]) -> Result<Nack> {
    expect_len("nack", data, 2)?;
    Ok(Nack {
        code: NackCode::from_byte(data[0]),
        raw_code: data[0],
        command: data[1],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::presets::PresetLevel;

    fn record(t1: u16, t2: u16, t3: u16, status: u8) -> Vec<u8> {
        let mut out = Vec::with_capacity(CONTINUOUS_RECORD_LEN);
        out.extend_from_slice(&t1.to_le_bytes());
        out.extend_from_slice(&t2.to_le_bytes());
        out.extend_from_slice(&t3.to_le_bytes());
        out.extend_from_slice(&[0, 0, status, 0]);
        out
    }

    #[test]
    fn test_parse_string() {
        assert_eq!(parse_string(b"HOME\0junk"), "HOME");
        assert_eq!(parse_string(b"HOME"), "HOME");
        assert_eq!(parse_string(b""), "");
        assert_eq!(parse_string(b"\0"), "");
    }

    #[test]
    fn test_parse_port_info() {
        let mut data = [0u8; PORT_INFO_LEN];
        data[0] = 2;
        data[13] = 1;
        let desc = parse_port_info(&data).unwrap();
        assert_eq!(desc.tool_type, 2);
        assert_eq!(desc.port, 1);

        assert!(parse_port_info(&data[..13]).is_err());
    }

    #[test]
    fn test_parse_port_value() {
        let value = parse_port_value("setpoint", &[0x4E, 0x0C, 0x01]).unwrap();
        assert_eq!(value.value, 3150);
        assert_eq!(value.port, 1);

        let err = parse_port_value("setpoint", &[0x4E, 0x0C]).unwrap_err();
        assert_eq!(
            err,
            PayloadError::Length {
                what: "setpoint",
                expected: 3,
                got: 2
            }
        );
    }

    #[test]
    fn test_parse_tip_readings() {
        let single = parse_tip_readings(&[0x4E, 0x0C, 0x00]).unwrap();
        assert_eq!(single.primary, 3150);
        assert_eq!(single.secondary, None);
        assert_eq!(single.port, 0);

        let dual = parse_tip_readings(&[0x4E, 0x0C, 0x58, 0x0C, 0x02]).unwrap();
        assert_eq!(dual.primary, 3150);
        assert_eq!(dual.secondary, Some(3160));
        assert_eq!(dual.port, 2);

        assert!(parse_tip_readings(&[0x4E, 0x0C, 0x00, 0x00]).is_err());
    }

    #[test]
    fn test_parse_flow_limits() {
        let mut data = Vec::new();
        data.extend_from_slice(&100u16.to_le_bytes());
        data.extend_from_slice(&1000u16.to_le_bytes());
        let range = parse_flow_limits(&data).unwrap();
        assert_eq!(range.min, 100);
        assert_eq!(range.max, 1000);
    }

    #[test]
    fn test_parse_preset_bank() {
        let mut data = vec![1, 1];
        for temp in [2700u16, 3150, 3600] {
            data.push(1);
            data.extend_from_slice(&temp.to_le_bytes());
        }
        data.extend_from_slice(&[0, 2]);

        let bank = parse_preset_bank(&data).unwrap();
        assert!(bank.presets.enabled);
        assert_eq!(bank.presets.selected, PresetLevel::Second);
        assert_eq!(bank.presets.active_temperature(), Some(3150));
        assert_eq!(bank.port, 0);
        assert_eq!(bank.tool_type, 2);
    }

    #[test]
    fn test_parse_preset_bank_rejects_bad_selection() {
        let mut data = vec![1, 5];
        data.extend_from_slice(&[0; 9]);
        data.extend_from_slice(&[0, 2]);
        assert!(matches!(
            parse_preset_bank(&data),
            Err(PayloadError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_parse_continuous_update() {
        let mut data = vec![0xFF];
        data.extend(record(3150, 3160, 0, 1));
        data.extend(record(2700, 0, 0, 2));

        let records = parse_continuous_update(&data);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].temperature, 3150);
        assert_eq!(records[0].secondary, 3160);
        assert_eq!(records[0].status, 1);
        assert_eq!(records[1].temperature, 2700);
        assert_eq!(records[1].status, 2);
    }

    #[test]
    fn test_parse_continuous_update_partial_tail() {
        let mut data = vec![0x01];
        data.extend(record(100, 200, 300, 0x81));
        data.extend_from_slice(&[1, 2, 3]);

        let records = parse_continuous_update(&data);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].extra, 300);
        assert_eq!(records[0].status, 0x81);

        assert!(parse_continuous_update(&[]).is_empty());
        assert!(parse_continuous_update(&[0x01]).is_empty());
    }

    #[test]
    fn test_parse_nack() {
        let nack = parse_nack(&[0x03, 0x30]).unwrap();
        assert_eq!(nack.code, Some(NackCode::OutOfRange));
        assert_eq!(nack.command, 0x30);

        let nack = parse_nack(&[0x7F, 0x30]).unwrap();
        assert_eq!(nack.code, None);
        assert_eq!(nack.raw_code, 0x7F);
    }
}
