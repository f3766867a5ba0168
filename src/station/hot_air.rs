//! Hot-air station extensions.
//!
//! Streamed telemetry on these stations is read as a single record for
//! port 0; layouts with more than one record have not been observed.

use crate::error::PayloadError;
use crate::event::Event;
use crate::protocol::command::HotAirCommand;
use crate::protocol::packet::Packet;
use crate::protocol::parser::{
    CONTINUOUS_RECORD_LEN, parse_continuous_update, parse_flow_limits, parse_port_byte,
    parse_port_value,
};
use crate::station::{Context, Dispatch, FamilyState, Station};
use crate::types::identity::StationFamily;
use crate::types::tool::{HotAirStatus, HotAirTool, Tool};

/// Queries issued for a freshly created hot-air port.
pub(super) fn construct_port(index: u8, ctx: &mut Context<'_>) {
    ctx.send(HotAirCommand::SelectedFlow, &[index]);
    ctx.send(HotAirCommand::FlowLimits, &[]);
}

impl Station {
    pub(super) fn handle_hot_air(&mut self, packet: &Packet, ctx: &mut Context<'_>) -> Dispatch {
        let Some(command) = HotAirCommand::from_byte(packet.command) else {
            return Dispatch::Unhandled;
        };
        let data = packet.data();

        let result = match command {
            HotAirCommand::AirTemp => {
                self.on_reading("air temperature", data, ctx, |tool, value| {
                    tool.air_temperature = value;
                })
            }
            HotAirCommand::Power => {
                self.on_reading("heater power", data, ctx, |tool, value| tool.power = value)
            }
            HotAirCommand::ConnectedTool => self.on_connected_tool(data, ctx),
            HotAirCommand::SelectedFlow => self.on_selected_flow(data, ctx),
            HotAirCommand::FlowLimits => self.on_flow_limits(data),
            HotAirCommand::ContinuousModeUpdate => self.on_hot_air_update(data, ctx),
        };

        result.unwrap_or_else(|e| {
            tracing::warn!(?command, "rejected payload: {e}");
            Dispatch::Unhandled
        })
    }

    fn on_reading(
        &mut self,
        what: &'static str,
        data: &[u8],
        ctx: &mut Context<'_>,
        apply: impl FnOnce(&mut HotAirTool, u16),
    ) -> Result<Dispatch, PayloadError> {
        let reading = parse_port_value(what, data)?;
        if let Some(tool) = self
            .port_mut(reading.port)
            .and_then(|port| port.tool_mut().as_hot_air_mut())
        {
            apply(tool, reading.value);
            ctx.emit(Event::PortUpdated { port: reading.port });
        }
        Ok(Dispatch::Handled)
    }

    fn on_connected_tool(
        &mut self,
        data: &[u8],
        ctx: &mut Context<'_>,
    ) -> Result<Dispatch, PayloadError> {
        let (tool_type, index) = parse_port_byte("connected tool", data)?;
        let Some(tool) = Tool::from_type(StationFamily::HotAir, tool_type) else {
            tracing::warn!(port = index, tool_type, "unknown tool type connected");
            return Ok(Dispatch::Handled);
        };
        if let Some(port) = self.port_mut(index) {
            tracing::debug!(port = index, tool_type, "tool changed");
            port.replace_tool(tool);
            ctx.emit(Event::PortUpdated { port: index });
        }
        Ok(Dispatch::Handled)
    }

    fn on_selected_flow(
        &mut self,
        data: &[u8],
        ctx: &mut Context<'_>,
    ) -> Result<Dispatch, PayloadError> {
        let flow = parse_port_value("selected flow", data)?;
        if let Some(port) = self.port_mut(flow.port) {
            port.selected_airflow = Some(flow.value);
            ctx.emit(Event::PortUpdated { port: flow.port });
        }
        Ok(Dispatch::Handled)
    }

    fn on_flow_limits(&mut self, data: &[u8]) -> Result<Dispatch, PayloadError> {
        let range = parse_flow_limits(data)?;
        if let FamilyState::HotAir(limits) = &mut self.family {
            limits.min = Some(range.min);
            limits.max = Some(range.max);
        }
        Ok(Dispatch::Handled)
    }

    fn on_hot_air_update(
        &mut self,
        data: &[u8],
        ctx: &mut Context<'_>,
    ) -> Result<Dispatch, PayloadError> {
        let records = parse_continuous_update(data);
        let Some(record) = records.first() else {
            return Err(PayloadError::Length {
                what: "hot-air update",
                expected: 1 + CONTINUOUS_RECORD_LEN,
                got: data.len(),
            });
        };
        if records.len() > 1 {
            tracing::debug!(records = records.len(), "extra hot-air records ignored");
        }

        if let Some(tool) = self
            .port_mut(0)
            .and_then(|port| port.tool_mut().as_hot_air_mut())
        {
            tool.air_temperature = record.temperature;
            tool.airflow = record.secondary;
            tool.power = record.extra;
            tool.status = HotAirStatus::from_byte(record.status);
            ctx.emit(Event::PortUpdated { port: 0 });
        }
        Ok(Dispatch::Handled)
    }
}

#[cfg(test)]
mod tests {
    use crate::protocol::command::{BaseCommand, HotAirCommand};
    use crate::protocol::parser::CONTINUOUS_RECORD_LEN;
    use crate::station::testing::*;
    use crate::station::{Dispatch, Station};
    use crate::types::tool::{HotAirStatus, HotAirToolType};

    fn with_port() -> (Station, Harness) {
        let mut h = Harness::new();
        let mut station = hot_air_station();
        station.start(&mut h.ctx());
        station.dispatch(
            &packet(BaseCommand::PortInfo, &port_info(31, 0)),
            &mut h.ctx(),
        );
        h.events();
        (station, h)
    }

    fn value(value: u16, port: u8) -> Vec<u8> {
        let mut data = value.to_le_bytes().to_vec();
        data.push(port);
        data
    }

    #[test]
    fn test_port_construction_queries() {
        let (_station, mut h) = with_port();
        let sent = h.sent();
        assert_eq!(
            commands(&sent[2..]),
            vec![
                BaseCommand::ToolStatus as u8,
                BaseCommand::SelectedTemperature as u8,
                HotAirCommand::SelectedFlow as u8,
                HotAirCommand::FlowLimits as u8,
                BaseCommand::PortInfo as u8,
            ]
        );
    }

    #[test]
    fn test_readings() {
        let (mut station, mut h) = with_port();
        station.dispatch(&packet(HotAirCommand::AirTemp, &value(2700, 0)), &mut h.ctx());
        station.dispatch(&packet(HotAirCommand::Power, &value(120, 0)), &mut h.ctx());
        station.dispatch(
            &packet(HotAirCommand::SelectedFlow, &value(500, 0)),
            &mut h.ctx(),
        );

        let port = station.port(0).unwrap();
        let tool = port.tool().as_hot_air().unwrap();
        assert_eq!(tool.air_temperature, 2700);
        assert_eq!(tool.power, 120);
        assert_eq!(port.selected_airflow, Some(500));
    }

    #[test]
    fn test_connected_tool_retypes_in_place() {
        let (mut station, mut h) = with_port();
        station.dispatch(&packet(HotAirCommand::ConnectedTool, &[32, 0]), &mut h.ctx());
        let tool = station.port(0).unwrap().tool().as_hot_air().unwrap();
        assert_eq!(tool.tool_type, HotAirToolType::PrecisionHotAir);

        // Unknown type leaves the port alone.
        station.dispatch(&packet(HotAirCommand::ConnectedTool, &[99, 0]), &mut h.ctx());
        assert_eq!(station.port(0).unwrap().tool().raw_type(), 32);
    }

    #[test]
    fn test_flow_limits() {
        let (mut station, mut h) = with_port();
        let mut data = 100u16.to_le_bytes().to_vec();
        data.extend_from_slice(&1000u16.to_le_bytes());
        station.dispatch(&packet(HotAirCommand::FlowLimits, &data), &mut h.ctx());

        let limits = station.flow_limits().unwrap();
        assert_eq!(limits.min, Some(100));
        assert_eq!(limits.max, Some(1000));
    }

    #[test]
    fn test_single_port_update() {
        let (mut station, mut h) = with_port();
        let mut data = vec![0x00; 1 + CONTINUOUS_RECORD_LEN];
        data[1..3].copy_from_slice(&2700u16.to_le_bytes());
        data[3..5].copy_from_slice(&450u16.to_le_bytes());
        data[5..7].copy_from_slice(&80u16.to_le_bytes());
        data[9] = 0x21;

        let outcome = station.dispatch(
            &packet(HotAirCommand::ContinuousModeUpdate, &data),
            &mut h.ctx(),
        );
        assert_eq!(outcome, Dispatch::Handled);

        let tool = station.port(0).unwrap().tool().as_hot_air().unwrap();
        assert_eq!(tool.air_temperature, 2700);
        assert_eq!(tool.airflow, 450);
        assert_eq!(tool.power, 80);
        assert!(tool.status.contains(HotAirStatus::HEATER));
        assert!(tool.status.contains(HotAirStatus::PEDAL_CONNECTED));
    }

    #[test]
    fn test_short_update_falls_through() {
        let (mut station, mut h) = with_port();
        let outcome = station.dispatch(
            &packet(HotAirCommand::ContinuousModeUpdate, &[0x00, 1, 2]),
            &mut h.ctx(),
        );
        // The base table accepts it as an update with no complete records.
        assert_eq!(outcome, Dispatch::Handled);
        let tool = station.port(0).unwrap().tool().as_hot_air().unwrap();
        assert_eq!(tool.air_temperature, 0);
    }
}
