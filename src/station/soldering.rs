//! Soldering station extensions.

use crate::error::PayloadError;
use crate::event::Event;
use crate::protocol::command::SolderCommand;
use crate::protocol::packet::Packet;
use crate::protocol::parser::{parse_port_value, parse_preset_bank, parse_tip_readings, parse_u16};
use crate::station::{Context, Dispatch, FamilyState, FollowUp, Station};
use crate::types::units::uti_to_celsius;

/// Queries issued for a freshly created soldering port.
pub(super) fn construct_port(index: u8, tool_type: u8, ctx: &mut Context<'_>) {
    ctx.send(SolderCommand::MosTemp, &[index]);
    ctx.send(SolderCommand::TipTemp, &[index]);
    request_presets(index, tool_type, ctx);
    ctx.send(SolderCommand::MaxTemp, &[]);
    ctx.send(SolderCommand::MinTemp, &[]);
}

pub(super) fn request_presets(index: u8, tool_type: u8, ctx: &mut Context<'_>) {
    ctx.send(SolderCommand::LevelsTemps, &[index, tool_type]);
}

impl Station {
    pub(super) fn handle_soldering(&mut self, packet: &Packet, ctx: &mut Context<'_>) -> Dispatch {
        let Some(command) = SolderCommand::from_byte(packet.command) else {
            return Dispatch::Unhandled;
        };
        let data = packet.data();

        let result = match command {
            SolderCommand::LevelsTemps => self.on_presets(data, ctx),
            SolderCommand::TipTemp => self.on_tip_temperature(data, ctx),
            SolderCommand::MosTemp => on_mos_temperature(data),
            SolderCommand::MaxTemp | SolderCommand::MinTemp => {
                self.on_temperature_limit(command, data)
            }
        };

        result.unwrap_or_else(|e| {
            tracing::warn!(?command, "rejected payload: {e}");
            Dispatch::Unhandled
        })
    }

    fn on_presets(&mut self, data: &[u8], ctx: &mut Context<'_>) -> Result<Dispatch, PayloadError> {
        let bank = parse_preset_bank(data)?;
        let Some(port) = self.port_mut(bank.port) else {
            return Ok(Dispatch::Handled);
        };
        port.presets = Some(bank.presets);
        ctx.emit(Event::PortUpdated { port: bank.port });

        // Presets in use can be switched from the station's front panel,
        // so keep one delayed re-read in flight per port.
        if bank.presets.enabled && !port.preset_requery_pending {
            port.preset_requery_pending = true;
            return Ok(Dispatch::Schedule(FollowUp::RequeryPresets { port: bank.port }));
        }
        Ok(Dispatch::Handled)
    }

    fn on_tip_temperature(
        &mut self,
        data: &[u8],
        ctx: &mut Context<'_>,
    ) -> Result<Dispatch, PayloadError> {
        let readings = parse_tip_readings(data)?;
        let Some(port) = self.port_mut(readings.port) else {
            return Ok(Dispatch::Handled);
        };
        if let Some(tool) = port.tool_mut().as_soldering_mut() {
            tool.tip_temperature = readings.primary;
            if let Some(secondary) = readings.secondary {
                tool.secondary_tip_temperature = secondary;
            }
            ctx.emit(Event::PortUpdated {
                port: readings.port,
            });
        }
        Ok(Dispatch::Handled)
    }

    fn on_temperature_limit(
        &mut self,
        command: SolderCommand,
        data: &[u8],
    ) -> Result<Dispatch, PayloadError> {
        let value = parse_u16("temperature limit", data)?;
        if let FamilyState::Soldering(limits) = &mut self.family {
            if command == SolderCommand::MaxTemp {
                limits.max = Some(value);
            } else {
                limits.min = Some(value);
            }
        }
        Ok(Dispatch::Handled)
    }
}

fn on_mos_temperature(data: &[u8]) -> Result<Dispatch, PayloadError> {
    let reading = parse_port_value("heat-sink temperature", data)?;
    tracing::debug!(
        port = reading.port,
        celsius = uti_to_celsius(reading.value),
        "heat-sink temperature"
    );
    Ok(Dispatch::Handled)
}
