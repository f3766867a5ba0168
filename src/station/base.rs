//! Commands shared by every station family.

use crate::error::PayloadError;
use crate::event::Event;
use crate::protocol::command::{BaseCommand, LinkCommand, NackCode};
use crate::protocol::packet::Packet;
use crate::protocol::parser::{
    parse_continuous_update, parse_nack, parse_port_byte, parse_port_info, parse_port_value,
    parse_string,
};
use crate::station::{Context, Discovery, Dispatch, FollowUp, Station, hot_air, soldering};
use crate::types::identity::StationFamily;
use crate::types::port::{ContinuousModeRate, Port};
use crate::types::tool::Tool;

impl Station {
    pub(super) fn handle_base(&mut self, packet: &Packet, ctx: &mut Context<'_>) -> Dispatch {
        let Some(command) = BaseCommand::from_byte(packet.command) else {
            return Dispatch::Unhandled;
        };
        let data = packet.data();

        let result = match command {
            BaseCommand::Nack => self.on_nack(data, ctx),
            BaseCommand::PortInfo => self.on_port_info(data, ctx),
            BaseCommand::ToolStatus => self.on_tool_status(data, ctx),
            BaseCommand::StationName => Ok(self.on_station_name(data, ctx)),
            BaseCommand::SelectedTemperature => self.on_selected_temperature(data, ctx),
            BaseCommand::ContinuousMode => Ok(self.on_rate_table(data, ctx)),
            BaseCommand::ContinuousModeW => Ok(on_continuous_mode_ack(packet)),
            BaseCommand::ContinuousModeUpdate => Ok(self.on_continuous_update(data, ctx)),
        };

        result.unwrap_or_else(|e| {
            tracing::warn!(?command, "rejected payload: {e}");
            Dispatch::Unhandled
        })
    }

    fn on_nack(&mut self, data: &[u8], ctx: &mut Context<'_>) -> Result<Dispatch, PayloadError> {
        let nack = parse_nack(data)?;
        let ends_ports = nack.command == u8::from(BaseCommand::PortInfo);
        if nack.code == Some(NackCode::OutOfRange) && ends_ports {
            return Ok(self.finish_discovery(ctx));
        }
        tracing::debug!(
            code = nack.raw_code,
            command = nack.command,
            "station refused request"
        );
        Ok(Dispatch::Unhandled)
    }

    fn finish_discovery(&mut self, ctx: &mut Context<'_>) -> Dispatch {
        if self.discovery == Discovery::Complete {
            tracing::debug!("repeated end of ports ignored");
            return Dispatch::Handled;
        }
        self.discovery = Discovery::Complete;
        let ports = self.ports.len();
        tracing::info!(ports, "port discovery complete");
        self.enable_continuous_mode(ctx);
        ctx.emit(Event::DiscoveryComplete { ports });
        Dispatch::Schedule(FollowUp::StartPoller)
    }

    fn on_port_info(
        &mut self,
        data: &[u8],
        ctx: &mut Context<'_>,
    ) -> Result<Dispatch, PayloadError> {
        let descriptor = parse_port_info(data)?;
        let index = descriptor.port;

        if self.ports.contains_key(&index) {
            tracing::debug!(port = index, "port already known");
            return Ok(Dispatch::Handled);
        }

        match Tool::from_type(self.family(), descriptor.tool_type) {
            Some(tool) => self.add_port(index, tool, ctx),
            None => tracing::warn!(
                port = index,
                tool_type = descriptor.tool_type,
                "unknown tool type, skipping port"
            ),
        }

        if self.discovery == Discovery::Running {
            match index.checked_add(1) {
                Some(next) => ctx.send(BaseCommand::PortInfo, &[next]),
                None => return Ok(self.finish_discovery(ctx)),
            }
        }
        Ok(Dispatch::Handled)
    }

    fn add_port(&mut self, index: u8, tool: Tool, ctx: &mut Context<'_>) {
        let tool_type = tool.raw_type();
        self.ports.insert(index, Port::new(index, tool));
        tracing::info!(port = index, tool_type, "port discovered");

        ctx.send(BaseCommand::ToolStatus, &[index]);
        ctx.send(BaseCommand::SelectedTemperature, &[index]);
        match self.family() {
            StationFamily::Soldering => soldering::construct_port(index, tool_type, ctx),
            StationFamily::HotAir => hot_air::construct_port(index, ctx),
        }
        ctx.emit(Event::PortDiscovered {
            port: index,
            tool_type,
        });
    }

    fn on_tool_status(
        &mut self,
        data: &[u8],
        ctx: &mut Context<'_>,
    ) -> Result<Dispatch, PayloadError> {
        let (status, index) = parse_port_byte("tool status", data)?;
        if let Some(port) = self.port_mut(index) {
            port.tool_mut().set_status(status);
            ctx.emit(Event::PortUpdated { port: index });
        }
        Ok(Dispatch::Handled)
    }

    fn on_station_name(&mut self, data: &[u8], ctx: &mut Context<'_>) -> Dispatch {
        let name = parse_string(data);
        self.name = if name.is_empty() {
            tracing::debug!("station is unnamed");
            None
        } else {
            tracing::debug!(%name, "station name");
            Some(name)
        };
        ctx.emit(Event::StationRenamed {
            name: self.name.clone(),
        });
        Dispatch::Handled
    }

    fn on_selected_temperature(
        &mut self,
        data: &[u8],
        ctx: &mut Context<'_>,
    ) -> Result<Dispatch, PayloadError> {
        let setpoint = parse_port_value("selected temperature", data)?;
        if let Some(port) = self.port_mut(setpoint.port) {
            port.selected_temperature = Some(setpoint.value);
            ctx.emit(Event::PortUpdated {
                port: setpoint.port,
            });
        }
        Ok(Dispatch::Handled)
    }

    fn on_rate_table(&mut self, data: &[u8], ctx: &mut Context<'_>) -> Dispatch {
        let mut any_off = false;
        for (index, &raw) in (0..=u8::MAX).zip(data) {
            let Some(port) = self.ports.get_mut(&index) else {
                continue;
            };
            let Some(rate) = ContinuousModeRate::from_byte(raw) else {
                tracing::warn!(port = index, raw, "unknown continuous-mode rate");
                continue;
            };
            port.continuous_mode = rate;
            any_off |= rate == ContinuousModeRate::Off;
        }

        if any_off {
            tracing::debug!("streaming stopped on a port, re-enabling");
            self.enable_continuous_mode(ctx);
        }
        Dispatch::Handled
    }

    fn on_continuous_update(&mut self, data: &[u8], ctx: &mut Context<'_>) -> Dispatch {
        for (index, record) in (0..=u8::MAX).zip(parse_continuous_update(data)) {
            let Some(port) = self.ports.get_mut(&index) else {
                continue;
            };
            let tool = port.tool_mut();
            tool.set_temperatures(record.temperature, record.secondary);
            tool.set_status(record.status);
            ctx.emit(Event::PortUpdated { port: index });
        }
        Dispatch::Handled
    }
}

fn on_continuous_mode_ack(packet: &Packet) -> Dispatch {
    if packet.payload_is(LinkCommand::Ack.into()) {
        tracing::debug!("continuous mode acknowledged");
        Dispatch::Handled
    } else {
        Dispatch::Unhandled
    }
}
