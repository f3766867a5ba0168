//! Station model and command dispatch.
//!
//! A [`Station`] is built once the handshake has produced a firmware string.
//! Its family is fixed at construction and decides which command table is
//! consulted before the shared base table:
//!
//! ```text
//! inbound packet ──▶ family table ──unhandled──▶ base table ──unhandled──▶ surfaced
//! ```
//!
//! A family handler that recognises a command but cannot parse its payload
//! reports it as unhandled, so the base table still gets a look at it.

mod base;
mod hot_air;
mod soldering;

use std::collections::BTreeMap;

use crate::error::StationError;
use crate::event::{Event, EventSink};
use crate::link::Link;
use crate::protocol::command::BaseCommand;
use crate::protocol::packet::Packet;
use crate::types::identity::{StationFamily, StationIdentity};
use crate::types::port::{ContinuousModeRate, Port};

/// Station-wide temperature clamp of a soldering station, in UTI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TemperatureLimits {
    pub min: Option<u16>,
    pub max: Option<u16>,
}

/// Station-wide airflow clamp of a hot-air station.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlowLimits {
    pub min: Option<u16>,
    pub max: Option<u16>,
}

/// Family-specific station state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FamilyState {
    Soldering(TemperatureLimits),
    HotAir(FlowLimits),
}

impl FamilyState {
    const fn new(family: StationFamily) -> Self {
        match family {
            StationFamily::Soldering => Self::Soldering(TemperatureLimits {
                min: None,
                max: None,
            }),
            StationFamily::HotAir => Self::HotAir(FlowLimits {
                min: None,
                max: None,
            }),
        }
    }

    /// The family this state belongs to.
    #[must_use]
    pub const fn family(&self) -> StationFamily {
        match self {
            Self::Soldering(_) => StationFamily::Soldering,
            Self::HotAir(_) => StationFamily::HotAir,
        }
    }
}

/// Work a handler asks the session to schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowUp {
    /// Discovery finished; start periodic rate-table re-queries.
    StartPoller,
    /// Re-read this port's preset bank after a delay.
    RequeryPresets { port: u8 },
}

/// Outcome of dispatching one packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Handled,
    Schedule(FollowUp),
    Unhandled,
}

/// Port discovery progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Discovery {
    #[default]
    Idle,
    Running,
    Complete,
}

/// Where handlers send requests and report changes.
pub struct Context<'a> {
    link: &'a mut Link,
    events: &'a EventSink,
}

impl<'a> Context<'a> {
    /// Bundles a link and an event sink.
    pub const fn new(link: &'a mut Link, events: &'a EventSink) -> Self {
        Self { link, events }
    }

    /// Queues a request to the station.
    pub fn send(&mut self, command: impl Into<u8>, payload: &[u8]) {
        self.link.send(command.into(), payload);
    }

    /// Publishes an event for this link.
    pub fn emit(&self, event: Event) {
        self.events.emit(event);
    }
}

/// A connected station and its ports.
#[derive(Debug, Clone)]
pub struct Station {
    identity: StationIdentity,
    family: FamilyState,
    name: Option<String>,
    ports: BTreeMap<u8, Port>,
    discovery: Discovery,
    continuous_rate: ContinuousModeRate,
}

impl Station {
    /// Creates a station for an identity whose model names a known family.
    pub fn new(
        identity: StationIdentity,
        continuous_rate: ContinuousModeRate,
    ) -> Result<Self, StationError> {
        let family = identity.family()?;
        Ok(Self {
            identity,
            family: FamilyState::new(family),
            name: None,
            ports: BTreeMap::new(),
            discovery: Discovery::Idle,
            continuous_rate,
        })
    }

    /// Parses a firmware string and device id, then builds the station.
    pub fn from_firmware(
        firmware: &str,
        device_id: &str,
        continuous_rate: ContinuousModeRate,
    ) -> Result<Self, StationError> {
        Self::new(StationIdentity::parse(firmware, device_id)?, continuous_rate)
    }

    /// Station family.
    #[must_use]
    pub const fn family(&self) -> StationFamily {
        self.family.family()
    }

    /// What the station reported about itself.
    #[must_use]
    pub const fn identity(&self) -> &StationIdentity {
        &self.identity
    }

    /// Display name, if the station has one.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Temperature clamp, if this is a soldering station.
    #[must_use]
    pub const fn temperature_limits(&self) -> Option<&TemperatureLimits> {
        match &self.family {
            FamilyState::Soldering(limits) => Some(limits),
            FamilyState::HotAir(_) => None,
        }
    }

    /// Airflow clamp, if this is a hot-air station.
    #[must_use]
    pub const fn flow_limits(&self) -> Option<&FlowLimits> {
        match &self.family {
            FamilyState::HotAir(limits) => Some(limits),
            FamilyState::Soldering(_) => None,
        }
    }

    /// Discovered ports in index order.
    pub fn ports(&self) -> impl Iterator<Item = &Port> {
        self.ports.values()
    }

    /// Port by index.
    #[must_use]
    pub fn port(&self, index: u8) -> Option<&Port> {
        self.ports.get(&index)
    }

    /// Number of discovered ports.
    #[must_use]
    pub fn port_count(&self) -> usize {
        self.ports.len()
    }

    /// Port discovery progress.
    #[must_use]
    pub const fn discovery(&self) -> Discovery {
        self.discovery
    }

    /// Bitmask with one bit per discovered port (ports 0 to 7).
    #[must_use]
    pub fn port_mask(&self) -> u8 {
        self.ports
            .keys()
            .filter(|&&index| index < 8)
            .fold(0, |mask, &index| mask | (1 << index))
    }

    /// Starts discovery: asks for the station name and the first port.
    pub fn start(&mut self, ctx: &mut Context<'_>) {
        tracing::debug!(family = %self.family(), "starting port discovery");
        self.discovery = Discovery::Running;
        ctx.send(BaseCommand::StationName, &[]);
        ctx.send(BaseCommand::PortInfo, &[0]);
    }

    /// Routes one inbound packet: family table first, then the base table.
    pub fn dispatch(&mut self, packet: &Packet, ctx: &mut Context<'_>) -> Dispatch {
        let outcome = match self.family() {
            StationFamily::Soldering => self.handle_soldering(packet, ctx),
            StationFamily::HotAir => self.handle_hot_air(packet, ctx),
        };
        match outcome {
            Dispatch::Unhandled => self.handle_base(packet, ctx),
            other => other,
        }
    }

    /// Periodic heartbeat: re-reads the rate table.
    pub fn rearm(&self, ctx: &mut Context<'_>) {
        if self.discovery == Discovery::Complete {
            ctx.send(BaseCommand::ContinuousMode, &[]);
        }
    }

    /// Requests streaming for every discovered port.
    pub fn enable_continuous_mode(&self, ctx: &mut Context<'_>) {
        let mask = self.port_mask();
        tracing::debug!(
            rate = ?self.continuous_rate,
            mask = format_args!("{mask:#010b}"),
            "enabling continuous mode"
        );
        ctx.send(
            BaseCommand::ContinuousModeW,
            &[self.continuous_rate.into(), mask],
        );
    }

    /// Fires a scheduled preset re-query for `port`.
    ///
    /// Does nothing if the port has gone away or no longer holds a
    /// soldering tool.
    pub fn requery_presets(&mut self, port: u8, ctx: &mut Context<'_>) {
        let Some(entry) = self.ports.get_mut(&port) else {
            tracing::debug!(port, "preset re-query for unknown port dropped");
            return;
        };
        entry.preset_requery_pending = false;
        if entry.tool().as_soldering().is_some() {
            let tool_type = entry.tool().raw_type();
            soldering::request_presets(port, tool_type, ctx);
        }
    }

    fn port_mut(&mut self, index: u8) -> Option<&mut Port> {
        let port = self.ports.get_mut(&index);
        if port.is_none() {
            tracing::debug!(port = index, "update for unknown port ignored");
        }
        port
    }
}
