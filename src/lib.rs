//! # jbc-station
//!
//! A Rust library for monitoring JBC soldering and hot-air rework stations
//! over their USB serial protocol.
//!
//! The library speaks the station's framed binary protocol, negotiates
//! addresses through the connect handshake, discovers the station's ports
//! and keeps a live model of every tool fed by the station's continuous
//! telemetry stream.
//!
//! ## Features
//!
//! - Async/await based API using Tokio
//! - Any number of stations, each on its own independent link
//! - Event-driven notifications for observers
//! - Type-safe protocol implementation with per-family command vocabularies
//!
//! ## Quick Start
//!
//! ```no_run
//! use jbc_station::{EventFilter, EventKind, MonitorConfig, SerialConfig, StationMonitor};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), jbc_station::Error> {
//!     let mut monitor = StationMonitor::new(MonitorConfig::default());
//!     let mut discovered =
//!         monitor.subscribe(Some(EventFilter::kinds(vec![EventKind::DiscoveryComplete])));
//!
//!     let link = monitor.open_serial(SerialConfig::new("/dev/ttyACM0")).await?;
//!     discovered.recv().await;
//!
//!     if let Some(station) = monitor.station(link).await {
//!         println!("{} ({})", station.identity().model_variant, station.family());
//!         for port in station.ports() {
//!             println!("port {}: tool type {}", port.index(), port.tool().raw_type());
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`protocol`] - Frame codec, packets and command vocabularies
//! - [`link`] - Per-connection addressing, FID sequencing and handshake
//! - [`station`] - Station model and command dispatch
//! - [`types`] - Ports, tools, presets and identity
//! - [`session`] - One link's protocol state behind a single lock
//! - [`poller`] - Scheduled follow-ups (continuous-mode re-arm, preset re-query)
//! - [`transport`] - Transport implementations (currently USB/Serial)
//! - [`event`] - Async event system for observers
//! - [`monitor`] - High-level [`StationMonitor`]

pub mod config;
pub mod error;
pub mod event;
pub mod link;
pub mod monitor;
pub mod poller;
pub mod protocol;
pub mod session;
pub mod station;
pub mod transport;
pub mod types;

// Re-exports for convenience
pub use config::{LinkConfig, MonitorConfig};
pub use error::{Error, FrameError, HandshakeError, PayloadError, Result, StationError};
pub use event::{
    Event, EventDispatcher, EventFilter, EventKind, EventSink, LinkEvent, Subscription,
};
pub use link::{HandshakeStage, Link, LinkId, LinkState};
pub use monitor::StationMonitor;
pub use protocol::{
    BaseCommand, HotAirCommand, LinkCommand, NackCode, Packet, ProtocolVersion, SolderCommand,
};
pub use session::{Session, SessionHandle};
pub use station::{Discovery, FlowLimits, Station, TemperatureLimits};
pub use transport::{SerialConfig, SerialTransport, Transport};
pub use types::{
    ContinuousModeRate, HotAirStatus, HotAirTool, HotAirToolType, Port, PresetLevel,
    SolderingStatus, SolderingTool, SolderingToolType, StationFamily, StationIdentity,
    TemperatureLevel, TemperaturePresets, Tool, celsius_to_uti, uti_to_celsius,
};
