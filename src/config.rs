//! Link and monitor configuration.

use std::time::Duration;

use crate::protocol::packet::ProtocolVersion;
use crate::types::port::ContinuousModeRate;

/// Default interval between rate-table re-queries once streaming.
pub const DEFAULT_REARM_INTERVAL: Duration = Duration::from_millis(500);

/// Default delay before re-reading an enabled preset bank.
pub const DEFAULT_PRESET_REQUERY_DELAY: Duration = Duration::from_millis(500);

/// Default capacity of the event broadcast channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Per-link protocol behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkConfig {
    /// Streaming rate requested for every discovered port.
    pub continuous_rate: ContinuousModeRate,
    /// How often the rate table is re-read after discovery.
    pub rearm_interval: Duration,
    /// Delay before re-reading a port's enabled preset bank.
    pub preset_requery_delay: Duration,
    /// Protocol revision spoken on the link.
    pub protocol: ProtocolVersion,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkConfig {
    /// Creates a configuration with default settings.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            continuous_rate: ContinuousModeRate::Ms10,
            rearm_interval: DEFAULT_REARM_INTERVAL,
            preset_requery_delay: DEFAULT_PRESET_REQUERY_DELAY,
            protocol: ProtocolVersion::Two,
        }
    }

    /// Sets the streaming rate.
    #[must_use]
    pub const fn continuous_rate(mut self, rate: ContinuousModeRate) -> Self {
        self.continuous_rate = rate;
        self
    }

    /// Sets the re-arm interval.
    #[must_use]
    pub const fn rearm_interval(mut self, interval: Duration) -> Self {
        self.rearm_interval = interval;
        self
    }

    /// Sets the preset re-query delay.
    #[must_use]
    pub const fn preset_requery_delay(mut self, delay: Duration) -> Self {
        self.preset_requery_delay = delay;
        self
    }

    /// Sets the protocol revision.
    #[must_use]
    pub const fn protocol(mut self, protocol: ProtocolVersion) -> Self {
        self.protocol = protocol;
        self
    }
}

/// Settings shared by every link a monitor manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Applied to each new link.
    pub link: LinkConfig,
    /// Capacity of the event broadcast channel.
    pub event_capacity: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl MonitorConfig {
    /// Creates a configuration with default settings.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            link: LinkConfig::new(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    /// Sets the per-link configuration.
    #[must_use]
    pub const fn link(mut self, link: LinkConfig) -> Self {
        self.link = link;
        self
    }

    /// Sets the event channel capacity.
    #[must_use]
    pub const fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }
}
