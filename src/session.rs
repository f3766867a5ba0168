//! Per-link protocol session.
//!
//! A [`Session`] is the single owner of one link's state: decoder, handshake,
//! station model. Received bytes are decoded and dispatched synchronously
//! under one lock; anything that has to happen later is returned as a
//! [`FollowUp`] and scheduled by [`SessionHandle`] as a task holding only a
//! weak reference.

use std::sync::{Arc, Weak};

use bytes::Bytes;
use tokio::sync::{Mutex, MutexGuard, mpsc};

use crate::config::LinkConfig;
use crate::event::{Event, EventSink};
use crate::link::{HandshakeStage, Link, LinkId, LinkState};
use crate::poller;
use crate::protocol::command::LinkCommand;
use crate::protocol::packet::Packet;
use crate::station::{Context, Dispatch, FollowUp, Station};

/// Protocol state of one link.
#[derive(Debug)]
pub struct Session {
    link: Link,
    station: Option<Station>,
    state: LinkState,
    config: LinkConfig,
    events: EventSink,
    poller_started: bool,
}

impl Session {
    /// Creates a session that queues outbound frames on `outbound`.
    #[must_use]
    pub fn new(
        outbound: mpsc::UnboundedSender<Bytes>,
        config: LinkConfig,
        events: EventSink,
    ) -> Self {
        Self {
            link: Link::new(outbound, config.protocol),
            station: None,
            state: LinkState::Uninitialized,
            config,
            events,
            poller_started: false,
        }
    }

    /// Link this session belongs to.
    #[must_use]
    pub const fn id(&self) -> LinkId {
        self.events.link()
    }

    /// Lifecycle state.
    #[must_use]
    pub const fn state(&self) -> LinkState {
        self.state
    }

    /// Addressing and handshake details.
    #[must_use]
    pub const fn link(&self) -> &Link {
        &self.link
    }

    /// The identified station, once the handshake has completed.
    #[must_use]
    pub const fn station(&self) -> Option<&Station> {
        self.station.as_ref()
    }

    /// Configuration in effect.
    #[must_use]
    pub const fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Decodes `data` and dispatches every complete packet.
    ///
    /// Returns the follow-ups the caller must schedule.
    pub fn receive(&mut self, data: &[u8]) -> Vec<FollowUp> {
        if self.state == LinkState::Uninitialized {
            self.set_state(LinkState::Initializing);
        }

        self.link.feed(data);
        let mut follow_ups = Vec::new();
        loop {
            match self.link.decode() {
                Ok(Some(packet)) => {
                    if let Some(follow_up) = self.handle_packet(&packet) {
                        follow_ups.push(follow_up);
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(link = %self.id(), "dropping frame: {e}");
                    self.events.emit(Event::DecodeFailed(e));
                }
            }
        }
        follow_ups
    }

    fn handle_packet(&mut self, packet: &Packet) -> Option<FollowUp> {
        if !self.link.is_established() {
            match self.link.handshake(packet) {
                Ok(HandshakeStage::Complete) => self.on_established(),
                Ok(stage) => tracing::debug!(link = %self.id(), ?stage, "handshake progressed"),
                Err(e) => tracing::warn!(link = %self.id(), "unexpected handshake message: {e}"),
            }
            return None;
        }

        if packet.command == u8::from(LinkCommand::Handshake) {
            tracing::trace!(link = %self.id(), "late handshake frame ignored");
            return None;
        }
        if !self.link.accepts(packet) {
            tracing::trace!(
                link = %self.id(),
                target = packet.target,
                "packet for another address ignored"
            );
            return None;
        }
        let station = self.station.as_mut()?;

        let mut ctx = Context::new(&mut self.link, &self.events);
        match station.dispatch(packet, &mut ctx) {
            Dispatch::Handled => None,
            Dispatch::Schedule(FollowUp::StartPoller) if self.poller_started => None,
            Dispatch::Schedule(follow_up) => {
                if follow_up == FollowUp::StartPoller {
                    self.poller_started = true;
                }
                Some(follow_up)
            }
            Dispatch::Unhandled => {
                tracing::debug!(
                    link = %self.id(),
                    command = format_args!("{:#04x}", packet.command),
                    "unhandled packet"
                );
                self.events.emit(Event::Unhandled {
                    command: packet.command,
                    payload: packet.data().to_vec(),
                });
                None
            }
        }
    }

    fn on_established(&mut self) {
        self.events.emit(Event::HandshakeComplete {
            source: self.link.source(),
            target: self.link.target(),
        });

        let firmware = self.link.firmware().unwrap_or_default();
        let device_id = self.link.device_id().unwrap_or_default();
        match Station::from_firmware(firmware, device_id, self.config.continuous_rate) {
            Ok(mut station) => {
                let identity = station.identity().clone();
                tracing::info!(
                    link = %self.id(),
                    model = %identity.model_variant,
                    family = %station.family(),
                    "station identified"
                );
                self.events.emit(Event::StationIdentified {
                    identity: Box::new(identity),
                    family: station.family(),
                });
                station.start(&mut Context::new(&mut self.link, &self.events));
                self.station = Some(station);
                self.set_state(LinkState::StationFound);
            }
            Err(e) => {
                tracing::warn!(link = %self.id(), "unsupported device: {e}");
                self.set_state(LinkState::UnknownDevice);
            }
        }
    }

    /// Poller tick: re-reads the rate table.
    pub fn rearm(&mut self) {
        if let Some(station) = &self.station {
            station.rearm(&mut Context::new(&mut self.link, &self.events));
        }
    }

    /// Fires a scheduled preset re-query.
    pub fn requery_presets(&mut self, port: u8) {
        if let Some(station) = &mut self.station {
            station.requery_presets(port, &mut Context::new(&mut self.link, &self.events));
        }
    }

    fn set_state(&mut self, state: LinkState) {
        if self.state != state {
            tracing::debug!(link = %self.id(), from = ?self.state, to = ?state, "link state");
            self.state = state;
            self.events.emit(Event::LinkStateChanged(state));
        }
    }
}

/// Shared handle to a [`Session`].
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<Mutex<Session>>,
}

impl SessionHandle {
    /// Wraps a session for shared use.
    #[must_use]
    pub fn new(session: Session) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    /// Feeds received bytes and schedules resulting follow-ups.
    pub async fn receive(&self, data: &[u8]) {
        let (follow_ups, config) = {
            let mut session = self.inner.lock().await;
            (session.receive(data), *session.config())
        };
        for follow_up in follow_ups {
            self.schedule(follow_up, &config);
        }
    }

    fn schedule(&self, follow_up: FollowUp, config: &LinkConfig) {
        let session = self.downgrade();
        match follow_up {
            FollowUp::StartPoller => {
                tracing::debug!(
                    interval = ?config.rearm_interval,
                    "starting continuous-mode poller"
                );
                poller::spawn_rearm(session, config.rearm_interval);
            }
            FollowUp::RequeryPresets { port } => {
                tracing::debug!(
                    port,
                    delay = ?config.preset_requery_delay,
                    "preset re-query scheduled"
                );
                poller::spawn_preset_requery(session, port, config.preset_requery_delay);
            }
        }
    }

    /// Locks the session for direct access.
    pub async fn lock(&self) -> MutexGuard<'_, Session> {
        self.inner.lock().await
    }

    /// Snapshot of the station model.
    pub async fn station(&self) -> Option<Station> {
        self.inner.lock().await.station().cloned()
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> LinkState {
        self.inner.lock().await.state()
    }

    /// Weak reference for scheduled work.
    #[must_use]
    pub fn downgrade(&self) -> Weak<Mutex<Session>> {
        Arc::downgrade(&self.inner)
    }
}
