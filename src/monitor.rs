//! Multi-link [`StationMonitor`].
//!
//! The monitor owns one [`Session`] per attached link and routes received
//! bytes to it by [`LinkId`]. Links are independent: each has its own
//! decoder, handshake and station model, and nothing read on one link can
//! reach another.
//!
//! ## Example
//!
//! ```no_run
//! use jbc_station::{EventFilter, EventKind, MonitorConfig, SerialConfig, StationMonitor};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), jbc_station::Error> {
//!     let mut monitor = StationMonitor::new(MonitorConfig::default());
//!     let mut events = monitor.subscribe(Some(EventFilter::kinds(vec![EventKind::PortUpdated])));
//!
//!     let link = monitor.open_serial(SerialConfig::new("/dev/ttyACM0")).await?;
//!     while let Some(event) = events.recv().await {
//!         if let Some(station) = monitor.station(event.link).await {
//!             println!("{link}: {} ports", station.port_count());
//!         }
//!     }
//!     Ok(())
//! }
//! ```

use std::collections::HashMap;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::MonitorConfig;
use crate::error::{Error, Result};
use crate::event::{Event, EventDispatcher, EventFilter, Subscription};
use crate::link::{LinkId, LinkState};
use crate::session::{Session, SessionHandle};
use crate::station::Station;
use crate::transport::{self, SerialConfig, SerialTransport, Transport};

struct LinkEntry {
    session: SessionHandle,
    pump: Option<JoinHandle<()>>,
}

/// Tracks every attached station link.
pub struct StationMonitor {
    config: MonitorConfig,
    dispatcher: EventDispatcher,
    links: HashMap<LinkId, LinkEntry>,
    next_id: u32,
}

impl Default for StationMonitor {
    fn default() -> Self {
        Self::new(MonitorConfig::default())
    }
}

impl StationMonitor {
    /// Creates a monitor with no links.
    #[must_use]
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            dispatcher: EventDispatcher::new(config.event_capacity),
            config,
            links: HashMap::new(),
            next_id: 0,
        }
    }

    /// Configuration in effect.
    #[must_use]
    pub const fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Attaches a link whose frames are written to `outbound`.
    ///
    /// The caller is responsible for delivering received bytes through
    /// [`receive`](Self::receive) and for draining `outbound`.
    pub fn attach(&mut self, outbound: mpsc::UnboundedSender<Bytes>) -> (LinkId, SessionHandle) {
        let id = LinkId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);

        let events = self.dispatcher.sink(id);
        let session = SessionHandle::new(Session::new(outbound, self.config.link, events.clone()));
        self.links.insert(
            id,
            LinkEntry {
                session: session.clone(),
                pump: None,
            },
        );

        tracing::info!(link = %id, "link attached");
        events.emit(Event::LinkOpened);
        (id, session)
    }

    /// Feeds bytes received on `link`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownLink`] if the link is not attached.
    pub async fn receive(&self, link: LinkId, data: &[u8]) -> Result<()> {
        let session = self.session(link).ok_or(Error::UnknownLink(link))?;
        session.receive(data).await;
        Ok(())
    }

    /// Connects `transport` unless it is already connected, then drives it
    /// on a background task.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport fails to connect; no link is
    /// attached in that case.
    pub async fn open<T: Transport + 'static>(&mut self, mut transport: T) -> Result<LinkId> {
        if !transport.is_connected() {
            transport.connect().await?;
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let (id, session) = self.attach(tx);
        let pump = tokio::spawn(transport::pump(
            transport,
            session,
            rx,
            self.dispatcher.sink(id),
        ));
        if let Some(entry) = self.links.get_mut(&id) {
            entry.pump = Some(pump);
        }
        Ok(id)
    }

    /// Opens a serial port and attaches it.
    ///
    /// # Errors
    ///
    /// Returns an error if the port cannot be opened.
    pub async fn open_serial(&mut self, config: SerialConfig) -> Result<LinkId> {
        self.open(SerialTransport::new(config)).await
    }

    /// Detaches a link, stopping its transport task.
    ///
    /// Returns false if the link was not attached. Scheduled follow-ups for
    /// the link find their session gone and end on their own.
    pub fn remove(&mut self, link: LinkId) -> bool {
        let Some(entry) = self.links.remove(&link) else {
            return false;
        };

        // A finished pump has already reported the loss.
        let still_running = entry.pump.as_ref().is_none_or(|pump| !pump.is_finished());
        if let Some(pump) = entry.pump {
            pump.abort();
        }
        if still_running {
            self.dispatcher.sink(link).emit(Event::LinkLost);
        }
        tracing::info!(%link, "link removed");
        true
    }

    /// Handle to a link's session.
    #[must_use]
    pub fn session(&self, link: LinkId) -> Option<SessionHandle> {
        self.links.get(&link).map(|entry| entry.session.clone())
    }

    /// Snapshot of the station on `link`, once identified.
    pub async fn station(&self, link: LinkId) -> Option<Station> {
        self.links.get(&link)?.session.station().await
    }

    /// Lifecycle state of `link`.
    pub async fn link_state(&self, link: LinkId) -> Option<LinkState> {
        Some(self.links.get(&link)?.session.state().await)
    }

    /// Attached links in attach order.
    #[must_use]
    pub fn links(&self) -> Vec<LinkId> {
        let mut links: Vec<_> = self.links.keys().copied().collect();
        links.sort_unstable();
        links
    }

    /// Subscribes to events from every link, optionally filtered.
    #[must_use]
    pub fn subscribe(&self, filter: Option<EventFilter>) -> Subscription {
        self.dispatcher.subscribe(filter)
    }

    /// The shared event dispatcher.
    #[must_use]
    pub const fn events(&self) -> &EventDispatcher {
        &self.dispatcher
    }
}

impl Drop for StationMonitor {
    fn drop(&mut self) {
        for entry in self.links.values() {
            if let Some(pump) = &entry.pump {
                pump.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::future::BoxFuture;

    use super::*;
    use crate::event::{EventKind, LinkEvent};
    use crate::protocol::command::LinkCommand;
    use crate::session::testing::*;
    use crate::types::StationFamily;

    /// Byte pipe standing in for a serial port.
    struct MemoryTransport {
        inbound: mpsc::UnboundedReceiver<Bytes>,
        written: mpsc::UnboundedSender<Bytes>,
        connected: bool,
        refuse: bool,
    }

    /// The station's end of a [`MemoryTransport`].
    struct Peer {
        tx: mpsc::UnboundedSender<Bytes>,
        rx: mpsc::UnboundedReceiver<Bytes>,
    }

    fn memory_transport() -> (MemoryTransport, Peer) {
        let (to_host, inbound) = mpsc::unbounded_channel();
        let (written, from_host) = mpsc::unbounded_channel();
        (
            MemoryTransport {
                inbound,
                written,
                connected: false,
                refuse: false,
            },
            Peer {
                tx: to_host,
                rx: from_host,
            },
        )
    }

    impl Transport for MemoryTransport {
        fn connect(&mut self) -> BoxFuture<'_, Result<()>> {
            Box::pin(async move {
                if self.refuse {
                    return Err(Error::NotConnected);
                }
                self.connected = true;
                Ok(())
            })
        }

        fn disconnect(&mut self) -> BoxFuture<'_, Result<()>> {
            Box::pin(async move {
                self.connected = false;
                Ok(())
            })
        }

        fn send(&mut self, data: Bytes) -> BoxFuture<'_, Result<()>> {
            Box::pin(async move { self.written.send(data).map_err(|_| Error::ChannelClosed) })
        }

        fn recv(&mut self) -> BoxFuture<'_, Result<Option<Bytes>>> {
            Box::pin(async move { Ok(self.inbound.recv().await) })
        }

        fn is_connected(&self) -> bool {
            self.connected
        }
    }

    fn init_tracing() {
        // Set RUST_LOG=jbc_station=trace to see frame dumps.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    async fn next_of(sub: &mut Subscription, kind: EventKind) -> LinkEvent {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let event = sub.recv().await.unwrap();
                if event.event.kind() == kind {
                    return event;
                }
            }
        })
        .await
        .unwrap()
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<Bytes>) -> Vec<Bytes> {
        std::iter::from_fn(|| rx.try_recv().ok()).collect()
    }

    #[tokio::test]
    async fn test_open_runs_handshake_and_discovery() {
        init_tracing();
        let mut monitor = StationMonitor::default();
        let mut sub = monitor.subscribe(None);
        let (transport, mut peer) = memory_transport();

        let link = monitor.open(transport).await.unwrap();
        assert_eq!(next_of(&mut sub, EventKind::LinkOpened).await.link, link);
        assert_eq!(monitor.link_state(link).await, Some(LinkState::Uninitialized));

        peer.tx.send(handshake("02:DDE_2C:1:2")).unwrap();
        let identified = next_of(&mut sub, EventKind::StationIdentified).await;
        assert_eq!(identified.link, link);
        assert_eq!(monitor.link_state(link).await, Some(LinkState::StationFound));

        // The responder reply goes out first, addressed to the flipped peer.
        let first = tokio::time::timeout(Duration::from_secs(5), peer.rx.recv())
            .await
            .unwrap()
            .unwrap();
        let written = decode_all(&[first]);
        assert_eq!(written[0].command, u8::from(LinkCommand::Handshake));
        assert_eq!(written[0].target, STATION ^ 0x80);

        peer.tx.send(discovery(&[2, 4])).unwrap();
        let done = next_of(&mut sub, EventKind::DiscoveryComplete).await;
        assert!(matches!(done.event, Event::DiscoveryComplete { ports: 2 }));

        let station = monitor.station(link).await.unwrap();
        assert_eq!(station.family(), StationFamily::Soldering);
        assert_eq!(station.port_count(), 2);
    }

    #[tokio::test]
    async fn test_transport_close_reports_link_lost() {
        let mut monitor = StationMonitor::default();
        let mut sub = monitor.subscribe(Some(EventFilter::kinds(vec![EventKind::LinkLost])));
        let (transport, peer) = memory_transport();

        let link = monitor.open(transport).await.unwrap();
        drop(peer);

        assert_eq!(next_of(&mut sub, EventKind::LinkLost).await.link, link);
        // Still listed until removed.
        assert_eq!(monitor.links(), vec![link]);
        assert!(monitor.remove(link));
        assert!(monitor.links().is_empty());
    }

    #[tokio::test]
    async fn test_remove_stops_pump() {
        let mut monitor = StationMonitor::default();
        let mut sub = monitor.subscribe(None);
        let (transport, mut peer) = memory_transport();

        let link = monitor.open(transport).await.unwrap();
        assert!(monitor.remove(link));
        assert!(!monitor.remove(link));
        assert_eq!(next_of(&mut sub, EventKind::LinkLost).await.link, link);

        // The aborted pump drops its end of the pipe.
        let closed = tokio::time::timeout(Duration::from_secs(5), peer.rx.recv())
            .await
            .unwrap();
        assert!(closed.is_none());
        assert!(matches!(
            monitor.receive(link, &[0x10]).await,
            Err(Error::UnknownLink(id)) if id == link
        ));
    }

    #[tokio::test]
    async fn test_open_failure_attaches_nothing() {
        let mut monitor = StationMonitor::default();
        let (mut transport, _peer) = memory_transport();
        transport.refuse = true;

        assert!(monitor.open(transport).await.is_err());
        assert!(monitor.links().is_empty());
    }

    #[tokio::test]
    async fn test_open_keeps_existing_connection() {
        let mut monitor = StationMonitor::default();
        let (mut transport, _peer) = memory_transport();
        transport.connected = true;
        transport.refuse = true;

        let link = monitor.open(transport).await.unwrap();
        assert_eq!(monitor.links(), vec![link]);
    }

    #[tokio::test]
    async fn test_links_are_independent() {
        let mut monitor = StationMonitor::default();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        let (a, _) = monitor.attach(tx_a);
        let (b, _) = monitor.attach(tx_b);
        assert_ne!(a, b);
        assert_eq!(monitor.links(), vec![a, b]);

        // Half a handshake on each link, interleaved.
        let bytes = handshake("02:JTSE:1:2");
        let (head, tail) = bytes.split_at(bytes.len() / 2);
        monitor.receive(a, head).await.unwrap();
        monitor.receive(b, tail).await.unwrap();

        assert!(monitor.station(a).await.is_none());
        assert!(monitor.station(b).await.is_none());

        monitor.receive(a, tail).await.unwrap();
        assert_eq!(
            monitor.station(a).await.unwrap().family(),
            StationFamily::HotAir
        );
        assert!(monitor.station(b).await.is_none());
        assert!(!drain(&mut rx_a).is_empty());

        // Link b never saw a discover frame, so it never answered.
        assert!(drain(&mut rx_b).is_empty());
    }
}
