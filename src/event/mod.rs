//! Event system for observing station links.
//!
//! Every link reports what it learns (handshake progress, discovered ports,
//! telemetry updates) as [`LinkEvent`]s on a shared broadcast channel. The
//! station model itself remains the source of truth; events only say what
//! changed so observers know when to take a fresh snapshot.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::error::FrameError;
use crate::link::{LinkId, LinkState};
use crate::types::{StationFamily, StationIdentity};

/// Event types that can be dispatched.
#[derive(Debug, Clone)]
pub enum Event {
    /// Link attached to the monitor.
    LinkOpened,
    /// Link lifecycle state changed.
    LinkStateChanged(LinkState),
    /// Address negotiation finished.
    HandshakeComplete { source: u8, target: u8 },
    /// Firmware string identified a supported station.
    StationIdentified {
        identity: Box<StationIdentity>,
        family: StationFamily,
    },
    /// A port was created during discovery.
    PortDiscovered { port: u8, tool_type: u8 },
    /// The station reported its last port; streaming was requested.
    DiscoveryComplete { ports: usize },
    /// Readings or settings of a port changed.
    PortUpdated { port: u8 },
    /// Station name received (`None` when unnamed).
    StationRenamed { name: Option<String> },
    /// Packet that no handler recognised.
    Unhandled { command: u8, payload: Vec<u8> },
    /// Inbound frame dropped.
    DecodeFailed(FrameError),
    /// Transport closed or failed.
    LinkLost,
}

/// Payload-free discriminant of [`Event`], used for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    LinkOpened,
    LinkStateChanged,
    HandshakeComplete,
    StationIdentified,
    PortDiscovered,
    DiscoveryComplete,
    PortUpdated,
    StationRenamed,
    Unhandled,
    DecodeFailed,
    LinkLost,
}

impl Event {
    /// Returns the kind of this event.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::LinkOpened => EventKind::LinkOpened,
            Self::LinkStateChanged(_) => EventKind::LinkStateChanged,
            Self::HandshakeComplete { .. } => EventKind::HandshakeComplete,
            Self::StationIdentified { .. } => EventKind::StationIdentified,
            Self::PortDiscovered { .. } => EventKind::PortDiscovered,
            Self::DiscoveryComplete { .. } => EventKind::DiscoveryComplete,
            Self::PortUpdated { .. } => EventKind::PortUpdated,
            Self::StationRenamed { .. } => EventKind::StationRenamed,
            Self::Unhandled { .. } => EventKind::Unhandled,
            Self::DecodeFailed(_) => EventKind::DecodeFailed,
            Self::LinkLost => EventKind::LinkLost,
        }
    }
}

/// An event tagged with the link it came from.
#[derive(Debug, Clone)]
pub struct LinkEvent {
    pub link: LinkId,
    pub event: Event,
}

/// Subscription filter for specific links or event kinds.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Only events from this link.
    pub link: Option<LinkId>,
    /// Only events of these kinds.
    pub kinds: Option<Vec<EventKind>>,
}

impl EventFilter {
    /// Creates a filter for one link.
    #[must_use]
    pub const fn link(link: LinkId) -> Self {
        Self {
            link: Some(link),
            kinds: None,
        }
    }

    /// Creates a filter for specific event kinds.
    #[must_use]
    pub const fn kinds(kinds: Vec<EventKind>) -> Self {
        Self {
            link: None,
            kinds: Some(kinds),
        }
    }

    /// Narrows the filter to one link.
    #[must_use]
    pub const fn on_link(mut self, link: LinkId) -> Self {
        self.link = Some(link);
        self
    }

    /// Checks if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &LinkEvent) -> bool {
        if self.link.is_some_and(|link| link != event.link) {
            return false;
        }
        self.kinds
            .as_ref()
            .is_none_or(|kinds| kinds.contains(&event.event.kind()))
    }
}

/// A subscription to events.
pub struct Subscription {
    receiver: broadcast::Receiver<LinkEvent>,
    filter: Option<EventFilter>,
}

impl Subscription {
    /// Receives the next matching event.
    ///
    /// Lagged events are skipped. Returns `None` once the dispatcher is gone.
    pub async fn recv(&mut self) -> Option<LinkEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if self.filter.as_ref().is_none_or(|f| f.matches(&event)) {
                        return Some(event);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Returns the next matching event without waiting.
    ///
    /// Returns `None` when nothing is pending or the dispatcher is gone.
    pub fn try_recv(&mut self) -> Option<LinkEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.filter.as_ref().is_none_or(|f| f.matches(&event)) {
                        return Some(event);
                    }
                }
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "subscriber lagged");
                }
                Err(_) => return None,
            }
        }
    }
}

#[derive(Debug)]
struct EventDispatcherInner {
    sender: broadcast::Sender<LinkEvent>,
}

/// Dispatches events to subscribers.
#[derive(Debug, Clone)]
pub struct EventDispatcher {
    inner: Arc<EventDispatcherInner>,
}

impl EventDispatcher {
    /// Creates a new event dispatcher.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            inner: Arc::new(EventDispatcherInner { sender }),
        }
    }

    /// Dispatches an event to all subscribers.
    pub fn dispatch(&self, event: LinkEvent) {
        // No receivers is fine
        let _ = self.inner.sender.send(event);
    }

    /// Subscribes to events, optionally filtered.
    #[must_use]
    pub fn subscribe(&self, filter: Option<EventFilter>) -> Subscription {
        Subscription {
            receiver: self.inner.sender.subscribe(),
            filter,
        }
    }

    /// Returns a sink that tags events with `link`.
    #[must_use]
    pub fn sink(&self, link: LinkId) -> EventSink {
        EventSink {
            link,
            dispatcher: self.clone(),
        }
    }
}

/// Emits events on behalf of one link.
#[derive(Debug, Clone)]
pub struct EventSink {
    link: LinkId,
    dispatcher: EventDispatcher,
}

impl EventSink {
    /// The link events are tagged with.
    #[must_use]
    pub const fn link(&self) -> LinkId {
        self.link
    }

    /// Dispatches `event` tagged with this sink's link.
    pub fn emit(&self, event: Event) {
        self.dispatcher.dispatch(LinkEvent {
            link: self.link,
            event,
        });
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_event_dispatch() {
        let dispatcher = EventDispatcher::new(16);
        let mut sub = dispatcher.subscribe(None);

        dispatcher.sink(LinkId(1)).emit(Event::LinkOpened);

        let event = tokio::time::timeout(Duration::from_millis(100), sub.recv())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(event.link, LinkId(1));
        assert!(matches!(event.event, Event::LinkOpened));
    }

    #[test]
    fn test_event_filter() {
        let filter = EventFilter::kinds(vec![EventKind::PortUpdated, EventKind::LinkLost]);
        let event = |event| LinkEvent {
            link: LinkId(1),
            event,
        };

        assert!(filter.matches(&event(Event::PortUpdated { port: 0 })));
        assert!(filter.matches(&event(Event::LinkLost)));
        assert!(!filter.matches(&event(Event::LinkOpened)));
    }

    #[test]
    fn test_link_filter() {
        let filter = EventFilter::kinds(vec![EventKind::LinkLost]).on_link(LinkId(2));

        assert!(filter.matches(&LinkEvent {
            link: LinkId(2),
            event: Event::LinkLost,
        }));
        assert!(!filter.matches(&LinkEvent {
            link: LinkId(3),
            event: Event::LinkLost,
        }));
    }

    #[tokio::test]
    async fn test_filtered_subscription_skips() {
        let dispatcher = EventDispatcher::new(16);
        let mut sub = dispatcher.subscribe(Some(EventFilter::link(LinkId(2))));

        dispatcher.sink(LinkId(1)).emit(Event::LinkOpened);
        dispatcher.sink(LinkId(2)).emit(Event::LinkLost);

        let event = sub.recv().await.unwrap();
        assert_eq!(event.link, LinkId(2));
        assert!(matches!(event.event, Event::LinkLost));
    }
}
