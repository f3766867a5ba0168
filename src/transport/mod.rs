//! Transport layer for station communication.
//!
//! This module provides the abstraction for different byte-stream transports.
//! Currently only USB/Serial is implemented.

pub mod serial;

use bytes::Bytes;
use futures::future::BoxFuture;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::event::{Event, EventSink};
use crate::session::SessionHandle;

/// Trait for transport implementations.
pub trait Transport: Send {
    /// Connects to the device.
    fn connect(&mut self) -> BoxFuture<'_, Result<()>>;

    /// Disconnects from the device.
    fn disconnect(&mut self) -> BoxFuture<'_, Result<()>>;

    /// Writes raw bytes to the device.
    fn send(&mut self, data: Bytes) -> BoxFuture<'_, Result<()>>;

    /// Waits for the next chunk of received bytes.
    ///
    /// Returns `Ok(None)` once the device has gone away. Must be cancel-safe:
    /// the pump drops a pending `recv` whenever an outbound frame is ready.
    fn recv(&mut self) -> BoxFuture<'_, Result<Option<Bytes>>>;

    /// Returns true if connected.
    fn is_connected(&self) -> bool;
}

pub use serial::{SerialConfig, SerialTransport};

enum Step {
    Inbound(Result<Option<Bytes>>),
    Outbound(Option<Bytes>),
}

/// Moves bytes between a connected transport and its session until either
/// side closes.
///
/// Emits [`Event::LinkLost`] on exit.
pub async fn pump<T: Transport>(
    mut transport: T,
    session: SessionHandle,
    mut outbound: mpsc::UnboundedReceiver<Bytes>,
    events: EventSink,
) {
    let link = events.link();
    loop {
        let step = tokio::select! {
            inbound = transport.recv() => Step::Inbound(inbound),
            frame = outbound.recv() => Step::Outbound(frame),
        };

        match step {
            Step::Inbound(Ok(Some(data))) => {
                tracing::trace!(%link, "received {} bytes", data.len());
                session.receive(&data).await;
            }
            Step::Inbound(Ok(None)) => {
                tracing::info!(%link, "transport closed");
                break;
            }
            Step::Inbound(Err(e)) => {
                tracing::error!(%link, "transport read failed: {e}");
                break;
            }
            Step::Outbound(Some(frame)) => {
                if let Err(e) = transport.send(frame).await {
                    tracing::error!(%link, "transport write failed: {e}");
                    break;
                }
            }
            Step::Outbound(None) => break,
        }
    }

    if let Err(e) = transport.disconnect().await {
        tracing::debug!(%link, "disconnect failed: {e}");
    }
    events.emit(Event::LinkLost);
}
