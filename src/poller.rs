//! Scheduled follow-ups for a session.
//!
//! Both tasks hold a [`Weak`] reference and end quietly once the session
//! has been dropped.

use std::sync::Weak;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::session::Session;

/// Re-reads the rate table every `interval` until the session goes away.
///
/// The reply re-enables any port that stopped streaming and doubles as a
/// liveness heartbeat.
pub fn spawn_rearm(session: Weak<Mutex<Session>>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let Some(session) = session.upgrade() else {
                tracing::debug!("session closed, poller stopping");
                return;
            };
            session.lock().await.rearm();
        }
    })
}

/// Re-reads a port's preset bank once, after `delay`.
pub fn spawn_preset_requery(
    session: Weak<Mutex<Session>>,
    port: u8,
    delay: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        if let Some(session) = session.upgrade() {
            session.lock().await.requery_presets(port);
        }
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bytes::Bytes;
    use tokio::sync::mpsc;

    use super::*;
    use crate::config::LinkConfig;
    use crate::event::EventDispatcher;
    use crate::link::LinkId;
    use crate::protocol::command::{BaseCommand, SolderCommand};
    use crate::session::testing::*;

    const TICK: Duration = Duration::from_millis(500);

    fn discovered_session() -> (Arc<Mutex<Session>>, mpsc::UnboundedReceiver<Bytes>) {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let dispatcher = EventDispatcher::new(64);
        let mut session = Session::new(tx, LinkConfig::default(), dispatcher.sink(LinkId(1)));
        session.receive(&handshake("02:DDE:1:2"));
        session.receive(&discovery(&[4]));
        while rx.try_recv().is_ok() {}
        (Arc::new(Mutex::new(session)), rx)
    }

    async fn next_command(rx: &mut mpsc::UnboundedReceiver<Bytes>) -> u8 {
        let frame = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        decode_all(&[frame])[0].command
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_ticks() {
        let (session, mut rx) = discovered_session();
        let task = spawn_rearm(Arc::downgrade(&session), TICK);

        let start = Instant::now();
        assert_eq!(next_command(&mut rx).await, BaseCommand::ContinuousMode as u8);
        assert_eq!(next_command(&mut rx).await, BaseCommand::ContinuousMode as u8);
        assert!(start.elapsed() >= TICK * 2);

        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_stops_when_session_dropped() {
        let (session, _rx) = discovered_session();
        let task = spawn_rearm(Arc::downgrade(&session), TICK);
        drop(session);

        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_preset_requery_fires_once() {
        let (session, mut rx) = discovered_session();
        let task = spawn_preset_requery(Arc::downgrade(&session), 0, TICK);

        assert_eq!(next_command(&mut rx).await, SolderCommand::LevelsTemps as u8);
        task.await.unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_preset_requery_after_teardown_is_silent() {
        let (session, mut rx) = discovered_session();
        let task = spawn_preset_requery(Arc::downgrade(&session), 0, TICK);
        drop(session);

        task.await.unwrap();
        // Sender went away with the session.
        assert!(rx.recv().await.is_none());
    }
}
