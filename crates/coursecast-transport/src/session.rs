//! Session lifecycle supervision.
//!
//! `SessionManager` owns the transport handle, drives the connection state
//! machine off transport events, publishes the latest pairing challenge, and
//! re-invokes `connect` after disconnects. Readers get snapshots through a
//! watch channel; nothing here is a shared mutable global.
//!
//! State machine:
//! Initializing → AwaitingPairing → Ready;
//! Ready → Disconnected → Reconnecting → (AwaitingPairing | Ready).

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use coursecast_core::error::{CastError, Result};
use coursecast_core::traits::{ChatTransport, TransportEvent};
use coursecast_core::types::{ConnectionState, PairingChallenge};
use tokio::sync::{mpsc, watch};

type StateObserver = Box<dyn Fn() + Send + Sync>;

pub struct SessionManager {
    transport: Arc<dyn ChatTransport>,
    state_tx: watch::Sender<ConnectionState>,
    challenge: RwLock<Option<PairingChallenge>>,
    generation: AtomicU64,
    on_ready: Mutex<Vec<StateObserver>>,
    on_disconnected: Mutex<Vec<StateObserver>>,
    started: AtomicBool,
    reconnect_delay: Duration,
}

impl SessionManager {
    pub fn new(transport: Arc<dyn ChatTransport>, reconnect_delay: Duration) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Initializing);
        Self {
            transport,
            state_tx,
            challenge: RwLock::new(None),
            generation: AtomicU64::new(0),
            on_ready: Mutex::new(Vec::new()),
            on_disconnected: Mutex::new(Vec::new()),
            started: AtomicBool::new(false),
            reconnect_delay,
        }
    }

    /// Initialize the transport and begin driving its lifecycle.
    ///
    /// Idempotent: a second call is a no-op. The first `connect` failure is
    /// the only fatal one and propagates to the caller; after the first Ready
    /// every disconnect is handled by the reconnect loop.
    pub async fn start(self: &Arc<Self>) -> Result<()> {
        if self.started.swap(true, Ordering::SeqCst) {
            tracing::debug!("session manager already started");
            return Ok(());
        }

        let events = self
            .transport
            .take_events()
            .ok_or_else(|| CastError::connection("transport event stream already taken"))?;

        self.transport.connect().await?;
        tracing::info!(transport = self.transport.name(), "session manager started");

        let manager = Arc::clone(self);
        tokio::spawn(async move { manager.event_loop(events).await });
        Ok(())
    }

    /// Non-blocking state snapshot.
    pub fn current_state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    /// Latest unexpired pairing challenge, or None once Ready.
    pub fn latest_challenge(&self) -> Option<PairingChallenge> {
        if self.current_state() == ConnectionState::Ready {
            return None;
        }
        self.challenge
            .read()
            .expect("challenge lock poisoned")
            .clone()
    }

    /// Register an observer invoked once per transition into Ready,
    /// in registration order.
    pub fn on_ready(&self, observer: impl Fn() + Send + Sync + 'static) {
        self.on_ready
            .lock()
            .expect("observer lock poisoned")
            .push(Box::new(observer));
    }

    /// Register an observer invoked once per transition into Disconnected.
    pub fn on_disconnected(&self, observer: impl Fn() + Send + Sync + 'static) {
        self.on_disconnected
            .lock()
            .expect("observer lock poisoned")
            .push(Box::new(observer));
    }

    /// The live transport handle, valid only while Ready. A send attempted
    /// during any other state must fail fast, not block.
    pub fn transport(&self) -> Result<Arc<dyn ChatTransport>> {
        let state = self.current_state();
        if state != ConnectionState::Ready {
            return Err(CastError::not_ready(format!(
                "transport unavailable while {state}"
            )));
        }
        Ok(Arc::clone(&self.transport))
    }

    /// Await the next (or current) Ready state.
    pub async fn wait_until_ready(&self) {
        let mut rx = self.state_tx.subscribe();
        loop {
            if *rx.borrow_and_update() == ConnectionState::Ready {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Store the new state and report whether it actually changed. Uses
    /// `send_replace` so the value lands even with no subscriber alive.
    fn set_state(&self, state: ConnectionState) -> bool {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            tracing::info!(from = %previous, to = %state, "connection state changed");
        }
        previous != state
    }

    fn notify(&self, observers: &Mutex<Vec<StateObserver>>) {
        for observer in observers.lock().expect("observer lock poisoned").iter() {
            observer();
        }
    }

    async fn event_loop(self: Arc<Self>, mut events: mpsc::UnboundedReceiver<TransportEvent>) {
        while let Some(event) = events.recv().await {
            match event {
                TransportEvent::PairingChallenge {
                    code,
                    image_data_url,
                } => {
                    let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
                    *self.challenge.write().expect("challenge lock poisoned") =
                        Some(PairingChallenge {
                            code,
                            image_data_url,
                            generation,
                        });
                    self.set_state(ConnectionState::AwaitingPairing);
                    tracing::info!(generation, "pairing challenge updated");
                }
                TransportEvent::Ready => {
                    self.challenge
                        .write()
                        .expect("challenge lock poisoned")
                        .take();
                    // Observers fire once per transition; a duplicate ready
                    // frame from the transport is a no-op.
                    if self.set_state(ConnectionState::Ready) {
                        self.notify(&self.on_ready);
                    }
                }
                TransportEvent::Disconnected { reason } => {
                    tracing::warn!(%reason, "transport disconnected");
                    if self.set_state(ConnectionState::Disconnected) {
                        self.notify(&self.on_disconnected);
                        self.reconnect().await;
                    }
                }
            }
        }
        tracing::debug!("transport event stream closed");
    }

    /// Delayed reconnect, re-armed on failure without bound. The transport
    /// library does its own internal retries; this only re-invokes connect.
    async fn reconnect(&self) {
        tokio::time::sleep(self.reconnect_delay).await;
        self.set_state(ConnectionState::Reconnecting);
        while let Err(e) = self.transport.connect().await {
            tracing::warn!(error = %e, delay_secs = self.reconnect_delay.as_secs(),
                "reconnect attempt failed, re-arming");
            tokio::time::sleep(self.reconnect_delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::atomic::AtomicUsize;

    struct MockTransport {
        events_tx: mpsc::UnboundedSender<TransportEvent>,
        events_rx: Mutex<Option<mpsc::UnboundedReceiver<TransportEvent>>>,
        connect_calls: AtomicUsize,
        fail_connects: AtomicUsize,
    }

    impl MockTransport {
        fn new() -> (Arc<Self>, mpsc::UnboundedSender<TransportEvent>) {
            let (tx, rx) = mpsc::unbounded_channel();
            let transport = Arc::new(Self {
                events_tx: tx.clone(),
                events_rx: Mutex::new(Some(rx)),
                connect_calls: AtomicUsize::new(0),
                fail_connects: AtomicUsize::new(0),
            });
            (transport, tx)
        }

        fn connect_count(&self) -> usize {
            self.connect_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ChatTransport for MockTransport {
        fn name(&self) -> &str {
            "mock"
        }

        async fn connect(&self) -> Result<()> {
            self.connect_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_connects.load(Ordering::SeqCst) > 0 {
                self.fail_connects.fetch_sub(1, Ordering::SeqCst);
                return Err(CastError::connection("mock connect refused"));
            }
            Ok(())
        }

        fn take_events(&self) -> Option<mpsc::UnboundedReceiver<TransportEvent>> {
            self.events_rx.lock().expect("mock lock").take()
        }

        async fn send_text(&self, _target: &str, _text: &str) -> Result<()> {
            Ok(())
        }

        async fn send_media(&self, _target: &str, _caption: &str, _media: &Path) -> Result<()> {
            Ok(())
        }
    }

    async fn drain_events() {
        // Let the spawned event loop observe queued events.
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_start_is_idempotent() {
        let (transport, _tx) = MockTransport::new();
        let manager = Arc::new(SessionManager::new(
            transport.clone(),
            Duration::from_secs(5),
        ));

        manager.start().await.unwrap();
        manager.start().await.unwrap();
        assert_eq!(transport.connect_count(), 1);
    }

    #[tokio::test]
    async fn test_initial_connect_failure_is_fatal() {
        let (transport, _tx) = MockTransport::new();
        transport.fail_connects.store(1, Ordering::SeqCst);
        let manager = Arc::new(SessionManager::new(
            transport.clone(),
            Duration::from_secs(5),
        ));

        let err = manager.start().await.unwrap_err();
        assert!(matches!(err, CastError::Connection(_)));
    }

    #[tokio::test]
    async fn test_pairing_then_ready_transitions() {
        let (transport, tx) = MockTransport::new();
        let manager = Arc::new(SessionManager::new(
            transport.clone(),
            Duration::from_secs(5),
        ));
        manager.start().await.unwrap();

        tx.send(TransportEvent::PairingChallenge {
            code: "c1".into(),
            image_data_url: "data:image/png;base64,AAA".into(),
        })
        .unwrap();
        drain_events().await;

        assert_eq!(manager.current_state(), ConnectionState::AwaitingPairing);
        let challenge = manager.latest_challenge().unwrap();
        assert_eq!(challenge.code, "c1");
        assert_eq!(challenge.generation, 1);
        assert!(manager.transport().is_err());

        // A refreshed QR replaces the slot wholesale and bumps the generation.
        tx.send(TransportEvent::PairingChallenge {
            code: "c2".into(),
            image_data_url: "data:image/png;base64,BBB".into(),
        })
        .unwrap();
        drain_events().await;
        assert_eq!(manager.latest_challenge().unwrap().generation, 2);

        tx.send(TransportEvent::Ready).unwrap();
        drain_events().await;

        assert_eq!(manager.current_state(), ConnectionState::Ready);
        assert!(manager.latest_challenge().is_none());
        assert!(manager.transport().is_ok());
    }

    #[tokio::test]
    async fn test_state_visible_without_any_subscriber() {
        // Nothing subscribes to the watch channel here; transitions must
        // still land for snapshot readers.
        let (transport, tx) = MockTransport::new();
        let manager = Arc::new(SessionManager::new(
            transport.clone(),
            Duration::from_secs(5),
        ));
        manager.start().await.unwrap();

        tx.send(TransportEvent::Ready).unwrap();
        drain_events().await;
        assert_eq!(manager.current_state(), ConnectionState::Ready);

        tx.send(TransportEvent::Disconnected {
            reason: "gone".into(),
        })
        .unwrap();
        drain_events().await;
        assert_eq!(manager.current_state(), ConnectionState::Disconnected);
        assert!(manager.transport().is_err());
    }

    #[tokio::test]
    async fn test_duplicate_ready_notifies_once() {
        let (transport, tx) = MockTransport::new();
        let manager = Arc::new(SessionManager::new(
            transport.clone(),
            Duration::from_secs(5),
        ));

        let fired = Arc::new(AtomicUsize::new(0));
        {
            let fired = Arc::clone(&fired);
            manager.on_ready(move || {
                fired.fetch_add(1, Ordering::SeqCst);
            });
        }

        manager.start().await.unwrap();
        tx.send(TransportEvent::Ready).unwrap();
        tx.send(TransportEvent::Ready).unwrap();
        drain_events().await;

        assert_eq!(manager.current_state(), ConnectionState::Ready);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_observers_run_in_registration_order() {
        let (transport, tx) = MockTransport::new();
        let manager = Arc::new(SessionManager::new(
            transport.clone(),
            Duration::from_secs(5),
        ));

        let order = Arc::new(Mutex::new(Vec::new()));
        for tag in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            manager.on_ready(move || order.lock().expect("order lock").push(tag));
        }

        manager.start().await.unwrap();
        tx.send(TransportEvent::Ready).unwrap();
        drain_events().await;

        assert_eq!(
            *order.lock().expect("order lock"),
            vec!["first", "second", "third"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_schedules_delayed_reconnect() {
        let (transport, tx) = MockTransport::new();
        let manager = Arc::new(SessionManager::new(
            transport.clone(),
            Duration::from_secs(5),
        ));
        manager.start().await.unwrap();

        tx.send(TransportEvent::Ready).unwrap();
        drain_events().await;
        assert_eq!(transport.connect_count(), 1);

        tx.send(TransportEvent::Disconnected {
            reason: "socket closed".into(),
        })
        .unwrap();
        drain_events().await;
        assert_eq!(manager.current_state(), ConnectionState::Disconnected);
        assert!(manager.transport().is_err());
        // No immediate retry: the delay has not elapsed yet.
        assert_eq!(transport.connect_count(), 1);

        tokio::time::advance(Duration::from_secs(5)).await;
        drain_events().await;
        assert_eq!(transport.connect_count(), 2);
        assert_eq!(manager.current_state(), ConnectionState::Reconnecting);

        // The transport coming back flips the state without re-pairing.
        tx.send(TransportEvent::Ready).unwrap();
        drain_events().await;
        assert_eq!(manager.current_state(), ConnectionState::Ready);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_rearms_after_failed_connect() {
        let (transport, tx) = MockTransport::new();
        let manager = Arc::new(SessionManager::new(
            transport.clone(),
            Duration::from_secs(5),
        ));
        manager.start().await.unwrap();
        tx.send(TransportEvent::Ready).unwrap();
        drain_events().await;

        transport.fail_connects.store(2, Ordering::SeqCst);
        tx.send(TransportEvent::Disconnected {
            reason: "gone".into(),
        })
        .unwrap();
        drain_events().await;

        // Two failing attempts, then one that sticks.
        tokio::time::advance(Duration::from_secs(5)).await;
        drain_events().await;
        assert_eq!(transport.connect_count(), 2);

        tokio::time::advance(Duration::from_secs(5)).await;
        drain_events().await;
        assert_eq!(transport.connect_count(), 3);

        tokio::time::advance(Duration::from_secs(5)).await;
        drain_events().await;
        assert_eq!(transport.connect_count(), 4);
        assert_eq!(manager.current_state(), ConnectionState::Reconnecting);
    }
}
