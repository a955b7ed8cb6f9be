use crate::error::{ControlError, Result};
use crate::picture::PictureSettingsTracker;
use crate::power::PowerStateTracker;
use crate::protocol::{Notification, Request, SubscriptionKind};
use crate::subscription::{DeviceEvent, NotificationReceiver};
use crate::transport::{ProbeResult, TransportClient, TransportFactory};
use futures_util::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use uuid::Uuid;

const SUBSCRIPTIONS: [SubscriptionKind; 2] =
    [SubscriptionKind::PowerState, SubscriptionKind::PictureSettings];

type Attempt = Shared<BoxFuture<'static, bool>>;

/// Routes parsed notifications to the trackers that own the state
#[derive(Clone)]
pub struct NotificationSink {
    pub power: Arc<PowerStateTracker>,
    pub picture: Arc<PictureSettingsTracker>,
}

impl NotificationSink {
    fn dispatch(&self, notification: Notification) {
        match notification {
            Notification::PowerState(payload) => self.power.apply(&payload),
            Notification::PictureSettings(payload) => self.picture.apply(&payload),
            Notification::Disconnected { closed_by_dispose } => {
                self.power.apply_disconnect(closed_by_dispose)
            }
        }
    }
}

/// Live transport session
struct ConnectionSession {
    id: Uuid,
    client: Arc<dyn TransportClient>,
    model_name: Option<String>,
    pumps: Vec<JoinHandle<()>>,
}

impl ConnectionSession {
    fn is_live(&self) -> bool {
        !self.client.is_closed()
    }

    async fn dispose(self) {
        for pump in &self.pumps {
            pump.abort();
        }
        if let Err(e) = self.client.close().await {
            tracing::debug!("Error closing session {}: {}", self.id, e);
        }
    }
}

impl Drop for ConnectionSession {
    fn drop(&mut self) {
        for pump in &self.pumps {
            pump.abort();
        }
    }
}

#[derive(Default)]
struct Slot {
    session: Option<ConnectionSession>,
    in_flight: Option<(u64, Attempt)>,
}

struct Inner {
    device: String,
    address: String,
    connectable: bool,
    connect_timeout: Duration,
    factory: Arc<dyn TransportFactory>,
    sink: NotificationSink,
    events: broadcast::Sender<DeviceEvent>,
    /// Serializes attempts; held for the whole dispose-open-subscribe sequence
    gate: tokio::sync::Mutex<()>,
    slot: Mutex<Slot>,
    next_attempt: AtomicU64,
}

/// Owns the single transport session of a device
///
/// Non-forced connects are idempotent: while an attempt is running every
/// caller awaits that same attempt, and an existing live session is reused
/// without touching the network. Forced reconnects always rebuild the
/// session, queueing behind any running attempt.
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<Inner>,
}

/// Identity and transport settings a [`ConnectionManager`] needs
pub struct ConnectionTarget {
    pub device: String,
    pub address: String,
    /// Dummy devices are never connected
    pub connectable: bool,
    pub connect_timeout: Duration,
}

impl ConnectionManager {
    pub fn new(
        target: ConnectionTarget,
        factory: Arc<dyn TransportFactory>,
        sink: NotificationSink,
        events: broadcast::Sender<DeviceEvent>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                device: target.device,
                address: target.address,
                connectable: target.connectable,
                connect_timeout: target.connect_timeout,
                factory,
                sink,
                events,
                gate: tokio::sync::Mutex::new(()),
                slot: Mutex::new(Slot::default()),
                next_attempt: AtomicU64::new(0),
            }),
        }
    }

    /// Connect unless a live session exists, joining any attempt in flight
    pub async fn connect(&self, retries: u32) -> bool {
        self.connect_with(retries, false).await
    }

    /// Tear down any session and connect again
    pub async fn reconnect(&self, retries: u32) -> bool {
        self.connect_with(retries, true).await
    }

    /// Make sure a live session exists, rebuilding it when `reconnect` is set
    pub async fn ensure_connected(&self, reconnect: bool, retries: u32) -> bool {
        if !reconnect && self.is_connected() {
            return true;
        }
        if self.connect_with(retries, reconnect).await {
            return true;
        }
        tracing::debug!("[{}] No connection could be made", self.inner.device);
        false
    }

    async fn connect_with(&self, retries: u32, force: bool) -> bool {
        if !self.inner.connectable {
            tracing::debug!("[{}] Placeholder device, not connecting", self.inner.device);
            return false;
        }

        let attempt = {
            let mut slot = self.inner.slot.lock();
            let joinable = if force {
                None
            } else {
                slot.in_flight.as_ref().map(|(_, attempt)| attempt.clone())
            };
            match joinable {
                Some(attempt) => attempt,
                None if !force && slot.session.as_ref().is_some_and(ConnectionSession::is_live) => {
                    return true
                }
                None => self.start_attempt(&mut slot, retries),
            }
        };

        attempt.await
    }

    fn start_attempt(&self, slot: &mut Slot, retries: u32) -> Attempt {
        let id = self.inner.next_attempt.fetch_add(1, Ordering::SeqCst);
        let inner = self.inner.clone();

        // Spawned so the attempt finishes (and releases the gate) even when
        // every waiting caller is dropped.
        let handle = tokio::spawn(async move {
            let success = {
                let _gate = inner.gate.lock().await;
                inner.run_attempt(retries).await
            };

            {
                let mut slot = inner.slot.lock();
                if slot.in_flight.as_ref().is_some_and(|(current, _)| *current == id) {
                    slot.in_flight = None;
                }
            }

            let _ = inner.events.send(DeviceEvent::Connected {
                device: inner.device.clone(),
                success,
            });
            success
        });

        let device = self.inner.device.clone();
        let attempt = async move {
            handle.await.unwrap_or_else(|e| {
                tracing::error!("[{}] Connect task failed: {}", device, e);
                false
            })
        }
        .boxed()
        .shared();

        slot.in_flight = Some((id, attempt.clone()));
        attempt
    }

    /// Whether a live session exists
    pub fn is_connected(&self) -> bool {
        self.inner
            .slot
            .lock()
            .session
            .as_ref()
            .is_some_and(ConnectionSession::is_live)
    }

    /// Client of the live session
    pub fn client(&self) -> Result<Arc<dyn TransportClient>> {
        self.inner
            .slot
            .lock()
            .session
            .as_ref()
            .filter(|s| s.is_live())
            .map(|s| s.client.clone())
            .ok_or(ControlError::NotConnected)
    }

    /// Model name reported by the current session
    pub fn model_name(&self) -> Option<String> {
        self.inner
            .slot
            .lock()
            .session
            .as_ref()
            .and_then(|s| s.model_name.clone())
    }

    /// Identifier of the current session
    pub fn session_id(&self) -> Option<Uuid> {
        self.inner.slot.lock().session.as_ref().map(|s| s.id)
    }

    /// Send a command over the live session
    pub async fn send_command(&self, request: Request, expect_reply: bool) -> Result<Option<Value>> {
        let client = self.client()?;
        tracing::debug!("[{}] Sending {}", self.inner.device, request.uri);
        client.send_command(request, expect_reply).await
    }

    /// Press a remote-control button over the live session
    pub async fn send_key(&self, key: &str) -> Result<()> {
        let client = self.client()?;
        tracing::debug!("[{}] Key {}", self.inner.device, key);
        client.send_key(key).await
    }

    /// Ask the transport whether the device is up, without needing a session
    pub async fn probe(&self) -> Result<ProbeResult> {
        let client = self.inner.factory.create();
        client.probe(&self.inner.address).await
    }

    /// Close the session, waiting for any running attempt first
    pub async fn disconnect(&self) {
        let _gate = self.inner.gate.lock().await;
        self.inner.dispose_session().await;
    }
}

impl Inner {
    async fn run_attempt(&self, retries: u32) -> bool {
        self.dispose_session().await;

        match self.open_session(retries).await {
            Ok(session) => {
                tracing::info!(
                    "[{}] Connected to {} (model: {})",
                    self.device,
                    self.address,
                    session.model_name.as_deref().unwrap_or("unknown")
                );
                self.slot.lock().session = Some(session);
                true
            }
            Err(e) => {
                tracing::error!("Error while connecting to {}: {}", self.address, e);
                false
            }
        }
    }

    async fn dispose_session(&self) {
        let session = self.slot.lock().session.take();
        if let Some(session) = session {
            tracing::debug!("[{}] Disposing session {}", self.device, session.id);
            session.dispose().await;
        }
    }

    async fn open_session(&self, retries: u32) -> Result<ConnectionSession> {
        let tries = retries.max(1);
        let mut last_error = None;

        for attempt in 1..=tries {
            tracing::info!(
                "[{}] Connecting to {} (try {} of {})",
                self.device,
                self.address,
                attempt,
                tries
            );
            let client = self.factory.create();

            let connect = client.connect(&self.address, self.connect_timeout);
            let error = match timeout(self.connect_timeout, connect).await {
                Ok(Ok(())) => return self.start_session(client).await,
                Ok(Err(e)) => e,
                Err(_) => ControlError::Timeout,
            };

            tracing::warn!("[{}] Connect try {} failed: {}", self.device, attempt, error);
            let _ = client.close().await;
            last_error = Some(error);
        }

        Err(last_error.unwrap_or_else(|| ControlError::ConnectFailed(self.address.clone())))
    }

    async fn start_session(&self, client: Arc<dyn TransportClient>) -> Result<ConnectionSession> {
        let mut pumps = Vec::with_capacity(SUBSCRIPTIONS.len());
        for kind in SUBSCRIPTIONS {
            match client.subscribe(kind).await {
                Ok(rx) => pumps.push(self.spawn_pump(rx)),
                Err(e) => {
                    for pump in &pumps {
                        pump.abort();
                    }
                    let _ = client.close().await;
                    return Err(e);
                }
            }
        }

        let model_name = match client.get_system_info("modelName").await {
            Ok(name) => name,
            Err(e) => {
                tracing::debug!("[{}] Could not read model name: {}", self.device, e);
                None
            }
        };

        Ok(ConnectionSession {
            id: Uuid::new_v4(),
            client,
            model_name,
            pumps,
        })
    }

    fn spawn_pump(&self, mut rx: NotificationReceiver) -> JoinHandle<()> {
        let sink = self.sink.clone();
        let device = self.device.clone();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(notification) => sink.dispatch(notification),
                    Err(ControlError::ChannelError(e)) => {
                        tracing::warn!("[{}] Notification stream: {}", device, e);
                    }
                    Err(_) => break,
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::PowerStatePayload;
    use crate::testing::{Call, MockFactory};
    use crate::types::{PowerOffSource, PowerState};
    use std::sync::atomic::Ordering;

    fn manager(factory: &MockFactory) -> (ConnectionManager, NotificationSink, broadcast::Receiver<DeviceEvent>) {
        let (events, rx) = broadcast::channel(16);
        let sink = NotificationSink {
            power: Arc::new(PowerStateTracker::new("tv", Duration::from_millis(500))),
            picture: Arc::new(PictureSettingsTracker::new("tv", events.clone())),
        };
        let manager = ConnectionManager::new(
            ConnectionTarget {
                device: "tv".to_string(),
                address: "192.168.1.50".to_string(),
                connectable: true,
                connect_timeout: Duration::from_secs(5),
            },
            Arc::new(factory.clone()),
            sink.clone(),
            events,
        );
        (manager, sink, rx)
    }

    #[tokio::test]
    async fn concurrent_connects_share_one_attempt() {
        let factory = MockFactory::new();
        factory.state.connect_delay_ms.store(50, Ordering::SeqCst);
        let (manager, _, _) = manager(&factory);

        let results = futures_util::future::join_all((0..8).map(|_| manager.connect(3))).await;

        assert!(results.iter().all(|r| *r));
        assert_eq!(factory.state.connect_calls.load(Ordering::SeqCst), 1);
        assert!(manager.is_connected());
    }

    #[tokio::test]
    async fn concurrent_callers_observe_same_failure() {
        let factory = MockFactory::new();
        factory.state.connect_delay_ms.store(20, Ordering::SeqCst);
        factory.state.connect_failures.store(u32::MAX, Ordering::SeqCst);
        let (manager, _, _) = manager(&factory);

        let results = futures_util::future::join_all((0..5).map(|_| manager.connect(1))).await;

        assert!(results.iter().all(|r| !*r));
        assert_eq!(factory.state.connect_calls.load(Ordering::SeqCst), 1);
        assert!(!manager.is_connected());
    }

    #[tokio::test]
    async fn live_session_short_circuits() {
        let factory = MockFactory::new();
        let (manager, _, _) = manager(&factory);

        assert!(manager.connect(1).await);
        let session = manager.session_id();
        assert!(manager.connect(1).await);

        assert_eq!(factory.state.connect_calls.load(Ordering::SeqCst), 1);
        assert_eq!(manager.session_id(), session);
        assert_eq!(manager.model_name().as_deref(), Some("OLED65C1"));
    }

    #[tokio::test]
    async fn forced_reconnect_replaces_session() {
        let factory = MockFactory::new();
        let (manager, _, _) = manager(&factory);

        assert!(manager.connect(1).await);
        let first = manager.session_id();
        assert!(manager.reconnect(1).await);

        assert_eq!(factory.state.connect_calls.load(Ordering::SeqCst), 2);
        assert_ne!(manager.session_id(), first);
        assert_eq!(
            factory.state.calls(),
            vec![Call::Connect, Call::Close, Call::Connect]
        );
    }

    #[tokio::test]
    async fn stale_session_is_rebuilt() {
        let factory = MockFactory::new();
        let (manager, _, _) = manager(&factory);

        assert!(manager.connect(1).await);
        factory.state.drop_connection();
        assert!(!manager.is_connected());
        assert!(matches!(manager.client(), Err(ControlError::NotConnected)));

        assert!(manager.connect(1).await);
        assert_eq!(factory.state.connect_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn retries_within_one_attempt() {
        let factory = MockFactory::new();
        factory.state.connect_failures.store(2, Ordering::SeqCst);
        let (manager, _, _) = manager(&factory);

        assert!(manager.connect(3).await);
        assert_eq!(factory.state.connect_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn connected_event_fires_for_success_and_failure() {
        let factory = MockFactory::new();
        factory.state.connect_failures.store(1, Ordering::SeqCst);
        let (manager, _, mut events) = manager(&factory);

        assert!(!manager.connect(1).await);
        assert!(manager.connect(1).await);

        assert_eq!(
            events.recv().await.unwrap(),
            DeviceEvent::Connected { device: "tv".to_string(), success: false }
        );
        assert_eq!(
            events.recv().await.unwrap(),
            DeviceEvent::Connected { device: "tv".to_string(), success: true }
        );
    }

    #[tokio::test]
    async fn notifications_reach_power_tracker() {
        let factory = MockFactory::new();
        let (manager, sink, _) = manager(&factory);
        assert!(manager.connect(1).await);

        factory.state.notify(Notification::PowerState(PowerStatePayload {
            state: "Active Standby".to_string(),
            processing: None,
        }));

        for _ in 0..50 {
            if sink.power.power_state() == PowerState::ActiveStandby {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(
            sink.power.snapshot(),
            (PowerState::ActiveStandby, PowerOffSource::External)
        );
    }

    #[tokio::test]
    async fn placeholder_device_never_connects() {
        let factory = MockFactory::new();
        let (events, _) = broadcast::channel(4);
        let manager = ConnectionManager::new(
            ConnectionTarget {
                device: "dummy".to_string(),
                address: String::new(),
                connectable: false,
                connect_timeout: Duration::from_secs(1),
            },
            Arc::new(factory.clone()),
            NotificationSink {
                power: Arc::new(PowerStateTracker::new("dummy", Duration::from_millis(500))),
                picture: Arc::new(PictureSettingsTracker::new("dummy", events.clone())),
            },
            events,
        );

        assert!(!manager.connect(3).await);
        assert!(!manager.reconnect(3).await);
        assert_eq!(factory.state.connect_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn disconnect_closes_session() {
        let factory = MockFactory::new();
        let (manager, _, _) = manager(&factory);
        assert!(manager.connect(1).await);

        manager.disconnect().await;

        assert!(!manager.is_connected());
        assert!(manager.session_id().is_none());
        assert_eq!(factory.state.calls().last(), Some(&Call::Close));
    }
}
