//! Test doubles shared by the unit tests

use crate::error::{ControlError, Result};
use crate::interpreter::ExternalServiceHandler;
use crate::protocol::{Notification, Request, SubscriptionKind};
use crate::subscription::NotificationReceiver;
use crate::transport::{ProbeResult, TransportClient, TransportFactory};
use crate::wol::{MacAddress, WakeSender};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;

/// Something the mock transport was asked to do, in call order
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Connect,
    Key(String),
    Command(String),
    Launch(String, Option<Value>),
    Close,
}

/// State shared by every client a [`MockFactory`] creates
pub struct MockState {
    pub connect_calls: AtomicUsize,
    /// Remaining connects that fail before one succeeds; `u32::MAX` fails forever
    pub connect_failures: AtomicU32,
    pub connect_delay_ms: AtomicU64,
    pub launch_failures: AtomicU32,
    pub key_failures: AtomicU32,
    pub dropped: AtomicBool,
    pub model_name: Mutex<Option<String>>,
    pub probe: Mutex<ProbeResult>,
    pub replies: Mutex<VecDeque<Value>>,
    /// Every request passed to `send_command`
    pub requests: Mutex<Vec<Request>>,
    calls: Mutex<Vec<(Instant, Call)>>,
    power_tx: broadcast::Sender<Notification>,
    picture_tx: broadcast::Sender<Notification>,
}

impl MockState {
    fn new() -> Self {
        let (power_tx, _) = broadcast::channel(32);
        let (picture_tx, _) = broadcast::channel(32);
        Self {
            connect_calls: AtomicUsize::new(0),
            connect_failures: AtomicU32::new(0),
            connect_delay_ms: AtomicU64::new(0),
            launch_failures: AtomicU32::new(0),
            key_failures: AtomicU32::new(0),
            dropped: AtomicBool::new(false),
            model_name: Mutex::new(Some("OLED65C1".to_string())),
            probe: Mutex::new(ProbeResult::Unsupported),
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            power_tx,
            picture_tx,
        }
    }

    fn record(&self, call: Call) {
        self.calls.lock().push((Instant::now(), call));
    }

    /// Calls in order, without timestamps
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().iter().map(|(_, c)| c.clone()).collect()
    }

    /// Calls in order with the time they were made
    pub fn timed_calls(&self) -> Vec<(Instant, Call)> {
        self.calls.lock().clone()
    }

    pub fn keys(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Key(k) => Some(k),
                _ => None,
            })
            .collect()
    }

    pub fn commands(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Command(uri) => Some(uri),
                _ => None,
            })
            .collect()
    }

    pub fn launches(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Launch(app, _) => Some(app),
                _ => None,
            })
            .collect()
    }

    /// Push a notification to the matching subscription stream
    pub fn notify(&self, notification: Notification) {
        match &notification {
            Notification::PowerState(_) => {
                let _ = self.power_tx.send(notification);
            }
            Notification::PictureSettings(_) => {
                let _ = self.picture_tx.send(notification);
            }
            Notification::Disconnected { .. } => {
                let _ = self.power_tx.send(notification.clone());
                let _ = self.picture_tx.send(notification);
            }
        }
    }

    /// Make every live client report a closed connection
    pub fn drop_connection(&self) {
        self.dropped.store(true, Ordering::SeqCst);
    }

    fn take_failure(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| match n {
                0 => None,
                u32::MAX => Some(u32::MAX),
                n => Some(n - 1),
            })
            .is_ok()
    }
}

pub struct MockTransport {
    state: Arc<MockState>,
    connected: AtomicBool,
}

#[async_trait]
impl TransportClient for MockTransport {
    async fn connect(&self, _address: &str, _timeout: Duration) -> Result<()> {
        self.state.connect_calls.fetch_add(1, Ordering::SeqCst);
        self.state.record(Call::Connect);

        let delay = self.state.connect_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        if MockState::take_failure(&self.state.connect_failures) {
            return Err(ControlError::ConnectFailed("connection refused".to_string()));
        }

        self.state.dropped.store(false, Ordering::SeqCst);
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn subscribe(&self, kind: SubscriptionKind) -> Result<NotificationReceiver> {
        let rx = match kind {
            SubscriptionKind::PowerState => self.state.power_tx.subscribe(),
            SubscriptionKind::PictureSettings => self.state.picture_tx.subscribe(),
        };
        Ok(NotificationReceiver::new(rx))
    }

    async fn send_key(&self, key: &str) -> Result<()> {
        if self.is_closed() {
            return Err(ControlError::ConnectionClosed);
        }
        if MockState::take_failure(&self.state.key_failures) {
            return Err(ControlError::Protocol(format!("key {} rejected", key)));
        }
        self.state.record(Call::Key(key.to_string()));
        Ok(())
    }

    async fn send_command(&self, request: Request, expect_reply: bool) -> Result<Option<Value>> {
        if self.is_closed() {
            return Err(ControlError::ConnectionClosed);
        }
        self.state.record(Call::Command(request.uri.clone()));
        self.state.requests.lock().push(request);
        if expect_reply {
            Ok(Some(self.state.replies.lock().pop_front().unwrap_or(Value::Null)))
        } else {
            Ok(None)
        }
    }

    async fn launch_app(&self, app_id: &str, params: Option<Value>) -> Result<()> {
        if MockState::take_failure(&self.state.launch_failures) {
            return Err(ControlError::AppLaunch {
                app_id: app_id.to_string(),
                detail: "launch refused".to_string(),
            });
        }
        self.state.record(Call::Launch(app_id.to_string(), params));
        Ok(())
    }

    async fn get_system_info(&self, key: &str) -> Result<Option<String>> {
        if key == "modelName" {
            return Ok(self.state.model_name.lock().clone());
        }
        Ok(None)
    }

    async fn close(&self) -> Result<()> {
        if self.connected.swap(false, Ordering::SeqCst) {
            self.state.record(Call::Close);
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        !self.connected.load(Ordering::SeqCst) || self.state.dropped.load(Ordering::SeqCst)
    }

    async fn probe(&self, _address: &str) -> Result<ProbeResult> {
        Ok(self.state.probe.lock().clone())
    }
}

/// Creates [`MockTransport`]s that share one [`MockState`]
#[derive(Clone)]
pub struct MockFactory {
    pub state: Arc<MockState>,
}

impl MockFactory {
    pub fn new() -> Self {
        Self {
            state: Arc::new(MockState::new()),
        }
    }
}

impl TransportFactory for MockFactory {
    fn create(&self) -> Arc<dyn TransportClient> {
        Arc::new(MockTransport {
            state: self.state.clone(),
            connected: AtomicBool::new(false),
        })
    }
}

/// Counts magic packets instead of sending them
#[derive(Default)]
pub struct RecordingWakeSender {
    pub sent: Mutex<Vec<MacAddress>>,
    pub fail: AtomicBool,
}

#[async_trait]
impl WakeSender for RecordingWakeSender {
    async fn send(&self, mac: MacAddress) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ControlError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "broadcast not permitted",
            )));
        }
        self.sent.lock().push(mac);
        Ok(())
    }
}

impl RecordingWakeSender {
    pub fn count(&self) -> usize {
        self.sent.lock().len()
    }
}

/// External-service handler that claims a fixed set of keys
pub struct RecordingHandler {
    handles: Vec<String>,
    pub seen: Mutex<Vec<(String, Vec<String>)>>,
}

impl RecordingHandler {
    pub fn claiming(keys: &[&str]) -> Self {
        Self {
            handles: keys.iter().map(|k| k.to_string()).collect(),
            seen: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ExternalServiceHandler for RecordingHandler {
    async fn handle(&self, key: &str, parameters: &[String]) -> bool {
        self.seen.lock().push((key.to_string(), parameters.to_vec()));
        self.handles.iter().any(|k| k.eq_ignore_ascii_case(key))
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}
