//! Transport abstraction
//!
//! The wire protocol (WebSocket framing, pairing, TLS) is provided by the
//! host. The core only talks to a TV through [`TransportClient`].

use crate::error::Result;
use crate::protocol::{Request, SubscriptionKind};
use crate::subscription::NotificationReceiver;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Result of a liveness probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeResult {
    /// The transport has no way to probe this device
    Unsupported,
    /// Nothing answered at the device's address
    Unreachable,
    /// The device answered; `power_state` is the vendor string if it reported one
    Reachable { power_state: Option<String> },
}

/// Vendor protocol client for a single session
#[async_trait]
pub trait TransportClient: Send + Sync {
    /// Open and authenticate the session
    async fn connect(&self, address: &str, timeout: Duration) -> Result<()>;

    /// Subscribe to a notification stream
    ///
    /// Notifications must be parsed with [`crate::Notification::parse`]
    /// before they are broadcast.
    async fn subscribe(&self, kind: SubscriptionKind) -> Result<NotificationReceiver>;

    /// Press a remote-control button
    async fn send_key(&self, key: &str) -> Result<()>;

    /// Send a command, optionally waiting for the reply payload
    async fn send_command(&self, request: Request, expect_reply: bool) -> Result<Option<Value>>;

    /// Launch an app with optional launch parameters
    async fn launch_app(&self, app_id: &str, params: Option<Value>) -> Result<()>;

    /// Read a system info value such as `modelName`
    async fn get_system_info(&self, key: &str) -> Result<Option<String>>;

    /// Close the session
    async fn close(&self) -> Result<()>;

    /// Whether the underlying connection has gone away
    fn is_closed(&self) -> bool;

    /// Check whether the device is reachable and which power state it reports
    async fn probe(&self, _address: &str) -> Result<ProbeResult> {
        Ok(ProbeResult::Unsupported)
    }
}

/// Creates a fresh client for every connection attempt
pub trait TransportFactory: Send + Sync {
    fn create(&self) -> Arc<dyn TransportClient>;
}

impl<F> TransportFactory for F
where
    F: Fn() -> Arc<dyn TransportClient> + Send + Sync,
{
    fn create(&self) -> Arc<dyn TransportClient> {
        self()
    }
}
