//! Wake-on-LAN followed by reconnect
//!
//! A sleeping TV needs a magic packet, a pause while its network stack comes
//! up, and then a fresh connection. [`WakeCoordinator`] strings those
//! together with a per-attempt time budget and an optional hook that runs
//! once the device is back.

use crate::config::TimingConfig;
use crate::connection::ConnectionManager;
use crate::error::{ControlError, Result};
use crate::transport::ProbeResult;
use crate::wol::{MacAddress, WakeSender};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Runs after a successful wake with retries
#[async_trait]
pub trait RecoveryHook: Send + Sync {
    async fn run(&self) -> Result<()>;
}

/// Starts a user script after the TV comes back, if the script exists
#[derive(Debug, Clone)]
pub struct ScriptRecoveryHook {
    path: PathBuf,
}

impl ScriptRecoveryHook {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl RecoveryHook for ScriptRecoveryHook {
    async fn run(&self) -> Result<()> {
        if !tokio::fs::try_exists(&self.path).await? {
            tracing::debug!("No resume script at {}", self.path.display());
            return Ok(());
        }

        tracing::info!("Starting resume script {}", self.path.display());
        // Fire and forget; the script may keep running
        tokio::process::Command::new(&self.path).spawn()?;
        Ok(())
    }
}

/// Wakes a device and re-establishes its session
pub struct WakeCoordinator {
    device: String,
    mac_address: Option<String>,
    connection: ConnectionManager,
    sender: Arc<dyn WakeSender>,
    timing: TimingConfig,
    recovery: Option<Arc<dyn RecoveryHook>>,
    just_woke_up: AtomicBool,
}

impl WakeCoordinator {
    pub fn new(
        device: impl Into<String>,
        mac_address: Option<String>,
        connection: ConnectionManager,
        sender: Arc<dyn WakeSender>,
        timing: TimingConfig,
    ) -> Self {
        Self {
            device: device.into(),
            mac_address,
            connection,
            sender,
            timing,
            recovery: None,
            just_woke_up: AtomicBool::new(false),
        }
    }

    /// Hook run once after [`Self::wake_and_connect_with_retries`] succeeds
    pub fn with_recovery_hook(mut self, hook: Arc<dyn RecoveryHook>) -> Self {
        self.recovery = Some(hook);
        self
    }

    /// Send a magic packet to the device
    pub async fn wake(&self) -> bool {
        match self.try_wake().await {
            Ok(()) => true,
            Err(ControlError::NoHardwareAddress(_)) => {
                tracing::debug!("[{}] Cannot wake device: it has no MAC address", self.device);
                false
            }
            Err(e) => {
                tracing::error!("[{}] Wake failed: {}", self.device, e);
                false
            }
        }
    }

    async fn try_wake(&self) -> Result<()> {
        let raw = self
            .mac_address
            .as_deref()
            .filter(|mac| !mac.trim().is_empty())
            .ok_or_else(|| ControlError::NoHardwareAddress(self.device.clone()))?;
        let mac: MacAddress = raw.parse()?;

        self.sender.send(mac).await?;
        self.just_woke_up.store(true, Ordering::SeqCst);
        tracing::info!("[{}] Wake-on-LAN sent to {}", self.device, mac);
        Ok(())
    }

    /// Clear and return the flag set by the last successful wake
    pub fn take_just_woke_up(&self) -> bool {
        self.just_woke_up.swap(false, Ordering::SeqCst)
    }

    /// Wake the device (unless a probe says it is already up) and connect
    pub async fn wake_and_connect(&self, wake_delay: Duration, connect_delay: Duration) -> bool {
        let probe = match self.connection.probe().await {
            Ok(probe) => probe,
            Err(e) => {
                tracing::debug!("[{}] Probe failed: {}", self.device, e);
                ProbeResult::Unsupported
            }
        };
        tracing::debug!("[{}] Probe result: {:?}", self.device, probe);

        let (probed, power_state) = match &probe {
            ProbeResult::Reachable { power_state } => (
                true,
                power_state
                    .as_deref()
                    .filter(|s| !s.is_empty())
                    .map(str::to_ascii_lowercase),
            ),
            _ => (false, None),
        };

        if power_state.as_deref() == Some("on") && self.connection.is_connected() {
            tracing::debug!("[{}] Already powered on and connected", self.device);
            return true;
        }

        if power_state.is_none() {
            sleep(wake_delay).await;
            if !self.wake().await {
                tracing::debug!("[{}] WOL failed", self.device);
                return false;
            }
            sleep(connect_delay).await;
        }

        let retries = self.timing.connect_retries;
        let connected = if probed {
            self.connection.reconnect(retries).await
        } else {
            self.connection.connect(retries).await
        };

        if connected && power_state.as_deref() == Some("standby") {
            if let Err(e) = self.connection.send_key("POWER").await {
                tracing::warn!("[{}] Could not leave standby: {}", self.device, e);
            }
        }

        tracing::debug!("[{}] Connect succeeded: {}", self.device, connected);
        connected
    }

    /// Repeat [`Self::wake_and_connect`] until it succeeds
    ///
    /// `max_retries` of one or less means the configured default. Each
    /// failed attempt is padded to the per-attempt budget.
    pub async fn wake_and_connect_with_retries(&self, max_retries: u32) -> bool {
        let max_retries = if max_retries <= 1 {
            self.timing.default_wake_retries
        } else {
            max_retries
        };
        let budget = self.timing.wake_attempt_budget();
        let connect_delay = self.timing.connect_delay();

        let mut success = false;
        for attempt in 1..=max_retries {
            tracing::debug!(
                "[{}] Wake and connect: attempt {} of {}",
                self.device,
                attempt,
                max_retries
            );

            let started = Instant::now();
            success = self.wake_and_connect(Duration::ZERO, connect_delay).await;
            if success {
                break;
            }

            let remaining = budget.saturating_sub(started.elapsed());
            if !remaining.is_zero() {
                sleep(remaining).await;
            }
        }

        if success {
            if let Some(hook) = &self.recovery {
                if let Err(e) = hook.run().await {
                    tracing::warn!("[{}] Recovery hook failed: {}", self.device, e);
                }
            }
        }

        success
    }
}
