//! Control configuration
//!
//! All timing constants used by the connection, wake and preset layers are
//! tunable here. The defaults were found empirically and are device and
//! network dependent, so hosts may override any of them.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration shared by every device a manager creates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlConfig {
    /// Delays, windows and retry counts
    #[serde(default)]
    pub timing: TimingConfig,

    /// Fill in launch params for the service apps (software update, factory menu)
    #[serde(default)]
    pub show_advanced_actions: bool,

    /// Script executed once after a successful wake with retries
    #[serde(default)]
    pub resume_script: Option<PathBuf>,

    /// Destination for Wake-on-LAN magic packets
    #[serde(default = "default_wake_broadcast_address")]
    pub wake_broadcast_address: String,
}

fn default_wake_broadcast_address() -> String {
    "255.255.255.255:9".to_string()
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            timing: TimingConfig::default(),
            show_advanced_actions: false,
            resume_script: None,
            wake_broadcast_address: default_wake_broadcast_address(),
        }
    }
}

impl ControlConfig {
    /// Parse a configuration from a JSON document; missing fields take defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Timing parameters in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Pause after a plain key press when the step gives no delay
    #[serde(default = "default_key_delay_ms")]
    pub default_key_delay_ms: u64,

    /// Window in which an Active notification keeps an app power-off attribution
    #[serde(default = "default_attribution_window_ms")]
    pub attribution_window_ms: u64,

    /// Settle time after launching an app on a freshly woken device
    #[serde(default = "default_wake_settle_delay_ms")]
    pub wake_settle_delay_ms: u64,

    /// Pause between an app launch and the first step
    #[serde(default = "default_post_launch_delay_ms")]
    pub post_launch_delay_ms: u64,

    /// Total time allotted to each wake-and-connect attempt
    #[serde(default = "default_wake_attempt_budget_ms")]
    pub wake_attempt_budget_ms: u64,

    /// Attempts used when a caller asks for one retry or fewer
    #[serde(default = "default_wake_retries")]
    pub default_wake_retries: u32,

    /// Delay before sending the magic packet
    #[serde(default = "default_wake_delay_ms")]
    pub wake_delay_ms: u64,

    /// Delay between the magic packet and the connect
    #[serde(default = "default_connect_delay_ms")]
    pub connect_delay_ms: u64,

    /// Per-try transport connect timeout
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Transport tries per connect call
    #[serde(default = "default_connect_retries")]
    pub connect_retries: u32,
}

fn default_key_delay_ms() -> u64 {
    180
}

fn default_attribution_window_ms() -> u64 {
    500
}

fn default_wake_settle_delay_ms() -> u64 {
    1000
}

fn default_post_launch_delay_ms() -> u64 {
    1500
}

fn default_wake_attempt_budget_ms() -> u64 {
    2000
}

fn default_wake_retries() -> u32 {
    5
}

fn default_wake_delay_ms() -> u64 {
    5000
}

fn default_connect_delay_ms() -> u64 {
    500
}

fn default_connect_timeout_ms() -> u64 {
    5000
}

fn default_connect_retries() -> u32 {
    3
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            default_key_delay_ms: default_key_delay_ms(),
            attribution_window_ms: default_attribution_window_ms(),
            wake_settle_delay_ms: default_wake_settle_delay_ms(),
            post_launch_delay_ms: default_post_launch_delay_ms(),
            wake_attempt_budget_ms: default_wake_attempt_budget_ms(),
            default_wake_retries: default_wake_retries(),
            wake_delay_ms: default_wake_delay_ms(),
            connect_delay_ms: default_connect_delay_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            connect_retries: default_connect_retries(),
        }
    }
}

impl TimingConfig {
    pub fn default_key_delay(&self) -> Duration {
        Duration::from_millis(self.default_key_delay_ms)
    }

    pub fn attribution_window(&self) -> Duration {
        Duration::from_millis(self.attribution_window_ms)
    }

    pub fn wake_settle_delay(&self) -> Duration {
        Duration::from_millis(self.wake_settle_delay_ms)
    }

    pub fn post_launch_delay(&self) -> Duration {
        Duration::from_millis(self.post_launch_delay_ms)
    }

    pub fn wake_attempt_budget(&self) -> Duration {
        Duration::from_millis(self.wake_attempt_budget_ms)
    }

    pub fn wake_delay(&self) -> Duration {
        Duration::from_millis(self.wake_delay_ms)
    }

    pub fn connect_delay(&self) -> Duration {
        Duration::from_millis(self.connect_delay_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}
