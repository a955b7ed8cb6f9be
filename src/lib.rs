//! Rust library for controlling network-attached smart TVs
//!
//! This library provides an async core for driving TVs over their
//! remote-control protocol. It supports:
//!
//! - One idempotent, serialized connection per device
//! - Wake-on-LAN followed by reconnect, with bounded retries
//! - Power-state tracking that tells app power-offs from manual ones
//! - Named actions for picture and input settings
//! - Presets: key sequences, app launches and setting changes
//! - Events for connection results and picture-setting changes
//!
//! The wire protocol itself is supplied by the host through
//! [`TransportClient`] and [`TransportFactory`].
//!
//! # Quick Start
//!
//! ```no_run
//! use smarttv_control::{ControlConfig, DeviceManager, Preset, TransportFactory};
//! use std::sync::Arc;
//!
//! async fn movie_night(factory: Arc<dyn TransportFactory>) {
//!     let manager = DeviceManager::new(ControlConfig::default(), factory);
//!     manager.add_custom("Living room", "192.168.1.50", Some("a0:b1:c2:d3:e4:f5".to_string()));
//!     manager.select(Some("Living room"));
//!
//!     // Wake the TV, start Netflix, then dim the picture
//!     let preset = Preset::new("Movie", ["WOL", "pictureMode(Cinema)", "backlight(40)"])
//!         .with_app("netflix", None);
//!     if !manager.execute_preset(&preset).await {
//!         eprintln!("Preset failed");
//!     }
//! }
//! ```
//!
//! # Architecture
//!
//! The library is organized into several layers:
//!
//! - **Manager**: Device list, selection and preset routing
//! - **Device**: High-level control API for a single TV
//! - **Interpreter**: Preset step execution
//! - **Actions**: Named settings with value sets and ranges
//! - **Wake**: Wake-on-LAN and reconnect with retries
//! - **Connection**: Session lifecycle and notification pumps
//! - **Protocol**: Request builders and parsed notifications
//! - **Types**: Domain types and data structures

mod actions;
mod config;
mod connection;
mod device;
mod error;
mod interpreter;
mod manager;
mod picture;
mod power;
mod protocol;
mod settings;
mod subscription;
#[cfg(test)]
mod testing;
mod transport;
mod types;
mod wake;
mod wol;

// Public exports
pub use actions::{
    ActionCall, ActionFn, ActionHandler, ActionRegistry, ActionValue, Category, InvokableAction, ValueSpec,
};
pub use config::{ControlConfig, TimingConfig};
pub use connection::{ConnectionManager, ConnectionTarget, NotificationSink};
pub use device::TvDevice;
pub use error::{ControlError, Result};
pub use interpreter::{advanced_app_params, ExternalServiceHandler, PresetStepInterpreter, StepToken};
pub use manager::DeviceManager;
pub use picture::PictureSettingsTracker;
pub use power::PowerStateTracker;
pub use protocol::{
    app, uri, Notification, PictureSettingsPayload, PowerStatePayload, Request, RequestKind, SettingValue,
    SubscriptionKind,
};
pub use settings::{
    EnumValue, SettingEnum, COLOR_GAMUT, DYNAMIC_TONE_MAPPING, ENERGY_SAVING, FALSE_TO_TRUE, GAMMA, HDMI_ICON,
    OFF_TO_AUTO, OFF_TO_HIGH, OFF_TO_ON, PICTURE_MODE,
};
pub use subscription::{DeviceEvent, EventReceiver, NotificationReceiver};
pub use transport::{ProbeResult, TransportClient, TransportFactory};
pub use types::{
    parse_steps, AppId, Device, DeviceAffinity, DeviceName, DeviceOptions, PictureSettings, PowerOffSource,
    PowerState, Preset, PresetTrigger, TriggerType, DEFAULT_GAME_BAR_ACTIONS,
};
pub use wake::{RecoveryHook, ScriptRecoveryHook, WakeCoordinator};
pub use wol::{MacAddress, UdpWakeSender, WakeSender};
