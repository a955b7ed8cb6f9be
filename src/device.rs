use crate::actions::{ActionRegistry, InvokableAction};
use crate::config::ControlConfig;
use crate::connection::{ConnectionManager, ConnectionTarget, NotificationSink};
use crate::error::Result;
use crate::interpreter::{ExternalServiceHandler, PresetStepInterpreter};
use crate::picture::PictureSettingsTracker;
use crate::power::PowerStateTracker;
use crate::protocol::{Request, SettingValue};
use crate::subscription::{DeviceEvent, EventReceiver};
use crate::transport::TransportFactory;
use crate::types::{
    Device, DeviceOptions, PictureSettings, PowerOffSource, PowerState, Preset, DEFAULT_GAME_BAR_ACTIONS,
};
use crate::wake::{ScriptRecoveryHook, WakeCoordinator};
use crate::wol::WakeSender;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Handle to a single TV
///
/// A `TvDevice` wires the connection, trackers, wake coordinator, action
/// registry and preset interpreter of one device together. Cloning is cheap
/// and every clone controls the same device.
#[derive(Clone)]
pub struct TvDevice {
    inner: Arc<DeviceInner>,
}

struct DeviceInner {
    device: RwLock<Device>,
    options: RwLock<DeviceOptions>,
    game_bar: RwLock<Vec<String>>,
    config: ControlConfig,
    events: broadcast::Sender<DeviceEvent>,
    power: Arc<PowerStateTracker>,
    picture: Arc<PictureSettingsTracker>,
    connection: ConnectionManager,
    wake: Arc<WakeCoordinator>,
    registry: Arc<ActionRegistry>,
    interpreter: PresetStepInterpreter,
    power_off_task: Mutex<Option<(u64, JoinHandle<()>)>>,
    next_timer: AtomicU64,
}

impl Drop for DeviceInner {
    fn drop(&mut self) {
        if let Some((_, task)) = self.power_off_task.lock().take() {
            task.abort();
        }
    }
}

impl TvDevice {
    /// Build a device and its components; nothing is connected yet
    pub fn new(
        device: Device,
        factory: Arc<dyn TransportFactory>,
        wake_sender: Arc<dyn WakeSender>,
        config: ControlConfig,
    ) -> Self {
        let name = device.name.clone();
        let (events, _) = broadcast::channel(100);

        let power = Arc::new(PowerStateTracker::new(&name, config.timing.attribution_window()));
        let picture = Arc::new(PictureSettingsTracker::new(&name, events.clone()));

        let connection = ConnectionManager::new(
            ConnectionTarget {
                device: name.clone(),
                address: device.ip_address.clone(),
                connectable: !device.is_dummy,
                connect_timeout: config.timing.connect_timeout(),
            },
            factory,
            NotificationSink {
                power: power.clone(),
                picture: picture.clone(),
            },
            events.clone(),
        );

        let mut wake = WakeCoordinator::new(
            &name,
            device.mac_address.clone(),
            connection.clone(),
            wake_sender,
            config.timing.clone(),
        );
        if let Some(script) = &config.resume_script {
            wake = wake.with_recovery_hook(Arc::new(ScriptRecoveryHook::new(script.clone())));
        }
        let wake = Arc::new(wake);

        let registry = Arc::new(ActionRegistry::with_defaults(&connection, &wake));
        let interpreter =
            PresetStepInterpreter::new(&name, connection.clone(), wake.clone(), registry.clone(), &config);

        Self {
            inner: Arc::new(DeviceInner {
                device: RwLock::new(device),
                options: RwLock::new(DeviceOptions::default()),
                game_bar: RwLock::new(default_game_bar()),
                config,
                events,
                power,
                picture,
                connection,
                wake,
                registry,
                interpreter,
                power_off_task: Mutex::new(None),
                next_timer: AtomicU64::new(0),
            }),
        }
    }

    /// Snapshot of the device record
    pub fn device(&self) -> Device {
        self.inner.device.read().clone()
    }

    pub fn name(&self) -> String {
        self.inner.device.read().name.clone()
    }

    pub fn mac_address(&self) -> Option<String> {
        self.inner.device.read().mac_address.clone()
    }

    /// Mark the device as user-managed
    pub fn convert_to_custom(&self) {
        self.inner.device.write().convert_to_custom();
    }

    pub fn options(&self) -> DeviceOptions {
        self.inner.options.read().clone()
    }

    pub fn set_options(&self, options: DeviceOptions) {
        *self.inner.options.write() = options;
    }

    /// Subscribe to connection and picture events
    pub fn subscribe_events(&self) -> EventReceiver {
        EventReceiver::new(self.inner.events.subscribe())
    }

    pub fn set_external_service_handler(&self, handler: Option<Arc<dyn ExternalServiceHandler>>) {
        self.inner.interpreter.set_external_service_handler(handler);
    }

    pub fn is_connected(&self) -> bool {
        self.inner.connection.is_connected()
    }

    /// Model name reported when the session was opened
    pub fn model_name(&self) -> Option<String> {
        self.inner.connection.model_name()
    }

    /// Connect unless a live session exists
    pub async fn connect(&self) -> bool {
        self.inner.connection.connect(self.inner.config.timing.connect_retries).await
    }

    /// Rebuild the session
    pub async fn reconnect(&self) -> bool {
        self.inner.connection.reconnect(self.inner.config.timing.connect_retries).await
    }

    pub async fn disconnect(&self) {
        self.inner.connection.disconnect().await;
    }

    pub fn power_state(&self) -> PowerState {
        self.inner.power.power_state()
    }

    pub fn powered_off_by(&self) -> PowerOffSource {
        self.inner.power.powered_off_by()
    }

    pub fn picture_settings(&self) -> PictureSettings {
        self.inner.picture.settings()
    }

    pub fn is_using_hdr_picture_mode(&self) -> bool {
        self.picture_settings().is_using_hdr_picture_mode()
    }

    /// Execute a preset on this device
    pub async fn execute_preset(&self, preset: &Preset) -> bool {
        self.inner.interpreter.execute(preset, false).await
    }

    /// Send a magic packet
    pub async fn wake(&self) -> bool {
        self.inner.wake.wake().await
    }

    /// Wake and connect once, using the configured delays
    pub async fn wake_and_connect(&self) -> bool {
        let timing = &self.inner.config.timing;
        self.inner
            .wake
            .wake_and_connect(timing.wake_delay(), timing.connect_delay())
            .await
    }

    /// Wake and connect, retrying within the per-attempt budget
    pub async fn wake_and_connect_with_retries(&self, retries: u32) -> bool {
        self.inner.wake.wake_and_connect_with_retries(retries).await
    }

    /// Turn the TV off, remembering that this library did it
    ///
    /// Only an active TV is turned off; the session is rebuilt first so a
    /// stale connection does not swallow the command.
    pub async fn power_off(&self) -> bool {
        let inner = &self.inner;
        if !inner
            .connection
            .ensure_connected(true, inner.config.timing.connect_retries)
            .await
        {
            return false;
        }
        if inner.power.power_state() != PowerState::Active {
            tracing::debug!(
                "[{}] Not powering off, state is {:?}",
                self.name(),
                inner.power.power_state()
            );
            return false;
        }

        inner.power.mark_powered_off_by_app();
        self.log_failure("power off", inner.connection.send_command(Request::turn_off(), false).await)
    }

    /// Press the power button over a live session
    pub async fn power_on(&self) -> bool {
        let inner = &self.inner;
        if !inner
            .connection
            .ensure_connected(false, inner.config.timing.connect_retries)
            .await
        {
            return false;
        }
        self.log_failure("power on", inner.connection.send_key("POWER").await)
    }

    /// Rebuild the session and check that the TV answers
    pub async fn test_connection(&self, retries: u32) -> bool {
        let inner = &self.inner;
        if !inner.connection.ensure_connected(true, retries).await {
            return false;
        }
        self.log_failure(
            "test connection",
            inner.connection.send_command(Request::audio_status(), true).await,
        )
    }

    /// All actions of the device
    pub fn actions(&self) -> &[Arc<InvokableAction>] {
        self.inner.registry.actions()
    }

    /// Invoke an action by name with step-style parameters
    pub async fn invoke_action(&self, name: &str, parameters: &[String]) -> bool {
        let result = self.inner.registry.invoke_by_name(name, parameters).await;
        self.log_failure(name, result)
    }

    /// Write a picture setting
    ///
    /// Registered settings go through their action so value sets are resolved
    /// and the mirror is updated.
    pub async fn set_system_setting(&self, name: &str, value: &str) -> bool {
        let inner = &self.inner;
        let result = if inner.registry.resolve(name).is_some() {
            inner.registry.invoke_by_name(name, &[value.to_string()]).await
        } else {
            let request = Request::set_system_setting("picture", name, SettingValue::Single(value.to_string()));
            inner.connection.send_command(request, false).await.map(|_| ())
        };
        self.log_failure(name, result)
    }

    /// Actions offered for the game bar
    pub fn game_bar_candidates(&self) -> Vec<Arc<InvokableAction>> {
        self.inner.registry.game_bar_candidates()
    }

    /// Action names currently on the game bar
    pub fn game_bar_actions(&self) -> Vec<String> {
        self.inner.game_bar.read().clone()
    }

    /// Replace the game bar; an empty list restores the default
    pub fn set_game_bar_actions(&self, names: Vec<String>) {
        *self.inner.game_bar.write() = if names.is_empty() {
            default_game_bar()
        } else {
            names
        };
    }

    /// Actions currently on the game bar, in registry order
    pub fn actions_for_game_bar(&self) -> Vec<Arc<InvokableAction>> {
        let names = self.inner.game_bar.read().clone();
        self.inner.registry.select(&names)
    }

    pub fn add_game_bar_action(&self, name: &str) {
        let mut game_bar = self.inner.game_bar.write();
        if !game_bar.iter().any(|n| n == name) {
            game_bar.push(name.to_string());
        }
    }

    pub fn remove_game_bar_action(&self, name: &str) {
        self.inner.game_bar.write().retain(|n| n != name);
    }

    /// Run the screensaver action after `delay`, replacing any pending timer
    pub fn power_off_in(&self, delay: Duration) {
        let id = self.inner.next_timer.fetch_add(1, Ordering::SeqCst);
        let weak: Weak<DeviceInner> = Arc::downgrade(&self.inner);

        let mut slot = self.inner.power_off_task.lock();
        if let Some((_, previous)) = slot.take() {
            previous.abort();
        }

        tracing::debug!("[{}] Screensaver action in {:?}", self.name(), delay);
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            {
                let mut slot = inner.power_off_task.lock();
                if slot.as_ref().is_some_and(|(current, _)| *current == id) {
                    slot.take();
                }
            }
            TvDevice { inner }.perform_action_on_screen_saver().await;
        });
        *slot = Some((id, task));
    }

    /// Cancel a pending [`Self::power_off_in`] timer
    pub fn clear_power_off_task(&self) {
        if let Some((_, task)) = self.inner.power_off_task.lock().take() {
            task.abort();
        }
    }

    /// Whether a screensaver timer is pending
    pub fn has_power_off_task(&self) -> bool {
        self.inner.power_off_task.lock().is_some()
    }

    /// Turn the screen or the whole TV off, depending on the options
    pub async fn perform_action_on_screen_saver(&self) -> bool {
        let screen_only = self.inner.options.read().turn_screen_off_on_screen_saver;
        if screen_only {
            tracing::debug!("[{}] Turning screen off on screen saver", self.name());
            return self.invoke_action("turnScreenOff", &[]).await;
        }

        tracing::debug!("[{}] Powering off due to screensaver", self.name());
        self.power_off().await
    }

    /// Undo [`Self::perform_action_on_screen_saver`]
    ///
    /// When only the screen was turned off and the session survived, the
    /// screen is turned back on (if configured). Otherwise the TV is woken.
    pub async fn perform_action_after_screen_saver(&self, power_on_retries: u32) -> bool {
        let options = self.options();
        if options.turn_screen_off_on_screen_saver && self.is_connected() {
            if options.turn_screen_on_after_screen_saver {
                tracing::debug!("[{}] Turning screen on after screen saver", self.name());
                self.invoke_action("turnScreenOn", &[]).await;
            }
            return true;
        }

        self.wake_and_connect_with_retries(power_on_retries).await
    }

    fn log_failure<T>(&self, operation: &str, result: Result<T>) -> bool {
        match result {
            Ok(_) => true,
            Err(e) => {
                tracing::error!("[{}] {} failed: {}", self.name(), operation, e);
                false
            }
        }
    }
}

fn default_game_bar() -> Vec<String> {
    DEFAULT_GAME_BAR_ACTIONS.iter().map(|s| s.to_string()).collect()
}
