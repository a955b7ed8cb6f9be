use crate::config::ControlConfig;
use crate::device::TvDevice;
use crate::interpreter::ExternalServiceHandler;
use crate::transport::TransportFactory;
use crate::types::{Device, DeviceAffinity, Preset};
use crate::wol::{MacAddress, UdpWakeSender, WakeSender};
use parking_lot::RwLock;
use std::sync::Arc;

/// Known TVs and the current selection
///
/// Custom devices are kept across discovery runs; auto-detected ones are
/// replaced by each run, except that a TV found again keeps its handle (and
/// with it any live session).
pub struct DeviceManager {
    config: ControlConfig,
    factory: Arc<dyn TransportFactory>,
    wake_sender: Arc<dyn WakeSender>,
    devices: RwLock<Vec<TvDevice>>,
    selected: RwLock<Option<TvDevice>>,
    handler: RwLock<Option<Arc<dyn ExternalServiceHandler>>>,
}

impl DeviceManager {
    /// Manager sending magic packets to the configured broadcast address
    pub fn new(config: ControlConfig, factory: Arc<dyn TransportFactory>) -> Self {
        let sender = Arc::new(UdpWakeSender::new(config.wake_broadcast_address.clone()));
        Self::with_wake_sender(config, factory, sender)
    }

    pub fn with_wake_sender(
        config: ControlConfig,
        factory: Arc<dyn TransportFactory>,
        wake_sender: Arc<dyn WakeSender>,
    ) -> Self {
        Self {
            config,
            factory,
            wake_sender,
            devices: RwLock::new(Vec::new()),
            selected: RwLock::new(None),
            handler: RwLock::new(None),
        }
    }

    /// All devices, custom and auto-detected
    pub fn devices(&self) -> Vec<TvDevice> {
        self.devices.read().clone()
    }

    /// Find a device by name
    pub fn device(&self, name: &str) -> Option<TvDevice> {
        self.devices.read().iter().find(|d| d.name() == name).cloned()
    }

    fn create(&self, device: Device) -> TvDevice {
        let tv = TvDevice::new(
            device,
            self.factory.clone(),
            self.wake_sender.clone(),
            self.config.clone(),
        );
        tv.set_external_service_handler(self.handler.read().clone());
        tv
    }

    /// Add a user-defined device; a device with the same name is returned as is
    pub fn add_custom(&self, name: &str, ip_address: &str, mac_address: Option<String>) -> TvDevice {
        if let Some(existing) = self.device(name) {
            tracing::debug!("Device {} already exists", name);
            return existing;
        }

        let tv = self.create(Device::new(name, ip_address, mac_address));
        tracing::info!("Added custom device {}", tv.device());
        self.devices.write().push(tv.clone());
        tv
    }

    /// Replace the auto-detected devices with the result of a discovery run
    pub fn merge_discovered(&self, found: Vec<Device>) {
        let mut devices = self.devices.write();

        let mut merged: Vec<TvDevice> = devices.iter().filter(|d| d.device().is_custom).cloned().collect();
        for device in found {
            let already_custom = merged.iter().any(|d| same_device(&d.device(), &device));
            if already_custom {
                continue;
            }

            let kept = devices
                .iter()
                .find(|d| !d.device().is_custom && same_device(&d.device(), &device))
                .cloned();
            merged.push(match kept {
                Some(tv) => tv,
                None => {
                    tracing::info!("Discovered {}", device);
                    self.create(Device {
                        is_custom: false,
                        ..device
                    })
                }
            });
        }

        *devices = merged;
        drop(devices);

        let mut selected = self.selected.write();
        if let Some(current) = selected.as_ref() {
            if self.device(&current.name()).is_none() {
                *selected = None;
            }
        }
    }

    /// Remove a device and close its session
    pub async fn remove(&self, name: &str) -> bool {
        let removed = {
            let mut devices = self.devices.write();
            let index = devices.iter().position(|d| d.name() == name);
            index.map(|i| devices.remove(i))
        };
        let Some(tv) = removed else {
            return false;
        };

        {
            let mut selected = self.selected.write();
            if selected.as_ref().is_some_and(|s| s.name() == name) {
                *selected = None;
            }
        }

        tv.clear_power_off_task();
        tv.disconnect().await;
        tracing::info!("Removed device {}", name);
        true
    }

    /// Mark an auto-detected device as user-managed
    pub fn convert_to_custom(&self, name: &str) -> bool {
        match self.device(name) {
            Some(tv) => {
                tv.convert_to_custom();
                true
            }
            None => false,
        }
    }

    /// Select the device that presets without affinity run on
    pub fn select(&self, name: Option<&str>) -> bool {
        let device = match name {
            Some(name) => match self.device(name) {
                Some(device) => Some(device),
                None => return false,
            },
            None => None,
        };
        *self.selected.write() = device;
        true
    }

    pub fn selected(&self) -> Option<TvDevice> {
        self.selected.read().clone()
    }

    /// Device a preset runs on
    pub fn device_for_preset(&self, preset: &Preset) -> Option<TvDevice> {
        match &preset.device {
            DeviceAffinity::GloballySelected => self.selected(),
            DeviceAffinity::MacAddress(mac) => self
                .devices
                .read()
                .iter()
                .find(|d| d.mac_address().is_some_and(|m| same_mac(&m, mac)))
                .cloned(),
        }
    }

    /// Execute a preset on the device it targets
    pub async fn execute_preset(&self, preset: &Preset) -> bool {
        match self.device_for_preset(preset) {
            Some(tv) => tv.execute_preset(preset).await,
            None => {
                tracing::error!("No device for preset {}", preset.name);
                false
            }
        }
    }

    /// Hook for steps such as `NvPreset(name)`; applies to every device
    pub fn set_external_service_handler(&self, handler: Option<Arc<dyn ExternalServiceHandler>>) {
        for tv in self.devices.read().iter() {
            tv.set_external_service_handler(handler.clone());
        }
        *self.handler.write() = handler;
    }
}

fn same_mac(a: &str, b: &str) -> bool {
    match (a.parse::<MacAddress>(), b.parse::<MacAddress>()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a.eq_ignore_ascii_case(b),
    }
}

fn same_device(a: &Device, b: &Device) -> bool {
    match (&a.mac_address, &b.mac_address) {
        (Some(x), Some(y)) => same_mac(x, y),
        _ => a.name == b.name && a.ip_address == b.ip_address,
    }
}
