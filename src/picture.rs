use crate::protocol::PictureSettingsPayload;
use crate::subscription::DeviceEvent;
use crate::types::PictureSettings;
use parking_lot::Mutex;
use tokio::sync::broadcast;

/// Mirrors the picture values the TV reports through its settings subscription
#[derive(Debug)]
pub struct PictureSettingsTracker {
    device: String,
    settings: Mutex<PictureSettings>,
    events: broadcast::Sender<DeviceEvent>,
}

impl PictureSettingsTracker {
    pub fn new(device: impl Into<String>, events: broadcast::Sender<DeviceEvent>) -> Self {
        Self {
            device: device.into(),
            settings: Mutex::new(PictureSettings::default()),
            events,
        }
    }

    /// Current mirrored values
    pub fn settings(&self) -> PictureSettings {
        *self.settings.lock()
    }

    /// Merge a notification; fields it does not carry keep their value
    pub fn apply(&self, payload: &PictureSettingsPayload) {
        {
            let mut settings = self.settings.lock();
            if let Some(v) = payload.backlight {
                settings.backlight = v;
            }
            if let Some(v) = payload.contrast {
                settings.contrast = v;
            }
            if let Some(v) = payload.brightness {
                settings.brightness = v;
            }
            if let Some(v) = payload.color {
                settings.color = v;
            }
            tracing::debug!("[{}] Picture settings changed: {:?}", self.device, *settings);
        }

        let _ = self.events.send(DeviceEvent::PictureSettingsChanged {
            device: self.device.clone(),
        });
    }
}
