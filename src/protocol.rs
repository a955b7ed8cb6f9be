use crate::error::{ControlError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

/// Command sent to the TV through [`crate::TransportClient::send_command`]
///
/// Framing (and pairing) is left to the transport; the core only decides
/// which URI gets which payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: RequestKind,
    pub uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

/// Request kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    Request,
    Subscribe,
}

pub mod uri {
    pub const TURN_OFF: &str = "ssap://system/turnOff";
    pub const TURN_SCREEN_OFF: &str = "ssap://com.webos.service.tvpower/power/turnOffScreen";
    pub const TURN_SCREEN_ON: &str = "ssap://com.webos.service.tvpower/power/turnOnScreen";
    pub const POWER_STATE: &str = "ssap://com.webos.service.tvpower/power/getPowerState";
    pub const GET_SYSTEM_SETTINGS: &str = "ssap://settings/getSystemSettings";
    pub const SET_SYSTEM_SETTINGS: &str = "ssap://settings/setSystemSettings";
    pub const SET_DEVICE_INFO: &str = "ssap://com.webos.service.eim/setDeviceInfo";
    pub const AUDIO_STATUS: &str = "ssap://audio/getStatus";
}

/// Apps with well-known launch parameters
pub mod app {
    pub const SOFTWARE_UPDATE: &str = "com.webos.app.softwareupdate";
    pub const FACTORY_WIN: &str = "com.webos.app.factorywin";
}

/// Picture keys the settings subscription reports on
pub const PICTURE_KEYS: [&str; 4] = ["backlight", "brightness", "contrast", "color"];

impl Request {
    /// Create a new request for the given URI
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: RequestKind::Request,
            uri: uri.into(),
            payload: None,
        }
    }

    /// Set the request payload
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Mark the request as a subscription
    pub fn subscribe(mut self) -> Self {
        self.kind = RequestKind::Subscribe;
        self
    }

    pub fn turn_off() -> Self {
        Self::new(uri::TURN_OFF)
    }

    pub fn turn_screen_off() -> Self {
        Self::new(uri::TURN_SCREEN_OFF)
    }

    pub fn turn_screen_on() -> Self {
        Self::new(uri::TURN_SCREEN_ON)
    }

    pub fn audio_status() -> Self {
        Self::new(uri::AUDIO_STATUS)
    }

    /// Change a single system setting, e.g. `("picture", "contrast", "55")`
    pub fn set_system_setting(category: &str, name: &str, value: SettingValue) -> Self {
        let mut settings = serde_json::Map::new();
        settings.insert(name.to_string(), value.into_json());
        Self::new(uri::SET_SYSTEM_SETTINGS).with_payload(json!({
            "category": category,
            "settings": settings,
        }))
    }

    /// Change the icon and label shown for an input
    pub fn set_device_config(id: &str, icon: &str, label: &str) -> Self {
        Self::new(uri::SET_DEVICE_INFO).with_payload(json!({
            "id": id,
            "icon": format!("{}.png", icon),
            "label": label,
        }))
    }
}

/// Value written by a setting request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingValue {
    Single(String),
    /// Per-step curves such as `adjustingLuminance`
    List(Vec<i64>),
}

impl SettingValue {
    fn into_json(self) -> Value {
        match self {
            Self::Single(value) => Value::String(value),
            Self::List(values) => json!(values),
        }
    }
}

/// Notification streams a session subscribes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubscriptionKind {
    PowerState,
    PictureSettings,
}

impl SubscriptionKind {
    /// Subscription request understood by the TV
    pub fn request(self) -> Request {
        match self {
            Self::PowerState => Request::new(uri::POWER_STATE).subscribe(),
            Self::PictureSettings => Request::new(uri::GET_SYSTEM_SETTINGS)
                .with_payload(json!({ "category": "picture", "keys": PICTURE_KEYS }))
                .subscribe(),
        }
    }
}

/// Parsed notification pushed by the TV
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    PowerState(PowerStatePayload),
    PictureSettings(PictureSettingsPayload),
    /// Transport lost its connection
    Disconnected {
        /// The core closed the session itself
        closed_by_dispose: bool,
    },
}

/// Payload of a power-state notification
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PowerStatePayload {
    pub state: String,
    /// Present while the TV is transitioning (e.g. `"Request Power Off"`)
    #[serde(default)]
    pub processing: Option<String>,
}

/// Payload of a picture-settings notification; absent or unparsable values are `None`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PictureSettingsPayload {
    pub backlight: Option<i64>,
    pub contrast: Option<i64>,
    pub brightness: Option<i64>,
    pub color: Option<i64>,
}

impl Notification {
    /// Parse a raw subscription payload
    ///
    /// Transports call this as soon as a message arrives, so nothing past the
    /// transport boundary handles untyped JSON.
    pub fn parse(kind: SubscriptionKind, payload: &Value) -> Result<Self> {
        match kind {
            SubscriptionKind::PowerState => {
                let payload: PowerStatePayload = serde_json::from_value(payload.clone())?;
                Ok(Self::PowerState(payload))
            }
            SubscriptionKind::PictureSettings => {
                let settings = payload
                    .get("settings")
                    .and_then(Value::as_object)
                    .ok_or_else(|| {
                        ControlError::InvalidResponse("No settings in picture notification".to_string())
                    })?;
                let field = |key: &str| settings.get(key).and_then(lenient_int);
                Ok(Self::PictureSettings(PictureSettingsPayload {
                    backlight: field("backlight"),
                    contrast: field("contrast"),
                    brightness: field("brightness"),
                    color: field("color"),
                }))
            }
        }
    }
}

/// TVs report numbers either as JSON numbers or as numeric strings
fn lenient_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn power_notification_keeps_processing_flag() {
        let n = Notification::parse(
            SubscriptionKind::PowerState,
            &json!({"state": "Active", "processing": "Screen On", "returnValue": true}),
        )
        .unwrap();
        assert_eq!(
            n,
            Notification::PowerState(PowerStatePayload {
                state: "Active".to_string(),
                processing: Some("Screen On".to_string()),
            })
        );
    }

    #[test]
    fn power_notification_without_state_is_rejected() {
        let result = Notification::parse(SubscriptionKind::PowerState, &json!({"returnValue": true}));
        assert!(matches!(result, Err(ControlError::Json(_))));
    }

    #[test]
    fn picture_notification_accepts_strings_and_numbers() {
        let n = Notification::parse(
            SubscriptionKind::PictureSettings,
            &json!({"settings": {"backlight": "80", "contrast": 85, "color": "vivid"}}),
        )
        .unwrap();
        assert_eq!(
            n,
            Notification::PictureSettings(PictureSettingsPayload {
                backlight: Some(80),
                contrast: Some(85),
                brightness: None,
                color: None,
            })
        );
    }

    #[test]
    fn picture_notification_needs_settings_object() {
        let result = Notification::parse(SubscriptionKind::PictureSettings, &json!({"x": 1}));
        assert!(matches!(result, Err(ControlError::InvalidResponse(_))));
    }

    #[test]
    fn setting_request_payload_shapes() {
        let single = Request::set_system_setting("picture", "contrast", SettingValue::Single("55".into()));
        assert_eq!(single.uri, uri::SET_SYSTEM_SETTINGS);
        assert_eq!(
            single.payload,
            Some(json!({"category": "picture", "settings": {"contrast": "55"}}))
        );

        let list = Request::set_system_setting(
            "picture",
            "adjustingLuminance",
            SettingValue::List(vec![0, -5, 10]),
        );
        assert_eq!(
            list.payload,
            Some(json!({"category": "picture", "settings": {"adjustingLuminance": [0, -5, 10]}}))
        );
    }

    #[test]
    fn request_serializes_kind_as_type() {
        let request = SubscriptionKind::PowerState.request();
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["type"], "subscribe");
        assert_eq!(value["uri"], uri::POWER_STATE);
        assert!(value.get("payload").is_none());
    }
}
