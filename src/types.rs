use crate::interpreter::StepToken;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Device identifier (display name)
pub type DeviceName = String;

/// App identifier as understood by the TV (e.g. `netflix`)
pub type AppId = String;

/// Actions shown on the game bar when a device has no explicit selection
pub const DEFAULT_GAME_BAR_ACTIONS: [&str; 4] = ["backlight", "contrast", "brightness", "color"];

/// Network-attached TV
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub name: DeviceName,

    /// IP address or host name
    pub ip_address: String,

    /// Hardware address, required for Wake-on-LAN
    #[serde(default)]
    pub mac_address: Option<String>,

    /// Added by the user rather than auto-detected
    #[serde(default = "default_true")]
    pub is_custom: bool,

    /// Placeholder entry that never connects
    #[serde(skip)]
    pub is_dummy: bool,
}

fn default_true() -> bool {
    true
}

impl Device {
    /// Create a user-added device
    pub fn new(
        name: impl Into<String>,
        ip_address: impl Into<String>,
        mac_address: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            ip_address: ip_address.into(),
            mac_address,
            is_custom: true,
            is_dummy: false,
        }
    }

    /// Create an auto-detected device
    pub fn discovered(
        name: impl Into<String>,
        ip_address: impl Into<String>,
        mac_address: Option<String>,
    ) -> Self {
        Self {
            is_custom: false,
            ..Self::new(name, ip_address, mac_address)
        }
    }

    /// Create a placeholder device
    pub fn dummy(name: impl Into<String>) -> Self {
        Self {
            is_dummy: true,
            ..Self::new(name, String::new(), None)
        }
    }

    /// Mark an auto-detected device as user-managed. There is no way back.
    pub fn convert_to_custom(&mut self) {
        self.is_custom = true;
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = if self.is_dummy {
            ""
        } else if self.is_custom {
            "Custom: "
        } else {
            "Auto detect: "
        };
        write!(f, "{}{}", prefix, self.name)?;
        if !self.ip_address.is_empty() {
            write!(f, ", {}", self.ip_address)?;
        }
        Ok(())
    }
}

/// Power state as reported by the TV
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PowerState {
    #[default]
    Unknown,
    Active,
    PoweredOff,
    Suspend,
    ActiveStandby,
    ScreenOff,
}

impl PowerState {
    /// Parse a vendor power-state string such as `"Active Standby"`
    ///
    /// Spaces and underscores are interchangeable and matching ignores case.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().replace(' ', "_").to_ascii_lowercase();
        match normalized.as_str() {
            "active" => Some(Self::Active),
            "power_off" => Some(Self::PoweredOff),
            "suspend" => Some(Self::Suspend),
            "active_standby" => Some(Self::ActiveStandby),
            "screen_off" => Some(Self::ScreenOff),
            _ => None,
        }
    }
}

/// Who caused the most recent power-off
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PowerOffSource {
    #[default]
    Unknown,
    App,
    External,
}

/// Picture values mirrored from the TV's settings subscription
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PictureSettings {
    pub backlight: i64,
    pub contrast: i64,
    pub brightness: i64,
    pub color: i64,
}

impl PictureSettings {
    /// Best guess whether an HDR picture mode is active.
    ///
    /// The picture mode itself cannot be read back, but HDR modes pin
    /// backlight and contrast at their maximum.
    pub fn is_using_hdr_picture_mode(&self) -> bool {
        self.backlight == 100 && self.contrast == 100
    }
}

/// Which device a preset runs against
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceAffinity {
    /// Whatever device is currently selected
    #[default]
    GloballySelected,
    /// The device with this hardware address
    MacAddress(String),
}

/// Host event that may start a preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerType {
    None,
    Startup,
    Resume,
    Shutdown,
    Standby,
    ScreensaverStart,
    ScreensaverStop,
    ProcessSwitch,
}

/// Automation trigger attached to a preset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresetTrigger {
    pub trigger: TriggerType,

    /// Host-defined condition flags (e.g. HDR active, game bar open)
    #[serde(default)]
    pub conditions: u32,

    /// Process names that must be running
    #[serde(default)]
    pub included_processes: Vec<String>,

    /// Process names that must not be running
    #[serde(default)]
    pub excluded_processes: Vec<String>,
}

impl PresetTrigger {
    /// Check the trigger against an event, the host's active condition flags
    /// and the names of running processes
    pub fn matches(&self, event: TriggerType, active_conditions: u32, processes: &[String]) -> bool {
        if self.trigger != event || self.trigger == TriggerType::None {
            return false;
        }
        if self.conditions & active_conditions != self.conditions {
            return false;
        }
        let running = |name: &String| processes.iter().any(|p| p.eq_ignore_ascii_case(name));
        if !self.included_processes.is_empty() && !self.included_processes.iter().any(running) {
            return false;
        }
        !self.excluded_processes.iter().any(running)
    }
}

/// User-defined sequence of remote-control steps
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub name: String,

    /// Step tokens, see [`crate::StepToken`]
    #[serde(default)]
    pub steps: Vec<String>,

    /// App launched before the steps run
    #[serde(default)]
    pub app_id: Option<AppId>,

    /// Launch parameters passed with the app
    #[serde(default)]
    pub app_params: Option<serde_json::Value>,

    #[serde(default)]
    pub device: DeviceAffinity,

    #[serde(default)]
    pub triggers: Vec<PresetTrigger>,
}

impl Preset {
    /// Create a preset from already tokenized steps
    pub fn new<S: Into<String>>(name: impl Into<String>, steps: impl IntoIterator<Item = S>) -> Self {
        Self {
            name: name.into(),
            steps: steps.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Set the app to launch
    pub fn with_app(mut self, app_id: impl Into<String>, params: Option<serde_json::Value>) -> Self {
        self.app_id = Some(app_id.into());
        self.app_params = params;
        self
    }

    /// Bind the preset to a device
    pub fn with_device(mut self, device: DeviceAffinity) -> Self {
        self.device = device;
        self
    }

    /// Whether the preset launches an app
    pub fn has_app(&self) -> bool {
        self.app_id.as_deref().is_some_and(|id| !id.is_empty())
    }

    /// Whether any step is the `WOL` pseudo-step, with or without a delay
    pub fn has_wake_step(&self) -> bool {
        self.steps.iter().any(|s| StepToken::parse(s).is_wake())
    }

    /// Whether any trigger fires for the given host state
    pub fn is_triggered(&self, event: TriggerType, active_conditions: u32, processes: &[String]) -> bool {
        self.triggers
            .iter()
            .any(|t| t.matches(event, active_conditions, processes))
    }
}

/// Split step source text into tokens
///
/// Tokens are separated by commas or whitespace. Separators inside
/// parentheses belong to the token, so `StartProgram(C:\My Games\run.exe)`
/// stays whole.
pub fn parse_steps(text: &str) -> Vec<String> {
    let mut steps = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;

    for c in text.chars() {
        match c {
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' | ' ' | '\t' | '\r' | '\n' if depth == 0 => {
                if !current.is_empty() {
                    steps.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        steps.push(current);
    }

    steps
}

/// Per-device power automation options
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceOptions {
    #[serde(default)]
    pub power_on_after_startup: bool,
    #[serde(default)]
    pub power_on_after_resume: bool,
    #[serde(default)]
    pub power_off_on_shutdown: bool,
    #[serde(default)]
    pub power_off_on_standby: bool,
    #[serde(default)]
    pub power_off_on_screen_saver: bool,
    #[serde(default)]
    pub power_on_after_screen_saver: bool,
    /// Turn only the panel off instead of powering down on screensaver start
    #[serde(default)]
    pub turn_screen_off_on_screen_saver: bool,
    #[serde(default)]
    pub turn_screen_on_after_screen_saver: bool,
    /// Seconds the screensaver must run before the TV is powered off
    #[serde(default)]
    pub screen_saver_minimal_duration: u64,
    #[serde(default)]
    pub triggers_enabled: bool,
}
