//! Per-device table of invokable actions
//!
//! Step names such as `contrast` or `pictureMode` resolve here to a callable
//! with typed parameter semantics: no value, a closed value set, or a
//! numeric range.

use crate::connection::ConnectionManager;
use crate::error::{ControlError, Result};
use crate::protocol::{app, Request, SettingValue, PICTURE_KEYS};
use crate::settings::{
    SettingEnum, COLOR_GAMUT, DYNAMIC_TONE_MAPPING, ENERGY_SAVING, FALSE_TO_TRUE, GAMMA, HDMI_ICON,
    OFF_TO_AUTO, OFF_TO_HIGH, OFF_TO_ON, PICTURE_MODE,
};
use crate::types::Preset;
use crate::wake::WakeCoordinator;
use futures_util::future::{BoxFuture, FutureExt};
use parking_lot::Mutex;
use serde_json::json;
use std::fmt;
use std::sync::Arc;

/// Grouping used by UIs and by the game bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Picture,
    Other,
    Power,
    Preset,
}

impl Category {
    /// Settings category understood by the TV
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Picture => "picture",
            Self::Other => "other",
            Self::Power => "power",
            Self::Preset => "preset",
        }
    }
}

/// Values an action accepts
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValueSpec {
    /// No parameter
    None,
    /// One member of a closed set
    Enum(&'static SettingEnum),
    /// Integers in `min..=max`; `number_of_values` > 1 for per-step curves
    Range {
        min: i64,
        max: i64,
        number_of_values: usize,
    },
}

/// Parameter handed to an action callable
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionValue {
    None,
    /// Already resolved to the protocol symbol for closed sets
    Single(String),
    /// Passed verbatim; the callable converts each element
    Multiple(Vec<String>),
}

/// Everything a callable learns about one invocation
#[derive(Debug, Clone)]
pub struct ActionCall {
    pub name: String,
    pub category: Category,
    pub value: ActionValue,
}

/// Callable behind an action
pub type ActionFn = Arc<dyn Fn(ActionCall) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// What running an action does
#[derive(Clone)]
pub enum ActionHandler {
    Call(ActionFn),
    /// Runs an internal preset (service menus and the like)
    Preset(Preset),
}

impl fmt::Debug for ActionHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Call(_) => f.write_str("Call(..)"),
            Self::Preset(preset) => f.debug_tuple("Preset").field(&preset.name).finish(),
        }
    }
}

/// Named action a step can invoke
#[derive(Debug)]
pub struct InvokableAction {
    name: String,
    title: String,
    category: Category,
    spec: ValueSpec,
    handler: ActionHandler,
    current_value: Mutex<Option<i64>>,
}

impl InvokableAction {
    pub fn new(name: impl Into<String>, handler: ActionHandler) -> Self {
        let name = name.into();
        Self {
            title: first_char_upper(&name),
            name,
            category: Category::Power,
            spec: ValueSpec::None,
            handler,
            current_value: Mutex::new(None),
        }
    }

    /// Action backed by a callable
    pub fn call<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(ActionCall) -> BoxFuture<'static, Result<()>> + Send + Sync + 'static,
    {
        Self::new(name, ActionHandler::Call(Arc::new(f)))
    }

    /// Action that runs a nested preset
    pub fn preset(preset: Preset) -> Self {
        let mut action = Self::new(preset.name.clone(), ActionHandler::Preset(preset));
        action.category = Category::Preset;
        action
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_enum(mut self, values: &'static SettingEnum) -> Self {
        self.spec = ValueSpec::Enum(values);
        self
    }

    pub fn with_range(mut self, min: i64, max: i64) -> Self {
        self.spec = ValueSpec::Range {
            min,
            max,
            number_of_values: 1,
        };
        self
    }

    /// Range action taking a list of values, e.g. a luminance curve
    pub fn with_curve(mut self, min: i64, max: i64, number_of_values: usize) -> Self {
        self.spec = ValueSpec::Range {
            min,
            max,
            number_of_values,
        };
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn spec(&self) -> ValueSpec {
        self.spec
    }

    /// Last value applied through this action, if it is mirrored
    pub fn current_value(&self) -> Option<i64> {
        *self.current_value.lock()
    }

    /// The preset this action runs, if it is a preset action
    pub fn nested_preset(&self) -> Option<&Preset> {
        match &self.handler {
            ActionHandler::Preset(preset) => Some(preset),
            ActionHandler::Call(_) => None,
        }
    }

    /// Turn step parameters into the value handed to the callable
    fn prepare(&self, parameters: &[String]) -> Result<(ActionValue, Option<i64>)> {
        match (parameters, self.spec) {
            ([], _) => Ok((ActionValue::None, None)),
            ([single], ValueSpec::Enum(table)) => {
                let resolved = table.resolve(single).ok_or_else(|| {
                    ControlError::invalid_parameter(
                        &self.name,
                        format!("'{}' is not a {} value", single, table.name),
                    )
                })?;
                Ok((
                    ActionValue::Single(resolved.symbol.to_string()),
                    Some(resolved.value as i64),
                ))
            }
            ([single], ValueSpec::Range { min, max, .. }) => {
                let value: i64 = single.trim().parse().map_err(|_| {
                    ControlError::invalid_parameter(&self.name, format!("'{}' is not a number", single))
                })?;
                if max > min && !(min..=max).contains(&value) {
                    return Err(ControlError::invalid_parameter(
                        &self.name,
                        format!("{} is outside {}..={}", value, min, max),
                    ));
                }
                Ok((ActionValue::Single(single.trim().to_string()), Some(value)))
            }
            ([single], ValueSpec::None) => Ok((ActionValue::Single(single.clone()), None)),
            (_, ValueSpec::Enum(table)) => Err(ControlError::invalid_parameter(
                &self.name,
                format!("expects a single {} value", table.name),
            )),
            (many, _) => Ok((ActionValue::Multiple(many.to_vec()), None)),
        }
    }
}

fn first_char_upper(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Registry of a device's actions
#[derive(Debug, Default)]
pub struct ActionRegistry {
    actions: Vec<Arc<InvokableAction>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an action; returns `false` when the name is already taken
    pub fn register(&mut self, action: InvokableAction) -> bool {
        if self.resolve(action.name()).is_some() {
            tracing::warn!("Action {} registered twice, keeping the first", action.name());
            return false;
        }
        self.actions.push(Arc::new(action));
        true
    }

    /// Find an action by name, ignoring case
    pub fn resolve(&self, name: &str) -> Option<Arc<InvokableAction>> {
        self.actions
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
            .cloned()
    }

    /// All actions in registration order
    pub fn actions(&self) -> &[Arc<InvokableAction>] {
        &self.actions
    }

    /// Invoke an action with step parameters
    pub async fn invoke(&self, action: &InvokableAction, parameters: &[String]) -> Result<()> {
        let f = match &action.handler {
            ActionHandler::Call(f) => f.clone(),
            ActionHandler::Preset(preset) => {
                return Err(ControlError::invalid_parameter(
                    &action.name,
                    format!("runs preset {} and must go through the interpreter", preset.name),
                ))
            }
        };

        let (value, mirror) = action.prepare(parameters)?;
        tracing::debug!("Invoking {} with {:?}", action.name, value);

        f(ActionCall {
            name: action.name.clone(),
            category: action.category,
            value,
        })
        .await?;

        // Picture values come back through the settings subscription; writing
        // them here would race with that echo.
        let passive = PICTURE_KEYS.iter().any(|k| *k == action.name);
        if !passive {
            if let Some(mirror) = mirror {
                *action.current_value.lock() = Some(mirror);
            }
        }

        Ok(())
    }

    /// Invoke by name
    pub async fn invoke_by_name(&self, name: &str, parameters: &[String]) -> Result<()> {
        let action = self
            .resolve(name)
            .ok_or_else(|| ControlError::ActionNotFound(name.to_string()))?;
        self.invoke(&action, parameters).await
    }

    /// Actions that make sense as game-bar sliders and pickers
    pub fn game_bar_candidates(&self) -> Vec<Arc<InvokableAction>> {
        self.actions
            .iter()
            .filter(|a| a.category == Category::Picture)
            .filter(|a| match a.spec {
                ValueSpec::Enum(table) => !std::ptr::eq(table, &PICTURE_MODE),
                ValueSpec::Range { min, max, .. } => min >= 0 && max > 0,
                ValueSpec::None => false,
            })
            .cloned()
            .collect()
    }

    /// Actions whose names appear in `names`, in registry order
    pub fn select(&self, names: &[String]) -> Vec<Arc<InvokableAction>> {
        self.actions
            .iter()
            .filter(|a| names.iter().any(|n| n == &a.name))
            .cloned()
            .collect()
    }
}

impl ActionRegistry {
    /// The stock action table of a TV
    pub fn with_defaults(connection: &ConnectionManager, wake: &Arc<WakeCoordinator>) -> Self {
        let mut registry = Self::new();

        let wake = wake.clone();
        registry.register(InvokableAction::call("WOL", move |call| {
            let wake = wake.clone();
            async move {
                if wake.wake().await {
                    Ok(())
                } else {
                    Err(ControlError::WakeFailed(call.name))
                }
            }
            .boxed()
        }));

        for name in ["backlight", "brightness", "contrast", "color"] {
            registry.register(setting_action(name, connection).with_range(0, 100));
        }

        let picture_enums: [(&str, &'static SettingEnum, Option<&str>); 9] = [
            ("pictureMode", &PICTURE_MODE, Some("Picture Mode")),
            ("colorGamut", &COLOR_GAMUT, Some("Color Gamut")),
            ("dynamicContrast", &OFF_TO_HIGH, Some("Dynamic Contrast")),
            ("gamma", &GAMMA, None),
            ("peakBrightness", &OFF_TO_HIGH, Some("Peak Brightness")),
            ("smoothGradation", &OFF_TO_AUTO, Some("Smooth Gradation")),
            ("energySaving", &ENERGY_SAVING, Some("Energy Saving")),
            ("hdrDynamicToneMapping", &DYNAMIC_TONE_MAPPING, Some("HDR Dynamic Tone Mapping")),
            ("motionProOLED", &OFF_TO_HIGH, Some("OLED Motion Pro")),
        ];
        for (name, values, title) in picture_enums {
            let action = setting_action(name, connection).with_enum(values);
            registry.register(match title {
                Some(title) => action.with_title(title),
                None => action,
            });
        }

        for input in 1..=4 {
            for (name, values) in [
                (format!("uhdDeepColorHDMI{}", input), &OFF_TO_ON),
                (format!("gameOptimizationHDMI{}", input), &OFF_TO_ON),
                (format!("hdmiPcMode_hdmi{}", input), &FALSE_TO_TRUE),
            ] {
                registry.register(
                    setting_action(&name, connection)
                        .with_category(Category::Other)
                        .with_enum(values),
                );
            }
        }

        registry.register(setting_action("adjustingLuminance", connection).with_curve(-50, 50, 20));

        registry.register(command_action("turnScreenOff", connection, Request::turn_screen_off));
        registry.register(command_action("turnScreenOn", connection, Request::turn_screen_on));

        let factory_steps = ["0", "4", "1", "3"];
        registry.register(InvokableAction::preset(
            Preset::new("InStart", factory_steps).with_app(
                app::FACTORY_WIN,
                Some(json!({ "id": "executeFactory", "irKey": "inStart" })),
            ),
        ));
        registry.register(InvokableAction::preset(
            Preset::new("EzAdjust", factory_steps).with_app(
                app::FACTORY_WIN,
                Some(json!({ "id": "executeFactory", "irKey": "ezAdjust" })),
            ),
        ));
        // Step text splits on spaces, so the name carries none
        registry.register(
            InvokableAction::preset(Preset::new("SoftwareUpdate", Vec::<String>::new()).with_app(
                app::SOFTWARE_UPDATE,
                Some(json!({ "mode": "user", "flagUpdate": true })),
            ))
            .with_title("Software Update"),
        );

        for input in 1..=4 {
            registry.register(
                device_config_action(&format!("HDMI_{}_icon", input), connection)
                    .with_title(format!("HDMI {} icon", input)),
            );
        }

        registry
    }
}

/// Writes a system setting in the action's category
fn setting_action(name: &str, connection: &ConnectionManager) -> InvokableAction {
    let connection = connection.clone();
    InvokableAction::call(name, move |call| {
        let connection = connection.clone();
        async move {
            let value = match call.value {
                ActionValue::Single(value) => SettingValue::Single(value),
                ActionValue::Multiple(values) => SettingValue::List(
                    values
                        .iter()
                        .map(|v| {
                            v.trim().parse::<i64>().map_err(|_| {
                                ControlError::invalid_parameter(&call.name, format!("'{}' is not a number", v))
                            })
                        })
                        .collect::<Result<Vec<_>>>()?,
                ),
                ActionValue::None => {
                    return Err(ControlError::invalid_parameter(&call.name, "a value is required"))
                }
            };
            let request = Request::set_system_setting(call.category.as_str(), &call.name, value);
            connection.send_command(request, false).await?;
            Ok(())
        }
        .boxed()
    })
    .with_category(Category::Picture)
}

/// Sends a fixed command
fn command_action(name: &str, connection: &ConnectionManager, request: fn() -> Request) -> InvokableAction {
    let connection = connection.clone();
    InvokableAction::call(name, move |_| {
        let connection = connection.clone();
        async move {
            connection.send_command(request(), false).await?;
            Ok(())
        }
        .boxed()
    })
}

/// Changes the icon and label of an HDMI input
fn device_config_action(name: &str, connection: &ConnectionManager) -> InvokableAction {
    let connection = connection.clone();
    InvokableAction::call(name, move |call| {
        let connection = connection.clone();
        async move {
            let ActionValue::Single(symbol) = call.value else {
                return Err(ControlError::invalid_parameter(&call.name, "an icon is required"));
            };
            let label = HDMI_ICON.by_symbol(&symbol).map_or(symbol.as_str(), |v| v.description);
            let id = call.name.trim_end_matches("_icon");
            connection
                .send_command(Request::set_device_config(id, &symbol, label), false)
                .await?;
            Ok(())
        }
        .boxed()
    })
    .with_category(Category::Other)
    .with_enum(&HDMI_ICON)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimingConfig;
    use crate::connection::{ConnectionTarget, NotificationSink};
    use crate::picture::PictureSettingsTracker;
    use crate::power::PowerStateTracker;
    use crate::testing::{MockFactory, RecordingWakeSender};
    use std::time::Duration;
    use tokio::sync::broadcast;

    type Seen = Arc<Mutex<Vec<ActionCall>>>;

    fn recording(name: &str, seen: &Seen) -> InvokableAction {
        let seen = seen.clone();
        InvokableAction::call(name, move |call| {
            seen.lock().push(call);
            async { Ok(()) }.boxed()
        })
    }

    fn failing(name: &str) -> InvokableAction {
        InvokableAction::call(name, |call| {
            async move { Err(ControlError::Protocol(format!("{} rejected", call.name))) }.boxed()
        })
    }

    fn params(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn zero_parameter_action_runs_callable() {
        let seen = Seen::default();
        let mut registry = ActionRegistry::new();
        registry.register(recording("turnScreenOff", &seen));

        registry.invoke_by_name("TURNSCREENOFF", &[]).await.unwrap();

        let calls = seen.lock();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].value, ActionValue::None);
    }

    #[tokio::test]
    async fn single_value_sets_directly_and_mirrors() {
        let seen = Seen::default();
        let mut registry = ActionRegistry::new();
        registry.register(
            recording("peakBrightness", &seen)
                .with_category(Category::Picture)
                .with_enum(&OFF_TO_HIGH),
        );
        registry.register(recording("contrast", &seen).with_category(Category::Picture).with_range(0, 100));

        registry.invoke_by_name("peakBrightness", &params(&["High"])).await.unwrap();
        registry.invoke_by_name("contrast", &params(&["55"])).await.unwrap();

        let calls = seen.lock();
        assert_eq!(calls[0].value, ActionValue::Single("high".to_string()));
        assert_eq!(calls[0].category, Category::Picture);
        assert_eq!(calls[1].value, ActionValue::Single("55".to_string()));
        drop(calls);

        assert_eq!(registry.resolve("peakBrightness").unwrap().current_value(), Some(3));
        // mirrored by the settings subscription instead
        assert_eq!(registry.resolve("contrast").unwrap().current_value(), None);
    }

    #[tokio::test]
    async fn multiple_values_pass_verbatim() {
        let seen = Seen::default();
        let mut registry = ActionRegistry::new();
        registry.register(recording("adjustingLuminance", &seen).with_curve(-50, 50, 20));

        registry
            .invoke_by_name("adjustingLuminance", &params(&["0", "-5", "x"]))
            .await
            .unwrap();

        assert_eq!(
            seen.lock()[0].value,
            ActionValue::Multiple(params(&["0", "-5", "x"]))
        );
    }

    #[tokio::test]
    async fn unresolved_description_fails_before_dispatch() {
        let seen = Seen::default();
        let mut registry = ActionRegistry::new();
        registry.register(recording("HDMI_1_icon", &seen).with_enum(&HDMI_ICON));

        let result = registry.invoke_by_name("HDMI_1_icon", &params(&["Toaster"])).await;

        assert!(matches!(result, Err(ControlError::InvalidParameter { .. })));
        assert!(seen.lock().is_empty());
    }

    #[tokio::test]
    async fn out_of_range_value_is_rejected() {
        let seen = Seen::default();
        let mut registry = ActionRegistry::new();
        registry.register(recording("backlight", &seen).with_range(0, 100));

        assert!(registry.invoke_by_name("backlight", &params(&["101"])).await.is_err());
        assert!(registry.invoke_by_name("backlight", &params(&["bright"])).await.is_err());
        assert!(seen.lock().is_empty());
    }

    #[tokio::test]
    async fn callable_failure_fails_invocation_and_keeps_mirror() {
        let mut registry = ActionRegistry::new();
        registry.register(failing("gamma").with_enum(&crate::settings::GAMMA));

        let result = registry.invoke_by_name("gamma", &params(&["2.2"])).await;

        assert!(matches!(result, Err(ControlError::Protocol(_))));
        assert_eq!(registry.resolve("gamma").unwrap().current_value(), None);
    }

    #[tokio::test]
    async fn unknown_name_is_not_found() {
        let registry = ActionRegistry::new();
        assert!(matches!(
            registry.invoke_by_name("sharpness", &[]).await,
            Err(ControlError::ActionNotFound(_))
        ));
    }

    #[test]
    fn duplicate_names_are_refused() {
        let seen = Seen::default();
        let mut registry = ActionRegistry::new();
        assert!(registry.register(recording("color", &seen)));
        assert!(!registry.register(recording("Color", &seen)));
        assert_eq!(registry.actions().len(), 1);
    }

    #[test]
    fn titles_default_to_capitalized_name() {
        let seen = Seen::default();
        let action = recording("backlight", &seen);
        assert_eq!(action.title(), "Backlight");
        assert_eq!(action.with_title("Back light").title(), "Back light");
    }

    #[test]
    fn game_bar_candidates_skip_picture_mode_and_signed_ranges() {
        let seen = Seen::default();
        let mut registry = ActionRegistry::new();
        registry.register(recording("backlight", &seen).with_category(Category::Picture).with_range(0, 100));
        registry.register(recording("pictureMode", &seen).with_category(Category::Picture).with_enum(&PICTURE_MODE));
        registry.register(recording("peakBrightness", &seen).with_category(Category::Picture).with_enum(&OFF_TO_HIGH));
        registry.register(recording("adjustingLuminance", &seen).with_category(Category::Picture).with_curve(-50, 50, 20));
        registry.register(recording("turnScreenOff", &seen));

        let names: Vec<_> = registry
            .game_bar_candidates()
            .iter()
            .map(|a| a.name().to_string())
            .collect();
        assert_eq!(names, vec!["backlight", "peakBrightness"]);
    }

    #[tokio::test]
    async fn preset_actions_are_not_directly_invokable() {
        let mut registry = ActionRegistry::new();
        registry.register(InvokableAction::preset(Preset::new("InStart", ["0", "4", "1", "3"])));

        let action = registry.resolve("instart").unwrap();
        assert_eq!(action.nested_preset().unwrap().steps.len(), 4);
        assert!(registry.invoke(&action, &[]).await.is_err());
    }

    async fn default_registry(mac: Option<&str>) -> (ActionRegistry, MockFactory) {
        let factory = MockFactory::new();
        let (events, _) = broadcast::channel(16);
        let connection = ConnectionManager::new(
            ConnectionTarget {
                device: "tv".to_string(),
                address: "192.168.1.50".to_string(),
                connectable: true,
                connect_timeout: Duration::from_secs(5),
            },
            Arc::new(factory.clone()),
            NotificationSink {
                power: Arc::new(PowerStateTracker::new("tv", Duration::from_millis(500))),
                picture: Arc::new(PictureSettingsTracker::new("tv", events.clone())),
            },
            events,
        );
        assert!(connection.connect(1).await);
        let wake = Arc::new(WakeCoordinator::new(
            "tv",
            mac.map(str::to_string),
            connection.clone(),
            Arc::new(RecordingWakeSender::default()),
            TimingConfig::default(),
        ));
        (ActionRegistry::with_defaults(&connection, &wake), factory)
    }

    #[tokio::test]
    async fn default_table_writes_settings() {
        let (registry, factory) = default_registry(None).await;

        registry.invoke_by_name("contrast", &params(&["55"])).await.unwrap();
        registry.invoke_by_name("pictureMode", &params(&["Expert (Dark room)"])).await.unwrap();
        registry
            .invoke_by_name("adjustingLuminance", &params(&["0", "-5", "10"]))
            .await
            .unwrap();
        registry.invoke_by_name("gameOptimizationHDMI2", &params(&["On"])).await.unwrap();

        let payloads: Vec<_> = factory
            .state
            .requests
            .lock()
            .iter()
            .map(|r| r.payload.clone().unwrap())
            .collect();
        assert_eq!(
            payloads,
            vec![
                json!({ "category": "picture", "settings": { "contrast": "55" } }),
                json!({ "category": "picture", "settings": { "pictureMode": "expert2" } }),
                json!({ "category": "picture", "settings": { "adjustingLuminance": [0, -5, 10] } }),
                json!({ "category": "other", "settings": { "gameOptimizationHDMI2": "on" } }),
            ]
        );
        assert_eq!(registry.resolve("pictureMode").unwrap().current_value(), Some(3));
    }

    #[tokio::test]
    async fn default_table_rejects_non_numeric_curve() {
        let (registry, factory) = default_registry(None).await;

        let result = registry
            .invoke_by_name("adjustingLuminance", &params(&["0", "bright"]))
            .await;

        assert!(matches!(result, Err(ControlError::InvalidParameter { .. })));
        assert!(factory.state.requests.lock().is_empty());
    }

    #[tokio::test]
    async fn hdmi_icon_sets_device_config() {
        let (registry, factory) = default_registry(None).await;

        registry.invoke_by_name("HDMI_3_icon", &params(&["Game Console"])).await.unwrap();

        let request = factory.state.requests.lock()[0].clone();
        assert_eq!(request.uri, crate::protocol::uri::SET_DEVICE_INFO);
        assert_eq!(
            request.payload,
            Some(json!({ "id": "HDMI_3", "icon": "gameconsole.png", "label": "Game Console" }))
        );
    }

    #[tokio::test]
    async fn wol_action_fails_without_mac() {
        let (registry, _) = default_registry(None).await;
        assert!(matches!(
            registry.invoke_by_name("wol", &[]).await,
            Err(ControlError::WakeFailed(_))
        ));

        let (registry, _) = default_registry(Some("a0:b1:c2:d3:e4:f5")).await;
        assert!(registry.invoke_by_name("WOL", &[]).await.is_ok());
    }

    #[tokio::test]
    async fn default_table_shape() {
        let (registry, _) = default_registry(None).await;

        assert_eq!(registry.actions().len(), 36);
        assert_eq!(registry.resolve("motionProOLED").unwrap().title(), "OLED Motion Pro");
        assert_eq!(registry.resolve("gamma").unwrap().title(), "Gamma");
        let update = registry.resolve("softwareupdate").unwrap();
        assert_eq!(update.title(), "Software Update");
        assert_eq!(update.nested_preset().unwrap().app_id.as_deref(), Some(app::SOFTWARE_UPDATE));
        assert_eq!(registry.game_bar_candidates().len(), 12);

        let selected = registry.select(&params(&["color", "backlight"]));
        let names: Vec<_> = selected.iter().map(|a| a.name()).collect();
        assert_eq!(names, vec!["backlight", "color"]);
    }
}
