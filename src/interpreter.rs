//! Preset execution
//!
//! A preset is a list of step tokens:
//!
//! ```text
//! KEY                  press a remote-control button
//! KEY:500              ...then wait 500 ms
//! action(p1;p2)        invoke a registered action with parameters
//! action(p1):1000      ...then wait 1000 ms
//! ```
//!
//! Step names are first looked up in the device's [`ActionRegistry`]. A
//! parameterized step that is not an action is offered to the
//! [`ExternalServiceHandler`] (`NvPreset(name)`, `StartProgram(path)`, ...).
//! Anything else is sent as a key.

use crate::actions::ActionRegistry;
use crate::config::{ControlConfig, TimingConfig};
use crate::connection::ConnectionManager;
use crate::error::{ControlError, Result};
use crate::protocol::app;
use crate::types::Preset;
use crate::wake::WakeCoordinator;
use async_trait::async_trait;
use futures_util::future::{BoxFuture, FutureExt};
use parking_lot::RwLock;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

/// Handles steps that belong to other services (GPU presets, programs)
#[async_trait]
pub trait ExternalServiceHandler: Send + Sync {
    /// Returns `true` when the step was handled
    async fn handle(&self, key: &str, parameters: &[String]) -> bool;
}

/// One parsed step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepToken {
    /// Step name as written
    pub key: String,
    /// Present when the step has a parameter list, even an empty one
    pub parameters: Option<Vec<String>>,
    /// Delay after the step, if the step gives one
    pub delay: Option<Duration>,
}

impl StepToken {
    /// Parse `KEY`, `KEY(p;p)`, `KEY:delay` or `KEY(p;p):delay`
    ///
    /// Colons inside the parameter list do not start a delay, so
    /// `StartProgram(C:\run.exe)` keeps its path. A delay that is not a
    /// number is ignored.
    pub fn parse(step: &str) -> Self {
        let step = step.trim();

        let (key, parameters, rest) = match step.find('(') {
            Some(open) => {
                let inner = &step[open + 1..];
                let (params, rest) = match inner.rfind(')') {
                    Some(close) => (&inner[..close], &inner[close + 1..]),
                    None => (inner, ""),
                };
                let parameters = params.split(';').map(|p| p.trim().to_string()).collect();
                (&step[..open], Some(parameters), rest)
            }
            None => match step.rsplit_once(':') {
                Some((key, delay)) => (key, None, delay),
                None => (step, None, ""),
            },
        };

        let delay = rest
            .trim()
            .trim_start_matches(':')
            .trim()
            .parse::<u64>()
            .ok()
            .map(Duration::from_millis);

        Self {
            key: key.trim().to_string(),
            parameters,
            delay,
        }
    }

    /// Button name sent to the TV: upper case, `_` before a leading digit
    pub fn key_name(&self) -> String {
        let key = self.key.to_ascii_uppercase();
        if key.starts_with(|c: char| c.is_ascii_digit()) {
            format!("_{}", key)
        } else {
            key
        }
    }

    fn parameters(&self) -> &[String] {
        self.parameters.as_deref().unwrap_or_default()
    }

    pub(crate) fn is_wake(&self) -> bool {
        self.parameters.is_none() && self.key.eq_ignore_ascii_case("WOL")
    }
}

/// Launch params for service apps when the preset carries none
pub fn advanced_app_params(app_id: &str, preset_name: &str) -> Option<Value> {
    if app_id == app::SOFTWARE_UPDATE {
        Some(json!({ "mode": "user", "flagUpdate": true }))
    } else if app_id == app::FACTORY_WIN {
        let ir_key = if preset_name.to_ascii_lowercase().contains("ezadjust") {
            "ezAdjust"
        } else {
            "inStart"
        };
        Some(json!({ "id": "executeFactory", "irKey": ir_key }))
    } else {
        None
    }
}

/// Runs presets against one device
pub struct PresetStepInterpreter {
    device: String,
    connection: ConnectionManager,
    wake: Arc<WakeCoordinator>,
    registry: Arc<ActionRegistry>,
    handler: RwLock<Option<Arc<dyn ExternalServiceHandler>>>,
    timing: TimingConfig,
    show_advanced_actions: bool,
}

impl PresetStepInterpreter {
    pub fn new(
        device: impl Into<String>,
        connection: ConnectionManager,
        wake: Arc<WakeCoordinator>,
        registry: Arc<ActionRegistry>,
        config: &ControlConfig,
    ) -> Self {
        Self {
            device: device.into(),
            connection,
            wake,
            registry,
            handler: RwLock::new(None),
            timing: config.timing.clone(),
            show_advanced_actions: config.show_advanced_actions,
        }
    }

    pub fn set_external_service_handler(&self, handler: Option<Arc<dyn ExternalServiceHandler>>) {
        *self.handler.write() = handler;
    }

    /// Execute a preset, returning whether it completed
    ///
    /// A `WOL` step wakes the device before anything else. Launching the app
    /// or running the steps is retried once on a rebuilt session.
    pub async fn execute(&self, preset: &Preset, reconnect: bool) -> bool {
        self.run_preset(preset, reconnect).await
    }

    fn run_preset<'a>(&'a self, preset: &'a Preset, reconnect: bool) -> BoxFuture<'a, bool> {
        async move {
            tracing::info!("[{}] Executing preset {}", self.device, preset.name);

            if preset.has_wake_step()
                && !self
                    .wake
                    .wake_and_connect(Duration::ZERO, self.timing.connect_delay())
                    .await
            {
                tracing::error!("[{}] Wake failed, not executing {}", self.device, preset.name);
                return false;
            }

            for attempt in 0..2 {
                let retry = attempt == 0;

                if !self
                    .connection
                    .ensure_connected(reconnect || !retry, self.timing.connect_retries)
                    .await
                {
                    tracing::debug!("[{}] Cannot apply preset: no connection could be made", self.device);
                    return false;
                }

                let mut launched = false;
                if let Some(app_id) = preset.app_id.as_deref().filter(|id| !id.is_empty()) {
                    if let Err(e) = self.launch(preset, app_id).await {
                        tracing::error!("[{}] Error while launching app: {}", self.device, e);
                        if retry {
                            continue;
                        }
                        return false;
                    }
                    launched = true;

                    if self.wake.take_just_woke_up() {
                        sleep(self.timing.wake_settle_delay()).await;
                    }
                }

                if !preset.steps.is_empty() {
                    if launched {
                        sleep(self.timing.post_launch_delay()).await;
                    }
                    if let Err(e) = self.execute_steps(preset).await {
                        tracing::error!("[{}] Error while executing steps: {}", self.device, e);
                        if retry {
                            continue;
                        }
                        return false;
                    }
                }

                return true;
            }

            false
        }
        .boxed()
    }

    async fn launch(&self, preset: &Preset, app_id: &str) -> Result<()> {
        let params = match &preset.app_params {
            Some(params) => Some(params.clone()),
            None if self.show_advanced_actions => advanced_app_params(app_id, &preset.name),
            None => None,
        };

        tracing::debug!("[{}] Launching {} with {:?}", self.device, app_id, params);
        self.connection.client()?.launch_app(app_id, params).await
    }

    async fn execute_steps(&self, preset: &Preset) -> Result<()> {
        for step in &preset.steps {
            let token = StepToken::parse(step);
            if token.key.is_empty() {
                continue;
            }

            // Woken before the steps; only the pause is left to honour
            let delay = if token.is_wake() {
                token.delay.unwrap_or(Duration::ZERO)
            } else {
                self.execute_step(&token).await?
            };
            if !delay.is_zero() {
                sleep(delay).await;
            }
        }
        Ok(())
    }

    /// Run one step and return the delay that should follow it
    async fn execute_step(&self, token: &StepToken) -> Result<Duration> {
        if let Some(action) = self.registry.resolve(&token.key) {
            match action.nested_preset() {
                Some(nested) => {
                    if !self.run_preset(nested, false).await {
                        return Err(ControlError::PresetFailed(nested.name.clone()));
                    }
                }
                None => self.registry.invoke(&action, token.parameters()).await?,
            }
            return Ok(token.delay.unwrap_or(Duration::ZERO));
        }

        if let Some(parameters) = &token.parameters {
            let handler = self.handler.read().clone();
            if let Some(handler) = handler {
                if handler.handle(&token.key, parameters).await {
                    tracing::debug!("[{}] {} handled externally", self.device, token.key);
                    return Ok(token.delay.unwrap_or(Duration::ZERO));
                }
            }
        }

        self.connection.send_key(&token.key_name()).await?;
        Ok(token.delay.unwrap_or(self.timing.default_key_delay()))
    }
}
