//! Power-state reconciliation
//!
//! TVs push power-state changes asynchronously and with some delay. The
//! tracker keeps the last reported state and attributes each power-off to
//! either this library or something external (remote, front button, the
//! TV's own timers). Attribution is a timing heuristic and can be wrong when
//! notifications arrive late.

use crate::protocol::PowerStatePayload;
use crate::types::{PowerOffSource, PowerState};
use parking_lot::Mutex;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Default)]
struct TrackerState {
    current: PowerState,
    powered_off_by: PowerOffSource,
    powered_off_via_app: bool,
    powered_off_via_app_at: Option<Instant>,
}

/// Tracks power state and power-off attribution for one device
#[derive(Debug)]
pub struct PowerStateTracker {
    device: String,
    attribution_window: Duration,
    state: Mutex<TrackerState>,
}

impl PowerStateTracker {
    pub fn new(device: impl Into<String>, attribution_window: Duration) -> Self {
        Self {
            device: device.into(),
            attribution_window,
            state: Mutex::new(TrackerState::default()),
        }
    }

    /// Last reported power state
    pub fn power_state(&self) -> PowerState {
        self.state.lock().current
    }

    /// Cause of the most recent power-off
    pub fn powered_off_by(&self) -> PowerOffSource {
        self.state.lock().powered_off_by
    }

    /// Both values from a single snapshot
    pub fn snapshot(&self) -> (PowerState, PowerOffSource) {
        let state = self.state.lock();
        (state.current, state.powered_off_by)
    }

    /// Whether the last power-off request came from this library
    pub fn powered_off_via_app(&self) -> bool {
        self.state.lock().powered_off_via_app
    }

    /// Record that the library is about to power the device off
    pub fn mark_powered_off_by_app(&self) {
        let mut state = self.state.lock();
        state.powered_off_via_app = true;
        state.powered_off_via_app_at = Some(Instant::now());
    }

    /// Apply a power-state notification
    pub fn apply(&self, payload: &PowerStatePayload) {
        let parsed = PowerState::parse(&payload.state);
        let mut state = self.state.lock();

        match parsed {
            Some(new_state) => {
                state.current = new_state;

                if new_state == PowerState::Active {
                    let outside_window = state
                        .powered_off_via_app_at
                        .map_or(true, |at| at.elapsed() > self.attribution_window);
                    if payload.processing.is_none() && outside_window {
                        state.powered_off_via_app = false;
                        state.powered_off_by = PowerOffSource::Unknown;
                        state.powered_off_via_app_at = None;
                    }
                } else {
                    state.powered_off_by = if state.powered_off_via_app {
                        PowerOffSource::App
                    } else {
                        PowerOffSource::External
                    };
                }
            }
            None => {
                state.current = PowerState::Unknown;
                tracing::warn!("[{}] Unknown power state: {}", self.device, payload.state);
            }
        }

        tracing::debug!(
            "[{}] Power state {:?}, powered off by {:?}, via app: {}",
            self.device,
            state.current,
            state.powered_off_by,
            state.powered_off_via_app
        );
    }

    /// Apply a transport disconnect
    ///
    /// A connection that drops on its own with no known cause counts as an
    /// external power-off.
    pub fn apply_disconnect(&self, closed_by_dispose: bool) {
        let mut state = self.state.lock();
        tracing::debug!(
            "[{}] Disconnect, powered off by: {:?}",
            self.device,
            state.powered_off_by
        );
        if !closed_by_dispose && state.powered_off_by == PowerOffSource::Unknown {
            state.powered_off_by = PowerOffSource::External;
        }
    }
}
