use thiserror::Error;

/// Result type for device control operations
pub type Result<T> = std::result::Result<T, ControlError>;

/// Errors that can occur while controlling a TV
#[derive(Error, Debug)]
pub enum ControlError {
    /// No live session exists for the device
    #[error("Not connected")]
    NotConnected,

    /// Connection was closed unexpectedly
    #[error("Connection closed")]
    ConnectionClosed,

    /// Operation timed out
    #[error("Timeout")]
    Timeout,

    /// Transport refused or failed the connection
    #[error("Connect failed: {0}")]
    ConnectFailed(String),

    /// No action with the given name is registered
    #[error("Action not found: {0}")]
    ActionNotFound(String),

    /// A parameter could not be applied to an action
    #[error("Invalid parameter for {action}: {detail}")]
    InvalidParameter {
        /// Action name
        action: String,
        /// What was wrong with the parameter
        detail: String,
    },

    /// Device rejected a command
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Invalid or unexpected response or notification payload
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Wake-on-LAN requested for a device without a hardware address
    #[error("Device {0} has no MAC address")]
    NoHardwareAddress(String),

    /// Hardware address could not be parsed
    #[error("Invalid MAC address: {0}")]
    InvalidMacAddress(String),

    /// Magic packet could not be sent
    #[error("Wake failed for {0}")]
    WakeFailed(String),

    /// A nested preset reported failure
    #[error("Preset {0} failed")]
    PresetFailed(String),

    /// App launch failed
    #[error("Failed to launch app {app_id}: {detail}")]
    AppLaunch {
        /// App identifier
        app_id: String,
        /// Failure detail
        detail: String,
    },

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Channel receive error
    #[error("Channel error: {0}")]
    ChannelError(String),
}

impl ControlError {
    /// Build an [`ControlError::InvalidParameter`] for the given action
    pub(crate) fn invalid_parameter(action: &str, detail: impl Into<String>) -> Self {
        Self::InvalidParameter {
            action: action.to_string(),
            detail: detail.into(),
        }
    }
}
