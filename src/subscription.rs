use crate::error::{ControlError, Result};
use crate::protocol::Notification;
use crate::types::DeviceName;
use tokio::sync::broadcast;

/// Event raised for UI collaborators
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    /// A connect attempt finished
    Connected { device: DeviceName, success: bool },

    /// Mirrored picture values changed
    PictureSettingsChanged { device: DeviceName },
}

/// Receiver for parsed TV notifications
pub struct NotificationReceiver {
    rx: broadcast::Receiver<Notification>,
}

impl NotificationReceiver {
    /// Wrap a transport's broadcast receiver
    pub fn new(rx: broadcast::Receiver<Notification>) -> Self {
        Self { rx }
    }

    /// Receive the next notification
    ///
    /// Returns [`ControlError::ConnectionClosed`] once the transport drops its sender.
    pub async fn recv(&mut self) -> Result<Notification> {
        self.rx.recv().await.map_err(map_recv_error)
    }
}

/// Receiver for device events
pub struct EventReceiver {
    rx: broadcast::Receiver<DeviceEvent>,
}

impl EventReceiver {
    pub(crate) fn new(rx: broadcast::Receiver<DeviceEvent>) -> Self {
        Self { rx }
    }

    /// Receive the next device event
    pub async fn recv(&mut self) -> Result<DeviceEvent> {
        self.rx.recv().await.map_err(map_recv_error)
    }

    /// Try to receive an event without waiting
    ///
    /// Returns `None` if no event is queued.
    pub fn try_recv(&mut self) -> Result<Option<DeviceEvent>> {
        match self.rx.try_recv() {
            Ok(event) => Ok(Some(event)),
            Err(broadcast::error::TryRecvError::Empty) => Ok(None),
            Err(broadcast::error::TryRecvError::Closed) => Err(ControlError::ConnectionClosed),
            Err(broadcast::error::TryRecvError::Lagged(n)) => {
                Err(ControlError::ChannelError(format!("Lagged by {} messages", n)))
            }
        }
    }
}

fn map_recv_error(e: broadcast::error::RecvError) -> ControlError {
    match e {
        broadcast::error::RecvError::Closed => ControlError::ConnectionClosed,
        broadcast::error::RecvError::Lagged(n) => {
            ControlError::ChannelError(format!("Lagged by {} messages", n))
        }
    }
}
