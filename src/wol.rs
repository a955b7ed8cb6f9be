//! Wake-on-LAN magic packets

use crate::error::{ControlError, Result};
use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;
use tokio::net::UdpSocket;

/// 48-bit hardware address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    pub fn octets(&self) -> [u8; 6] {
        self.0
    }

    /// Six `0xFF` bytes followed by the address sixteen times
    pub fn magic_packet(&self) -> [u8; 102] {
        let mut packet = [0xFF; 102];
        for chunk in packet[6..].chunks_exact_mut(6) {
            chunk.copy_from_slice(&self.0);
        }
        packet
    }
}

impl FromStr for MacAddress {
    type Err = ControlError;

    /// Accepts `AA:BB:CC:DD:EE:FF`, `AA-BB-CC-DD-EE-FF` and `AABBCCDDEEFF`
    fn from_str(s: &str) -> Result<Self> {
        let hex: String = s
            .trim()
            .chars()
            .filter(|c| *c != ':' && *c != '-' && *c != '.')
            .collect();
        if hex.len() != 12 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ControlError::InvalidMacAddress(s.to_string()));
        }

        let mut octets = [0u8; 6];
        for (i, octet) in octets.iter_mut().enumerate() {
            *octet = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16)
                .map_err(|_| ControlError::InvalidMacAddress(s.to_string()))?;
        }
        Ok(Self(octets))
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}", a, b, c, d, e, g)
    }
}

/// Sends magic packets
#[async_trait]
pub trait WakeSender: Send + Sync {
    async fn send(&self, mac: MacAddress) -> Result<()>;
}

/// Broadcasts magic packets over UDP
pub struct UdpWakeSender {
    target: String,
}

impl UdpWakeSender {
    /// Send to the given `host:port`, usually `255.255.255.255:9`
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }
}

#[async_trait]
impl WakeSender for UdpWakeSender {
    async fn send(&self, mac: MacAddress) -> Result<()> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.set_broadcast(true)?;
        let sent = socket.send_to(&mac.magic_packet(), &self.target).await?;
        tracing::debug!("Sent {} byte magic packet for {} to {}", sent, mac, self.target);
        Ok(())
    }
}
