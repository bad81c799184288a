pub mod http;
pub mod proxy_pool;

#[cfg(test)]
pub mod mock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Identity;
use proxy_pool::ProxyEndpoint;

/// Closed set of machine-readable failure codes a transport implementation
/// may surface. Callers classify on this enum, never on error type names or
/// message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransportSignal {
    FloodWait,
    PeerFlood,
    TooManyRequests,
    UsernameInvalid,
    UsernameNotOccupied,
    PeerIdInvalid,
    ConnectionFailed,
    Timeout,
    Internal,
}

impl TransportSignal {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportSignal::FloodWait => "FLOOD_WAIT",
            TransportSignal::PeerFlood => "PEER_FLOOD",
            TransportSignal::TooManyRequests => "TOO_MANY_REQUESTS",
            TransportSignal::UsernameInvalid => "USERNAME_INVALID",
            TransportSignal::UsernameNotOccupied => "USERNAME_NOT_OCCUPIED",
            TransportSignal::PeerIdInvalid => "PEER_ID_INVALID",
            TransportSignal::ConnectionFailed => "CONNECTION_FAILED",
            TransportSignal::Timeout => "TIMEOUT",
            TransportSignal::Internal => "INTERNAL",
        }
    }

    /// Parse a gateway wire code. Unknown codes collapse to `Internal` so
    /// downstream classification stays conservative.
    pub fn from_wire(code: &str) -> Self {
        match code.trim().to_ascii_uppercase().as_str() {
            "FLOOD_WAIT" | "FLOOD" => TransportSignal::FloodWait,
            "PEER_FLOOD" => TransportSignal::PeerFlood,
            "TOO_MANY_REQUESTS" | "429" => TransportSignal::TooManyRequests,
            "USERNAME_INVALID" => TransportSignal::UsernameInvalid,
            "USERNAME_NOT_OCCUPIED" => TransportSignal::UsernameNotOccupied,
            "PEER_ID_INVALID" => TransportSignal::PeerIdInvalid,
            "CONNECTION_FAILED" | "CONNECTION_RESET" => TransportSignal::ConnectionFailed,
            "TIMEOUT" => TransportSignal::Timeout,
            _ => TransportSignal::Internal,
        }
    }
}

impl std::fmt::Display for TransportSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error)]
#[error("{signal}: {message}")]
pub struct TransportError {
    pub signal: TransportSignal,
    pub message: String,
}

impl TransportError {
    pub fn new(signal: TransportSignal, message: impl Into<String>) -> Self {
        Self {
            signal,
            message: message.into(),
        }
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(TransportSignal::ConnectionFailed, message)
    }
}

/// One connected messaging session for a single identity.
#[async_trait]
pub trait Session: Send + Sync {
    async fn send_text(&self, peer: &str, body: &str) -> Result<(), TransportError>;

    /// Latest message received from `peer`, if any.
    async fn fetch_latest(&self, peer: &str) -> Result<Option<String>, TransportError>;

    /// Idempotent; safe to call even when the handshake never completed.
    async fn disconnect(&self);
}

/// The wire protocol seam. Implementations authenticate with the identity's
/// session token, optionally egressing through the given proxy endpoint.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn connect(
        &self,
        identity: &Identity,
        proxy: Option<&ProxyEndpoint>,
    ) -> Result<Box<dyn Session>, TransportError>;
}
