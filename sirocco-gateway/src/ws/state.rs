//! Stream session state.

use serde::{Deserialize, Serialize};

/// Connection state of a stream session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// Not connected; the initial and terminal state.
    Disconnected,
    /// Handshake (and login, for private sessions) in progress.
    Connecting,
    /// Connected and serving frames.
    Connected,
    /// Connection lost; recovery attempts in progress.
    Reconnecting,
}

impl SessionState {
    /// Returns true if the session is serving frames.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Returns true during connect or reconnect.
    #[must_use]
    pub fn is_transitioning(&self) -> bool {
        matches!(self, Self::Connecting | Self::Reconnecting)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected => write!(f, "Connected"),
            Self::Reconnecting => write!(f, "Reconnecting"),
        }
    }
}
