use crate::session::SessionState;

/// Errors that can occur in session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Transport-level error (connect failure, peer closed, socket I/O).
    #[error("transport error: {0}")]
    Transport(#[from] puppetry_transport::TransportError),

    /// Frame-level error; the byte stream can no longer be trusted.
    #[error("frame error: {0}")]
    Frame(#[from] puppetry_frame::FrameError),

    /// Malformed notation inside a well-framed message.
    #[error("notation error: {0}")]
    Notation(#[from] puppetry_notation::NotationError),

    /// Configuration rejected before connecting.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The operation needs an active session.
    #[error("session is {0}, not active")]
    NotActive(SessionState),

    /// `connect` was called on a session that already left `Idle`.
    #[error("session is {0}; a new session is required to connect")]
    AlreadyStarted(SessionState),

    /// Nothing may be sent before the server's first message arrives.
    #[error("pump not established; no message received from the server yet")]
    NoPump,
}

impl SessionError {
    /// True when the peer simply hung up.
    pub fn is_peer_closed(&self) -> bool {
        matches!(
            self,
            SessionError::Transport(puppetry_transport::TransportError::ConnectionClosed)
        )
    }
}

/// Invalid externally supplied settings.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("host must not be empty")]
    EmptyHost,

    #[error("pump name must not be empty")]
    EmptyPump,

    #[error("port {0} outside 1024-65535")]
    Port(u16),

    #[error("update interval {0} is not a finite, non-negative number of seconds")]
    UpdateInterval(f64),

    #[error("{field} must be greater than zero")]
    ZeroDuration { field: &'static str },
}

pub type Result<T> = std::result::Result<T, SessionError>;
