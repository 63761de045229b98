/// Errors that can occur in transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The host name did not resolve to any usable address.
    #[error("failed to resolve {addr}: {source}")]
    Resolve {
        addr: String,
        source: std::io::Error,
    },

    /// Failed to connect to the specified address.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },

    /// The peer shut the connection down.
    #[error("connection closed by peer")]
    ConnectionClosed,

    /// An I/O error occurred on the transport stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed locally.
    #[error("transport shut down")]
    Shutdown,
}

impl TransportError {
    /// True when the error means the connection is gone for good.
    pub fn is_disconnect(&self) -> bool {
        matches!(
            self,
            TransportError::ConnectionClosed | TransportError::Shutdown
        )
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
