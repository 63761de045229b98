/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// A byte other than an ASCII digit or `:` in the length prefix.
    #[error("invalid byte 0x{byte:02x} in frame length prefix")]
    InvalidLengthByte { byte: u8 },

    /// The `:` delimiter arrived with no length digits before it.
    #[error("frame delimiter without length digits")]
    MissingLength,

    /// The declared payload length exceeds the configured maximum.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// A previous framing error left the stream unsynchronized.
    #[error("frame decoder poisoned by an earlier framing error")]
    Poisoned,

    /// An I/O error occurred while reading frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended cleanly between frames.
    #[error("connection closed")]
    ConnectionClosed,

    /// The stream ended in the middle of a frame.
    #[error("connection closed (incomplete frame, {buffered} bytes buffered)")]
    Truncated { buffered: usize },
}

impl FrameError {
    /// True for errors that mean the byte stream itself is malformed.
    pub fn is_framing(&self) -> bool {
        matches!(
            self,
            FrameError::InvalidLengthByte { .. }
                | FrameError::MissingLength
                | FrameError::PayloadTooLarge { .. }
                | FrameError::Poisoned
        )
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
