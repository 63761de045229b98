/// Errors that can occur while parsing LLSD notation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotationError {
    /// The input ended in the middle of a value.
    #[error("unexpected end of notation input at offset {offset}")]
    UnexpectedEof { offset: usize },

    /// A byte that cannot start or continue the current token.
    #[error("unexpected byte 0x{byte:02x} at offset {offset}")]
    UnexpectedByte { byte: u8, offset: usize },

    /// An integer or real literal that does not parse.
    #[error("invalid number {text:?} at offset {offset}")]
    InvalidNumber { text: String, offset: usize },

    /// A string literal whose bytes are not valid UTF-8.
    #[error("string at offset {offset} is not valid UTF-8")]
    InvalidUtf8 { offset: usize },

    /// A well-formed notation type this value model does not carry.
    #[error("unsupported notation type {kind} at offset {offset}")]
    Unsupported { kind: &'static str, offset: usize },

    /// Bytes remain after the top-level value.
    #[error("trailing data after value at offset {offset}")]
    TrailingData { offset: usize },

    /// Containers nested deeper than the parser allows.
    #[error("notation nested deeper than {max} levels")]
    TooDeep { max: usize },
}

pub type Result<T> = std::result::Result<T, NotationError>;
