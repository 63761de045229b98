//! Length-prefixed message framing for the puppetry protocol.
//!
//! Every message on the wire is framed as:
//! - the payload length as ASCII decimal digits
//! - a `:` delimiter
//! - exactly that many payload bytes (LLSD notation)
//!
//! The decoder is a resumable state machine: feed it whatever the socket
//! produced and it hands back complete payloads.

pub mod codec;
pub mod error;
pub mod reader;

pub use codec::{
    encode_frame, encode_message, frame_message, FrameConfig, FrameDecoder,
    DEFAULT_INITIAL_CAPACITY, DEFAULT_MAX_PAYLOAD, DELIMITER,
};
pub use error::{FrameError, Result};
pub use reader::FrameReader;
