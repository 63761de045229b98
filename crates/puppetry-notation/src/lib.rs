//! Dynamic message values and their LLSD notation encoding.
//!
//! Every puppetry payload is a [`Value`]: undef, booleans, integers, reals,
//! strings, arrays and string-keyed maps. On the wire a value is written in
//! LLSD notation, a compact human-readable grammar:
//!
//! ```text
//! {'command':'move','reply':!,'head':{'local_rot':[r0.0,r0.0,r0.1]}}
//! ```
//!
//! This crate knows nothing about framing or sockets.

pub mod error;
pub mod format;
pub mod json;
pub mod parse;
pub mod value;

pub use error::{NotationError, Result};
pub use format::{to_notation, write_notation};
pub use parse::{from_notation, from_notation_with_depth, DEFAULT_MAX_DEPTH};
pub use value::{Map, Value};
