//! TCP transport for puppetry sessions.
//!
//! Provides the [`Connection`] abstraction a session drives and its TCP
//! implementation: bounded connect, non-blocking reads that tell "nothing
//! ready" apart from "peer closed", and complete writes.
//!
//! This is the lowest layer of the workspace; framing and sessions build on
//! top of it.

pub mod error;
pub mod tcp;
pub mod traits;

pub use error::{Result, TransportError};
pub use tcp::{ConnectConfig, TcpConnection};
pub use traits::Connection;
