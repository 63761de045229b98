//! Stream avatar poses to a puppetry server.
//!
//! A puppetry server speaks length-prefixed LLSD notation over TCP. This
//! crate bundles the layers needed to talk to one:
//!
//! # Crate Structure
//!
//! - [`notation`]: the dynamic [`Value`](notation::Value) model and its LLSD notation codec
//! - [`frame`]: `<len>:<payload>` framing with a resumable decoder
//! - [`transport`]: non-blocking TCP connection
//! - [`session`]: pump handling, pose sampling and the cooperative scheduler
//!   (behind the `session` feature)

/// Re-export notation types.
pub mod notation {
    pub use puppetry_notation::*;
}

/// Re-export frame types.
pub mod frame {
    pub use puppetry_frame::*;
}

/// Re-export transport types.
pub mod transport {
    pub use puppetry_transport::*;
}

/// Re-export session types (requires `session` feature).
#[cfg(feature = "session")]
pub mod session {
    pub use puppetry_session::*;
}
