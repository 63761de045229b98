//! Puppetry session management.
//!
//! A [`Session`] owns one TCP connection to a puppetry server. It decodes
//! inbound frames and, once the server's first message has arrived,
//! streams pose updates back as `move` commands to the configured pump. The [`scheduler`]
//! drives a session from a single thread.

pub mod command;
pub mod config;
pub mod connector;
pub mod error;
pub mod pose;
pub mod scheduler;
pub mod session;

#[cfg(test)]
mod testing;

pub use command::{envelope, move_command, pump_from_message, COMMAND_MOVE, DEFAULT_PUMP};
pub use config::{
    clamp_update_interval, update_interval_from_secs, SessionConfig, DEFAULT_HOST, DEFAULT_PORT,
    DEFAULT_PUMP_INTERVAL, DEFAULT_UPDATE_INTERVAL, MAX_UPDATE_INTERVAL, MIN_PORT,
    MIN_UPDATE_INTERVAL,
};
pub use connector::{connect, connect_with_config};
pub use error::{ConfigError, Result, SessionError};
pub use pose::{BonePose, PoseFile, PoseSnapshot, PoseSource, Quaternion, StaticPose};
pub use scheduler::{drive, Rearm, Scheduler, DEFAULT_REARM};
pub use session::{MessageHandler, Session, SessionState, SessionStats};
