use std::fmt;
use std::io;

use puppetry_frame::FrameError;
use puppetry_notation::NotationError;
use puppetry_session::SessionError;
use puppetry_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::BrokenPipe => TRANSPORT_ERROR,
        io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Connect { source, .. } | TransportError::Io(source) => {
            io_error(context, source)
        }
        TransportError::ConnectionClosed => CliError::new(FAILURE, format!("{context}: {err}")),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::ConnectionClosed => CliError::new(FAILURE, format!("{context}: {err}")),
        other => CliError::new(DATA_INVALID, format!("{context}: {other}")),
    }
}

pub fn notation_error(context: &str, err: NotationError) -> CliError {
    CliError::new(DATA_INVALID, format!("{context}: {err}"))
}

pub fn session_error(context: &str, err: SessionError) -> CliError {
    match err {
        SessionError::Transport(err) => transport_error(context, err),
        SessionError::Frame(err) => frame_error(context, err),
        SessionError::Notation(err) => notation_error(context, err),
        SessionError::Config(err) => CliError::new(USAGE, format!("{context}: {err}")),
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_refused_is_a_transport_error() {
        let err = TransportError::Connect {
            addr: "127.0.0.1:15555".to_string(),
            source: io::Error::from(io::ErrorKind::ConnectionRefused),
        };
        assert_eq!(transport_error("connect failed", err).code, TRANSPORT_ERROR);
    }

    #[test]
    fn connect_timeout_maps_to_timeout() {
        let err = SessionError::Transport(TransportError::Connect {
            addr: "10.0.0.1:15555".to_string(),
            source: io::Error::from(io::ErrorKind::TimedOut),
        });
        assert_eq!(session_error("connect failed", err).code, TIMEOUT);
    }

    #[test]
    fn malformed_stream_is_invalid_data() {
        let err = FrameError::InvalidLengthByte { byte: b'x' };
        assert_eq!(frame_error("decode failed", err).code, DATA_INVALID);
        let err = FrameError::Truncated { buffered: 3 };
        assert_eq!(frame_error("decode failed", err).code, DATA_INVALID);
    }

    #[test]
    fn bad_config_is_usage() {
        let err = SessionError::Config(puppetry_session::ConfigError::Port(80));
        let cli = session_error("invalid settings", err);
        assert_eq!(cli.code, USAGE);
        assert!(cli.message.contains("port 80"));
    }
}
