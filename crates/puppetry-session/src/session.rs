use std::fmt;

use bytes::BytesMut;
use puppetry_frame::{encode_message, FrameDecoder};
use puppetry_notation::{from_notation, Value};
use puppetry_transport::{Connection, TcpConnection};
use tracing::{debug, info, trace, warn};

use crate::command::{envelope, move_command, pump_from_message};
use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::pose::PoseSource;

/// Lifecycle of a [`Session`]. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Active,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Connecting => "connecting",
            SessionState::Active => "active",
            SessionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Counters kept over the life of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub frames_received: u64,
    pub frames_sent: u64,
    pub messages_dropped: u64,
}

/// Callback invoked for every decoded inbound message.
pub type MessageHandler = Box<dyn FnMut(&Value)>;

/// One puppetry conversation with a server.
///
/// The session owns its connection and frame decoder. Outbound commands are
/// always addressed to the configured pump, but none are sent until the
/// server's first message has arrived.
pub struct Session<C = TcpConnection> {
    config: SessionConfig,
    state: SessionState,
    connection: Option<C>,
    decoder: FrameDecoder,
    server_pump: Option<String>,
    pose_source: Option<Box<dyn PoseSource>>,
    handler: MessageHandler,
    stats: SessionStats,
    out: BytesMut,
}

fn log_message(message: &Value) {
    info!(%message, "message received");
}

impl Session<TcpConnection> {
    /// Create an idle session. Nothing touches the network until
    /// [`connect`](Self::connect).
    pub fn new(config: SessionConfig) -> Self {
        Self::build(config, None, SessionState::Idle)
    }

    /// Connect to the configured server.
    ///
    /// A failed attempt leaves the session `Closed`; build a new session to
    /// try again.
    pub fn connect(&mut self) -> Result<()> {
        if self.state != SessionState::Idle {
            return Err(SessionError::AlreadyStarted(self.state));
        }
        self.config.validate()?;

        self.state = SessionState::Connecting;
        debug!(host = %self.config.host, port = self.config.port, "connecting");
        match TcpConnection::connect(&self.config.host, self.config.port, &self.config.connect) {
            Ok(connection) => {
                self.connection = Some(connection);
                self.state = SessionState::Active;
                info!(host = %self.config.host, port = self.config.port, "session active");
                Ok(())
            }
            Err(err) => {
                warn!(host = %self.config.host, port = self.config.port, error = %err, "connect failed");
                self.state = SessionState::Closed;
                Err(err.into())
            }
        }
    }
}

impl<C: Connection> Session<C> {
    /// Build an active session over an already established connection.
    pub fn with_connection(connection: C, config: SessionConfig) -> Self {
        Self::build(config, Some(connection), SessionState::Active)
    }

    fn build(config: SessionConfig, connection: Option<C>, state: SessionState) -> Self {
        let decoder = FrameDecoder::with_config(config.frame.clone());
        Self {
            config,
            state,
            connection,
            decoder,
            server_pump: None,
            pose_source: None,
            handler: Box::new(log_message),
            stats: SessionStats::default(),
            out: BytesMut::new(),
        }
    }

    /// Attach the pose source sampled by [`sample_and_send`](Self::sample_and_send).
    pub fn with_pose_source(mut self, source: impl PoseSource + 'static) -> Self {
        self.set_pose_source(source);
        self
    }

    pub fn set_pose_source(&mut self, source: impl PoseSource + 'static) {
        self.pose_source = Some(Box::new(source));
    }

    /// Replace the inbound message handler. The default logs each message.
    pub fn on_message(&mut self, handler: impl FnMut(&Value) + 'static) {
        self.handler = Box::new(handler);
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    /// The pump every outbound envelope is addressed to.
    pub fn pump(&self) -> &str {
        &self.config.pump
    }

    /// The pump named in the server's first message, or the configured pump
    /// when that message named none. `None` until a message arrives, and
    /// nothing is sent before then.
    pub fn server_pump(&self) -> Option<&str> {
        self.server_pump.as_deref()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Read whatever the server sent and dispatch every complete message.
    ///
    /// Returns the number of messages handed to the handler. A message that
    /// fails to parse is dropped; a framing, I/O or peer-close error closes
    /// the session and is returned, after any frames that completed before a
    /// framing error were dispatched.
    pub fn pump_io(&mut self) -> Result<usize> {
        if self.state != SessionState::Active {
            return Ok(0);
        }
        let Some(connection) = self.connection.as_mut() else {
            return Ok(0);
        };

        let data = match connection.try_read_available() {
            Ok(data) => data,
            Err(err) => return Err(self.fail(err.into())),
        };
        if data.is_empty() {
            return Ok(0);
        }
        trace!(bytes = data.len(), "read");

        let mut payloads = Vec::new();
        let framing = self.decoder.push_into(&data, &mut payloads);

        let mut dispatched = 0;
        for payload in payloads {
            self.stats.frames_received += 1;
            let message = match from_notation(&payload) {
                Ok(message) => message,
                Err(err) => {
                    self.stats.messages_dropped += 1;
                    warn!(error = %err, bytes = payload.len(), "dropping malformed message");
                    continue;
                }
            };
            self.establish_pump(&message);
            (self.handler)(&message);
            dispatched += 1;
        }
        if let Err(err) = framing {
            return Err(self.fail(err.into()));
        }
        Ok(dispatched)
    }

    /// Send one move command per bone of the current pose.
    ///
    /// Does nothing until the session is active, the server's first message
    /// has arrived and the pose source yields a snapshot. Returns the number
    /// of frames sent.
    pub fn sample_and_send(&mut self) -> Result<usize> {
        if self.state != SessionState::Active || self.server_pump.is_none() {
            return Ok(0);
        }
        let Some(snapshot) = self.pose_source.as_mut().and_then(|source| source.snapshot()) else {
            return Ok(0);
        };

        let mut sent = 0;
        for bone in snapshot.bones() {
            let Some(command) = move_command(&bone.name, bone.rotation) else {
                warn!(bone = %bone.name, "skipping bone with a reserved name");
                continue;
            };
            self.write_envelope(command)?;
            sent += 1;
        }
        if sent > 0 {
            trace!(frames = sent, "pose sent");
        }
        Ok(sent)
    }

    /// Send an arbitrary command map to the configured pump.
    pub fn send(&mut self, command: Value) -> Result<()> {
        if self.state != SessionState::Active {
            return Err(SessionError::NotActive(self.state));
        }
        if self.server_pump.is_none() {
            return Err(SessionError::NoPump);
        }
        self.write_envelope(command)
    }

    /// Close the connection. Calling it again has no effect.
    pub fn disconnect(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        self.close_connection();
        self.state = SessionState::Closed;
        info!(
            frames_sent = self.stats.frames_sent,
            frames_received = self.stats.frames_received,
            "session closed"
        );
    }

    fn establish_pump(&mut self, message: &Value) {
        if self.server_pump.is_some() {
            return;
        }
        let server_pump = pump_from_message(message)
            .unwrap_or(self.config.pump.as_str())
            .to_string();
        info!(server_pump = %server_pump, pump = %self.config.pump, "pump established");
        self.server_pump = Some(server_pump);
    }

    fn write_envelope(&mut self, data: Value) -> Result<()> {
        self.out.clear();
        encode_message(&envelope(&self.config.pump, data), &mut self.out);

        let Some(connection) = self.connection.as_mut() else {
            return Err(SessionError::NotActive(self.state));
        };
        if let Err(err) = connection.write_all(&self.out) {
            return Err(self.fail(err.into()));
        }
        self.stats.frames_sent += 1;
        Ok(())
    }

    /// Close after an unrecoverable error and hand the error back.
    fn fail(&mut self, err: SessionError) -> SessionError {
        if err.is_peer_closed() {
            info!("server closed the connection");
        } else {
            warn!(error = %err, "closing session");
        }
        self.close_connection();
        self.state = SessionState::Closed;
        err
    }

    fn close_connection(&mut self) {
        if let Some(mut connection) = self.connection.take() {
            connection.close();
        }
        self.decoder.reset();
    }
}

impl<C> fmt::Debug for Session<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("host", &self.config.host)
            .field("port", &self.config.port)
            .field("state", &self.state)
            .field("pump", &self.config.pump)
            .field("server_pump", &self.server_pump)
            .field("stats", &self.stats)
            .finish()
    }
}
