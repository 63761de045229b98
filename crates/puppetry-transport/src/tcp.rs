use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use bytes::{Bytes, BytesMut};
use tracing::{debug, info, trace};

use crate::error::{Result, TransportError};
use crate::traits::Connection;

const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Socket options for a [`TcpConnection`].
#[derive(Debug, Clone)]
pub struct ConnectConfig {
    /// Bound on each connect attempt. Default: 1 s.
    pub connect_timeout: Duration,
    /// Longest a single blocking write may wait before the stall deadline
    /// is checked again. Reads never wait. Default: 100 ms.
    pub poll_interval: Duration,
    /// Upper bound on bytes drained by one `try_read_available`.
    pub max_read_per_call: usize,
    /// A write making no progress for this long fails with `TimedOut`.
    pub write_stall_timeout: Duration,
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(1),
            poll_interval: Duration::from_millis(100),
            max_read_per_call: 64 * 1024,
            write_stall_timeout: Duration::from_secs(2),
        }
    }
}

/// TCP client connection in non-blocking mode.
///
/// Owns exactly one socket. Once closed it stays closed; reconnecting means
/// building a new `TcpConnection`.
pub struct TcpConnection {
    stream: Option<TcpStream>,
    peer: SocketAddr,
    config: ConnectConfig,
    peer_closed: bool,
}

impl TcpConnection {
    /// Connect to `host:port`, trying each resolved address in turn.
    ///
    /// The timeout applies to the connect attempts only; afterwards the
    /// socket is switched to non-blocking mode.
    pub fn connect(host: &str, port: u16, config: &ConnectConfig) -> Result<Self> {
        let addr = format!("{host}:{port}");
        let candidates: Vec<SocketAddr> = (host, port)
            .to_socket_addrs()
            .map_err(|source| TransportError::Resolve {
                addr: addr.clone(),
                source,
            })?
            .collect();

        let mut last_err = None;
        for candidate in candidates {
            match TcpStream::connect_timeout(&candidate, config.connect_timeout) {
                Ok(stream) => {
                    info!(peer = %candidate, "connected");
                    return Self::from_stream(stream, config.clone());
                }
                Err(err) => {
                    debug!(peer = %candidate, error = %err, "connect attempt failed");
                    last_err = Some(err);
                }
            }
        }

        Err(TransportError::Connect {
            addr,
            source: last_err.unwrap_or_else(|| {
                std::io::Error::new(ErrorKind::NotFound, "no addresses resolved")
            }),
        })
    }

    /// Wrap an already connected stream.
    pub fn from_stream(stream: TcpStream, config: ConnectConfig) -> Result<Self> {
        let peer = stream.peer_addr()?;
        stream.set_nodelay(true)?;
        stream.set_nonblocking(true)?;
        Ok(Self {
            stream: Some(stream),
            peer,
            config,
            peer_closed: false,
        })
    }

    /// Address of the remote end.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Current connection configuration.
    pub fn config(&self) -> &ConnectConfig {
        &self.config
    }

    fn stream(&mut self) -> Result<&mut TcpStream> {
        self.stream.as_mut().ok_or(TransportError::Shutdown)
    }
}

impl Connection for TcpConnection {
    fn try_read_available(&mut self) -> Result<Bytes> {
        if self.peer_closed {
            return Err(TransportError::ConnectionClosed);
        }
        let max = self.config.max_read_per_call;
        let (bytes, eof) = drain_available(self.stream()?, max)?;
        if eof {
            debug!(peer = %self.peer, "peer closed connection");
            self.peer_closed = true;
            // Bytes that preceded the close are still delivered; the
            // closure surfaces on the next call.
            if bytes.is_empty() {
                return Err(TransportError::ConnectionClosed);
            }
        }
        Ok(bytes)
    }

    fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        let poll = self.config.poll_interval;
        let stall = self.config.write_stall_timeout;
        let stream = self.stream()?;

        // Blocking writes with a short timeout instead of spinning on
        // WouldBlock; reads stay non-blocking. Non-blocking mode is restored
        // on every path, including a failed switch.
        let result = match enter_blocking_write(stream, poll) {
            Ok(()) => write_fully(stream, buf, stall),
            Err(err) => Err(err),
        };
        let restored = stream.set_nonblocking(true);

        result?;
        restored?;
        trace!(bytes = buf.len(), "wrote buffer");
        Ok(())
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
            info!(peer = %self.peer, "connection closed");
        }
    }

    fn is_closed(&self) -> bool {
        self.stream.is_none()
    }
}

impl Drop for TcpConnection {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for TcpConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpConnection")
            .field("peer", &self.peer)
            .field("closed", &self.stream.is_none())
            .field("peer_closed", &self.peer_closed)
            .finish()
    }
}

fn enter_blocking_write(stream: &TcpStream, poll: Duration) -> Result<()> {
    stream.set_nonblocking(false)?;
    stream.set_write_timeout(Some(poll))?;
    Ok(())
}

/// Read until the source would block, reports EOF, or `max` bytes arrived.
///
/// Returns the bytes and whether EOF was seen.
pub(crate) fn drain_available<R: Read>(source: &mut R, max: usize) -> Result<(Bytes, bool)> {
    let mut buf = BytesMut::new();
    let mut chunk = [0u8; READ_CHUNK_SIZE];

    while buf.len() < max {
        let want = READ_CHUNK_SIZE.min(max - buf.len());
        match source.read(&mut chunk[..want]) {
            Ok(0) => return Ok((buf.freeze(), true)),
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) if err.kind() == ErrorKind::WouldBlock => break,
            Err(err)
                if matches!(
                    err.kind(),
                    ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted
                ) =>
            {
                return Ok((buf.freeze(), true))
            }
            Err(err) => return Err(TransportError::Io(err)),
        }
    }

    Ok((buf.freeze(), false))
}

/// Write all of `buf`, failing if no progress is made for `stall`.
pub(crate) fn write_fully<W: Write>(sink: &mut W, buf: &[u8], stall: Duration) -> Result<()> {
    let mut offset = 0usize;
    let mut last_progress = Instant::now();

    while offset < buf.len() {
        match sink.write(&buf[offset..]) {
            Ok(0) => return Err(TransportError::ConnectionClosed),
            Ok(n) => {
                offset += n;
                last_progress = Instant::now();
            }
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                if last_progress.elapsed() >= stall {
                    return Err(TransportError::Io(std::io::Error::new(
                        ErrorKind::TimedOut,
                        format!("write stalled with {} bytes pending", buf.len() - offset),
                    )));
                }
            }
            Err(err)
                if matches!(
                    err.kind(),
                    ErrorKind::BrokenPipe
                        | ErrorKind::ConnectionReset
                        | ErrorKind::ConnectionAborted
                ) =>
            {
                return Err(TransportError::ConnectionClosed)
            }
            Err(err) => return Err(TransportError::Io(err)),
        }
    }

    loop {
        match sink.flush() {
            Ok(()) => return Ok(()),
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(TransportError::Io(err)),
        }
    }
}
