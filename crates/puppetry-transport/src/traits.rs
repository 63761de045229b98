use bytes::Bytes;

use crate::error::Result;

/// A connected byte stream as seen by a session.
///
/// Implementations never block on reads: "nothing ready" is an empty
/// buffer, and a peer that hung up is `TransportError::ConnectionClosed`.
/// The two outcomes must never be conflated.
pub trait Connection {
    /// Return every byte currently available, possibly none.
    fn try_read_available(&mut self) -> Result<Bytes>;

    /// Write the whole buffer, retrying partial writes.
    fn write_all(&mut self, buf: &[u8]) -> Result<()>;

    /// Close the connection. Calling it again has no further effect.
    fn close(&mut self);

    /// True once [`close`](Self::close) has run.
    fn is_closed(&self) -> bool;
}

impl<C: Connection + ?Sized> Connection for Box<C> {
    fn try_read_available(&mut self) -> Result<Bytes> {
        (**self).try_read_available()
    }

    fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        (**self).write_all(buf)
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn is_closed(&self) -> bool {
        (**self).is_closed()
    }
}
