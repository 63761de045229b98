//! Scripted in-memory connection shared by the session and scheduler tests.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use bytes::Bytes;
use puppetry_frame::frame_message;
use puppetry_notation::{Map, Value};
use puppetry_transport::{Connection, TransportError};

pub(crate) enum Step {
    Data(Vec<u8>),
    PeerClosed,
}

#[derive(Default)]
pub(crate) struct Script {
    pub reads: VecDeque<Step>,
    pub written: Vec<u8>,
    pub fail_writes: bool,
    pub closed: bool,
}

/// Handle for inspecting a [`MockConnection`] after the session took it.
#[derive(Clone, Default)]
pub(crate) struct MockConnection(pub Rc<RefCell<Script>>);

impl MockConnection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_bytes(&self, data: &[u8]) {
        self.0.borrow_mut().reads.push_back(Step::Data(data.to_vec()));
    }

    pub fn push_message(&self, message: &Value) {
        self.push_bytes(&frame_message(message));
    }

    pub fn push_close(&self) {
        self.0.borrow_mut().reads.push_back(Step::PeerClosed);
    }

    pub fn written(&self) -> Vec<u8> {
        self.0.borrow().written.clone()
    }

    pub fn fail_writes(&self) {
        self.0.borrow_mut().fail_writes = true;
    }

    pub fn was_closed(&self) -> bool {
        self.0.borrow().closed
    }
}

impl Connection for MockConnection {
    fn try_read_available(&mut self) -> puppetry_transport::Result<Bytes> {
        let mut script = self.0.borrow_mut();
        if script.closed {
            return Err(TransportError::Shutdown);
        }
        match script.reads.pop_front() {
            Some(Step::Data(data)) => Ok(Bytes::from(data)),
            Some(Step::PeerClosed) => Err(TransportError::ConnectionClosed),
            None => Ok(Bytes::new()),
        }
    }

    fn write_all(&mut self, buf: &[u8]) -> puppetry_transport::Result<()> {
        let mut script = self.0.borrow_mut();
        if script.closed {
            return Err(TransportError::Shutdown);
        }
        if script.fail_writes {
            return Err(TransportError::ConnectionClosed);
        }
        script.written.extend_from_slice(buf);
        Ok(())
    }

    fn close(&mut self) {
        self.0.borrow_mut().closed = true;
    }

    fn is_closed(&self) -> bool {
        self.0.borrow().closed
    }
}

/// A server greeting naming `pump`.
pub(crate) fn greeting(pump: &str) -> Value {
    let mut map = Map::new();
    map.insert("pump", pump);
    map.insert("data", Map::new());
    Value::Map(map)
}
