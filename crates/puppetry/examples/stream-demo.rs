//! Streams a nodding head to a toy in-process server.
//!
//! Run with:
//!   cargo run --example stream-demo
//!
//! The server greets the client, which opens the send gate, prints the
//! first few move commands it receives and hangs up, which ends the
//! session.

use std::cell::RefCell;
use std::net::TcpListener;
use std::rc::Rc;
use std::sync::atomic::AtomicBool;
use std::thread;
use std::time::Duration;

use puppetry::frame::{frame_message, FrameReader};
use puppetry::notation::{Map, Value};
use puppetry::session::{drive, PoseSnapshot, Quaternion, Scheduler, Session, SessionConfig};

const FRAMES_TO_ACCEPT: usize = 10;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let port = listener.local_addr()?.port();
    eprintln!("Toy server listening on port {port}");

    let server = thread::spawn(move || -> std::io::Result<()> {
        let (mut stream, peer) = listener.accept()?;
        eprintln!("Client connected: {peer}");

        let mut greeting = Map::new();
        greeting.insert("pump", "demo");
        greeting.insert("data", Map::new());
        std::io::Write::write_all(&mut stream, &frame_message(&Value::Map(greeting)))?;

        let reader = FrameReader::new(stream.try_clone()?);
        for payload in reader.take(FRAMES_TO_ACCEPT) {
            match payload {
                Ok(payload) => eprintln!("<- {}", String::from_utf8_lossy(&payload)),
                Err(err) => {
                    eprintln!("Read failed: {err}");
                    break;
                }
            }
        }
        Ok(())
    });

    let mut angle: f64 = 0.0;
    let nod = move || {
        angle += 0.2;
        let half = (angle.sin() * 0.3) / 2.0;
        let mut snapshot = PoseSnapshot::new();
        snapshot.push("head", Quaternion::new(half.cos(), half.sin(), 0.0, 0.0));
        Some(snapshot)
    };

    let config = SessionConfig {
        port,
        update_interval: Duration::from_millis(50),
        ..SessionConfig::default()
    };
    let mut session = Session::new(config).with_pose_source(nod);
    session.connect()?;

    let session = Rc::new(RefCell::new(session));
    let mut scheduler = Scheduler::new();
    drive(Rc::clone(&session), &mut scheduler);
    scheduler.run(&AtomicBool::new(false));

    eprintln!("Session ended: {:?}", session.borrow().stats());
    server.join().map_err(|_| "server thread panicked")??;
    Ok(())
}
