use crate::config::SessionConfig;
use crate::error::Result;
use crate::session::Session;

/// Connect to a puppetry server with default settings.
pub fn connect(host: &str, port: u16) -> Result<Session> {
    connect_with_config(SessionConfig {
        host: host.to_string(),
        port,
        ..SessionConfig::default()
    })
}

/// Connect with explicit configuration.
pub fn connect_with_config(config: SessionConfig) -> Result<Session> {
    let mut session = Session::new(config);
    session.connect()?;
    Ok(session)
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;
    use std::thread;

    use super::*;
    use crate::session::SessionState;

    #[test]
    fn connect_convenience() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("listener should bind");
        let port = listener.local_addr().expect("listener has an address").port();
        let server = thread::spawn(move || {
            let _ = listener.accept().expect("listener should accept");
        });

        let session = connect("127.0.0.1", port).expect("client should connect");
        assert_eq!(session.state(), SessionState::Active);
        assert_eq!(session.config().port, port);
        assert!(session.server_pump().is_none());

        server.join().expect("server thread should complete");
    }

    #[test]
    fn connect_rejects_bad_host() {
        assert!(connect("", 15555).is_err());
    }
}
