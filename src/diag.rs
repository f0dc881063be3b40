//! Network diagnostic console.
//!
//! A single-client, line-oriented TCP mirror of the node's log messages.
//! It stays dark until the admission window closes, accepts at most one
//! client (a newer connection replaces the old one), and never blocks the
//! main loop: the listener and the client socket both run non-blocking.

use log::{info, warn};
use std::io::{ErrorKind, Write};
use std::net::{Ipv4Addr, TcpListener, TcpStream};

/// Default diagnostics port.
pub const DIAG_PORT: u16 = 2323;

pub struct NetConsole {
    listener: Option<TcpListener>,
    client: Option<TcpStream>,
}

impl NetConsole {
    pub fn new() -> Self {
        Self {
            listener: None,
            client: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.listener.is_some()
    }

    pub fn local_port(&self) -> Option<u16> {
        self.listener
            .as_ref()
            .and_then(|l| l.local_addr().ok())
            .map(|a| a.port())
    }

    /// Start listening. Bind failure is logged and the console simply stays
    /// inactive; the primary log keeps working either way.
    pub fn start(&mut self, port: u16) {
        if self.listener.is_some() {
            return;
        }
        match TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)) {
            Ok(listener) => {
                if let Err(e) = listener.set_nonblocking(true) {
                    warn!("diag console: set_nonblocking failed: {e}");
                    return;
                }
                info!(
                    "diag console listening on TCP port {}",
                    listener.local_addr().map(|a| a.port()).unwrap_or(port)
                );
                self.listener = Some(listener);
            }
            Err(e) => warn!("diag console unavailable: {e}"),
        }
    }

    /// Accept a pending client, replacing any previous one.
    pub fn poll_accept(&mut self) {
        let Some(listener) = &self.listener else {
            return;
        };
        match listener.accept() {
            Ok((stream, peer)) => {
                if stream.set_nonblocking(true).is_ok() {
                    info!("diag client connected from {peer}");
                    self.client = Some(stream);
                }
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => {}
            Err(e) => warn!("diag accept failed: {e}"),
        }
    }

    /// Emit one line to the primary log and, when connected, to the client.
    /// A write failure drops the client.
    pub fn line(&mut self, msg: &str) {
        info!("{msg}");
        if let Some(client) = &mut self.client {
            let failed = client.write_all(msg.as_bytes()).is_err()
                || client.write_all(b"\r\n").is_err();
            if failed {
                info!("diag client disconnected");
                self.client = None;
            }
        }
    }
}

impl Default for NetConsole {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::time::{Duration, Instant};

    #[test]
    fn mirrors_lines_to_connected_client() {
        let mut console = NetConsole::new();
        console.start(0);
        let port = console.local_port().expect("console bound");

        let mut client = TcpStream::connect((Ipv4Addr::LOCALHOST, port)).unwrap();
        client
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();

        // Accept can lag the connect slightly
        let deadline = Instant::now() + Duration::from_secs(2);
        while console.client.is_none() {
            console.poll_accept();
            assert!(Instant::now() < deadline, "client never accepted");
            std::thread::sleep(Duration::from_millis(5));
        }

        console.line("spell 7 received");

        let mut buf = [0u8; 64];
        let n = client.read(&mut buf).unwrap();
        let text = String::from_utf8_lossy(&buf[..n]);
        assert!(text.contains("spell 7 received"));
    }

    #[test]
    fn inactive_console_still_logs_without_panic() {
        let mut console = NetConsole::new();
        console.poll_accept();
        console.line("no client, no listener");
        assert!(!console.is_active());
    }
}
