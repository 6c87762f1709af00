//! Transport
//!
//! Opens the byte stream a request travels over: plain TCP for `http`,
//! TCP wrapped in TLS for `https`.

use std::io::{self, Read, Write};
use std::net::Shutdown;

use crate::tcp::{TcpConfig, TcpConnection};
use crate::tls::TlsStream;
use crate::NetError;

/// An open connection to a server
pub enum Connection {
    Plain(TcpConnection),
    Tls(Box<TlsStream>),
}

impl Connection {
    pub fn is_secure(&self) -> bool {
        matches!(self, Connection::Tls(_))
    }

    /// Close the connection, sending close_notify first over TLS
    pub fn close(self) -> io::Result<()> {
        match self {
            Connection::Plain(tcp) => tcp.shutdown(Shutdown::Both),
            Connection::Tls(mut tls) => tls.shutdown(),
        }
    }
}

/// Connect to `host:port`, performing a TLS handshake when `secure` is set
///
/// Failures are never retried here.
pub fn connect(host: &str, port: u16, secure: bool, config: &TcpConfig) -> Result<Connection, NetError> {
    let wrap = |source: io::Error| NetError::Connection {
        host: host.to_string(),
        port,
        source,
    };

    let tcp = TcpConnection::connect(host, port, config).map_err(wrap)?;
    tracing::debug!("connected to {}:{} ({})", host, port, tcp.remote_addr());

    if secure {
        let tls = TlsStream::connect(tcp, host).map_err(wrap)?;
        Ok(Connection::Tls(Box::new(tls)))
    } else {
        Ok(Connection::Plain(tcp))
    }
}

impl Read for Connection {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Connection::Plain(s) => s.read(buf),
            Connection::Tls(s) => s.read(buf),
        }
    }
}

impl Write for Connection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Connection::Plain(s) => s.write(buf),
            Connection::Tls(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Connection::Plain(s) => s.flush(),
            Connection::Tls(s) => s.flush(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_connect_plain() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let conn = connect("127.0.0.1", port, false, &TcpConfig::default()).unwrap();
        assert!(!conn.is_secure());
    }

    #[test]
    fn test_close_plain_reaches_peer() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
            let mut buf = [0u8; 16];
            let _ = tx.send(stream.read(&mut buf).map_err(|e| e.kind()));
        });

        let conn = connect("127.0.0.1", port, false, &TcpConfig::default()).unwrap();
        conn.close().unwrap();

        // Peer sees EOF rather than a timeout
        assert_eq!(rx.recv_timeout(Duration::from_secs(10)).unwrap(), Ok(0));
    }

    #[test]
    fn test_connect_unresolvable_host() {
        let err = connect("no-such-host.invalid", 80, false, &TcpConfig::default())
            .err()
            .expect("lookup should fail");
        match err {
            NetError::Connection { host, port, .. } => {
                assert_eq!(host, "no-such-host.invalid");
                assert_eq!(port, 80);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
