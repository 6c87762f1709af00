//! TCP Connection Layer
//!
//! Plain TCP streams with optional timeouts. Nothing is configured by default,
//! so an unresponsive peer blocks the caller until it goes away.

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// TCP connection configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TcpConfig {
    /// Connection timeout per resolved address
    #[serde(with = "millis")]
    pub connect_timeout: Option<Duration>,
    /// Read timeout
    #[serde(with = "millis")]
    pub read_timeout: Option<Duration>,
    /// Write timeout
    #[serde(with = "millis")]
    pub write_timeout: Option<Duration>,
    /// TCP nodelay (disable Nagle's algorithm)
    pub nodelay: bool,
}

impl Default for TcpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: None,
            read_timeout: None,
            write_timeout: None,
            nodelay: true,
        }
    }
}

/// TCP connection wrapper
#[derive(Debug)]
pub struct TcpConnection {
    stream: TcpStream,
    remote_addr: SocketAddr,
}

impl TcpConnection {
    /// Connect to `host:port`, trying every resolved address in turn
    pub fn connect(host: &str, port: u16, config: &TcpConfig) -> io::Result<Self> {
        let mut last_err = None;

        for addr in (host, port).to_socket_addrs()? {
            match Self::connect_to_addr(addr, config) {
                Ok(conn) => return Ok(conn),
                Err(e) => {
                    tracing::debug!("connect to {} failed: {}", addr, e);
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("no address found for {host}"))
        }))
    }

    /// Connect to a SocketAddr
    pub fn connect_to_addr(addr: SocketAddr, config: &TcpConfig) -> io::Result<Self> {
        let stream = match config.connect_timeout {
            Some(timeout) => TcpStream::connect_timeout(&addr, timeout)?,
            None => TcpStream::connect(addr)?,
        };

        stream.set_nodelay(config.nodelay)?;
        stream.set_read_timeout(config.read_timeout)?;
        stream.set_write_timeout(config.write_timeout)?;

        Ok(Self {
            stream,
            remote_addr: addr,
        })
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    /// Take the inner stream (for TLS upgrade)
    pub fn into_inner(self) -> TcpStream {
        self.stream
    }

    /// Shutdown the connection
    pub fn shutdown(&self, how: Shutdown) -> io::Result<()> {
        self.stream.shutdown(how)
    }
}

impl Read for TcpConnection {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }
}

impl Write for TcpConnection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}

/// Optional durations as whole milliseconds
mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_some(&(d.as_millis() as u64)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[test]
    fn test_tcp_config_default() {
        let config = TcpConfig::default();
        assert_eq!(config.connect_timeout, None);
        assert_eq!(config.read_timeout, None);
        assert!(config.nodelay);
    }

    #[test]
    fn test_connect_local() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let conn = TcpConnection::connect("127.0.0.1", port, &TcpConfig::default()).unwrap();
        assert_eq!(conn.remote_addr().port(), port);
    }

    #[test]
    fn test_connect_refused() {
        // Bind then drop to get a port nobody listens on
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        assert!(TcpConnection::connect("127.0.0.1", port, &TcpConfig::default()).is_err());
    }

    #[test]
    fn test_config_millis_serde() {
        let config: TcpConfig = serde_json::from_str(r#"{"read_timeout": 1500}"#).unwrap();
        assert_eq!(config.read_timeout, Some(Duration::from_millis(1500)));
        assert_eq!(config.connect_timeout, None);
        assert!(config.nodelay);
    }
}
