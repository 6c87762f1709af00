//! TLS Layer
//!
//! Client-side TLS using rustls, verified against the Mozilla root store.

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::{Arc, OnceLock};

use rustls::{ClientConfig, ClientConnection, RootCertStore, StreamOwned};
use rustls::pki_types::ServerName;

use crate::tcp::TcpConnection;

/// Shared rustls configuration, built on first use
fn client_config() -> Arc<ClientConfig> {
    static CONFIG: OnceLock<Arc<ClientConfig>> = OnceLock::new();

    CONFIG
        .get_or_init(|| {
            let mut root_store = RootCertStore::empty();
            root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

            let mut config = ClientConfig::builder()
                .with_root_certificates(root_store)
                .with_no_client_auth();

            // Only HTTP/1.1 is spoken on top
            config.alpn_protocols = vec![b"http/1.1".to_vec()];

            Arc::new(config)
        })
        .clone()
}

/// TLS stream wrapper over TCP using rustls
pub struct TlsStream {
    stream: StreamOwned<ClientConnection, TcpStream>,
    server_name: String,
}

impl TlsStream {
    /// Run the handshake over an open TCP connection
    ///
    /// `server_name` is used for SNI and certificate verification.
    pub fn connect(tcp: TcpConnection, server_name: &str) -> io::Result<Self> {
        let name: ServerName<'static> = server_name
            .to_string()
            .try_into()
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, format!("invalid server name: {server_name}")))?;

        let mut conn = ClientConnection::new(client_config(), name)
            .map_err(io::Error::other)?;

        let mut sock = tcp.into_inner();
        while conn.is_handshaking() {
            conn.complete_io(&mut sock)?;
        }

        let stream = Self {
            stream: StreamOwned::new(conn, sock),
            server_name: server_name.to_string(),
        };
        tracing::debug!(
            "TLS established with {} ({})",
            stream.server_name(),
            stream.protocol_version().unwrap_or("Unknown")
        );

        Ok(stream)
    }

    /// Get server name
    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    /// Get negotiated protocol version
    pub fn protocol_version(&self) -> Option<&'static str> {
        self.stream.conn.protocol_version().map(|v| match v {
            rustls::ProtocolVersion::TLSv1_2 => "TLSv1.2",
            rustls::ProtocolVersion::TLSv1_3 => "TLSv1.3",
            _ => "Unknown",
        })
    }

    /// Send close_notify, then shut the socket down
    pub fn shutdown(&mut self) -> io::Result<()> {
        self.stream.conn.send_close_notify();
        self.stream.flush()?;
        self.stream.sock.shutdown(Shutdown::Both)
    }
}

impl Read for TlsStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.stream.read(buf) {
            // Plenty of servers drop the socket without close_notify; with
            // `connection: close` that is simply the end of the body.
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                tracing::debug!("{} closed without close_notify", self.server_name);
                Ok(0)
            }
            other => other,
        }
    }
}

impl Write for TlsStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}
