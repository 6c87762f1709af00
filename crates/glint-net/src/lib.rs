//! glint Networking
//!
//! Resource fetching over HTTP/1.1, HTTPS and `file:` URLs, with redirect
//! following and a `Cache-Control: max-age` response cache.

pub mod locator;
pub mod tcp;
pub mod tls;
pub mod transport;
pub mod http1;
pub mod cache;
pub mod client;

pub use locator::{ParsedUrl, Scheme};
pub use tcp::{TcpConnection, TcpConfig};
pub use tls::TlsStream;
pub use transport::{connect, Connection};
pub use http1::{send_request, read_response, read_body, decode_body, HttpVersion, RequestHeaders, ResponseHead, ResponseHeaders};
pub use cache::{CacheEntry, ResponseCache};
pub use client::{resolve_redirect, HttpClient, HttpClientBuilder, ClientConfig, DEFAULT_MAX_REDIRECTS, DEFAULT_USER_AGENT};

/// Fetch a URL with a fresh client and an empty cache
pub fn fetch(url: &str) -> Result<String, NetError> {
    HttpClient::new().fetch(url)
}

/// Network error
#[derive(Debug, thiserror::Error)]
pub enum NetError {
    #[error("Unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Connection to {host}:{port} failed: {source}")]
    Connection {
        host: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported response encoding: {header}: {value}")]
    UnsupportedEncoding { header: String, value: String },

    #[error("Too many redirects ({hops}) while fetching {url}")]
    RedirectLoop { url: String, hops: u32 },

    #[error("Invalid redirect from {url}: {reason}")]
    InvalidRedirect { url: String, reason: String },

    #[error("Failed to read {path}: {source}")]
    ResourceRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Response body is not valid UTF-8")]
    Decode(#[from] std::string::FromUtf8Error),
}

impl NetError {
    pub(crate) fn protocol(msg: impl Into<String>) -> Self {
        NetError::Protocol(msg.into())
    }
}
