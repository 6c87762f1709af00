//! HTTP Client
//!
//! The fetch entry point: consults the response cache, reads `file:` URLs
//! from disk, performs HTTP(S) round trips and follows redirects up to a
//! fixed number of hops.

use std::io::{self, BufReader};

use serde::{Deserialize, Serialize};

use crate::cache::ResponseCache;
use crate::http1::{decode_body, read_body, read_response, send_request, RequestHeaders, ResponseHeaders};
use crate::locator::{ParsedUrl, Scheme};
use crate::tcp::TcpConfig;
use crate::transport;
use crate::NetError;

/// Redirect hops allowed before a fetch is abandoned
pub const DEFAULT_MAX_REDIRECTS: u32 = 300;

/// Default `user-agent` request header
pub const DEFAULT_USER_AGENT: &str = "glint/0.1";

/// HTTP client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// User agent string
    pub user_agent: String,
    /// Redirect depth at which a fetch fails
    pub max_redirects: u32,
    /// Socket settings
    pub tcp: TcpConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.into(),
            max_redirects: DEFAULT_MAX_REDIRECTS,
            tcp: TcpConfig::default(),
        }
    }
}

/// HTTP client builder
pub struct HttpClientBuilder {
    config: ClientConfig,
    cache: Option<ResponseCache>,
}

impl HttpClientBuilder {
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
            cache: None,
        }
    }

    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn user_agent(mut self, ua: &str) -> Self {
        self.config.user_agent = ua.to_string();
        self
    }

    pub fn max_redirects(mut self, max: u32) -> Self {
        self.config.max_redirects = max;
        self
    }

    pub fn tcp(mut self, tcp: TcpConfig) -> Self {
        self.config.tcp = tcp;
        self
    }

    /// Use an existing cache instead of an empty one
    pub fn cache(mut self, cache: ResponseCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn build(self) -> HttpClient {
        HttpClient::with_cache(self.config, self.cache.unwrap_or_default())
    }
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// What one network round trip produced
enum Outcome {
    Redirect(Option<String>),
    Body { body: String, headers: ResponseHeaders },
}

/// HTTP client
///
/// Owns the response cache, so sharing one client between threads needs a
/// `Mutex` around it.
pub struct HttpClient {
    config: ClientConfig,
    cache: ResponseCache,
}

impl HttpClient {
    /// Create a new HTTP client with default settings
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Create a client builder
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::new()
    }

    /// Create with custom config and an empty cache
    pub fn with_config(config: ClientConfig) -> Self {
        Self::with_cache(config, ResponseCache::new())
    }

    /// Create with custom config and cache
    pub fn with_cache(config: ClientConfig, cache: ResponseCache) -> Self {
        Self { config, cache }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut ResponseCache {
        &mut self.cache
    }

    /// Fetch a URL and return its body
    pub fn fetch(&mut self, url: &str) -> Result<String, NetError> {
        const NO_HEADERS: &[(&str, &str)] = &[];
        self.fetch_with_headers(url, NO_HEADERS)
    }

    /// Fetch a URL, sending extra request headers on the first hop only
    ///
    /// Headers are lowercased and override the built-in `host`, `connection`
    /// and `user-agent` values. They are not forwarded across redirects.
    ///
    /// A server may redirect to a `file:` URL, in which case the local file
    /// is read and returned.
    pub fn fetch_with_headers<K: AsRef<str>, V: AsRef<str>>(
        &mut self,
        url: &str,
        headers: &[(K, V)],
    ) -> Result<String, NetError> {
        tracing::info!("GET {}", url);

        let mut current = url.to_string();
        let mut extra = RequestHeaders::new();
        extra.extend(headers);
        let mut depth = 0;

        loop {
            if let Some(body) = self.cache.get(&current) {
                tracing::debug!("cache hit for {}", current);
                return Ok(body.to_string());
            }

            if depth >= self.config.max_redirects {
                return Err(NetError::RedirectLoop {
                    url: url.to_string(),
                    hops: depth,
                });
            }

            let parsed = ParsedUrl::parse(&current)?;
            if parsed.scheme() == Scheme::File {
                return read_file(&parsed);
            }

            match self.round_trip(&parsed, &extra)? {
                Outcome::Redirect(location) => {
                    let location = location.ok_or_else(|| NetError::InvalidRedirect {
                        url: current.clone(),
                        reason: "missing location header".into(),
                    })?;
                    let next = resolve_redirect(&current, &location)?;
                    tracing::debug!("redirect {} -> {} (hop {})", current, next, depth + 1);

                    current = next;
                    extra = RequestHeaders::new();
                    depth += 1;
                }
                Outcome::Body { body, headers } => {
                    self.cache.put(&current, &body, &headers);
                    return Ok(body);
                }
            }
        }
    }

    fn round_trip(&self, url: &ParsedUrl, extra: &RequestHeaders) -> Result<Outcome, NetError> {
        let (Some(host), Some(port)) = (url.connect_host(), url.port()) else {
            return Err(NetError::InvalidUrl(format!("no host in {url}")));
        };

        let mut conn = transport::connect(host, port, url.scheme().is_secure(), &self.config.tcp)?;

        let mut headers = RequestHeaders::for_url(url, &self.config.user_agent);
        for (name, value) in extra.iter() {
            headers.insert(name, value);
        }
        send_request(&mut conn, url, &headers).map_err(|e| connection_lost(url, e))?;

        let mut reader = BufReader::new(conn);
        let head = read_response(&mut reader)?;
        tracing::debug!("{} {} {} for {}", head.version, head.status, head.reason, url);

        if head.is_redirect() {
            close(reader.into_inner(), url);
            return Ok(Outcome::Redirect(head.location().map(str::to_string)));
        }

        let body = read_body(&mut reader).map_err(|e| connection_lost(url, e))?;
        close(reader.into_inner(), url);

        Ok(Outcome::Body {
            body: decode_body(body)?,
            headers: head.headers,
        })
    }
}

/// I/O failure on an established connection
fn connection_lost(url: &ParsedUrl, source: io::Error) -> NetError {
    NetError::Connection {
        host: url.connect_host().unwrap_or_default().to_string(),
        port: url.port().unwrap_or_default(),
        source,
    }
}

/// The response is complete by now, so a failed close is only logged
fn close(conn: transport::Connection, url: &ParsedUrl) {
    if let Err(e) = conn.close() {
        tracing::debug!("closing connection for {} failed: {}", url, e);
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve a `Location` value against the URL that produced it
pub fn resolve_redirect(base_url: &str, location: &str) -> Result<String, NetError> {
    let invalid = |reason: String| NetError::InvalidRedirect {
        url: base_url.to_string(),
        reason,
    };

    let base = url::Url::parse(base_url).map_err(|e| invalid(e.to_string()))?;
    let target = base
        .join(location)
        .map_err(|e| invalid(format!("{location:?}: {e}")))?;

    Ok(target.into())
}

fn read_file(url: &ParsedUrl) -> Result<String, NetError> {
    tracing::debug!("reading {}", url.path());

    std::fs::read_to_string(url.path()).map_err(|source| NetError::ResourceRead {
        path: url.path().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_client_builder() {
        let client = HttpClient::builder()
            .user_agent("TestAgent/1.0")
            .max_redirects(5)
            .build();

        assert_eq!(client.config().user_agent, "TestAgent/1.0");
        assert_eq!(client.config().max_redirects, 5);
        assert!(client.cache().is_empty());
    }

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(config.max_redirects, 300);
        assert_eq!(config.tcp, TcpConfig::default());
    }

    #[test]
    fn test_config_from_json() {
        let config: ClientConfig = serde_json::from_str(r#"{"max_redirects": 20}"#).unwrap();
        assert_eq!(config.max_redirects, 20);
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
    }

    #[test]
    fn test_redirect_resolution() {
        assert_eq!(resolve_redirect("http://a.com/x/y", "../z").unwrap(), "http://a.com/z");
        assert_eq!(
            resolve_redirect("http://example.com/old/path", "/new/path").unwrap(),
            "http://example.com/new/path"
        );
        assert_eq!(
            resolve_redirect("http://example.com/page", "https://other.com/new").unwrap(),
            "https://other.com/new"
        );
        assert_eq!(
            resolve_redirect("https://example.com:8443/a/b", "c?d=1").unwrap(),
            "https://example.com:8443/a/c?d=1"
        );
        assert_eq!(
            resolve_redirect("http://example.com/a", "//cdn.example.com/lib.js").unwrap(),
            "http://cdn.example.com/lib.js"
        );
    }

    #[test]
    fn test_redirect_resolution_errors() {
        assert!(matches!(
            resolve_redirect("not a url", "/x"),
            Err(NetError::InvalidRedirect { .. })
        ));
        assert!(matches!(
            resolve_redirect("http://a.com/", "http://[bad"),
            Err(NetError::InvalidRedirect { .. })
        ));
    }

    #[test]
    fn test_fetch_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "<p>hello</p>").unwrap();
        let url = format!("file://{}", file.path().display());

        let mut client = HttpClient::new();
        assert_eq!(client.fetch(&url).unwrap(), "<p>hello</p>");
        assert!(client.cache().is_empty());
    }

    #[test]
    fn test_fetch_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("file://{}/missing.html", dir.path().display());

        match HttpClient::new().fetch(&url) {
            Err(NetError::ResourceRead { path, .. }) => assert!(path.ends_with("missing.html")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_cache_checked_first() {
        let mut client = HttpClient::new();
        client
            .cache_mut()
            .insert("http://unreachable.invalid/", "cached", std::time::Duration::from_secs(60));

        assert_eq!(client.fetch("http://unreachable.invalid/").unwrap(), "cached");
    }

    #[test]
    fn test_injected_cache() {
        let mut cache = ResponseCache::new();
        cache.insert("https://a.invalid/", "warm", std::time::Duration::from_secs(60));

        let mut client = HttpClient::builder().cache(cache).build();
        assert_eq!(client.fetch("https://a.invalid/").unwrap(), "warm");
    }

    #[test]
    fn test_connection_lost_names_peer() {
        let url = ParsedUrl::parse("https://[::1]:8443/x").unwrap();
        let err = connection_lost(&url, io::Error::from(io::ErrorKind::ConnectionReset));

        match err {
            NetError::Connection { host, port, source } => {
                assert_eq!(host, "::1");
                assert_eq!(port, 8443);
                assert_eq!(source.kind(), io::ErrorKind::ConnectionReset);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_unsupported_scheme() {
        assert!(matches!(
            HttpClient::new().fetch("gopher://example.org/"),
            Err(NetError::UnsupportedScheme(_))
        ));
    }
}
