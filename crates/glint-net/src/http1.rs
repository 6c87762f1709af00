//! HTTP/1.1 Framing
//!
//! Request serialization and response parsing for HTTP/1.1.
//!
//! Responses are read with connection-close semantics: everything after the
//! header block up to EOF is the body. Chunked transfer coding and content
//! codings are refused rather than decoded.

use std::collections::HashMap;
use std::fmt;
use std::io::{self, BufRead, Read, Write};

use crate::locator::ParsedUrl;
use crate::NetError;

/// Response headers that must not appear, since their decoding is not implemented
const UNSUPPORTED_ENCODING_HEADERS: [&str; 2] = ["transfer-encoding", "content-encoding"];

/// HTTP version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HttpVersion {
    Http10,
    #[default]
    Http11,
}

impl fmt::Display for HttpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpVersion::Http10 => write!(f, "HTTP/1.0"),
            HttpVersion::Http11 => write!(f, "HTTP/1.1"),
        }
    }
}

/// Request headers in emission order
///
/// Names are stored lowercased. Inserting a name that is already present
/// replaces its value without moving it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestHeaders {
    entries: Vec<(String, String)>,
}

impl RequestHeaders {
    /// Empty header set
    pub fn new() -> Self {
        Self::default()
    }

    /// The mandatory headers for `url`: host, connection, user-agent
    pub fn for_url(url: &ParsedUrl, user_agent: &str) -> Self {
        let mut headers = Self::new();
        headers.insert("host", &url.host_header());
        headers.insert("connection", "close");
        headers.insert("user-agent", user_agent);
        headers
    }

    /// Set a header, overriding an existing one of the same name in place
    pub fn insert(&mut self, name: &str, value: &str) {
        let name = name.to_lowercase();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.entries.push((name, value.to_string())),
        }
    }

    /// Merge caller-supplied headers in the order given
    pub fn extend<K: AsRef<str>, V: AsRef<str>>(&mut self, headers: &[(K, V)]) {
        for (name, value) in headers {
            self.insert(name.as_ref(), value.as_ref());
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        let name = name.to_lowercase();
        self.entries
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Serialize a `GET` request for `url`
pub fn serialize_request(url: &ParsedUrl, headers: &RequestHeaders) -> Vec<u8> {
    let mut req = format!("GET {} {}\r\n", url.path(), HttpVersion::Http11);

    for (name, value) in headers.iter() {
        req.push_str(name);
        req.push_str(": ");
        req.push_str(value);
        req.push_str("\r\n");
    }

    // End of headers
    req.push_str("\r\n");

    req.into_bytes()
}

/// Write a `GET` request for `url` to a stream
pub fn send_request<W: Write>(writer: &mut W, url: &ParsedUrl, headers: &RequestHeaders) -> io::Result<()> {
    writer.write_all(&serialize_request(url, headers))?;
    writer.flush()
}

/// Response headers keyed by lowercase name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseHeaders {
    map: HashMap<String, String>,
}

impl ResponseHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a header; a repeated name keeps the last value
    pub fn insert(&mut self, name: &str, value: &str) {
        self.map.insert(name.trim().to_lowercase(), value.trim().to_string());
    }

    /// Get header value (case-insensitive)
    pub fn get(&self, name: &str) -> Option<&str> {
        self.map.get(&name.to_lowercase()).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl<K: AsRef<str>, V: AsRef<str>> FromIterator<(K, V)> for ResponseHeaders {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Self::new();
        for (name, value) in iter {
            headers.insert(name.as_ref(), value.as_ref());
        }
        headers
    }
}

/// Status line and headers of a response
#[derive(Debug, Clone)]
pub struct ResponseHead {
    pub version: HttpVersion,
    pub status: u16,
    pub reason: String,
    pub headers: ResponseHeaders,
}

impl ResponseHead {
    /// Check if response is redirect (3xx)
    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }

    /// Get redirect location
    pub fn location(&self) -> Option<&str> {
        self.headers.get("location")
    }
}

/// Read the status line and header block
///
/// On success the reader is positioned at the first byte of the body.
pub fn read_response<R: BufRead>(reader: &mut R) -> Result<ResponseHead, NetError> {
    let mut line = String::new();
    if read_head_line(reader, &mut line)? == 0 {
        return Err(NetError::protocol("connection closed before status line"));
    }
    let (version, status, reason) = parse_status_line(&line)?;

    let mut headers = ResponseHeaders::new();
    loop {
        line.clear();
        read_head_line(reader, &mut line)?;

        let trimmed = line.trim_end_matches(['\r', '\n']);
        if trimmed.is_empty() {
            break;
        }

        match trimmed.split_once(':') {
            Some((name, value)) => headers.insert(name, value),
            None => tracing::warn!("skipping malformed header line: {:?}", trimmed),
        }
    }

    for name in UNSUPPORTED_ENCODING_HEADERS {
        if let Some(value) = headers.get(name) {
            return Err(NetError::UnsupportedEncoding {
                header: name.to_string(),
                value: value.to_string(),
            });
        }
    }

    Ok(ResponseHead {
        version,
        status,
        reason,
        headers,
    })
}

/// Read the rest of the stream, up to EOF
pub fn read_body<R: Read>(reader: &mut R) -> io::Result<Vec<u8>> {
    let mut body = Vec::new();
    reader.read_to_end(&mut body)?;
    Ok(body)
}

/// Body bytes as text; anything but UTF-8 is refused
pub fn decode_body(body: Vec<u8>) -> Result<String, NetError> {
    Ok(String::from_utf8(body)?)
}

fn read_head_line<R: BufRead>(reader: &mut R, line: &mut String) -> Result<usize, NetError> {
    reader
        .read_line(line)
        .map_err(|e| NetError::protocol(format!("reading response head: {e}")))
}

fn parse_status_line(line: &str) -> Result<(HttpVersion, u16, String), NetError> {
    let line = line.trim_end_matches(['\r', '\n']);
    let mut parts = line.splitn(3, ' ');

    let version = match parts.next() {
        Some("HTTP/1.0") => HttpVersion::Http10,
        Some("HTTP/1.1") => HttpVersion::Http11,
        _ => return Err(NetError::protocol(format!("invalid status line: {line:?}"))),
    };

    let status = parts
        .next()
        .and_then(|s| s.parse::<u16>().ok())
        .ok_or_else(|| NetError::protocol(format!("invalid status code: {line:?}")))?;

    // Reason phrase (optional)
    let reason = parts.next().unwrap_or("").to_string();

    Ok((version, status, reason))
}
