//! URL Locator
//!
//! Splits a URL string into scheme, host, port and path.

use std::fmt;
use std::str::FromStr;

use crate::NetError;

/// Supported URL schemes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    Http,
    Https,
    File,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
            Scheme::File => "file",
        }
    }

    /// Port used when the URL does not name one
    pub fn default_port(&self) -> Option<u16> {
        match self {
            Scheme::Http => Some(80),
            Scheme::Https => Some(443),
            Scheme::File => None,
        }
    }

    /// Whether the connection is wrapped in TLS
    pub fn is_secure(&self) -> bool {
        matches!(self, Scheme::Https)
    }
}

impl FromStr for Scheme {
    type Err = NetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("http") {
            Ok(Scheme::Http)
        } else if s.eq_ignore_ascii_case("https") {
            Ok(Scheme::Https)
        } else if s.eq_ignore_ascii_case("file") {
            Ok(Scheme::File)
        } else {
            Err(NetError::UnsupportedScheme(s.to_string()))
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed URL
///
/// Network URLs always carry a host, a port and a path starting with `/`.
/// `file:` URLs carry only a filesystem path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedUrl {
    scheme: Scheme,
    host: Option<String>,
    port: Option<u16>,
    path: String,
}

impl ParsedUrl {
    /// Parse a URL string
    pub fn parse(input: &str) -> Result<Self, NetError> {
        let input = input.trim();

        let (scheme, rest) = input
            .split_once(':')
            .ok_or_else(|| NetError::InvalidUrl(format!("missing scheme: {input}")))?;
        let scheme: Scheme = scheme.parse()?;

        match scheme {
            Scheme::File => Ok(Self::parse_file(rest)),
            Scheme::Http | Scheme::Https => {
                let rest = rest
                    .strip_prefix("//")
                    .ok_or_else(|| NetError::InvalidUrl(format!("missing '//' after scheme: {input}")))?;
                Self::parse_network(scheme, rest)
            }
        }
    }

    fn parse_network(scheme: Scheme, rest: &str) -> Result<Self, NetError> {
        let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
        let (authority, target) = rest.split_at(end);

        // Fragments never go on the wire
        let target = target.split('#').next().unwrap_or_default();
        let path = if target.is_empty() {
            "/".to_string()
        } else if target.starts_with('?') {
            format!("/{target}")
        } else {
            target.to_string()
        };

        let host_port = authority
            .rsplit_once('@')
            .map_or(authority, |(_userinfo, host_port)| host_port);
        let (host, port) = split_host_port(host_port)?;

        Ok(Self {
            scheme,
            host: Some(host.to_string()),
            port: Some(port.or(scheme.default_port()).unwrap_or(80)),
            path,
        })
    }

    fn parse_file(rest: &str) -> Self {
        // Authority and path are concatenated, so `//` is the only thing to drop
        let rest = rest.strip_prefix("//").unwrap_or(rest);
        let end = rest.find(['?', '#']).unwrap_or(rest.len());

        Self {
            scheme: Scheme::File,
            host: None,
            port: None,
            path: rest[..end].trim_start().to_string(),
        }
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// Host as written in the URL (IPv6 literals keep their brackets)
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Request target for network URLs, filesystem path for `file:`
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Host suitable for DNS resolution and TLS server names
    pub fn connect_host(&self) -> Option<&str> {
        self.host()
            .map(|h| h.strip_prefix('[').and_then(|h| h.strip_suffix(']')).unwrap_or(h))
    }

    /// Value for the `Host` request header
    pub fn host_header(&self) -> String {
        let host = self.host().unwrap_or_default();
        match self.port {
            Some(port) if Some(port) != self.scheme.default_port() => format!("{host}:{port}"),
            _ => host.to_string(),
        }
    }
}

impl FromStr for ParsedUrl {
    type Err = NetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ParsedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.scheme {
            Scheme::File => write!(f, "file://{}", self.path),
            _ => write!(f, "{}://{}{}", self.scheme, self.host_header(), self.path),
        }
    }
}

fn split_host_port(host_port: &str) -> Result<(&str, Option<u16>), NetError> {
    let (host, port) = if host_port.starts_with('[') {
        let close = host_port
            .find(']')
            .ok_or_else(|| NetError::InvalidUrl(format!("unterminated IPv6 host: {host_port}")))?;
        let (host, after) = host_port.split_at(close + 1);
        match after.strip_prefix(':') {
            Some(port) => (host, Some(port)),
            None if after.is_empty() => (host, None),
            None => return Err(NetError::InvalidUrl(format!("invalid authority: {host_port}"))),
        }
    } else {
        match host_port.split_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (host_port, None),
        }
    };

    if host.is_empty() {
        return Err(NetError::InvalidUrl("empty host".into()));
    }

    let port = match port {
        None | Some("") => None,
        Some(p) => Some(
            p.parse::<u16>()
                .map_err(|_| NetError::InvalidUrl(format!("invalid port: {p}")))?,
        ),
    };

    Ok((host, port))
}
