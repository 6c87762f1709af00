//! HTTP Response Cache
//!
//! Keeps response bodies keyed by the exact URL string they were requested
//! with, for as long as `Cache-Control: max-age` allows.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::http1::ResponseHeaders;

/// Cached response entry
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Response body
    pub body: String,
    /// Time when cached
    pub cached_at: Instant,
    /// Max age (time to live)
    pub max_age: Duration,
}

impl CacheEntry {
    /// Fresh while strictly less than `max_age` has passed since storing
    pub fn is_fresh_at(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.cached_at) < self.max_age
    }

    pub fn is_fresh(&self) -> bool {
        self.is_fresh_at(Instant::now())
    }

    /// Get remaining TTL
    pub fn ttl(&self) -> Duration {
        self.max_age.saturating_sub(self.cached_at.elapsed())
    }
}

/// What a `Cache-Control` value asks of this cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Directive {
    Store(Duration),
    NoStore,
    Ignore,
}

/// Only `no-store` and `max-age=<seconds>` are understood; anything else is ignored.
fn parse_cache_control(value: &str) -> Directive {
    let mut max_age = None;

    for directive in value.split(',').map(str::trim) {
        if directive.eq_ignore_ascii_case("no-store") {
            return Directive::NoStore;
        }
        if let Some((name, secs)) = directive.split_once('=') {
            if name.trim().eq_ignore_ascii_case("max-age") {
                max_age = secs.trim().trim_matches('"').parse::<u64>().ok();
            }
        }
    }

    max_age.map_or(Directive::Ignore, |secs| Directive::Store(Duration::from_secs(secs)))
}

/// Response cache
///
/// Stale entries are never evicted; `get` skips them and the next `put` for
/// the same URL overwrites them.
#[derive(Debug, Default)]
pub struct ResponseCache {
    entries: HashMap<String, CacheEntry>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a fresh cached body
    pub fn get(&self, url: &str) -> Option<&str> {
        self.get_at(url, Instant::now())
    }

    /// Like `get`, judging freshness at `now`
    pub fn get_at(&self, url: &str, now: Instant) -> Option<&str> {
        self.entries
            .get(url)
            .filter(|entry| entry.is_fresh_at(now))
            .map(|entry| entry.body.as_str())
    }

    /// Check if URL has a fresh entry
    pub fn contains(&self, url: &str) -> bool {
        self.get(url).is_some()
    }

    /// Store a response body according to its `Cache-Control` header
    ///
    /// Returns whether anything was stored. `no-store` wins over any
    /// `max-age` in the same header, so "max-age=60, no-store" is not stored.
    pub fn put(&mut self, url: &str, body: &str, headers: &ResponseHeaders) -> bool {
        let Some(cache_control) = headers.get("cache-control") else {
            return false;
        };

        match parse_cache_control(cache_control) {
            Directive::Store(max_age) => {
                tracing::debug!("caching {} for {}s", url, max_age.as_secs());
                self.insert(url, body, max_age);
                true
            }
            Directive::NoStore => {
                tracing::debug!("not caching {} (no-store)", url);
                false
            }
            Directive::Ignore => false,
        }
    }

    /// Store a body for a fixed duration, replacing any previous entry
    pub fn insert(&mut self, url: &str, body: &str, max_age: Duration) {
        self.entries.insert(url.to_string(), CacheEntry {
            body: body.to_string(),
            cached_at: Instant::now(),
            max_age,
        });
    }

    /// Raw entry, fresh or not
    pub fn entry(&self, url: &str) -> Option<&CacheEntry> {
        self.entries.get(url)
    }

    /// Number of stored entries, stale ones included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Clear all entries
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
