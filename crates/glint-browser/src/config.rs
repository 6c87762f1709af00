//! Client configuration loaded from an optional TOML file.
//!
//! ```toml
//! user_agent = "glint/0.1"
//! max_redirects = 300
//!
//! [tcp]
//! connect_timeout = 5000   # milliseconds
//! read_timeout = 30000
//! ```

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use glint_net::ClientConfig;

/// Parse a config from TOML text; missing keys keep their defaults
pub fn parse_config(text: &str) -> Result<ClientConfig> {
    toml::from_str(text).context("invalid client config")
}

/// Load `path`, or the defaults when no path is given
pub fn load_config(path: Option<&Path>) -> Result<ClientConfig> {
    let Some(path) = path else {
        return Ok(ClientConfig::default());
    };

    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config = parse_config(&text).with_context(|| format!("in {}", path.display()))?;

    tracing::debug!("loaded config from {}", path.display());
    Ok(config)
}
