//! glint Browser - Main Entry Point

use anyhow::{Context, Result};
use clap::Parser;

use glint_browser::{config, logging, strip_tags, Cli};
use glint_net::HttpClient;

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging();

    let config = config::load_config(cli.config.as_deref())?;
    let mut client = HttpClient::with_config(config);

    tracing::info!("Loading: {}", cli.url);
    let body = client
        .fetch_with_headers(&cli.url, &cli.headers)
        .with_context(|| format!("failed to load {}", cli.url))?;

    if cli.raw {
        print!("{body}");
    } else {
        print!("{}", strip_tags(&body));
    }

    Ok(())
}
