//! Command-line arguments

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "glint-browser", version, about = "Load a URL and print its text")]
pub struct Cli {
    /// URL to load (http, https or file)
    pub url: String,

    /// Extra request header as `name: value` (repeatable)
    #[arg(short = 'H', long = "header", value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    /// Print the body as received instead of stripping tags
    #[arg(long)]
    pub raw: bool,

    /// TOML file with client settings
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

fn parse_header(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once(':')
        .ok_or_else(|| format!("expected `name: value`, got {s:?}"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("empty header name in {s:?}"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}
