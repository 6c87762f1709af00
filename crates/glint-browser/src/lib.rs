//! glint Browser
//!
//! Command-line front end for glint-net: loads a page and prints its text.

pub mod cli;
pub mod config;
pub mod logging;
pub mod text;

pub use cli::Cli;
pub use text::strip_tags;
