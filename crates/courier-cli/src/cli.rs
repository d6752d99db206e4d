//! Command-line interface definitions and parsing

use std::path::PathBuf;

use clap::Parser;

/// The Courier chat relay daemon.
#[derive(Parser)]
#[command(name = "courierd", author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Address to bind the WebSocket listener to (overrides config)
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}
