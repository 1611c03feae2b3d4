use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

/// Command-line arguments for the pdfpress binary.
#[derive(Debug, Parser)]
#[command(name = "pdfpress", version, about = "HTML-to-PDF rendering service")]
pub struct Args {
    /// Path to a TOML configuration file.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Override the listen address.
    #[arg(long, value_name = "ADDR")]
    pub bind: Option<SocketAddr>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Emit JSON log lines.
    #[arg(long)]
    pub log_json: bool,

    /// Cap simultaneous renders; the default imposes no limit.
    #[arg(long, value_name = "COUNT")]
    pub max_concurrent: Option<usize>,
}

pub fn parse() -> Args {
    Args::parse()
}
