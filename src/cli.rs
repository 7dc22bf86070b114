//! This module implements the CLI interface for the demo negotiation
//! binary.

use clap::Parser;

/// Run a capability negotiation between two reference devices and print
/// the result.
#[derive(Parser, Debug)]
#[command(
    name = env!("CARGO_PKG_NAME"),
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS"),
    about = env!("CARGO_PKG_DESCRIPTION"),
    long_about = None
)]
pub struct Cli {
    /// Enable verbose logging. Can be specified multiple times to
    /// increase verbosity.
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Surface width in pixels.
    #[arg(long, default_value_t = 1920)]
    pub width: u32,

    /// Surface height in pixels.
    #[arg(long, default_value_t = 1080)]
    pub height: u32,

    /// Negotiate a display usage in addition to texture sampling.
    #[arg(long)]
    pub display: bool,
}
