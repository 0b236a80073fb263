//! sunrise-sunset binary
//!
//! Thin CLI wrapper around the library. Parses arguments, sets up logging and
//! invokes `sunrise_sunset::run`.

use anyhow::Result;
use clap::Parser;
use sunrise_sunset::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    sunrise_sunset::init_tracing(&cli.log_level);
    sunrise_sunset::run(cli).await
}
