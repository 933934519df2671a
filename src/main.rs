//! cdnify - rewrite image references in HTML to CDN URLs.

mod cli;

use anyhow::Result;
use cdnify::{Rewriter, logger};
use clap::{ColorChoice, Parser};
use cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    cli.check()?;
    let config = cli::load_config(&cli)?;
    let rewriter = Rewriter::new(&config)?;
    cli::run(&cli, &rewriter)
}
