//! Command-line interface definitions.

use anyhow::{Result, bail};
use clap::{ColorChoice, Parser};
use std::path::{Path, PathBuf};

/// Rewrite image references in HTML to CDN URLs
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (optional when --storage-id is given)
    #[arg(short = 'C', long, default_value = "cdnify.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Override `storage_id`
    #[arg(long)]
    pub storage_id: Option<String>,

    /// Override `base_path`
    #[arg(long, value_hint = clap::ValueHint::Url)]
    pub base_path: Option<String>,

    /// Override `secret`
    #[arg(long)]
    pub secret: Option<String>,

    /// Override `cdn_domain`
    #[arg(long)]
    pub cdn_domain: Option<String>,

    /// Write output to file instead of stdout (single input only)
    #[arg(short, long, value_hint = clap::ValueHint::FilePath, conflicts_with = "in_place")]
    pub output: Option<PathBuf>,

    /// Rewrite every input file in place
    #[arg(short, long)]
    pub in_place: bool,

    /// Enable verbose output for debugging
    #[arg(short, long)]
    pub verbose: bool,

    /// HTML files to rewrite. Omit or use `-` to read stdin.
    #[arg(value_name = "FILE", value_hint = clap::ValueHint::FilePath)]
    pub files: Vec<PathBuf>,
}

impl Cli {
    /// Check if input comes from stdin.
    pub fn reads_stdin(&self) -> bool {
        match self.files.as_slice() {
            [] => true,
            [path] => path == Path::new("-"),
            _ => false,
        }
    }

    /// Reject argument combinations clap can't express.
    pub fn check(&self) -> Result<()> {
        if self.in_place {
            if self.files.is_empty() {
                bail!("--in-place needs at least one FILE");
            }
            if self.files.iter().any(|p| p == Path::new("-")) {
                bail!("--in-place can't rewrite stdin");
            }
        } else if self.files.len() > 1 {
            bail!("multiple inputs need --in-place");
        }
        Ok(())
    }
}
