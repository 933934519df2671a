//! Command-line front end: argument parsing, config assembly, file I/O.

mod args;
mod run;

pub use args::Cli;
pub use run::run;

use anyhow::{Context, Result, bail};
use cdnify::RewriteConfig;
use cdnify::log;

/// Load the config file (if any) and apply command-line overrides.
pub fn load_config(cli: &Cli) -> Result<RewriteConfig> {
    let mut config = if cli.config.exists() {
        let config = RewriteConfig::from_path(&cli.config)
            .with_context(|| format!("failed to load `{}`", cli.config.display()))?;
        log!("config"; "loaded {}", cli.config.display());
        config
    } else if let Some(storage_id) = &cli.storage_id {
        RewriteConfig::new(storage_id.clone())
    } else {
        bail!(
            "config file `{}` not found and no --storage-id given",
            cli.config.display()
        );
    };

    if let Some(storage_id) = &cli.storage_id {
        config.storage_id = storage_id.clone();
    }
    if let Some(base_path) = &cli.base_path {
        config.base_path = base_path.clone();
    }
    if let Some(secret) = &cli.secret {
        config.secret = Some(secret.clone());
    }
    if let Some(cdn_domain) = &cli.cdn_domain {
        config.cdn_domain = cdn_domain.clone();
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_storage_id_without_file() {
        let cli = Cli::parse_from(["cdnify", "-C", "/nonexistent/cdnify.toml", "--storage-id", "s"]);
        let config = load_config(&cli).unwrap();
        assert_eq!(config, RewriteConfig::new("s"));
    }

    #[test]
    fn test_missing_file_and_storage_id() {
        let cli = Cli::parse_from(["cdnify", "-C", "/nonexistent/cdnify.toml"]);
        assert!(load_config(&cli).is_err());
    }

    #[test]
    fn test_flags_override_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "storage_id = \"disk\"\nbase_path = \"https://old.com\"").unwrap();
        let path = file.path().to_str().unwrap();

        let cli = Cli::parse_from(["cdnify", "-C", path, "--base-path", "https://new.com", "--secret", "k"]);
        let config = load_config(&cli).unwrap();
        assert_eq!(config.storage_id, "disk");
        assert_eq!(config.base_path, "https://new.com");
        assert_eq!(config.secret.as_deref(), Some("k"));
    }
}
