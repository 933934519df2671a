//! Reading inputs, rewriting them, writing results.

use anyhow::{Context, Result, bail};
use cdnify::dom;
use cdnify::{RewriteStats, Rewriter, debug, log};
use rayon::prelude::*;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use super::Cli;

/// Rewrite the inputs named on the command line.
pub fn run(cli: &Cli, rewriter: &Rewriter) -> Result<()> {
    if cli.in_place {
        return rewrite_in_place(&cli.files, rewriter);
    }

    let input = if cli.reads_stdin() {
        let mut buf = Vec::new();
        io::stdin()
            .lock()
            .read_to_end(&mut buf)
            .context("failed to read stdin")?;
        buf
    } else {
        let path = &cli.files[0];
        fs::read(path).with_context(|| format!("failed to read `{}`", path.display()))?
    };

    let report = rewriter.rewrite_with_report(&dom::decode(&input));
    match &cli.output {
        Some(path) => fs::write(path, &report.html)
            .with_context(|| format!("failed to write `{}`", path.display()))?,
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(report.html.as_bytes())?;
            stdout.flush()?;
        }
    }

    log_stats(1, &report.stats);
    Ok(())
}

/// Rewrite each file in parallel, writing back only files that changed.
fn rewrite_in_place(files: &[PathBuf], rewriter: &Rewriter) -> Result<()> {
    let results: Vec<_> = files
        .par_iter()
        .map(|path| (path, rewrite_file(path, rewriter)))
        .collect();

    let mut total = RewriteStats::default();
    let mut failed = 0;
    for (path, result) in results {
        match result {
            Ok(stats) => {
                total.rewritten += stats.rewritten;
                total.ignored += stats.ignored;
                total.bypassed += stats.bypassed;
            }
            Err(e) => {
                log!("error"; "{}: {:#}", path.display(), e);
                failed += 1;
            }
        }
    }

    log_stats(files.len() - failed, &total);
    if failed > 0 {
        bail!("{failed} of {} files failed", files.len());
    }
    Ok(())
}

fn rewrite_file(path: &Path, rewriter: &Rewriter) -> Result<RewriteStats> {
    let input = fs::read(path).context("failed to read")?;
    let report = rewriter.rewrite_with_report(&dom::decode(&input));

    if report.stats.rewritten > 0 {
        fs::write(path, &report.html).context("failed to write")?;
        debug!("rewrite"; "{}: {} elements", path.display(), report.stats.rewritten);
    }
    Ok(report.stats)
}

fn log_stats(files: usize, stats: &RewriteStats) {
    log!(
        "done";
        "{} file(s), {} element(s) rewritten, {} ignored, {} bypassed",
        files, stats.rewritten, stats.ignored, stats.bypassed
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use cdnify::RewriteConfig;
    use tempfile::TempDir;

    fn rewriter() -> Rewriter {
        Rewriter::new(&RewriteConfig::new("s").with_base_path("https://a.com")).unwrap()
    }

    #[test]
    fn test_in_place() {
        let dir = TempDir::new().unwrap();
        let page = dir.path().join("page.html");
        let plain = dir.path().join("plain.html");
        fs::write(&page, r#"<img src="x.jpg">"#).unwrap();
        fs::write(&plain, "<p>no images</p>").unwrap();

        rewrite_in_place(&[page.clone(), plain.clone()], &rewriter()).unwrap();

        assert!(fs::read_to_string(&page).unwrap().contains("https://s.5gcdn.net/ext/auto"));
        assert_eq!(fs::read_to_string(&plain).unwrap(), "<p>no images</p>");
    }

    #[test]
    fn test_in_place_reports_missing_file() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.html");
        assert!(rewrite_in_place(&[missing], &rewriter()).is_err());
    }

    #[test]
    fn test_output_file() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in.html");
        let output = dir.path().join("out.html");
        fs::write(&input, "\u{feff}<img src=\"x.jpg\">").unwrap();

        let cli = <Cli as clap::Parser>::parse_from([
            "cdnify",
            "--storage-id",
            "s",
            "-o",
            output.to_str().unwrap(),
            input.to_str().unwrap(),
        ]);
        run(&cli, &rewriter()).unwrap();

        let out = fs::read_to_string(&output).unwrap();
        assert!(!out.starts_with('\u{feff}'));
        assert!(out.contains("src=https%3A%2F%2Fa.com%2Fx.jpg"));
    }
}
