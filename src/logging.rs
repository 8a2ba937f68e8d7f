use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

fn filter(verbose: bool) -> EnvFilter {
    let default_level = if verbose { "stepview=debug" } else { "stepview=warn" };
    // RUST_LOG wins when set and valid.
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Log to stderr; used by the one-shot subcommands.
pub fn init_stderr(verbose: bool) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(verbose))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub fn log_path() -> Option<PathBuf> {
    dirs::cache_dir().map(|d| d.join("stepview").join("stepview.log"))
}

/// Log to a file so the viewer's alternate screen stays clean.
pub fn init_file(verbose: bool) -> Result<()> {
    let Some(path) = log_path() else {
        return Ok(());
    };
    init_file_at(&path, verbose)
}

pub fn init_file_at(path: &Path, verbose: bool) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(verbose))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init();
    Ok(())
}
