use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::LogConfig;

pub const LOG_ENV: &str = "MOVIE_SHELF_LOG";
const LOG_FILE_NAME: &str = "movie-shelf.log";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Stderr,
    /// The terminal UI owns the screen, so events go to a file.
    File,
}

fn filter(cfg: &LogConfig) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(&cfg.level))
        .unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Installs the global subscriber. Keep the returned guard alive until exit so
/// buffered file output is flushed.
pub fn init(cfg: &LogConfig, target: Target) -> Result<Option<WorkerGuard>> {
    match target {
        Target::Stderr => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter(cfg))
                .with_target(false)
                .with_writer(std::io::stderr)
                .try_init();
            Ok(None)
        }
        Target::File => {
            let path = cfg
                .file
                .clone()
                .or_else(default_log_path)
                .context("logging: resolve log file path")?;
            let (dir, name) = split_path(&path);
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("logging: create directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter(cfg))
                .with_ansi(false)
                .with_writer(writer)
                .try_init();
            Ok(Some(guard))
        }
    }
}

fn split_path(path: &Path) -> (PathBuf, String) {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| LOG_FILE_NAME.to_string());
    (dir, name)
}

pub fn default_log_path() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join("movie-shelf").join(LOG_FILE_NAME))
}
