//! Log setup: console plus a rotated file under `logs/`.
//!
//! On every startup the previous `plexorc.log` is renamed to a timestamped
//! file and at most `max_logs - 1` rotated files are kept alongside the
//! fresh current log, oldest removed first.

use anyhow::{Context, Result};
use chrono::Local;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_BASENAME: &str = "plexorc";

/// Rotate old logs and install the global subscriber. The returned guard
/// must be held for the lifetime of the process so buffered file output is
/// flushed on exit.
pub fn init(log_dir: &Path, max_logs: usize) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;
    rotate(log_dir, max_logs)?;

    let current = log_dir.join(format!("{LOG_BASENAME}.log"));
    let file = std::fs::File::create(&current)
        .with_context(|| format!("failed to create log file {}", current.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer),
        )
        .init();

    Ok(guard)
}

/// Rename the current log to a timestamped file and prune rotated logs
/// beyond the retention limit.
fn rotate(log_dir: &Path, max_logs: usize) -> Result<()> {
    let current = log_dir.join(format!("{LOG_BASENAME}.log"));
    if current.exists() {
        let ts = Local::now().format("%Y-%m-%d_%H-%M-%S");
        let rotated = log_dir.join(format!("{LOG_BASENAME}_{ts}.log"));
        std::fs::rename(&current, &rotated)
            .with_context(|| format!("failed to rotate {}", current.display()))?;
    }

    let mut rotated: Vec<(std::time::SystemTime, PathBuf)> = std::fs::read_dir(log_dir)?
        .flatten()
        .filter_map(|entry| {
            let path = entry.path();
            let name = path.file_name()?.to_str()?;
            if !name.starts_with(&format!("{LOG_BASENAME}_")) || !name.ends_with(".log") {
                return None;
            }
            let modified = entry.metadata().ok()?.modified().ok()?;
            Some((modified, path))
        })
        .collect();
    rotated.sort();

    // Keep max_logs - 1 rotated files plus the fresh current log.
    let keep = max_logs.saturating_sub(1);
    while rotated.len() > keep {
        let (_, oldest) = rotated.remove(0);
        std::fs::remove_file(&oldest)
            .with_context(|| format!("failed to prune old log {}", oldest.display()))?;
    }
    Ok(())
}
