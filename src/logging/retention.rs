use super::sink::LogSink;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use walkdir::WalkDir;

#[derive(Debug, Default, Clone)]
pub struct PruneReport {
    pub removed: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

impl PruneReport {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.failed.is_empty()
    }

    /// Report for a pass that could not scan `directory` at all.
    pub fn scan_failed(directory: &Path, error: &anyhow::Error) -> Self {
        Self {
            removed: Vec::new(),
            failed: vec![(directory.to_path_buf(), format!("{:#}", error))],
        }
    }
}

/// Deletes `*.log` files directly inside `directory` whose last
/// modification is more than `retention` before `now`.
pub fn prune_expired(directory: &Path, retention: Duration, now: SystemTime) -> Result<PruneReport> {
    let mut report = PruneReport::default();

    if !directory.exists() {
        return Ok(report);
    }

    for entry in WalkDir::new(directory).min_depth(1).max_depth(1) {
        let entry = entry
            .with_context(|| format!("Failed to scan log directory: {}", directory.display()))?;

        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("log") {
            continue;
        }

        let modified = entry
            .metadata()
            .map_err(std::io::Error::from)
            .and_then(|metadata| metadata.modified());
        let modified = match modified {
            Ok(modified) => modified,
            Err(e) => {
                report.failed.push((path.to_path_buf(), e.to_string()));
                continue;
            }
        };

        let expired = now
            .duration_since(modified)
            .map(|age| age > retention)
            .unwrap_or(false);
        if !expired {
            continue;
        }

        match fs::remove_file(path) {
            Ok(()) => report.removed.push(path.to_path_buf()),
            Err(e) => report.failed.push((path.to_path_buf(), e.to_string())),
        }
    }

    Ok(report)
}

pub fn log_report(report: &PruneReport) {
    for path in &report.removed {
        info!(path = %path.display(), "Deleted old log file");
    }
    for (path, error) in &report.failed {
        warn!(path = %path.display(), error = %error, "Failed to clean old log file");
    }
}

/// Re-runs the retention pass every `interval` until the handle is aborted.
pub fn spawn_retention_task(sink: Arc<LogSink>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // first tick completes immediately; startup already pruned
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match sink.prune() {
                Ok(report) => log_report(&report),
                Err(e) => warn!(error = %e, "Log retention pass failed"),
            }
        }
    })
}
