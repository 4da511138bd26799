use clap::{Args, Subcommand};
use anyhow::{Context, Result};
use crate::logging::{retention, LogCategory};
use crate::Config;
use std::fs;
use std::path::PathBuf;
use std::time::SystemTime;
use walkdir::WalkDir;

#[derive(Args)]
pub struct LogsArgs {
    #[command(subcommand)]
    pub command: LogsCommand,
}

#[derive(Subcommand)]
pub enum LogsCommand {
    /// Delete log files older than the retention window
    Prune {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// List log files with their category and size
    List {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

pub async fn run(args: LogsArgs) -> Result<()> {
    match args.command {
        LogsCommand::Prune { config } => {
            let cfg = Config::load(config.as_ref())?;
            let directory = &cfg.logging.directory;

            println!(
                "Pruning {} (retention: {} days)",
                directory.display(),
                cfg.logging.retention_days
            );

            let report = retention::prune_expired(directory, cfg.logging.retention(), SystemTime::now())?;
            for path in &report.removed {
                println!("  removed {}", path.display());
            }
            for (path, error) in &report.failed {
                println!("  [!] {}: {}", path.display(), error);
            }
            println!(" {} file(s) removed", report.removed.len());

            Ok(())
        }

        LogsCommand::List { config } => {
            let cfg = Config::load(config.as_ref())?;
            let directory = &cfg.logging.directory;

            if !directory.exists() {
                println!("No log directory at {}", directory.display());
                return Ok(());
            }

            let mut files = Vec::new();
            for entry in WalkDir::new(directory).min_depth(1).max_depth(1).sort_by_file_name() {
                let entry = entry.with_context(|| format!("Failed to read {}", directory.display()))?;
                let name = entry.file_name().to_string_lossy().into_owned();
                if !entry.file_type().is_file() || !name.ends_with(".log") {
                    continue;
                }
                let size = fs::metadata(entry.path()).map(|m| m.len()).unwrap_or(0);
                let category = LogCategory::from_file_name(&name)
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "other".to_string());
                files.push((category, size, name));
            }

            println!("{:<12} {:>12}  {}", "CATEGORY", "BYTES", "FILE");
            for (category, size, name) in &files {
                println!("{:<12} {:>12}  {}", category, size, name);
            }
            println!("\n{} file(s)", files.len());

            Ok(())
        }
    }
}
