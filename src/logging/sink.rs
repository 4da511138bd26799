//! Durable, date-partitioned log files.
//!
//! One file per (category, calendar date): `application-2024-03-05.log`,
//! `error-2024-03-05.log`. A write that would push the current file past
//! `max_file_size` first renames it to
//! `<category>-<date>-<rotation stamp>.log` and starts a fresh file under
//! the original name. Writes never fail from the caller's point of view;
//! I/O errors send the line to stderr instead.

use super::clock;
use super::retention::{self, PruneReport};
use crate::config::LoggingConfig;
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogCategory {
    Application,
    Error,
}

impl LogCategory {
    pub const ALL: [LogCategory; 2] = [LogCategory::Application, LogCategory::Error];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Application => "application",
            Self::Error => "error",
        }
    }

    /// Category a log file name belongs to, if any.
    pub fn from_file_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|category| name.starts_with(&format!("{}-", category.as_str())))
    }
}

impl fmt::Display for LogCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct SinkOptions {
    pub directory: PathBuf,
    pub max_file_size: u64,
    pub retention: Duration,
    pub utc_offset_hours: Option<i32>,
}

impl From<&LoggingConfig> for SinkOptions {
    fn from(config: &LoggingConfig) -> Self {
        Self {
            directory: config.directory.clone(),
            max_file_size: config.max_file_size,
            retention: config.retention(),
            utc_offset_hours: config.utc_offset_hours,
        }
    }
}

pub struct LogSink {
    options: SinkOptions,
    application: Mutex<CategoryFile>,
    error: Mutex<CategoryFile>,
}

impl LogSink {
    /// Creates the log directory and runs the startup retention pass.
    pub fn open(options: SinkOptions) -> Result<(Self, PruneReport)> {
        fs::create_dir_all(&options.directory).with_context(|| {
            format!("Failed to create log directory: {}", options.directory.display())
        })?;

        // An unreadable directory does not stop startup; the caller logs the report.
        let report = retention::prune_expired(&options.directory, options.retention, SystemTime::now())
            .unwrap_or_else(|e| PruneReport::scan_failed(&options.directory, &e));

        let sink = Self {
            application: Mutex::new(CategoryFile::new(LogCategory::Application)),
            error: Mutex::new(CategoryFile::new(LogCategory::Error)),
            options,
        };

        Ok((sink, report))
    }

    pub fn options(&self) -> &SinkOptions {
        &self.options
    }

    pub fn directory(&self) -> &Path {
        &self.options.directory
    }

    /// Appends `line` plus a newline to today's file for `category`.
    pub fn write(&self, category: LogCategory, line: &str) {
        self.write_at(category, line, Utc::now());
    }

    /// [`LogSink::write`] with an explicit clock reading.
    pub fn write_at(&self, category: LogCategory, line: &str, now: DateTime<Utc>) {
        // File I/O runs inline on the calling thread while the category lock is held.
        let mut slot = self.slot(category).lock();
        if let Err(e) = slot.append(&self.options, line, now) {
            slot.close();
            fallback(category, line, &e);
        }
    }

    pub fn prune(&self) -> Result<PruneReport> {
        retention::prune_expired(&self.options.directory, self.options.retention, SystemTime::now())
    }

    /// Path of the un-rotated file for `category` on `date`.
    pub fn path_for(&self, category: LogCategory, date: NaiveDate) -> PathBuf {
        file_path(&self.options.directory, category, date)
    }

    fn slot(&self, category: LogCategory) -> &Mutex<CategoryFile> {
        match category {
            LogCategory::Application => &self.application,
            LogCategory::Error => &self.error,
        }
    }
}

/// Open handle and tracked size of the current file for one category.
struct CategoryFile {
    category: LogCategory,
    date: Option<NaiveDate>,
    file: Option<File>,
    size: u64,
}

impl CategoryFile {
    fn new(category: LogCategory) -> Self {
        Self {
            category,
            date: None,
            file: None,
            size: 0,
        }
    }

    fn close(&mut self) {
        self.file = None;
        self.date = None;
        self.size = 0;
    }

    fn append(&mut self, options: &SinkOptions, line: &str, now: DateTime<Utc>) -> io::Result<()> {
        let date = clock::local_date(now, options.utc_offset_hours);
        if self.file.is_none() || self.date != Some(date) {
            self.open(&options.directory, date)?;
        }

        let mut record = String::with_capacity(line.len() + 1);
        record.push_str(line);
        record.push('\n');
        let needed = record.len() as u64;

        if self.size > 0 && self.size + needed > options.max_file_size {
            self.rotate(&options.directory, date, now)?;
        }

        let file = self
            .file
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "log file is not open"))?;
        file.write_all(record.as_bytes())?;
        self.size += needed;

        Ok(())
    }

    fn open(&mut self, directory: &Path, date: NaiveDate) -> io::Result<()> {
        self.file = None;
        let path = file_path(directory, self.category, date);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        self.size = file.metadata()?.len();
        self.file = Some(file);
        self.date = Some(date);
        Ok(())
    }

    fn rotate(&mut self, directory: &Path, date: NaiveDate, now: DateTime<Utc>) -> io::Result<()> {
        // handle must be closed before the rename
        self.file = None;

        let current = file_path(directory, self.category, date);
        let rotated = rotated_path(directory, self.category, date, now);
        fs::rename(&current, &rotated)?;

        self.open(directory, date)
    }
}

pub fn file_path(directory: &Path, category: LogCategory, date: NaiveDate) -> PathBuf {
    directory.join(format!("{}-{}.log", category, date.format("%Y-%m-%d")))
}

fn rotated_path(directory: &Path, category: LogCategory, date: NaiveDate, now: DateTime<Utc>) -> PathBuf {
    let stamp = now.format("%Y-%m-%dT%H-%M-%S-%3fZ");
    let base = format!("{}-{}-{}", category, date.format("%Y-%m-%d"), stamp);

    let mut candidate = directory.join(format!("{}.log", base));
    let mut n = 1;
    while candidate.exists() {
        candidate = directory.join(format!("{}-{}.log", base, n));
        n += 1;
    }
    candidate
}

/// Console channel of last resort. Writes straight to stderr, never
/// through `tracing`, so it cannot re-enter the sink.
fn fallback(category: LogCategory, line: &str, error: &io::Error) {
    let mut stderr = io::stderr().lock();
    let _ = writeln!(stderr, "Failed to write {} log: {}", category, error);
    let _ = writeln!(stderr, "{}", line);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Arc;
    use std::thread;

    fn options(dir: &Path, max_file_size: u64) -> SinkOptions {
        SinkOptions {
            directory: dir.to_path_buf(),
            max_file_size,
            retention: Duration::from_secs(30 * 24 * 60 * 60),
            utc_offset_hours: Some(0),
        }
    }

    fn log_files(dir: &Path, category: LogCategory) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .and_then(LogCategory::from_file_name)
                    == Some(category)
            })
            .collect();
        files.sort();
        files
    }

    #[test]
    fn test_write_creates_dated_file() {
        let dir = tempfile::tempdir().unwrap();
        let (sink, _) = LogSink::open(options(dir.path(), 1024)).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 10, 0, 0).unwrap();

        sink.write_at(LogCategory::Application, "first", now);
        sink.write_at(LogCategory::Application, "second", now);

        let path = dir.path().join("application-2024-03-05.log");
        assert_eq!(fs::read_to_string(path).unwrap(), "first\nsecond\n");
        assert!(log_files(dir.path(), LogCategory::Error).is_empty());
    }

    #[test]
    fn test_new_date_opens_new_file() {
        let dir = tempfile::tempdir().unwrap();
        let (sink, _) = LogSink::open(options(dir.path(), 1024)).unwrap();

        sink.write_at(LogCategory::Error, "late", Utc.with_ymd_and_hms(2024, 3, 5, 23, 59, 59).unwrap());
        sink.write_at(LogCategory::Error, "early", Utc.with_ymd_and_hms(2024, 3, 6, 0, 0, 1).unwrap());

        assert_eq!(fs::read_to_string(dir.path().join("error-2024-03-05.log")).unwrap(), "late\n");
        assert_eq!(fs::read_to_string(dir.path().join("error-2024-03-06.log")).unwrap(), "early\n");
    }

    #[test]
    fn test_rotation_bounds_file_size() {
        let dir = tempfile::tempdir().unwrap();
        let ceiling = 100;
        let (sink, _) = LogSink::open(options(dir.path(), ceiling)).unwrap();
        let line = "x".repeat(29); // 30 bytes with newline

        let mut now = Utc.with_ymd_and_hms(2024, 3, 5, 10, 0, 0).unwrap();
        for _ in 0..10 {
            sink.write_at(LogCategory::Application, &line, now);
            now = now + chrono::Duration::milliseconds(1);
        }

        let files = log_files(dir.path(), LogCategory::Application);
        assert!(files.len() >= 2, "{:?}", files);

        let mut total = 0;
        for file in &files {
            let size = fs::metadata(file).unwrap().len();
            assert!(size <= ceiling, "{} is {} bytes", file.display(), size);
            total += size;
        }
        assert_eq!(total, 300);
        assert!(dir.path().join("application-2024-03-05.log").exists());
    }

    #[test]
    fn test_rotation_in_same_millisecond_does_not_clobber() {
        let dir = tempfile::tempdir().unwrap();
        let (sink, _) = LogSink::open(options(dir.path(), 10)).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 10, 0, 0).unwrap();

        for i in 0..4 {
            sink.write_at(LogCategory::Application, &format!("line-{}", i), now);
        }

        let files = log_files(dir.path(), LogCategory::Application);
        assert_eq!(files.len(), 4);
        let contents: String = files.iter().map(|f| fs::read_to_string(f).unwrap()).collect();
        for i in 0..4 {
            assert!(contents.contains(&format!("line-{}", i)));
        }
    }

    #[test]
    fn test_oversized_line_still_written() {
        let dir = tempfile::tempdir().unwrap();
        let (sink, _) = LogSink::open(options(dir.path(), 8)).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 10, 0, 0).unwrap();

        sink.write_at(LogCategory::Error, "this line is longer than the ceiling", now);

        let content = fs::read_to_string(dir.path().join("error-2024-03-05.log")).unwrap();
        assert_eq!(content, "this line is longer than the ceiling\n");
    }

    #[test]
    fn test_existing_file_size_is_respected() {
        let dir = tempfile::tempdir().unwrap();
        let existing = dir.path().join("application-2024-03-05.log");
        fs::write(&existing, "y".repeat(95)).unwrap();

        let (sink, _) = LogSink::open(options(dir.path(), 100)).unwrap();
        sink.write_at(
            LogCategory::Application,
            "0123456789",
            Utc.with_ymd_and_hms(2024, 3, 5, 10, 0, 0).unwrap(),
        );

        assert_eq!(fs::read_to_string(&existing).unwrap(), "0123456789\n");
        assert_eq!(log_files(dir.path(), LogCategory::Application).len(), 2);
    }

    #[test]
    fn test_io_failure_is_swallowed() {
        let dir = tempfile::tempdir().unwrap();
        let (sink, _) = LogSink::open(options(dir.path(), 1024)).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 10, 0, 0).unwrap();

        // a directory where the log file should be makes the open fail
        fs::create_dir(dir.path().join("application-2024-03-05.log")).unwrap();
        sink.write_at(LogCategory::Application, "lost", now);

        // the other category keeps working
        sink.write_at(LogCategory::Error, "kept", now);
        assert_eq!(fs::read_to_string(dir.path().join("error-2024-03-05.log")).unwrap(), "kept\n");
    }

    #[test]
    fn test_concurrent_writers_never_interleave() {
        let dir = tempfile::tempdir().unwrap();
        let (sink, _) = LogSink::open(options(dir.path(), 4096)).unwrap();
        let sink = Arc::new(sink);

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let sink = Arc::clone(&sink);
                thread::spawn(move || {
                    for i in 0..50 {
                        let line = format!("thread-{}-line-{}-{}", t, i, "z".repeat(40));
                        sink.write(LogCategory::Application, &line);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let mut lines = 0;
        for file in log_files(dir.path(), LogCategory::Application) {
            let content = fs::read_to_string(&file).unwrap();
            assert!(fs::metadata(&file).unwrap().len() <= 4096);
            for line in content.lines() {
                assert!(line.starts_with("thread-"), "corrupt line: {}", line);
                assert!(line.ends_with(&"z".repeat(40)), "corrupt line: {}", line);
                lines += 1;
            }
        }
        assert_eq!(lines, 400);
    }

    #[test]
    fn test_category_from_file_name() {
        assert_eq!(
            LogCategory::from_file_name("application-2024-03-05.log"),
            Some(LogCategory::Application)
        );
        assert_eq!(
            LogCategory::from_file_name("error-2024-03-05-2024-03-05T10-00-00-000Z.log"),
            Some(LogCategory::Error)
        );
        assert_eq!(LogCategory::from_file_name("notes.txt"), None);
    }
}
