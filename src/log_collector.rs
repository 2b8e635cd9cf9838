//! Decoupled logging pipeline.
//!
//! # Architecture
//!
//! ```text
//! log::info!() / log::warn!() ...
//!     |
//! [LogCollector] (log::Log, non-blocking)
//!     | (crossbeam unbounded channel)
//!     v
//! [disk writer thread] ---> logs/cubegui-<date>.log
//!     |
//!     v
//! [tail] bounded in-memory buffer read by the UI log panel
//! ```
//!
//! Calculation workers log from their own threads; the channel keeps them
//! from ever blocking on disk I/O.

use chrono::Local;
use crossbeam_channel::{unbounded, Sender};
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::lock;

/// Lines kept for the UI
pub const DEFAULT_TAIL_CAPACITY: usize = 500;

/// Internal log line or special marker
enum LogMessage {
    Line(LogLine),
    /// Flush marker with channel sender to signal completion
    Flush(Sender<()>),
}

/// Get the logs path relative to the current working directory: ./logs
pub fn get_global_logs_path() -> Result<PathBuf, String> {
    let cwd = std::env::current_dir()
        .map_err(|e| format!("Failed to get current working directory: {}", e))?;
    Ok(cwd.join("logs"))
}

/// Ensure the logs directory exists
pub fn ensure_logs_dir_exists(log_dir: &Path) -> Result<(), String> {
    std::fs::create_dir_all(log_dir)
        .map_err(|e| format!("Failed to create logs directory: {}", e))
}

/// A log line with metadata
#[derive(Clone, Debug, PartialEq)]
pub struct LogLine {
    pub level: Level,
    pub message: String,
    /// Local time, `HH:MM:SS.mmm`
    pub timestamp: String,
}

impl LogLine {
    pub fn new(level: Level, message: String) -> Self {
        LogLine {
            level,
            message,
            timestamp: Local::now().format("%H:%M:%S%.3f").to_string(),
        }
    }

    fn formatted(&self) -> String {
        format!("[{}] [{}] {}\n", self.timestamp, self.level, self.message)
    }
}

/// Logger persisting every line to disk and keeping a tail for the UI.
#[derive(Clone)]
pub struct LogCollector {
    tx: Sender<LogMessage>,
    log_path: PathBuf,
    tail: Arc<Mutex<VecDeque<LogLine>>>,
    level: LevelFilter,
}

impl LogCollector {
    /// Creates the collector and its disk writer thread. The log file is
    /// `<log_dir>/cubegui-<YYYY-MM-DD>.log`, appended to if it exists.
    pub fn new(log_dir: &Path, level: LevelFilter, tail_capacity: usize) -> Result<Self, String> {
        ensure_logs_dir_exists(log_dir)?;
        let log_path = log_dir.join(format!("cubegui-{}.log", Local::now().format("%Y-%m-%d")));
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .map_err(|e| format!("Failed to open log file {}: {}", log_path.display(), e))?;

        let (tx, rx) = unbounded::<LogMessage>();
        let tail = Arc::new(Mutex::new(VecDeque::with_capacity(tail_capacity)));
        let tail_writer = Arc::clone(&tail);

        std::thread::Builder::new()
            .name("log-writer".to_string())
            .spawn(move || {
                while let Ok(msg) = rx.recv() {
                    match msg {
                        LogMessage::Line(line) => {
                            write_line(&mut file, &line);
                            let mut tail = lock::lock(&tail_writer);
                            if tail_capacity > 0 && tail.len() == tail_capacity {
                                tail.pop_front();
                            }
                            if tail_capacity > 0 {
                                tail.push_back(line);
                            }
                        }
                        LogMessage::Flush(done) => {
                            let _ = file.flush();
                            let _ = file.sync_data();
                            let _ = done.send(());
                        }
                    }
                }
                eprintln!("[Log] Disk writer thread shutting down");
            })
            .map_err(|e| format!("Failed to spawn log writer: {}", e))?;

        Ok(LogCollector {
            tx,
            log_path,
            tail,
            level,
        })
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Send a log line (non-blocking)
    pub fn log_line(&self, line: LogLine) {
        let _ = self.tx.send(LogMessage::Line(line));
    }

    /// Snapshot of the in-memory tail, oldest first
    pub fn tail(&self) -> Vec<LogLine> {
        lock::lock(&self.tail).iter().cloned().collect()
    }

    /// Blocks until every line sent before this call is on disk.
    pub fn flush_blocking(&self) -> Result<(), String> {
        let (tx, rx) = crossbeam_channel::bounded::<()>(1);
        self.tx
            .send(LogMessage::Flush(tx))
            .map_err(|e| format!("Failed to send flush marker: {}", e))?;
        rx.recv()
            .map_err(|e| format!("Flush signal interrupted: {}", e))
    }
}

fn write_line(file: &mut File, line: &LogLine) {
    let _ = file.write_all(line.formatted().as_bytes());
}

/// Wires all log::info!(), log::warn!() ... calls into the collector
impl Log for LogCollector {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            self.log_line(LogLine::new(record.level(), record.args().to_string()));
        }
    }

    fn flush(&self) {
        let _ = self.flush_blocking();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_log_collector_creates_file() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("logs");
        let collector = LogCollector::new(&dir, LevelFilter::Info, 10).unwrap();
        assert!(collector.log_path().exists());
        assert!(collector.log_path().starts_with(&dir));
    }

    #[test]
    fn test_unusable_log_dir_reports_logging_error() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("logs");
        std::fs::write(&blocker, "not a directory").unwrap();
        let err = match LogCollector::new(&blocker, LevelFilter::Info, 10) {
            Ok(_) => panic!("a file cannot hold log files"),
            Err(e) => crate::error::AppError::Logging(e),
        };
        assert!(err.user_message().starts_with("Logging unavailable"));
    }

    #[test]
    fn test_lines_reach_disk_after_flush() {
        let temp_dir = TempDir::new().unwrap();
        let collector = LogCollector::new(temp_dir.path(), LevelFilter::Info, 10).unwrap();
        for i in 0..100 {
            collector.log_line(LogLine::new(Level::Info, format!("Log message {}", i)));
        }
        collector.flush_blocking().unwrap();
        let content = std::fs::read_to_string(collector.log_path()).unwrap();
        assert!(content.contains("[INFO] Log message 0"));
        assert!(content.contains("Log message 99"));
    }

    #[test]
    fn test_tail_is_bounded() {
        let temp_dir = TempDir::new().unwrap();
        let collector = LogCollector::new(temp_dir.path(), LevelFilter::Info, 3).unwrap();
        for i in 0..5 {
            collector.log_line(LogLine::new(Level::Warn, format!("line {}", i)));
        }
        collector.flush_blocking().unwrap();
        let tail: Vec<String> = collector.tail().into_iter().map(|l| l.message).collect();
        assert_eq!(tail, vec!["line 2", "line 3", "line 4"]);
    }

    #[test]
    fn test_level_filter() {
        let temp_dir = TempDir::new().unwrap();
        let collector = LogCollector::new(temp_dir.path(), LevelFilter::Info, 3).unwrap();
        let debug = Metadata::builder().level(Level::Debug).build();
        let warn = Metadata::builder().level(Level::Warn).build();
        assert!(!collector.enabled(&debug));
        assert!(collector.enabled(&warn));
    }
}
