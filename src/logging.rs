//! Minimal logging plumbing on top of the `log` facade; binaries and tests
//! pick a backend, here `env_logger` in dev-dependencies.
//!
//! Covers the configured `std_message_level`/`file_message_level` pair: a
//! thread-id registry under a shared/exclusive lock, and per-log-file
//! writers each guarded by their own lock.
use log::LevelFilter;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::{Mutex, RwLock};
use std::thread::ThreadId;

/// `{none, fatal, error, warning, info, debug, trace, all}`, mapped onto
/// `log::LevelFilter`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLevel {
    None,
    Fatal,
    Error,
    Warning,
    Info,
    Debug,
    Trace,
    All,
}

impl MessageLevel {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Some(Self::None),
            "fatal" => Some(Self::Fatal),
            "error" => Some(Self::Error),
            "warning" => Some(Self::Warning),
            "info" => Some(Self::Info),
            "debug" => Some(Self::Debug),
            "trace" => Some(Self::Trace),
            "all" => Some(Self::All),
            _ => None,
        }
    }

    pub fn to_level_filter(self) -> LevelFilter {
        match self {
            Self::None => LevelFilter::Off,
            // "fatal" has no stdlib analogue; errors are the closest surviving level.
            Self::Fatal | Self::Error => LevelFilter::Error,
            Self::Warning => LevelFilter::Warn,
            Self::Info => LevelFilter::Info,
            Self::Debug => LevelFilter::Debug,
            Self::Trace | Self::All => LevelFilter::Trace,
        }
    }
}

/// Registry mapping the calling thread to a human-readable log id, e.g.
/// `"island-2"` or `"backprop-worker-3"`. Readers take the shared lock,
/// the one registering thread takes it exclusively.
#[derive(Default)]
pub struct ThreadLogIds {
    ids: RwLock<HashMap<ThreadId, String>>,
}

impl ThreadLogIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, id: impl Into<String>) {
        let mut guard = self.ids.write().expect("thread log id registry poisoned");
        guard.insert(std::thread::current().id(), id.into());
    }

    pub fn current(&self) -> String {
        let guard = self.ids.read().expect("thread log id registry poisoned");
        guard
            .get(&std::thread::current().id())
            .cloned()
            .unwrap_or_else(|| "main".to_string())
    }
}

/// A single log file sink guarded by a per-file lock.
pub struct FileSink {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
    max_message_length: usize,
}

impl FileSink {
    pub fn create(path: impl Into<PathBuf>, max_message_length: usize) -> std::io::Result<Self> {
        let path = path.into();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
            max_message_length,
        })
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Writes one already-formatted line, truncated to `max_message_length`.
    pub fn write_line(&self, thread_id: &str, level: &str, message: &str) {
        let mut truncated = message;
        if truncated.len() > self.max_message_length {
            truncated = &truncated[..self.max_message_length];
        }
        let mut guard = self.writer.lock().expect("log file writer poisoned");
        let _ = writeln!(guard, "[{thread_id}] {level}: {truncated}");
    }

    pub fn flush(&self) {
        let mut guard = self.writer.lock().expect("log file writer poisoned");
        let _ = guard.flush();
    }
}

/// Installs `std_message_level` as the global `log` filter. `write_to_file`
/// is realized by constructing a [`FileSink`] directly and writing to it from
/// call sites that care (the strategy/controller), rather than hooking a
/// second `log::Log` backend — keeps the one global logger slot free for the
/// binary/test harness's backend of choice.
pub fn init_stdout_filter(level: MessageLevel) {
    log::set_max_level(level.to_level_filter());
}
