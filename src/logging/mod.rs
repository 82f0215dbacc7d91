//! Structured event log for the dashboard (`~/.qpep-dash/dashboard-log.jsonl`).
//!
//! Every record is one JSON line with an RFC 3339 timestamp, a level, the
//! component that produced it and a free-form message. Writing is
//! best-effort: I/O failures are swallowed so logging never interrupts the
//! event loop. Tests use the in-memory sink and read the records back.

use std::cell::RefCell;
use std::fs::{OpenOptions, create_dir_all};
use std::io::Write;
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::schema::LoggingConfig;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Severity of a log record. Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl Level {
    /// Parse a level name; unknown names fall back to `info`.
    pub fn parse(val: &str) -> Self {
        match val.to_ascii_lowercase().as_str() {
            "debug" | "trace" => Self::Debug,
            "warn" | "warning" => Self::Warn,
            "error" => Self::Error,
            _ => Self::Info,
        }
    }
}

/// A single line of the event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    pub timestamp: String,
    pub level: Level,
    pub component: String,
    pub message: String,
}

// ---------------------------------------------------------------------------
// EventLog handle
// ---------------------------------------------------------------------------

enum Sink {
    Disabled,
    File(PathBuf),
    Memory(RefCell<Vec<LogRecord>>),
}

/// Cheaply cloneable logging handle shared by every dashboard component.
#[derive(Clone)]
pub struct EventLog {
    sink: Rc<Sink>,
    min_level: Level,
}

impl std::fmt::Debug for EventLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.sink.as_ref() {
            Sink::Disabled => "disabled",
            Sink::File(_) => "file",
            Sink::Memory(_) => "memory",
        };
        f.debug_struct("EventLog")
            .field("sink", &kind)
            .field("min_level", &self.min_level)
            .finish()
    }
}

impl EventLog {
    /// A log that drops everything.
    pub fn disabled() -> Self {
        Self {
            sink: Rc::new(Sink::Disabled),
            min_level: Level::Error,
        }
    }

    /// Append JSONL records to `path`.
    pub fn file(path: PathBuf, min_level: Level) -> Self {
        Self {
            sink: Rc::new(Sink::File(path)),
            min_level,
        }
    }

    /// Keep records in memory; see [`records`](Self::records).
    pub fn memory(min_level: Level) -> Self {
        Self {
            sink: Rc::new(Sink::Memory(RefCell::new(Vec::new()))),
            min_level,
        }
    }

    /// Build the log described by the `[logging]` config section.
    pub fn from_config(config: &LoggingConfig) -> Self {
        if !config.enabled {
            return Self::disabled();
        }
        match expand_home(&config.path) {
            Some(path) => Self::file(path, Level::parse(&config.level)),
            None => Self::disabled(),
        }
    }

    pub fn debug(&self, component: &str, message: impl AsRef<str>) {
        self.write(Level::Debug, component, message.as_ref());
    }

    pub fn info(&self, component: &str, message: impl AsRef<str>) {
        self.write(Level::Info, component, message.as_ref());
    }

    pub fn warn(&self, component: &str, message: impl AsRef<str>) {
        self.write(Level::Warn, component, message.as_ref());
    }

    pub fn error(&self, component: &str, message: impl AsRef<str>) {
        self.write(Level::Error, component, message.as_ref());
    }

    /// Records captured by a memory sink. Empty for every other sink.
    pub fn records(&self) -> Vec<LogRecord> {
        match self.sink.as_ref() {
            Sink::Memory(records) => records.borrow().clone(),
            _ => Vec::new(),
        }
    }

    fn write(&self, level: Level, component: &str, message: &str) {
        if level < self.min_level {
            return;
        }
        let record = LogRecord {
            timestamp: Utc::now().to_rfc3339(),
            level,
            component: component.to_string(),
            message: message.to_string(),
        };
        match self.sink.as_ref() {
            Sink::Disabled => {}
            Sink::File(path) => {
                let _ = append_record(path, &record);
            }
            Sink::Memory(records) => records.borrow_mut().push(record),
        }
    }
}

// ---------------------------------------------------------------------------
// File I/O
// ---------------------------------------------------------------------------

fn append_record(path: &PathBuf, record: &LogRecord) -> Result<()> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let json = serde_json::to_string(record)?;
    writeln!(file, "{json}")?;

    Ok(())
}

/// Expand a leading `~` to the home directory.
pub fn expand_home(path: &str) -> Option<PathBuf> {
    if let Some(rest) = path.strip_prefix("~/") {
        return dirs::home_dir().map(|home| home.join(rest));
    }
    if path == "~" {
        return dirs::home_dir();
    }
    Some(PathBuf::from(path))
}
