//! Where the engine reports problems it recovers from.
//!
//! The sink is created by the host and handed to the game, which passes the
//! same instance to every scene. Nothing here is global.

use std::{
    cell::RefCell,
    time::SystemTime
};

use chrono::{
    DateTime,
    Local
};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum DebugLevel {
    Log,
    Warn,
    Error,
}

impl std::fmt::Display for DebugLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DebugLevel::Log => "LOG",
            DebugLevel::Warn => "WARN",
            DebugLevel::Error => "ERROR",
        };
        write!(f, "{name}")
    }
}

pub trait DebugSink {
    fn report(&self, level: DebugLevel, message: &str);

    fn log(&self, message: &str) {
        self.report(DebugLevel::Log, message);
    }

    fn warn(&self, message: &str) {
        self.report(DebugLevel::Warn, message);
    }

    fn error(&self, message: &str) {
        self.report(DebugLevel::Error, message);
    }
}

/// Forwards to the `log` facade.
#[derive(Debug, Default, Copy, Clone)]
pub struct LogSink;

impl DebugSink for LogSink {
    fn report(&self, level: DebugLevel, message: &str) {
        match level {
            DebugLevel::Log => log::info!("{message}"),
            DebugLevel::Warn => log::warn!("{message}"),
            DebugLevel::Error => log::error!("{message}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DebugEntry {
    pub time: SystemTime,
    pub level: DebugLevel,
    pub message: String,
}

impl DebugEntry {
    pub fn new<S: AsRef<str>>(level: DebugLevel, message: S) -> Self {
        Self {
            time: SystemTime::now(),
            level,
            message: message.as_ref().to_string(),
        }
    }
}

impl std::fmt::Display for DebugEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let datetime: DateTime<Local> = self.time.into();
        write!(f, "{} <{}> {}", datetime.format("%H:%M:%S"), self.level, self.message)
    }
}

/// Keeps every entry and also forwards it to `log`.
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: RefCell<Vec<DebugEntry>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<DebugEntry> {
        self.entries.borrow().clone()
    }

    pub fn count(&self, level: DebugLevel) -> usize {
        self.entries.borrow().iter().filter(|e| e.level == level).count()
    }

    pub fn contains<S: AsRef<str>>(&self, fragment: S) -> bool {
        self.entries.borrow().iter().any(|e| e.message.contains(fragment.as_ref()))
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}

impl DebugSink for MemorySink {
    fn report(&self, level: DebugLevel, message: &str) {
        LogSink.report(level, message);
        self.entries.borrow_mut().push(DebugEntry::new(level, message));
    }
}

#[test]
fn test_memory_sink_records_levels() {
    let sink = MemorySink::new();
    sink.log("scene ready");
    sink.warn("cannot remove non-existent entity 3");
    sink.error("collider requested with physics disabled");

    assert_eq!(sink.entries().len(), 3);
    assert_eq!(sink.count(DebugLevel::Warn), 1);
    assert!(sink.contains("non-existent"));
    assert!(!sink.contains("fatal"));

    sink.clear();
    assert!(sink.entries().is_empty());
}

#[test]
fn test_entry_display() {
    let entry = DebugEntry::new(DebugLevel::Warn, "camera 'map' does not exist");
    let line = entry.to_string();
    assert!(line.ends_with("<WARN> camera 'map' does not exist"), "{line}");
    // HH:MM:SS prefix
    assert_eq!(line.split(' ').next().map(str::len), Some(8));
}
