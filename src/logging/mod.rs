use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use colored::Colorize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl Level {
    fn tag(&self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }
}

/// Destination for log lines. Constructed once per process and passed down,
/// never registered globally.
pub trait LogSink: Send + Sync {
    fn log(&self, level: Level, message: &str);
}

/// Writes colorized lines to the terminal. Debug lines are dropped unless
/// verbose mode is on.
pub struct ConsoleSink {
    verbose: bool,
}

impl ConsoleSink {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl LogSink for ConsoleSink {
    fn log(&self, level: Level, message: &str) {
        match level {
            Level::Debug => {
                if self.verbose {
                    println!("{} {}", "DEBUG".dimmed(), message.dimmed());
                }
            }
            Level::Info => println!("{} {}", "INFO".green(), message),
            Level::Warn => println!("{} {}", "WARN".yellow(), message),
            Level::Error => println!("{} {}", "ERROR".red().bold(), message),
        }
    }
}

/// Keeps the most recent lines in memory. Backs the log panel of the
/// interactive console.
pub struct MemorySink {
    capacity: usize,
    lines: Mutex<VecDeque<String>>,
}

impl MemorySink {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            lines: Mutex::new(VecDeque::new()),
        }
    }

    /// The `count` most recent lines, oldest first.
    pub fn tail(&self, count: usize) -> Vec<String> {
        let lines = self.lines.lock().expect("log buffer poisoned");
        lines
            .iter()
            .skip(lines.len().saturating_sub(count))
            .cloned()
            .collect()
    }
}

impl LogSink for MemorySink {
    fn log(&self, level: Level, message: &str) {
        let mut lines = self.lines.lock().expect("log buffer poisoned");
        if lines.len() == self.capacity {
            lines.pop_front();
        }
        lines.push_back(format!("[{}] {}", level.tag(), message));
    }
}

/// Fans every line out to all attached sinks.
pub struct TeeSink {
    sinks: Vec<Arc<dyn LogSink>>,
}

impl TeeSink {
    pub fn new(sinks: Vec<Arc<dyn LogSink>>) -> Self {
        Self { sinks }
    }
}

impl LogSink for TeeSink {
    fn log(&self, level: Level, message: &str) {
        for sink in &self.sinks {
            sink.log(level, message);
        }
    }
}

/// Cheap handle around the process-wide sink.
#[derive(Clone)]
pub struct Logger {
    sink: Arc<dyn LogSink>,
}

impl Logger {
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self { sink }
    }

    pub fn debug(&self, message: &str) {
        self.sink.log(Level::Debug, message);
    }

    pub fn info(&self, message: &str) {
        self.sink.log(Level::Info, message);
    }

    pub fn warn(&self, message: &str) {
        self.sink.log(Level::Warn, message);
    }

    pub fn error(&self, message: &str) {
        self.sink.log(Level::Error, message);
    }
}
