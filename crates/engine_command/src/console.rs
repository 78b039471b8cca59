//! The console front: a command registry plus the on-screen log.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::warn;

use crate::argument::Argument;
use crate::error::CommandError;
use crate::registry::CommandRegistry;
use crate::script::{self, ScriptReport};

/// Default number of lines kept by [`ConsoleLog`].
pub const DEFAULT_LOG_CAPACITY: usize = 64;

/// Ring of the most recent console lines, newest first.
///
/// Writers from unrelated call sites share one mutex, so each append and the
/// shift of older entries toward the tail happen atomically.
#[derive(Debug)]
pub struct ConsoleLog {
    capacity: usize,
    entries: Mutex<VecDeque<String>>,
}

impl ConsoleLog {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Mutex::new(VecDeque::with_capacity(capacity.max(1))),
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a line at the head, dropping the oldest entry when full.
    pub fn push(&self, line: impl Into<String>) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.push_front(line.into());
        entries.truncate(self.capacity);
    }

    /// Snapshot of the log, newest first.
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.iter().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Default for ConsoleLog {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}

/// A registry wired to a log: failed commands surface as one log line each.
#[derive(Debug)]
pub struct Console {
    registry: CommandRegistry,
    log: Arc<ConsoleLog>,
}

impl Console {
    #[must_use]
    pub fn new(registry: CommandRegistry, log: Arc<ConsoleLog>) -> Self {
        Self { registry, log }
    }

    #[must_use]
    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    #[must_use]
    pub fn log(&self) -> &Arc<ConsoleLog> {
        &self.log
    }

    /// Execute one line, logging `<line>: <error>` on failure.
    ///
    /// # Errors
    ///
    /// Returns the dispatch error after it has been logged.
    pub fn run_line(&self, extras: &[Argument], line: &str) -> Result<(), CommandError> {
        let line = line.trim();
        self.registry.execute(extras, line).inspect_err(|error| {
            warn!(line, %error, "command failed");
            self.log.push(format!("{line}: {error}"));
        })
    }

    /// Run a config-line script, logging each failing line.
    pub fn run_script(&self, extras: &[Argument], source: &str) -> ScriptReport {
        let report = script::run_script(&self.registry, extras, source);
        for failure in &report.failures {
            self.log.push(format!(
                "line {}: {}: {}",
                failure.line, failure.command, failure.error
            ));
        }
        report
    }
}
