//! Config-line scripts: one command per line.
//!
//! Lines are trimmed; blank lines and lines starting with `#` are skipped.
//! A failing line is recorded and processing continues with the next one.

use tracing::{debug, warn};

use crate::argument::Argument;
use crate::error::CommandError;
use crate::registry::CommandRegistry;

/// A script line that failed to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptFailure {
    /// 1-based line number.
    pub line: usize,
    /// The trimmed command text.
    pub command: String,
    pub error: CommandError,
}

/// Outcome of running a script.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptReport {
    /// Number of lines that were dispatched, successful or not.
    pub executed: usize,
    pub failures: Vec<ScriptFailure>,
}

impl ScriptReport {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Run every command line in `source` against `registry`.
pub fn run_script(registry: &CommandRegistry, extras: &[Argument], source: &str) -> ScriptReport {
    let mut report = ScriptReport::default();

    for (index, raw) in source.lines().enumerate() {
        let command = raw.trim();
        if command.is_empty() || command.starts_with('#') {
            continue;
        }

        report.executed += 1;
        match registry.execute(extras, command) {
            Ok(()) => debug!(line = index + 1, command, "script line ok"),
            Err(error) => {
                warn!(line = index + 1, command, %error, "script line failed");
                report.failures.push(ScriptFailure {
                    line: index + 1,
                    command: command.to_string(),
                    error,
                });
            }
        }
    }

    report
}
