//! Console configuration.

use std::path::PathBuf;

use engine_command::console::DEFAULT_LOG_CAPACITY;

/// Startup configuration for the console.
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    /// Lines kept in the console log.
    pub log_capacity: usize,
    /// Config-line scripts run at startup, in order.
    pub scripts: Vec<PathBuf>,
    /// Directory searched recursively for `.proto` descriptor files.
    pub schema_dir: Option<PathBuf>,
}

impl ConsoleConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            log_capacity: DEFAULT_LOG_CAPACITY,
            scripts: Vec::new(),
            schema_dir: None,
        }
    }

    #[must_use]
    pub fn with_log_capacity(mut self, capacity: usize) -> Self {
        self.log_capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_script(mut self, path: impl Into<PathBuf>) -> Self {
        self.scripts.push(path.into());
        self
    }

    #[must_use]
    pub fn with_schema_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.schema_dir = Some(dir.into());
        self
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self::new()
    }
}
