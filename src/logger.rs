//! Run logger.
//!
//! Every report line goes to the console and is appended to a run-log file
//! named after the moment the first logger asked for it. The file is opened,
//! appended and closed on each call, so no handle outlives a write.

use std::fmt::Display;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use crate::config::HarnessConfig;
use crate::error::Result;
use crate::style::Style;

/// Run-log file name, fixed for the life of the process.
static RUN_STAMP: OnceLock<String> = OnceLock::new();

/// Returns the timestamp naming this process's run log (microsecond resolution).
pub fn run_stamp() -> &'static str {
    RUN_STAMP.get_or_init(|| chrono::Local::now().format("%Y%m%d%H%M%S%6f").to_string())
}

/// Console + file sink for the test report.
pub struct Logger {
    log_dir: PathBuf,
    color: bool,
    console: Mutex<Box<dyn Write + Send>>,
}

impl Logger {
    /// Creates a logger that writes to stdout and into `log_dir`.
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        Self::with_console(log_dir, Box::new(std::io::stdout()))
    }

    /// Creates a logger for the configured log directory and color setting.
    pub fn from_config(config: &HarnessConfig) -> Self {
        Self::new(config.log_dir()).with_color(config.color)
    }

    /// Creates a logger with a custom console writer.
    pub fn with_console(log_dir: impl Into<PathBuf>, console: Box<dyn Write + Send>) -> Self {
        Self {
            log_dir: log_dir.into(),
            color: true,
            console: Mutex::new(console),
        }
    }

    /// Enables or disables ANSI styling.
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    pub fn color(&self) -> bool {
        self.color
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// Path of the run-log file this logger appends to.
    pub fn log_file(&self) -> PathBuf {
        self.log_dir.join(run_stamp())
    }

    /// Logs one line.
    pub fn log(&self, message: impl Display) -> Result<()> {
        self.log_parts(&[&message], " ", "\n")
    }

    /// Logs without a trailing newline.
    pub fn log_inline(&self, message: impl Display) -> Result<()> {
        self.log_parts(&[&message], " ", "")
    }

    /// Joins `parts` with `separator`, appends `terminator`, and writes the
    /// result to the run log and the console.
    ///
    /// An unwritable log directory is reported to the caller.
    pub fn log_parts(&self, parts: &[&dyn Display], separator: &str, terminator: &str) -> Result<()> {
        let mut message = parts
            .iter()
            .map(|part| part.to_string())
            .collect::<Vec<_>>()
            .join(separator);
        message.push_str(terminator);

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.log_file())?;
        file.write_all(message.as_bytes())?;
        drop(file);

        self.write_console(&message)
    }

    /// Runs `f` inside a styled region; the reset is emitted on every exit path.
    pub fn styled<T>(&self, style: &Style, f: impl FnOnce(&Self) -> Result<T>) -> Result<T> {
        let _guard = style.apply(self)?;
        f(self)
    }

    /// Writes raw text to the console only. Escape sequences go through here
    /// so they never reach the run-log file.
    pub(crate) fn write_console(&self, text: &str) -> Result<()> {
        let mut console = self
            .console
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        console.write_all(text.as_bytes())?;
        console.flush()?;
        Ok(())
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("log_dir", &self.log_dir)
            .field("color", &self.color)
            .finish_non_exhaustive()
    }
}
