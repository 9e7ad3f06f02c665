//! Error types for the autograding test harness.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for harness operations.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error outside of a more specific step.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to prepare a testcase directory (subdirectories, build template).
    #[error("setup failed for {}: {source}", .path.display())]
    Setup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An external program could not be started at all.
    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// An external program exited unsuccessfully.
    #[error("{step} exited with {}", describe_exit(.code))]
    ToolExit { step: String, code: Option<i32> },

    /// A file handed to a comparison does not exist.
    #[error("File {} does not exist", .0.display())]
    MissingFile(PathBuf),

    /// A file expected to exist (and be empty) is missing.
    #[error("File {} should exist", .0.display())]
    ExpectedFile(PathBuf),

    /// A file expected to be empty has content.
    #[error("File {} should be empty", .0.display())]
    NotEmpty(PathBuf),

    /// Byte-level comparison found differences.
    #[error(
        "Difference between {} and {} exited with exit code 1\n\nDiff:\n{diff}",
        .actual.display(),
        .expected.display()
    )]
    Diff {
        actual: PathBuf,
        expected: PathBuf,
        diff: String,
    },

    /// Canonicalized JSON documents differ.
    #[error("JSON files {} and {} are different", .actual.display(), .expected.display())]
    JsonMismatch { actual: PathBuf, expected: PathBuf },

    /// A JSON file could not be parsed.
    #[error("failed to parse JSON file {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Configuration or module descriptor error.
    #[error("configuration error: {0}")]
    Config(String),

    /// A module name was requested that nothing registered.
    #[error("unknown test module: {0}")]
    UnknownModule(String),
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

/// Result type alias for harness operations.
pub type Result<T> = std::result::Result<T, Error>;
