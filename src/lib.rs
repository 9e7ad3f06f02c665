//! Autograde Tests - integration-test harness for autograding binaries
//!
//! Test modules are registered explicitly with a [`Registry`], each bound to a
//! testcase directory. The [`Runner`] builds the grading executables for every
//! requested module, runs its testcases in declaration order, compares outputs
//! against expected files, and reports to the console and a run-log file.

pub mod canonical;
pub mod config;
pub mod error;
pub mod logger;
pub mod registry;
pub mod runner;
pub mod style;
pub mod suite;
pub mod testcase;
pub mod wrapper;

pub use canonical::{json_equivalent, Canonical};
pub use config::{GradingArgs, HarnessConfig, ToolsConfig, BUNDLED_EMPTY_JSON};
pub use error::{Error, Result};
pub use logger::{run_stamp, Logger};
pub use registry::{Registry, TestModule};
pub use runner::{FailedTestcase, ModuleReport, RunSummary, Runner};
pub use style::{Style, StyleGuard};
pub use suite::{ModuleSpec, Step, Suite, TestcaseSpec};
pub use testcase::{FailureKind, FailureSite, Outcome, TestFailure, TestFn, TestResult, Testcase};
pub use wrapper::TestcaseWrapper;
