//! Declarative test modules loaded from `module.yaml` descriptors.
//!
//! A tests directory holds one subdirectory per module; each one containing a
//! `module.yaml` becomes a registered module whose testcase directory is that
//! subdirectory.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::HarnessConfig;
use crate::error::{Error, Result};
use crate::registry::{Registry, TestModule};
use crate::testcase::{TestFailure, TestResult};
use crate::wrapper::TestcaseWrapper;

/// Descriptor file name looked up in each module directory.
pub const MODULE_FILE: &str = "module.yaml";

/// One harness operation inside a testcase or prebuild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    Build,
    RunCompile,
    RunRun,
    RunValidator,
    Diff {
        actual: String,
        #[serde(default)]
        expected: Option<String>,
    },
    JsonDiff {
        actual: String,
        #[serde(default)]
        expected: Option<String>,
    },
    EmptyFile {
        file: String,
    },
    EmptyJsonDiff {
        file: String,
    },
    /// Shell command run with `sh -c` from the testcase directory.
    Command {
        run: String,
    },
}

impl Step {
    /// Executes the step against a testcase directory.
    pub fn execute(&self, wrapper: &TestcaseWrapper) -> Result<()> {
        match self {
            Step::Build => wrapper.build(),
            Step::RunCompile => wrapper.run_compile(),
            Step::RunRun => wrapper.run_run(),
            Step::RunValidator => wrapper.run_validator(),
            Step::Diff { actual, expected } => match expected {
                Some(expected) => wrapper.diff_with(actual, expected),
                None => wrapper.diff(actual),
            },
            Step::JsonDiff { actual, expected } => match expected {
                Some(expected) => wrapper.json_diff_with(actual, expected),
                None => wrapper.json_diff(actual),
            },
            Step::EmptyFile { file } => wrapper.empty_file(file),
            Step::EmptyJsonDiff { file } => wrapper.empty_json_diff(file),
            Step::Command { run } => run_shell(wrapper.path(), run),
        }
    }
}

/// Runs a shell command and fails on a nonzero exit.
fn run_shell(cwd: &Path, cmd: &str) -> Result<()> {
    tracing::debug!(cmd = %cmd, cwd = %cwd.display(), "running shell step");
    let status = Command::new("sh")
        .args(["-c", cmd])
        .current_dir(cwd)
        .status()
        .map_err(|source| Error::Spawn {
            program: "sh".to_string(),
            source,
        })?;

    if status.success() {
        Ok(())
    } else {
        Err(Error::ToolExit {
            step: format!("Command `{}`", cmd),
            code: status.code(),
        })
    }
}

/// Runs steps in order, stopping at the first failure.
fn run_steps(steps: &[Step], wrapper: &TestcaseWrapper) -> TestResult {
    for (index, step) in steps.iter().enumerate() {
        step.execute(wrapper)
            .map_err(|e| TestFailure::at_step(e, index + 1))?;
    }
    Ok(())
}

/// A declarative testcase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestcaseSpec {
    pub name: String,
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// A declarative test module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleSpec {
    /// Module name; defaults to the directory name.
    #[serde(default)]
    pub name: Option<String>,

    /// Build the grading executables during setup.
    #[serde(default = "default_build")]
    pub build: bool,

    /// Setup steps run once before the testcases.
    #[serde(default)]
    pub prebuild: Vec<Step>,

    #[serde(default)]
    pub testcases: Vec<TestcaseSpec>,

    /// Directory the descriptor was loaded from.
    #[serde(skip)]
    pub dir: PathBuf,
}

fn default_build() -> bool {
    true
}

impl ModuleSpec {
    /// Loads a descriptor from `<dir>/module.yaml`.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let path = dir.join(MODULE_FILE);
        let content = std::fs::read_to_string(&path).map_err(Error::Io)?;

        let mut spec: ModuleSpec = serde_yaml::from_str(&content).map_err(|e| {
            Error::Config(format!("failed to parse {}: {}", path.display(), e))
        })?;
        spec.dir = dir.to_path_buf();
        Ok(spec)
    }

    /// The module's name, falling back to its directory name.
    pub fn module_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| {
            self.dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        })
    }

    /// Turns the descriptor into a registrable module.
    pub fn into_module(self, config: Arc<HarnessConfig>) -> TestModule {
        let name = self.module_name();
        let mut module = TestModule::new(name, self.dir, config);
        module.with_build(self.build);

        if !self.prebuild.is_empty() {
            let steps = self.prebuild;
            module.prebuild(move |wrapper| run_steps(&steps, wrapper));
        }
        for testcase in self.testcases {
            let steps = testcase.steps;
            module.testcase(testcase.name, move |wrapper| run_steps(&steps, wrapper));
        }
        module
    }
}

/// Module descriptors found under a tests directory.
#[derive(Debug, Clone, Default)]
pub struct Suite {
    pub modules: Vec<ModuleSpec>,
}

impl Suite {
    /// Loads every immediate subdirectory of `tests_dir` that has a
    /// `module.yaml`, ordered by directory name.
    pub fn discover(tests_dir: impl AsRef<Path>) -> Result<Self> {
        let tests_dir = tests_dir.as_ref();
        let mut dirs = Vec::new();
        for entry in std::fs::read_dir(tests_dir)? {
            let path = entry?.path();
            if path.is_dir() && path.join(MODULE_FILE).is_file() {
                dirs.push(path);
            }
        }
        dirs.sort();

        let modules = dirs
            .iter()
            .map(|dir| ModuleSpec::load(dir))
            .collect::<Result<Vec<_>>>()?;
        tracing::debug!(
            tests_dir = %tests_dir.display(),
            count = modules.len(),
            "discovered test modules"
        );
        Ok(Self { modules })
    }

    pub fn names(&self) -> Vec<String> {
        self.modules.iter().map(ModuleSpec::module_name).collect()
    }

    /// Registers every module, in discovery order.
    pub fn into_registry(self, config: Arc<HarnessConfig>) -> Registry {
        let mut registry = Registry::new(config.clone());
        for spec in self.modules {
            registry.register(spec.into_module(config.clone()));
        }
        registry
    }
}
