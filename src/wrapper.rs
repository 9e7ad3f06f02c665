//! Per-testcase facade for building, running and comparing.
//!
//! A [`TestcaseWrapper`] is bound to one testcase directory laid out as:
//!
//! ```text
//! <testcase>/
//!   data/        inputs and actual outputs (working directory of the executables)
//!   validation/  expected outputs
//!   log/         captured tool output
//!   build/       build-system intermediate files
//!   bin/         compile.out, run.out, validate.out
//! ```
//!
//! Bare file names given to the comparison helpers resolve against `data/`
//! (actual) and `validation/` (expected). Names that contain a directory
//! component are joined to the testcase directory as given.

use std::fs::File;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;

use crate::canonical::json_equivalent;
use crate::config::{HarnessConfig, BUNDLED_EMPTY_JSON};
use crate::error::{Error, Result};

/// Subdirectory holding actual outputs.
pub const DATA_DIR: &str = "data";
/// Subdirectory holding expected outputs.
pub const VALIDATION_DIR: &str = "validation";
pub const LOG_DIR: &str = "log";
pub const BUILD_DIR: &str = "build";
pub const BIN_DIR: &str = "bin";

/// Build tool configuration flag turning off assignment installation.
const ASSIGNMENT_INSTALLATION_OFF: &str = "-DASSIGNMENT_INSTALLATION=OFF";

/// Operations scoped to a single testcase directory.
#[derive(Debug, Clone)]
pub struct TestcaseWrapper {
    path: PathBuf,
    config: Arc<HarnessConfig>,
}

impl TestcaseWrapper {
    /// Binds a wrapper to `path`. Relative paths are made absolute against the
    /// current directory, since executables run from `data/`.
    pub fn new(path: impl Into<PathBuf>, config: Arc<HarnessConfig>) -> Self {
        let path = path.into();
        let path = if path.is_relative() {
            match std::env::current_dir() {
                Ok(cwd) => cwd.join(path),
                Err(_) => path,
            }
        } else {
            path
        };
        Self { path, config }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn data_dir(&self) -> PathBuf {
        self.path.join(DATA_DIR)
    }

    pub fn validation_dir(&self) -> PathBuf {
        self.path.join(VALIDATION_DIR)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.path.join(LOG_DIR)
    }

    pub fn build_dir(&self) -> PathBuf {
        self.path.join(BUILD_DIR)
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.path.join(BIN_DIR)
    }

    /// Resolves `name` against `default_dir` unless it already names a directory.
    pub fn resolve(&self, name: impl AsRef<Path>, default_dir: &str) -> PathBuf {
        let name = name.as_ref();
        if has_directory(name) {
            self.path.join(name)
        } else {
            self.path.join(default_dir).join(name)
        }
    }

    /// Builds the grading executables with the external build tool.
    ///
    /// Creates `log/`, `build/` and `bin/`, copies the build template into
    /// `build/CMakeLists.txt`, then runs the configuration and compilation steps
    /// from `build/`, capturing their output under `log/`.
    pub fn build(&self) -> Result<()> {
        for dir in [self.log_dir(), self.build_dir(), self.bin_dir()] {
            match std::fs::create_dir(&dir) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
                Err(source) => return Err(Error::Setup { path: dir, source }),
            }
        }

        let template = self.config.build_template();
        std::fs::copy(&template, self.build_dir().join("CMakeLists.txt"))
            .map_err(|source| Error::Setup {
                path: template.clone(),
                source,
            })?;

        self.run_logged(
            &self.config.tools.cmake,
            &[ASSIGNMENT_INSTALLATION_OFF, "."],
            &self.build_dir(),
            "cmake_output.txt",
            "Build (cmake)",
        )?;
        self.run_logged(
            &self.config.tools.make,
            &[],
            &self.build_dir(),
            "make_output.txt",
            "Build (make)",
        )
    }

    /// Runs `bin/compile.out` from `data/`.
    pub fn run_compile(&self) -> Result<()> {
        self.run_grading_binary("compile.out", "compile_output.txt", "Compile")
    }

    /// Runs `bin/run.out` from `data/`.
    pub fn run_run(&self) -> Result<()> {
        self.run_grading_binary("run.out", "run_output.txt", "run.out")
    }

    /// Runs `bin/validate.out` from `data/`.
    pub fn run_validator(&self) -> Result<()> {
        self.run_grading_binary("validate.out", "validate_output.txt", "Validator")
    }

    /// Byte-compares `data/<name>` with `validation/<name>`.
    pub fn diff(&self, name: impl AsRef<Path>) -> Result<()> {
        let (actual, expected) = self.resolve_pair(name.as_ref(), None);
        self.diff_paths(&actual, &expected)
    }

    /// Byte-compares an actual file with a differently named expected file.
    pub fn diff_with(&self, actual: impl AsRef<Path>, expected: impl AsRef<Path>) -> Result<()> {
        let (actual, expected) = self.resolve_pair(actual.as_ref(), Some(expected.as_ref()));
        self.diff_paths(&actual, &expected)
    }

    /// Compares `data/<name>` with `validation/<name>` as JSON, ignoring key
    /// order and element order.
    pub fn json_diff(&self, name: impl AsRef<Path>) -> Result<()> {
        let (actual, expected) = self.resolve_pair(name.as_ref(), None);
        json_diff_paths(&actual, &expected)
    }

    /// JSON comparison against a differently named expected file.
    pub fn json_diff_with(
        &self,
        actual: impl AsRef<Path>,
        expected: impl AsRef<Path>,
    ) -> Result<()> {
        let (actual, expected) = self.resolve_pair(actual.as_ref(), Some(expected.as_ref()));
        json_diff_paths(&actual, &expected)
    }

    /// Fails unless the named file exists and has zero length.
    pub fn empty_file(&self, name: impl AsRef<Path>) -> Result<()> {
        let path = self.resolve(name, DATA_DIR);
        if !path.is_file() {
            return Err(Error::ExpectedFile(path));
        }
        if std::fs::metadata(&path)?.len() != 0 {
            return Err(Error::NotEmpty(path));
        }
        Ok(())
    }

    /// JSON-compares the named file against the shared "empty" fixture.
    pub fn empty_json_diff(&self, name: impl AsRef<Path>) -> Result<()> {
        let actual = self.resolve(name, DATA_DIR);
        if let Some(fixture) = self.config.empty_json_fixture_file() {
            return json_diff_paths(&actual, &fixture);
        }

        let label = PathBuf::from("<bundled empty_json_diff_file.json>");
        tracing::debug!(actual = %actual.display(), "using bundled empty JSON fixture");
        let left = read_json(&actual)?;
        let right = serde_json::from_str(BUNDLED_EMPTY_JSON).map_err(|source| Error::Json {
            path: label.clone(),
            source,
        })?;
        compare_json(actual, label, &left, &right)
    }

    fn resolve_pair(&self, actual: &Path, expected: Option<&Path>) -> (PathBuf, PathBuf) {
        let expected = match expected {
            Some(expected) if !expected.as_os_str().is_empty() => expected.to_path_buf(),
            _ => actual
                .file_name()
                .map(PathBuf::from)
                .unwrap_or_else(|| actual.to_path_buf()),
        };
        (
            self.resolve(actual, DATA_DIR),
            self.resolve(expected, VALIDATION_DIR),
        )
    }

    fn diff_paths(&self, actual: &Path, expected: &Path) -> Result<()> {
        ensure_file(actual)?;
        ensure_file(expected)?;

        let program = &self.config.tools.diff;
        tracing::debug!(actual = %actual.display(), expected = %expected.display(), "diffing files");
        let output = Command::new(program)
            .arg(actual)
            .arg(expected)
            .output()
            .map_err(|source| Error::Spawn {
                program: program.clone(),
                source,
            })?;

        match output.status.code() {
            Some(0) => Ok(()),
            Some(1) => Err(Error::Diff {
                actual: actual.to_path_buf(),
                expected: expected.to_path_buf(),
                diff: String::from_utf8_lossy(&output.stdout).into_owned(),
            }),
            code => {
                tracing::warn!(
                    stderr = %String::from_utf8_lossy(&output.stderr),
                    "diff reported trouble"
                );
                Err(Error::ToolExit {
                    step: "diff".to_string(),
                    code,
                })
            }
        }
    }

    fn run_grading_binary(&self, binary: &str, log_name: &str, step: &str) -> Result<()> {
        let program = self.bin_dir().join(binary);
        let args = self.config.grading_args.to_args();
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        self.run_logged(program, &args, &self.data_dir(), log_name, step)
    }

    /// Runs `program` in `cwd` with stdout and stderr captured to `log/<log_name>`.
    fn run_logged(
        &self,
        program: impl AsRef<Path>,
        args: &[&str],
        cwd: &Path,
        log_name: &str,
        step: &str,
    ) -> Result<()> {
        let program = program.as_ref();
        let log = File::create(self.log_dir().join(log_name))?;
        let log_err = log.try_clone()?;

        tracing::debug!(
            program = %program.display(),
            args = ?args,
            cwd = %cwd.display(),
            "running {}",
            step
        );

        let status = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(log)
            .stderr(log_err)
            .status()
            .map_err(|source| Error::Spawn {
                program: program.display().to_string(),
                source,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(Error::ToolExit {
                step: step.to_string(),
                code: status.code(),
            })
        }
    }
}

fn has_directory(name: &Path) -> bool {
    name.parent()
        .map(|parent| !parent.as_os_str().is_empty())
        .unwrap_or(false)
}

fn ensure_file(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(Error::MissingFile(path.to_path_buf()))
    }
}

fn read_json(path: &Path) -> Result<serde_json::Value> {
    ensure_file(path)?;
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|source| Error::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn json_diff_paths(actual: &Path, expected: &Path) -> Result<()> {
    // Both files must exist before either is parsed.
    ensure_file(actual)?;
    ensure_file(expected)?;
    let left = read_json(actual)?;
    let right = read_json(expected)?;
    compare_json(actual.to_path_buf(), expected.to_path_buf(), &left, &right)
}

fn compare_json(
    actual: PathBuf,
    expected: PathBuf,
    left: &serde_json::Value,
    right: &serde_json::Value,
) -> Result<()> {
    if json_equivalent(left, right) {
        Ok(())
    } else {
        Err(Error::JsonMismatch { actual, expected })
    }
}
