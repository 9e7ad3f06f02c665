//! Harness configuration.
//!
//! Paths default relative to the Submitty install directory, which can be
//! overridden with `SUBMITTY_INSTALL_DIR`. Setting `NO_COLOR` disables ANSI
//! styling in the console report.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Name of the build descriptor template inside the grading source directory.
pub const BUILD_TEMPLATE: &str = "Sample_CMakeLists.txt";

/// Copy of the "empty" JSON fixture compiled into the harness. Used when no
/// fixture is configured and the install tree does not provide one.
pub const BUNDLED_EMPTY_JSON: &str = include_str!("../fixtures/empty_json_diff_file.json");

/// External programs the harness delegates to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Build-system configuration step.
    #[serde(default = "default_cmake")]
    pub cmake: String,
    /// Build-system compilation step.
    #[serde(default = "default_make")]
    pub make: String,
    /// Byte-level diff utility.
    #[serde(default = "default_diff")]
    pub diff: String,
}

fn default_cmake() -> String {
    "cmake".to_string()
}

fn default_make() -> String {
    "make".to_string()
}

fn default_diff() -> String {
    "diff".to_string()
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            cmake: default_cmake(),
            make: default_make(),
            diff: default_diff(),
        }
    }
}

/// The four positional arguments every grading executable receives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradingArgs {
    #[serde(default = "default_assignment")]
    pub assignment: String,
    #[serde(default = "default_user")]
    pub user: String,
    #[serde(default = "default_submission")]
    pub submission: u32,
    #[serde(default)]
    pub version: u32,
}

fn default_assignment() -> String {
    "testassignment".to_string()
}

fn default_user() -> String {
    "testuser".to_string()
}

fn default_submission() -> u32 {
    1
}

impl Default for GradingArgs {
    fn default() -> Self {
        Self {
            assignment: default_assignment(),
            user: default_user(),
            submission: default_submission(),
            version: 0,
        }
    }
}

impl GradingArgs {
    /// Arguments in the order the executables expect them.
    pub fn to_args(&self) -> [String; 4] {
        [
            self.assignment.clone(),
            self.user.clone(),
            self.submission.to_string(),
            self.version.to_string(),
        ]
    }
}

/// Top-level harness configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Submitty install root.
    #[serde(default = "default_install_dir")]
    pub install_dir: PathBuf,
    /// Directory holding the build descriptor template.
    #[serde(default)]
    pub grading_source_dir: Option<PathBuf>,
    /// Directory receiving one run-log file per invocation.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    /// Reference "empty" JSON document used by `empty_json_diff`.
    #[serde(default)]
    pub empty_json_fixture: Option<PathBuf>,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub grading_args: GradingArgs,
    /// Emit ANSI styling on the console.
    #[serde(default = "default_color")]
    pub color: bool,
}

fn default_install_dir() -> PathBuf {
    PathBuf::from("/usr/local/submitty")
}

fn default_color() -> bool {
    true
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            install_dir: default_install_dir(),
            grading_source_dir: None,
            log_dir: None,
            empty_json_fixture: None,
            tools: ToolsConfig::default(),
            grading_args: GradingArgs::default(),
            color: default_color(),
        }
    }
}

impl HarnessConfig {
    /// Loads a configuration from a TOML file, then applies env overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(Error::Io)?;
        let config: Self = toml::from_str(&content).map_err(|e| {
            Error::Config(format!("failed to parse {}: {}", path.display(), e))
        })?;
        tracing::debug!(path = %path.display(), "loaded harness config");
        Ok(config.with_env_overrides())
    }

    /// Default configuration with env overrides applied.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(dir) = std::env::var("SUBMITTY_INSTALL_DIR") {
            if !dir.is_empty() {
                self.install_dir = PathBuf::from(dir);
            }
        }
        if std::env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty()) {
            self.color = false;
        }
        self
    }

    pub fn grading_source_dir(&self) -> PathBuf {
        self.grading_source_dir
            .clone()
            .unwrap_or_else(|| self.install_dir.join("src").join("grading"))
    }

    /// Full path of the build descriptor template.
    pub fn build_template(&self) -> PathBuf {
        self.grading_source_dir().join(BUILD_TEMPLATE)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.log_dir
            .clone()
            .unwrap_or_else(|| self.install_dir.join("test_suite").join("log"))
    }

    pub fn empty_json_fixture(&self) -> PathBuf {
        self.empty_json_fixture.clone().unwrap_or_else(|| {
            self.install_dir
                .join("test_suite")
                .join("integrationTests")
                .join("data")
                .join("empty_json_diff_file.json")
        })
    }

    /// Fixture file to compare against in `empty_json_diff`, or `None` when the
    /// bundled copy applies.
    ///
    /// An explicitly configured fixture is always used, even if it is missing,
    /// so that misconfiguration surfaces as a test failure.
    pub fn empty_json_fixture_file(&self) -> Option<PathBuf> {
        let path = self.empty_json_fixture();
        (self.empty_json_fixture.is_some() || path.is_file()).then_some(path)
    }

    /// Checks the configured paths.
    ///
    /// Fatal problems are joined into an [`Error::Config`]; otherwise the
    /// returned warnings describe things that will make individual modules fail.
    pub fn validate(&self) -> Result<Vec<String>> {
        let mut problems = Vec::new();
        let mut warnings = Vec::new();

        let template = self.build_template();
        if !template.is_file() {
            warnings.push(format!(
                "build template {} not found; builds will fail",
                template.display()
            ));
        }
        if let Some(fixture) = &self.empty_json_fixture {
            if !fixture.is_file() {
                warnings.push(format!("empty JSON fixture {} not found", fixture.display()));
            }
        }
        let tools = [&self.tools.cmake, &self.tools.make, &self.tools.diff];
        if tools.iter().any(|tool| tool.trim().is_empty()) {
            problems.push("tool program names cannot be empty");
        }
        if self.grading_args.assignment.trim().is_empty()
            || self.grading_args.user.trim().is_empty()
        {
            problems.push("grading assignment and user cannot be empty");
        }

        if problems.is_empty() {
            Ok(warnings)
        } else {
            Err(Error::Config(problems.join("; ")))
        }
    }
}
