//! Sequential test runner and run summary.
//!
//! Modules run in the order requested. For each one the runner performs the
//! setup phase (prebuild, then the build when enabled) and, if setup
//! succeeded, every testcase in declaration order. A failing testcase never
//! stops the ones after it; a failing setup skips the whole module.

use crate::error::{Error, Result};
use crate::logger::Logger;
use crate::registry::{Registry, TestModule};
use crate::style::Style;
use crate::testcase::{FailureSite, Outcome, TestFailure, Testcase};

/// A testcase failure as reported in the summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedTestcase {
    /// 1-based position within the module.
    pub index: usize,
    pub name: String,
    pub site: FailureSite,
    pub message: String,
}

/// Per-module result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleReport {
    pub name: String,
    /// Set when setup failed and no testcase ran.
    pub setup_error: Option<String>,
    pub attempted: usize,
    pub passed: usize,
    pub failures: Vec<FailedTestcase>,
}

impl ModuleReport {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            setup_error: None,
            attempted: 0,
            passed: 0,
            failures: Vec::new(),
        }
    }

    pub fn passed(&self) -> bool {
        self.setup_error.is_none() && self.passed == self.attempted
    }
}

/// Result of one `run_tests` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub modules: Vec<ModuleReport>,
}

impl RunSummary {
    pub fn modules_attempted(&self) -> usize {
        self.modules.len()
    }

    pub fn modules_passed(&self) -> usize {
        self.modules.iter().filter(|m| m.passed()).count()
    }

    pub fn all_passed(&self) -> bool {
        self.modules_passed() == self.modules_attempted()
    }

    /// Process exit status for this run: 0 when everything passed, else 1.
    pub fn exit_code(&self) -> i32 {
        if self.all_passed() {
            0
        } else {
            1
        }
    }

    pub fn module(&self, name: &str) -> Option<&ModuleReport> {
        self.modules.iter().find(|m| m.name == name)
    }
}

/// Runs registered modules and reports through a [`Logger`].
pub struct Runner<'a> {
    registry: &'a Registry,
    logger: &'a Logger,
}

impl<'a> Runner<'a> {
    pub fn new(registry: &'a Registry, logger: &'a Logger) -> Self {
        Self { registry, logger }
    }

    /// Runs every registered module in registration order.
    pub fn run_all(&self) -> Result<RunSummary> {
        self.run_tests(&self.registry.names())
    }

    /// Runs the named modules in the given order.
    ///
    /// Test failures are recorded in the summary; only logging failures are
    /// returned as errors.
    pub fn run_tests<S: AsRef<str>>(&self, names: &[S]) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        for name in names {
            let name = name.as_ref();
            let report = self.run_module(name)?;
            summary.modules.push(report);
        }

        let total = summary.modules_attempted();
        let passed = summary.modules_passed();
        if passed == total {
            self.logger
                .styled(&(Style::bold() + Style::green()), |log| log.log("All modules passed"))?;
        } else {
            self.logger.styled(&(Style::bold() + Style::red()), |log| {
                log.log(format!("{}/{} modules passed", passed, total))
            })?;
        }

        tracing::info!(passed, total, "test run finished");
        Ok(summary)
    }

    fn run_module(&self, name: &str) -> Result<ModuleReport> {
        let mut report = ModuleReport::new(name);
        let log = self.logger;

        log.styled(&Style::bold(), |log| {
            log.log(format!("--- BEGIN TEST MODULE {} ---", name.to_uppercase()))
        })?;

        let module = self.registry.get(name);
        match self.setup(name, module)? {
            Some(message) => {
                log.log(format!("Build failed with exception: {}", message))?;
                report.setup_error = Some(message);
            }
            None => {
                if let Some(module) = module {
                    self.run_testcases(module, &mut report)?;
                }
            }
        }

        log.styled(&Style::bold(), |log| {
            log.log(format!("--- END TEST MODULE {} ---", name.to_uppercase()))
        })?;
        log.log("")?;

        Ok(report)
    }

    /// Returns the setup failure message, if setup failed.
    fn setup(&self, name: &str, module: Option<&TestModule>) -> Result<Option<String>> {
        let log = self.logger;
        log.log("* Starting compilation...")?;

        let Some(module) = module else {
            tracing::warn!(module = %name, "requested module is not registered");
            return Ok(Some(Error::UnknownModule(name.to_string()).to_string()));
        };

        if module.has_prebuild() {
            log.log_inline(format!("* Starting prebuild for {}... ", name))?;
            match module.run_prebuild() {
                Ok(()) => log.log("Done")?,
                Err(failure) => {
                    log.log("")?;
                    tracing::warn!(module = %name, site = %failure.site(), "prebuild failed");
                    return Ok(Some(failure.to_string()));
                }
            }
        }

        if module.builds() {
            if let Err(e) = module.wrapper().build() {
                tracing::warn!(module = %name, error = %e, "build failed");
                return Ok(Some(e.to_string()));
            }
        }

        log.log("* Finished compilation")?;
        Ok(None)
    }

    fn run_testcases(&self, module: &TestModule, report: &mut ModuleReport) -> Result<()> {
        let total = module.testcases().len();
        report.attempted = total;
        report.passed = total;

        for (index, testcase) in module.testcases().iter().enumerate() {
            let index = index + 1;
            if let Outcome::Failed(failure) = self.run_testcase(module, testcase)? {
                self.logger.styled(&(Style::bold() + Style::red()), |log| {
                    log.log(format!(
                        "Testcase {} failed on {} with exception: {}",
                        index,
                        failure.site(),
                        failure
                    ))
                })?;
                report.passed -= 1;
                report.failures.push(FailedTestcase {
                    index,
                    name: testcase.name().to_string(),
                    site: failure.site().clone(),
                    message: failure.to_string(),
                });
            }
        }

        if report.passed == total {
            self.logger
                .styled(&(Style::bold() + Style::green()), |log| log.log("All testcases passed"))?;
        } else {
            self.logger.styled(&(Style::bold() + Style::red()), |log| {
                log.log(format!("{}/{} testcases passed", report.passed, total))
            })?;
        }
        Ok(())
    }

    /// Runs one testcase, printing its start line and PASSED/FAILED status.
    fn run_testcase(&self, module: &TestModule, testcase: &Testcase) -> Result<Outcome> {
        self.logger.log_inline(format!(
            "* Starting testcase {}.{}... ",
            module.name(),
            testcase.name()
        ))?;

        let outcome = testcase.call(module.wrapper());
        match &outcome {
            Outcome::Passed => {
                self.logger
                    .styled(&(Style::bold() + Style::green()), |log| log.log("PASSED"))?;
            }
            Outcome::Failed(failure) => {
                self.logger
                    .styled(&(Style::bold() + Style::red()), |log| log.log("FAILED"))?;
                log_failure_detail(module, testcase, failure);
            }
        }
        Ok(outcome)
    }
}

fn log_failure_detail(module: &TestModule, testcase: &Testcase, failure: &TestFailure) {
    match failure.site() {
        FailureSite::Source { file, line } => tracing::debug!(
            module = %module.name(),
            testcase = %testcase.name(),
            file = %file,
            line,
            "testcase failed"
        ),
        site => tracing::debug!(
            module = %module.name(),
            testcase = %testcase.name(),
            site = %site,
            "testcase failed"
        ),
    }
}
