//! Explicit test-module registration.
//!
//! Each test module registers under a unique name together with its testcase
//! directory. Testcases keep their registration order; registering more under
//! an existing name appends to it.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::HarnessConfig;
use crate::testcase::{catch_failures, TestFn, TestResult, Testcase};
use crate::wrapper::TestcaseWrapper;

/// A named group of testcases sharing one testcase directory.
pub struct TestModule {
    name: String,
    wrapper: TestcaseWrapper,
    prebuild: Option<TestFn>,
    testcases: Vec<Testcase>,
    build: bool,
}

impl TestModule {
    /// Creates an empty module rooted at `path`. The build step is enabled.
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, config: Arc<HarnessConfig>) -> Self {
        Self {
            name: name.into(),
            wrapper: TestcaseWrapper::new(path, config),
            prebuild: None,
            testcases: Vec::new(),
            build: true,
        }
    }

    /// Sets the one-time setup action, replacing any previous one.
    pub fn prebuild<F>(&mut self, func: F) -> &mut Self
    where
        F: Fn(&TestcaseWrapper) -> TestResult + 'static,
    {
        self.prebuild = Some(Box::new(func));
        self
    }

    /// Appends a testcase.
    pub fn testcase<F>(&mut self, name: impl Into<String>, func: F) -> &mut Self
    where
        F: Fn(&TestcaseWrapper) -> TestResult + 'static,
    {
        self.testcases.push(Testcase::new(name, func));
        self
    }

    /// Enables or disables building the grading executables during setup.
    pub fn with_build(&mut self, build: bool) -> &mut Self {
        self.build = build;
        self
    }

    /// Skips building the grading executables during setup.
    pub fn without_build(&mut self) -> &mut Self {
        self.with_build(false)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn wrapper(&self) -> &TestcaseWrapper {
        &self.wrapper
    }

    pub fn testcases(&self) -> &[Testcase] {
        &self.testcases
    }

    pub fn has_prebuild(&self) -> bool {
        self.prebuild.is_some()
    }

    pub fn builds(&self) -> bool {
        self.build
    }

    /// Runs the prebuild action, if any. Panics are reported as failures.
    pub fn run_prebuild(&self) -> TestResult {
        match &self.prebuild {
            Some(prebuild) => catch_failures(|| prebuild(&self.wrapper)),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for TestModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestModule")
            .field("name", &self.name)
            .field("path", &self.wrapper.path())
            .field("prebuild", &self.prebuild.is_some())
            .field("testcases", &self.testcases)
            .field("build", &self.build)
            .finish()
    }
}

/// All registered modules, in registration order.
#[derive(Debug)]
pub struct Registry {
    config: Arc<HarnessConfig>,
    modules: Vec<TestModule>,
}

impl Registry {
    pub fn new(config: Arc<HarnessConfig>) -> Self {
        Self {
            config,
            modules: Vec::new(),
        }
    }

    pub fn config(&self) -> &Arc<HarnessConfig> {
        &self.config
    }

    /// Returns the module called `name`, creating it at `path` on first use.
    ///
    /// A module keeps the directory it was first registered with.
    pub fn module(&mut self, name: &str, path: impl Into<PathBuf>) -> &mut TestModule {
        match self.position(name) {
            Some(index) => {
                let path = path.into();
                let requested = TestcaseWrapper::new(path.clone(), self.config.clone());
                let module = &mut self.modules[index];
                if module.wrapper.path() != requested.path() {
                    tracing::warn!(
                        module = %name,
                        kept = %module.wrapper.path().display(),
                        ignored = %path.display(),
                        "module already registered with a different directory"
                    );
                }
                module
            }
            None => {
                let module = TestModule::new(name, path, self.config.clone());
                self.modules.push(module);
                let last = self.modules.len() - 1;
                &mut self.modules[last]
            }
        }
    }

    /// Adds a fully built module.
    ///
    /// If the name is taken, the new testcases are appended to the existing
    /// module, its prebuild (when set) replaces the old one, and its build
    /// setting wins.
    pub fn register(&mut self, module: TestModule) {
        match self.position(&module.name) {
            Some(index) => {
                let existing = &mut self.modules[index];
                if module.prebuild.is_some() {
                    existing.prebuild = module.prebuild;
                }
                existing.testcases.extend(module.testcases);
                existing.build = module.build;
            }
            None => self.modules.push(module),
        }
    }

    pub fn get(&self, name: &str) -> Option<&TestModule> {
        self.modules.iter().find(|m| m.name == name)
    }

    /// Module names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.modules.iter().map(|m| m.name.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TestModule> {
        self.modules.iter()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.modules.iter().position(|m| m.name == name)
    }
}
