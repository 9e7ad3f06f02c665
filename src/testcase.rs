//! Testcases, their outcomes, and where failures came from.
//!
//! A test function returns [`TestResult`]. Harness errors convert into a
//! [`TestFailure`] through `?`, and the conversion records the source line of
//! that `?`. Panics raised by test code are caught at the same boundary and
//! carry the panic location instead.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::panic::{AssertUnwindSafe, Location};
use std::sync::Once;

use crate::error::Error;
use crate::wrapper::TestcaseWrapper;

/// Result of a test or prebuild function.
pub type TestResult = std::result::Result<(), TestFailure>;

/// Boxed test or prebuild function.
pub type TestFn = Box<dyn Fn(&TestcaseWrapper) -> TestResult>;

/// Where a failure originated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureSite {
    /// A source location in test code.
    Source { file: String, line: u32 },
    /// A 1-based step in a declarative testcase.
    Step(usize),
    Unknown,
}

impl FailureSite {
    fn from_location(location: &Location<'_>) -> Self {
        FailureSite::Source {
            file: location.file().to_string(),
            line: location.line(),
        }
    }

    /// Source line, when the failure came from code.
    pub fn line(&self) -> Option<u32> {
        match self {
            FailureSite::Source { line, .. } => Some(*line),
            _ => None,
        }
    }
}

impl fmt::Display for FailureSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureSite::Source { line, .. } => write!(f, "line {}", line),
            FailureSite::Step(step) => write!(f, "step {}", step),
            FailureSite::Unknown => write!(f, "unknown line"),
        }
    }
}

/// What went wrong.
#[derive(Debug)]
pub enum FailureKind {
    /// A harness operation failed.
    Harness(Error),
    /// Test code reported a failure.
    Message(String),
    /// Test code panicked.
    Panic(String),
}

/// A failed test or prebuild, with its origin.
#[derive(Debug)]
pub struct TestFailure {
    kind: FailureKind,
    site: FailureSite,
}

impl TestFailure {
    /// A failure raised by test code at the caller's location.
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Message(message.into()),
            site: FailureSite::from_location(Location::caller()),
        }
    }

    /// A harness error attributed to a declarative step.
    pub fn at_step(error: Error, step: usize) -> Self {
        Self {
            kind: FailureKind::Harness(error),
            site: FailureSite::Step(step),
        }
    }

    pub fn kind(&self) -> &FailureKind {
        &self.kind
    }

    pub fn site(&self) -> &FailureSite {
        &self.site
    }

    /// The harness error behind this failure, if any.
    pub fn harness_error(&self) -> Option<&Error> {
        match &self.kind {
            FailureKind::Harness(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_panic(&self) -> bool {
        matches!(self.kind, FailureKind::Panic(_))
    }
}

impl From<Error> for TestFailure {
    #[track_caller]
    fn from(error: Error) -> Self {
        Self {
            kind: FailureKind::Harness(error),
            site: FailureSite::from_location(Location::caller()),
        }
    }
}

impl fmt::Display for TestFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            FailureKind::Harness(e) => write!(f, "{}", e),
            FailureKind::Message(msg) => write!(f, "{}", msg),
            FailureKind::Panic(msg) => write!(f, "panicked: {}", msg),
        }
    }
}

impl std::error::Error for TestFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            FailureKind::Harness(e) => std::error::Error::source(e),
            _ => None,
        }
    }
}

/// Outcome of running one testcase.
#[derive(Debug)]
pub enum Outcome {
    Passed,
    Failed(TestFailure),
}

impl Outcome {
    pub fn passed(&self) -> bool {
        matches!(self, Outcome::Passed)
    }
}

impl From<TestResult> for Outcome {
    fn from(result: TestResult) -> Self {
        match result {
            Ok(()) => Outcome::Passed,
            Err(failure) => Outcome::Failed(failure),
        }
    }
}

/// A named test function.
pub struct Testcase {
    name: String,
    func: TestFn,
}

impl Testcase {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&TestcaseWrapper) -> TestResult + 'static,
    {
        Self {
            name: name.into(),
            func: Box::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs the function, turning panics into failures.
    pub fn call(&self, wrapper: &TestcaseWrapper) -> Outcome {
        catch_failures(|| (self.func)(wrapper)).into()
    }
}

impl fmt::Debug for Testcase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Testcase").field("name", &self.name).finish()
    }
}

thread_local! {
    static CAPTURING: Cell<bool> = const { Cell::new(false) };
    static PANIC_SITE: RefCell<Option<FailureSite>> = const { RefCell::new(None) };
}

static PANIC_HOOK: Once = Once::new();

/// Chains a panic hook that records the location of panics raised inside
/// [`catch_failures`] and stays silent for them. Other panics go to the
/// previous hook.
fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            if CAPTURING.with(Cell::get) {
                let site = info
                    .location()
                    .map(FailureSite::from_location)
                    .unwrap_or(FailureSite::Unknown);
                PANIC_SITE.with(|slot| *slot.borrow_mut() = Some(site));
            } else {
                previous(info);
            }
        }));
    });
}

/// Runs `f`, converting a panic into a [`TestFailure`].
pub(crate) fn catch_failures(f: impl FnOnce() -> TestResult) -> TestResult {
    install_panic_hook();
    let was_capturing = CAPTURING.with(|c| c.replace(true));
    let result = std::panic::catch_unwind(AssertUnwindSafe(f));
    CAPTURING.with(|c| c.set(was_capturing));

    match result {
        Ok(result) => result,
        Err(payload) => {
            let site = PANIC_SITE
                .with(|slot| slot.borrow_mut().take())
                .unwrap_or(FailureSite::Unknown);
            Err(TestFailure {
                kind: FailureKind::Panic(panic_message(payload.as_ref())),
                site,
            })
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
