//! End-to-end runner scenarios with in-process test modules.
//!
//! Modules here disable the build step so no build tool is needed.

mod common;

use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;

use tempfile::TempDir;

use autograde_tests::{FailureSite, HarnessConfig, Registry, Runner, TestFailure};

use common::capture_logger;

fn registry() -> Registry {
    Registry::new(Arc::new(HarnessConfig::default()))
}

#[test]
fn prebuild_then_pass_then_fail() {
    let temp = TempDir::new().unwrap();
    let module_dir = temp.path().join("test_marker");
    std::fs::create_dir_all(&module_dir).unwrap();

    let mut reg = registry();
    let fail_line = line!() + 11;
    reg.module("test_marker", &module_dir)
        .without_build()
        .prebuild(|t| {
            let marker = t.path().join("marker.txt");
            let mut seen = std::fs::read_to_string(&marker).unwrap_or_default();
            seen.push_str("prebuild\n");
            std::fs::write(marker, seen).map_err(autograde_tests::Error::Io)?;
            Ok(())
        })
        .testcase("passes", |_| Ok(()))
        .testcase("raises", |_| Err(TestFailure::new("boom")));

    let (logger, capture) = capture_logger(temp.path());
    let summary = Runner::new(&reg, &logger)
        .run_tests(&["test_marker"])
        .unwrap();

    assert_eq!(
        std::fs::read_to_string(module_dir.join("marker.txt")).unwrap(),
        "prebuild\n"
    );

    let report = summary.module("test_marker").unwrap();
    assert_eq!(report.attempted, 2);
    assert_eq!(report.passed, 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].index, 2);
    assert_eq!(report.failures[0].message, "boom");
    assert_eq!(report.failures[0].site.line(), Some(fail_line));
    assert_eq!(summary.exit_code(), 1);

    let out = capture.contents();
    assert_eq!(out.matches("PASSED").count(), 1);
    assert_eq!(out.matches("FAILED").count(), 1);
    assert!(out.contains("--- BEGIN TEST MODULE TEST_MARKER ---\n"));
    assert!(out.contains("* Starting prebuild for test_marker... Done\n"));
    assert!(out.contains("* Starting testcase test_marker.passes... PASSED\n"));
    assert!(out.contains("* Starting testcase test_marker.raises... FAILED\n"));
    assert!(out.contains(&format!(
        "Testcase 2 failed on line {} with exception: boom\n",
        fail_line
    )));
    assert!(out.contains("1/2 testcases passed\n"));
    assert!(out.contains("--- END TEST MODULE TEST_MARKER ---\n\n"));
    assert!(out.ends_with("0/1 modules passed\n"));

    // the run log mirrors the console when color is off
    assert_eq!(std::fs::read_to_string(logger.log_file()).unwrap(), out);
}

#[test]
fn prebuild_failure_skips_every_testcase() {
    let temp = TempDir::new().unwrap();
    let calls = Rc::new(Cell::new(0));

    let mut reg = registry();
    let first = calls.clone();
    let second = calls.clone();
    reg.module("broken", temp.path())
        .without_build()
        .prebuild(|_| Err(TestFailure::new("cannot prepare inputs")))
        .testcase("one", move |_| {
            first.set(first.get() + 1);
            Ok(())
        })
        .testcase("two", move |_| {
            second.set(second.get() + 1);
            Ok(())
        });

    let (logger, capture) = capture_logger(temp.path());
    let summary = Runner::new(&reg, &logger).run_tests(&["broken"]).unwrap();

    assert_eq!(calls.get(), 0);
    let report = summary.module("broken").unwrap();
    assert!(!report.passed());
    assert_eq!(report.setup_error.as_deref(), Some("cannot prepare inputs"));
    assert_eq!(report.attempted, 0);

    let out = capture.contents();
    assert!(out.contains("Build failed with exception: cannot prepare inputs\n"));
    assert!(!out.contains("Starting testcase"));
    assert!(out.contains("--- END TEST MODULE BROKEN ---"));
    assert_eq!(summary.exit_code(), 1);
}

#[test]
fn failing_testcase_does_not_stop_the_module() {
    let temp = TempDir::new().unwrap();
    let ran_last = Rc::new(Cell::new(false));
    let flag = ran_last.clone();

    let mut reg = registry();
    reg.module("m", temp.path())
        .without_build()
        .testcase("fails", |t| {
            t.empty_file("missing.txt")?;
            Ok(())
        })
        .testcase("panics", |_| panic!("unexpected state"))
        .testcase("still_runs", move |_| {
            flag.set(true);
            Ok(())
        });

    let (logger, capture) = capture_logger(temp.path());
    let summary = Runner::new(&reg, &logger).run_tests(&["m"]).unwrap();

    assert!(ran_last.get());
    let report = summary.module("m").unwrap();
    assert_eq!(report.passed, 1);
    assert_eq!(report.failures.len(), 2);
    assert!(report.failures[0].message.ends_with("should exist"));
    assert_eq!(report.failures[1].message, "panicked: unexpected state");
    assert!(matches!(report.failures[1].site, FailureSite::Source { .. }));

    let out = capture.contents();
    assert!(out.contains("1/3 testcases passed\n"));
}

#[test]
fn passing_modules_report_success() {
    let temp = TempDir::new().unwrap();
    let mut reg = registry();
    reg.module("a", temp.path()).without_build().testcase("ok", |_| Ok(()));
    reg.module("b", temp.path()).without_build().testcase("ok", |_| Ok(()));

    let (logger, capture) = capture_logger(temp.path());
    let summary = Runner::new(&reg, &logger).run_all().unwrap();

    assert!(summary.all_passed());
    assert_eq!(summary.exit_code(), 0);
    let names: Vec<_> = summary.modules.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, ["a", "b"]);

    let out = capture.contents();
    assert_eq!(out.matches("All testcases passed\n").count(), 2);
    assert!(out.ends_with("All modules passed\n"));
}

#[test]
fn modules_run_in_requested_order() {
    let temp = TempDir::new().unwrap();
    let mut reg = registry();
    reg.module("first", temp.path()).without_build();
    reg.module("second", temp.path()).without_build();

    let (logger, capture) = capture_logger(temp.path());
    Runner::new(&reg, &logger)
        .run_tests(&["second", "first"])
        .unwrap();

    let out = capture.contents();
    let second = out.find("BEGIN TEST MODULE SECOND").unwrap();
    let first = out.find("BEGIN TEST MODULE FIRST").unwrap();
    assert!(second < first);
}

#[test]
fn unknown_module_is_reported_as_failed() {
    let temp = TempDir::new().unwrap();
    let mut reg = registry();
    reg.module("real", temp.path())
        .without_build()
        .testcase("ok", |_| Ok(()));

    let (logger, capture) = capture_logger(temp.path());
    let summary = Runner::new(&reg, &logger)
        .run_tests(&["real", "ghost"])
        .unwrap();

    assert!(summary.module("real").unwrap().passed());
    assert!(!summary.module("ghost").unwrap().passed());
    assert_eq!(summary.modules_passed(), 1);

    let out = capture.contents();
    assert!(out.contains("Build failed with exception: unknown test module: ghost\n"));
    assert!(out.ends_with("1/2 modules passed\n"));
}

#[test]
fn unwritable_log_dir_aborts_the_run() {
    let temp = TempDir::new().unwrap();
    let mut reg = registry();
    reg.module("m", temp.path()).without_build();

    let (logger, _capture) = capture_logger(&temp.path().join("no-such-dir"));
    assert!(Runner::new(&reg, &logger).run_tests(&["m"]).is_err());
}
