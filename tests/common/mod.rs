//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

use autograde_tests::Logger;

/// Console writer that keeps everything written to it.
#[derive(Clone, Default)]
pub struct Capture(Arc<Mutex<Vec<u8>>>);

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Capture {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

/// Logger writing uncolored output into `log_dir` and a capture buffer.
pub fn capture_logger(log_dir: &Path) -> (Logger, Capture) {
    let capture = Capture::default();
    let logger = Logger::with_console(log_dir, Box::new(capture.clone())).with_color(false);
    (logger, capture)
}

/// Writes an executable shell script.
#[cfg(unix)]
pub fn write_script(path: &Path, body: &str) {
    use std::os::unix::fs::PermissionsExt;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("failed to create script dir");
    }
    std::fs::write(path, format!("#!/bin/sh\n{}\n", body)).expect("failed to write script");
    let mut perms = std::fs::metadata(path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(path, perms).expect("failed to chmod script");
}
