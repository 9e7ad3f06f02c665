//! ANSI console styling.
//!
//! A [`Style`] is a set of SGR attribute codes. Applying it to a [`Logger`]
//! yields a [`StyleGuard`] which emits the reset sequence when dropped, so a
//! styled region is always closed, including on early returns and panics.

use std::ops::Add;

use crate::error::Result;
use crate::logger::Logger;

/// Escape sequence clearing every attribute.
pub const RESET: &str = "\x1b[0m";

/// A composable set of terminal attribute codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Style {
    codes: Vec<u8>,
}

impl Style {
    pub fn new(codes: impl Into<Vec<u8>>) -> Self {
        Self {
            codes: codes.into(),
        }
    }

    pub fn bold() -> Self {
        Self::new([1])
    }

    pub fn underscore() -> Self {
        Self::new([4])
    }

    pub fn blink() -> Self {
        Self::new([5])
    }

    pub fn black() -> Self {
        Self::new([30])
    }

    pub fn red() -> Self {
        Self::new([31])
    }

    pub fn green() -> Self {
        Self::new([32])
    }

    pub fn yellow() -> Self {
        Self::new([33])
    }

    pub fn blue() -> Self {
        Self::new([34])
    }

    pub fn magenta() -> Self {
        Self::new([35])
    }

    pub fn cyan() -> Self {
        Self::new([36])
    }

    pub fn white() -> Self {
        Self::new([37])
    }

    pub fn codes(&self) -> &[u8] {
        &self.codes
    }

    /// The escape sequence selecting this style.
    pub fn escape(&self) -> String {
        let codes = self
            .codes
            .iter()
            .map(|code| code.to_string())
            .collect::<Vec<_>>()
            .join(";");
        format!("\x1b[{}m", codes)
    }

    /// Emits the style on the logger's console and returns the guard that resets it.
    ///
    /// With color disabled nothing is written on either side.
    pub fn apply<'a>(&self, logger: &'a Logger) -> Result<StyleGuard<'a>> {
        if !logger.color() {
            return Ok(StyleGuard { logger: None });
        }
        logger.write_console(&self.escape())?;
        Ok(StyleGuard {
            logger: Some(logger),
        })
    }
}

impl Add for Style {
    type Output = Style;

    fn add(mut self, other: Style) -> Style {
        self.codes.extend(other.codes);
        self
    }
}

impl Add<&Style> for &Style {
    type Output = Style;

    fn add(self, other: &Style) -> Style {
        self.clone() + other.clone()
    }
}

/// Active styled region; resets the console on drop.
#[must_use = "the style is reset as soon as the guard is dropped"]
pub struct StyleGuard<'a> {
    logger: Option<&'a Logger>,
}

impl Drop for StyleGuard<'_> {
    fn drop(&mut self) {
        if let Some(logger) = self.logger.take() {
            if let Err(e) = logger.write_console(RESET) {
                tracing::warn!(error = %e, "failed to reset console style");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl Write for Capture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Capture {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    #[test]
    fn styles_combine_codes_in_order() {
        let style = Style::bold() + Style::red();
        assert_eq!(style.codes(), &[1, 31]);
        assert_eq!(style.escape(), "\x1b[1;31m");
        assert_eq!((&Style::bold() + &Style::underscore()).codes(), &[1, 4]);
    }

    #[test]
    fn reset_fires_when_the_block_fails() {
        let temp = TempDir::new().unwrap();
        let capture = Capture::default();
        let logger = Logger::with_console(temp.path(), Box::new(capture.clone()));

        let result: Result<()> = logger.styled(&Style::red(), |_| {
            Err(crate::error::Error::Config("boom".to_string()))
        });

        assert!(result.is_err());
        assert_eq!(capture.contents(), "\x1b[31m\x1b[0m");
    }

    #[test]
    fn reset_fires_when_the_block_panics() {
        let temp = TempDir::new().unwrap();
        let capture = Capture::default();
        let logger = Logger::with_console(temp.path(), Box::new(capture.clone()));

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = Style::bold().apply(&logger).unwrap();
            panic!("inside styled region");
        }));

        assert!(outcome.is_err());
        assert_eq!(capture.contents(), "\x1b[1m\x1b[0m");
    }

    #[test]
    fn disabled_color_writes_no_escapes() {
        let temp = TempDir::new().unwrap();
        let capture = Capture::default();
        let logger =
            Logger::with_console(temp.path(), Box::new(capture.clone())).with_color(false);

        logger
            .styled(&Style::green(), |log| log.log("plain"))
            .unwrap();

        assert_eq!(capture.contents(), "plain\n");
    }
}
