// SPDX-License-Identifier: GPL-3.0-only
//! Runtime settings
//!
//! Settings come in two containers with different visibility:
//!
//! - process-wide: retry budgets (see [`crate::ddc::retry`]) and the sleep
//!   multiplier, stored in atomics and shared by every thread
//! - per thread: verification, output level and DDC error reporting, stored
//!   in a `thread_local!` and invisible to other threads

use std::cell::Cell;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DdcError, Result};

/// Amount of detail in reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OutputLevel {
    Terse,
    Normal,
    Verbose,
    VeryVerbose,
}

impl FromStr for OutputLevel {
    type Err = DdcError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "terse" => Ok(OutputLevel::Terse),
            "normal" => Ok(OutputLevel::Normal),
            "verbose" => Ok(OutputLevel::Verbose),
            "very-verbose" | "veryverbose" => Ok(OutputLevel::VeryVerbose),
            other => Err(DdcError::Config(format!("unknown output level '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ThreadSettings {
    verify: bool,
    output_level: OutputLevel,
    report_ddc_errors: bool,
}

impl ThreadSettings {
    const DEFAULT: ThreadSettings = ThreadSettings {
        verify: true,
        output_level: OutputLevel::Normal,
        report_ddc_errors: false,
    };
}

thread_local! {
    static THREAD_SETTINGS: Cell<ThreadSettings> = const { Cell::new(ThreadSettings::DEFAULT) };
}

fn update<T>(f: impl FnOnce(&mut ThreadSettings) -> T) -> T {
    THREAD_SETTINGS.with(|cell| {
        let mut settings = cell.get();
        let out = f(&mut settings);
        cell.set(settings);
        out
    })
}

fn current() -> ThreadSettings {
    THREAD_SETTINGS.with(|cell| cell.get())
}

/// Turn read-after-write verification on or off for the current thread
///
/// Returns the prior setting.
pub fn enable_verify(onoff: bool) -> bool {
    update(|s| std::mem::replace(&mut s.verify, onoff))
}

pub fn is_verify_enabled() -> bool {
    current().verify
}

/// Set the report detail for the current thread, returning the prior level
pub fn set_output_level(level: OutputLevel) -> OutputLevel {
    update(|s| std::mem::replace(&mut s.output_level, level))
}

pub fn output_level() -> OutputLevel {
    current().output_level
}

/// Log every DDC error on the current thread at warn level, not only the
/// ones that exhaust the retry budget
pub fn enable_report_ddc_errors(onoff: bool) -> bool {
    update(|s| std::mem::replace(&mut s.report_ddc_errors, onoff))
}

pub fn is_report_ddc_errors_enabled() -> bool {
    current().report_ddc_errors
}

const MAX_SLEEP_MULTIPLIER: f32 = 10.0;

/// Sleep multiplier in percent
static SLEEP_MULTIPLIER: AtomicU32 = AtomicU32::new(100);

/// Scale the DDC/CI protocol delays for every thread
pub fn set_sleep_multiplier(multiplier: f32) -> Result<()> {
    if !(0.0..=MAX_SLEEP_MULTIPLIER).contains(&multiplier) {
        return Err(DdcError::InvalidArgument(format!(
            "sleep multiplier {} outside 0.0..={}",
            multiplier, MAX_SLEEP_MULTIPLIER
        )));
    }
    SLEEP_MULTIPLIER.store((multiplier * 100.0).round() as u32, Ordering::Relaxed);
    Ok(())
}

pub fn sleep_multiplier() -> f32 {
    SLEEP_MULTIPLIER.load(Ordering::Relaxed) as f32 / 100.0
}

/// Apply the sleep multiplier to a protocol delay
pub fn scaled(delay: Duration) -> Duration {
    delay.mul_f32(sleep_multiplier())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_is_thread_local() {
        let prior = enable_verify(false);
        assert!(prior);
        assert!(!is_verify_enabled());

        let other = std::thread::spawn(is_verify_enabled).join().unwrap();
        assert!(other, "new thread must start with the default");

        assert!(!enable_verify(true));
        assert!(is_verify_enabled());
    }

    #[test]
    fn test_output_level() {
        assert_eq!(set_output_level(OutputLevel::Verbose), OutputLevel::Normal);
        assert_eq!(output_level(), OutputLevel::Verbose);
        set_output_level(OutputLevel::Normal);
        assert_eq!("very-verbose".parse::<OutputLevel>().unwrap(), OutputLevel::VeryVerbose);
        assert!("loud".parse::<OutputLevel>().is_err());
    }

    #[test]
    fn test_report_ddc_errors() {
        assert!(!enable_report_ddc_errors(true));
        assert!(is_report_ddc_errors_enabled());
        enable_report_ddc_errors(false);
    }

    #[test]
    fn test_sleep_multiplier_range() {
        assert!(set_sleep_multiplier(-1.0).is_err());
        assert!(set_sleep_multiplier(11.0).is_err());
        assert_eq!(sleep_multiplier(), 1.0);
    }
}
