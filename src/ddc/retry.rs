// SPDX-License-Identifier: GPL-3.0-only
//! Retry management
//!
//! I2C is an inherently unreliable protocol, so every DDC/CI exchange runs
//! inside a retry context. There are three contexts, each with its own
//! process-wide budget:
//!
//! - write-read: a request followed by a response (most reads)
//! - write-only: a request without response (setting a value)
//! - multi-part: a sequence of write-read exchanges forming one logical
//!   operation (capabilities, table reads and writes); the budget applies to
//!   the whole sequence

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::{DdcError, Result};
use crate::settings;

/// Upper limit for any retry budget
pub const MAX_MAX_TRIES: u8 = 15;

const DEFAULT_WRITE_READ_TRIES: u8 = 10;
const DEFAULT_WRITE_ONLY_TRIES: u8 = 4;
const DEFAULT_MULTI_PART_TRIES: u8 = 8;

static WRITE_READ_TRIES: AtomicU8 = AtomicU8::new(DEFAULT_WRITE_READ_TRIES);
static WRITE_ONLY_TRIES: AtomicU8 = AtomicU8::new(DEFAULT_WRITE_ONLY_TRIES);
static MULTI_PART_TRIES: AtomicU8 = AtomicU8::new(DEFAULT_MULTI_PART_TRIES);

/// Retry context of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RetryType {
    WriteRead,
    WriteOnly,
    MultiPart,
}

impl RetryType {
    pub const ALL: [RetryType; 3] = [RetryType::WriteRead, RetryType::WriteOnly, RetryType::MultiPart];

    fn counter(self) -> &'static AtomicU8 {
        match self {
            RetryType::WriteRead => &WRITE_READ_TRIES,
            RetryType::WriteOnly => &WRITE_ONLY_TRIES,
            RetryType::MultiPart => &MULTI_PART_TRIES,
        }
    }

    /// Budget a fresh process starts with
    pub fn default_tries(self) -> u8 {
        match self {
            RetryType::WriteRead => DEFAULT_WRITE_READ_TRIES,
            RetryType::WriteOnly => DEFAULT_WRITE_ONLY_TRIES,
            RetryType::MultiPart => DEFAULT_MULTI_PART_TRIES,
        }
    }
}

impl fmt::Display for RetryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RetryType::WriteRead => "write-read",
            RetryType::WriteOnly => "write-only",
            RetryType::MultiPart => "multi-part",
        })
    }
}

/// Largest value accepted by [`set_max_tries`]
pub fn max_max_tries() -> u8 {
    MAX_MAX_TRIES
}

/// Current budget of a retry context
pub fn get_max_tries(retry_type: RetryType) -> u8 {
    retry_type.counter().load(Ordering::Acquire)
}

/// Set the budget of a retry context
///
/// Values outside `1..=MAX_MAX_TRIES` are rejected and the prior budget stays
/// in effect. The setting is global, not per thread.
pub fn set_max_tries(retry_type: RetryType, max_tries: u8) -> Result<()> {
    if !(1..=MAX_MAX_TRIES).contains(&max_tries) {
        return Err(DdcError::InvalidArgument(format!(
            "max tries {} for {} outside 1..={}",
            max_tries, retry_type, MAX_MAX_TRIES
        )));
    }
    retry_type.counter().store(max_tries, Ordering::Release);
    debug!(retry_type = %retry_type, max_tries, "Retry budget changed");
    Ok(())
}

/// Run one logical operation under the budget of `retry_type`
///
/// The budget is read once, when the operation starts.
pub fn with_retries<T>(
    retry_type: RetryType,
    operation: &str,
    op: impl FnMut(u8) -> Result<T>,
) -> Result<T> {
    run(retry_type, get_max_tries(retry_type), operation, op)
}

/// Retry loop with an explicit budget
///
/// `op` gets the 1-based attempt number. Transient failures are retried until
/// `max_tries` attempts were made; anything else is returned at once.
pub fn run<T>(
    retry_type: RetryType,
    max_tries: u8,
    operation: &str,
    mut op: impl FnMut(u8) -> Result<T>,
) -> Result<T> {
    let max_tries = max_tries.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt) {
            Ok(value) => {
                if attempt > 1 {
                    debug!(%retry_type, operation, attempt, "Succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) if e.is_transient() && attempt < max_tries => {
                if settings::is_report_ddc_errors_enabled() {
                    warn!(%retry_type, operation, attempt, error = %e, "DDC error, retrying");
                } else {
                    debug!(%retry_type, operation, attempt, error = %e, "DDC error, retrying");
                }
                attempt += 1;
            }
            Err(e) if e.is_transient() => {
                warn!(%retry_type, operation, tries = attempt, error = %e, "Retries exhausted");
                return Err(DdcError::RetriesExhausted {
                    retry_type,
                    tries: attempt,
                    source: Box::new(e),
                });
            }
            Err(e) => {
                debug!(%retry_type, operation, attempt, error = %e, "Non-transient failure, not retrying");
                return Err(e);
            }
        }
    }
}
