// SPDX-License-Identifier: GPL-3.0-only
//! Display communication channels
//!
//! The DDC/CI engine only needs to send bytes to a display and receive bytes
//! back. Each channel implementation provides that over a different bus.

#[cfg(target_os = "linux")]
pub mod i2c;

#[cfg(feature = "usb-hid")]
pub mod hid;

pub mod simulated;

use std::time::Duration;

use crate::error::TransportError;

/// Delays required by the DDC/CI specification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Wait between writing a request and reading its reply
    pub write_read_delay: Duration,
    /// Wait after a command before the next one may be sent
    pub post_command_delay: Duration,
}

impl Timing {
    /// Standard DDC/CI host timing
    pub const DDC_STANDARD: Timing = Timing {
        write_read_delay: Duration::from_millis(40),
        post_command_delay: Duration::from_millis(50),
    };

    /// No delays, for in-memory channels
    pub const NONE: Timing = Timing {
        write_read_delay: Duration::ZERO,
        post_command_delay: Duration::ZERO,
    };
}

/// An open communication channel to one display
pub trait Transport: std::fmt::Debug + Send {
    /// Write one complete DDC/CI packet
    fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError>;

    /// Read up to `max_len` bytes of a reply
    fn receive(&mut self, max_len: usize) -> Result<Vec<u8>, TransportError>;

    /// Protocol delays this channel needs
    fn timing(&self) -> Timing {
        Timing::DDC_STANDARD
    }
}

/// Creates channels to one physical display
///
/// Held by the display registry; every successful [`ChannelOpener::open`]
/// yields an independent channel.
pub trait ChannelOpener: std::fmt::Debug + Send + Sync {
    fn open(&self) -> Result<Box<dyn Transport>, TransportError>;
}
