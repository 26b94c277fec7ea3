// SPDX-License-Identifier: GPL-3.0-only
//! Display handles
//!
//! A [`DisplayHandle`] is an open session with one display. The VCP value
//! operations live in [`crate::vcp`] as methods on the handle.

use std::fmt;
use std::sync::atomic::Ordering;

use super::reference::DisplayRef;
use crate::ddc;
use crate::error::{DdcError, Result};
use crate::transport::Transport;

/// Open channel to one display
#[derive(Debug)]
pub struct DisplayHandle {
    dref: DisplayRef,
    transport: Option<Box<dyn Transport>>,
}

impl DisplayHandle {
    pub(crate) fn new(dref: DisplayRef, transport: Box<dyn Transport>) -> Self {
        Self { dref, transport: Some(transport) }
    }

    pub fn display_ref(&self) -> &DisplayRef {
        &self.dref
    }

    pub fn is_open(&self) -> bool {
        self.transport.is_some()
    }

    /// Channel of an open handle
    pub(crate) fn transport(&mut self) -> Result<&mut dyn Transport> {
        match self.transport.as_deref_mut() {
            Some(t) => Ok(t),
            None => Err(DdcError::HandleClosed(self.dref.location().to_string())),
        }
    }

    /// Close the channel
    ///
    /// Closing an already closed handle is an error.
    pub fn close(&mut self) -> Result<()> {
        if self.transport.take().is_none() {
            return Err(DdcError::HandleClosed(self.dref.location().to_string()));
        }
        self.dref.record.open.store(false, Ordering::Release);
        debug!(display = %self.dref.location(), "Display closed");
        Ok(())
    }

    /// Ask the display to save its current settings
    pub fn save_current_settings(&mut self) -> Result<()> {
        ddc::save_current_settings(self.transport()?)
    }
}

impl Drop for DisplayHandle {
    fn drop(&mut self) {
        if self.transport.take().is_some() {
            self.dref.record.open.store(false, Ordering::Release);
        }
    }
}

impl fmt::Display for DisplayHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Display_Handle[{}]", self.dref.location())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::detect::DetectedDisplay;
    use crate::display::reference::ChannelLocation;
    use crate::error::Status;
    use crate::transport::simulated::SimulatedMonitor;

    fn open_handle() -> DisplayHandle {
        let monitor = SimulatedMonitor::new();
        let location = ChannelLocation::Usb { bus: 1, device: 4, hiddev: 0 };
        DisplayRef::ad_hoc(DetectedDisplay::new(location, Box::new(monitor)))
            .open()
            .unwrap()
    }

    #[test]
    fn test_close_twice_is_rejected() {
        let mut handle = open_handle();
        handle.close().unwrap();
        assert!(!handle.is_open());
        assert_eq!(handle.close().unwrap_err().status(), Status::Arg);
    }

    #[test]
    fn test_operation_after_close_is_rejected() {
        let mut handle = open_handle();
        handle.save_current_settings().unwrap();
        handle.close().unwrap();
        let err = handle.save_current_settings().unwrap_err();
        assert!(matches!(err, DdcError::HandleClosed(_)));
    }
}
