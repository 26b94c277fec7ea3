// SPDX-License-Identifier: GPL-3.0-only
//! Display references
//!
//! A [`DisplayRef`] denotes one physical monitor on one channel. References
//! handed out by the registry live as long as the detection that produced
//! them; references built with [`DisplayRef::ad_hoc`] belong to the caller
//! and are retired by [`DisplayRef::release`].

use std::fmt;
use std::hash::{Hash, Hasher};
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use super::detect::DetectedDisplay;
use super::edid::ParsedEdid;
use super::handle::DisplayHandle;
use crate::error::{DdcError, Result};
use crate::features::MccsVersion;
use crate::report;
use crate::settings::{self, OutputLevel};
use crate::transport::ChannelOpener;

/// Physical channel of a display
///
/// Ordering follows detection order: I2C buses ascending, then USB devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ChannelLocation {
    I2c { busno: u32 },
    Usb { bus: u32, device: u32, hiddev: u32 },
}

impl fmt::Display for ChannelLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelLocation::I2c { busno } => write!(f, "/dev/i2c-{}", busno),
            ChannelLocation::Usb { bus, device, hiddev } => {
                write!(f, "usb {}:{} (hiddev{})", bus, device, hiddev)
            }
        }
    }
}

/// Who releases a reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// Owned by the registry; releasing does nothing
    Registry,
    /// Owned by the caller; releasing retires it
    AdHoc,
}

/// Everything known about one detected display
#[derive(Debug)]
pub(crate) struct DisplayRecord {
    pub(crate) location: ChannelLocation,
    pub(crate) dispno: Option<u32>,
    pub(crate) adl: Option<(u32, u32)>,
    pub(crate) edid: Option<ParsedEdid>,
    pub(crate) ddc_working: bool,
    pub(crate) opener: Box<dyn ChannelOpener>,
    /// Set while a handle is open; shared by every record of the same
    /// channel across redetection
    pub(crate) open: Arc<AtomicBool>,
    /// Set once the reference was released or superseded by redetection
    pub(crate) retired: AtomicBool,
    pub(crate) mccs_version: OnceCell<MccsVersion>,
    pub(crate) capabilities: OnceCell<String>,
}

impl DisplayRecord {
    /// `previous` is the record this one replaces on the same channel
    pub(crate) fn new(detected: DetectedDisplay, dispno: Option<u32>, previous: Option<&DisplayRecord>) -> Self {
        Self {
            location: detected.location,
            dispno,
            adl: detected.adl,
            edid: detected.edid,
            ddc_working: detected.ddc_working,
            opener: detected.opener,
            open: previous.map_or_else(|| Arc::new(AtomicBool::new(false)), |p| p.open.clone()),
            retired: AtomicBool::new(false),
            mccs_version: OnceCell::new(),
            capabilities: OnceCell::new(),
        }
    }
}

/// Resolved reference to one physical display
#[derive(Debug, Clone)]
pub struct DisplayRef {
    pub(crate) record: Arc<DisplayRecord>,
    ownership: Ownership,
}

impl DisplayRef {
    pub(crate) fn registered(record: Arc<DisplayRecord>) -> Self {
        Self { record, ownership: Ownership::Registry }
    }

    /// Caller owned reference to a display that did not come from detection
    pub fn ad_hoc(detected: DetectedDisplay) -> Self {
        Self {
            record: Arc::new(DisplayRecord::new(detected, None, None)),
            ownership: Ownership::AdHoc,
        }
    }

    pub fn ownership(&self) -> Ownership {
        self.ownership
    }

    pub fn location(&self) -> ChannelLocation {
        self.record.location
    }

    /// Display number, `None` for displays without working DDC/CI
    pub fn dispno(&self) -> Option<u32> {
        self.record.dispno
    }

    pub fn edid(&self) -> Option<&ParsedEdid> {
        self.record.edid.as_ref()
    }

    pub fn is_ddc_working(&self) -> bool {
        self.record.ddc_working
    }

    pub fn is_open(&self) -> bool {
        self.record.open.load(Ordering::Acquire)
    }

    /// MCCS version, once it was determined through a handle
    pub fn cached_mccs_version(&self) -> Option<MccsVersion> {
        self.record.mccs_version.get().copied()
    }

    /// Open a channel to the display
    ///
    /// Only one handle per display may be open at a time.
    pub fn open(&self) -> Result<DisplayHandle> {
        if self.record.retired.load(Ordering::Acquire) {
            return Err(DdcError::InvalidDisplay(format!("{} is no longer valid", self)));
        }
        if self
            .record
            .open
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(DdcError::Locked(self.to_string()));
        }
        match self.record.opener.open() {
            Ok(transport) => {
                debug!(display = %self.record.location, "Display opened");
                Ok(DisplayHandle::new(self.clone(), transport))
            }
            Err(e) => {
                self.record.open.store(false, Ordering::Release);
                warn!(display = %self.record.location, error = %e, "Failed to open display");
                Err(e.into())
            }
        }
    }

    /// Release the reference
    ///
    /// Registry references are left alone. An ad hoc reference is retired,
    /// unless a handle on it is still open.
    pub fn release(self) -> Result<()> {
        match self.ownership {
            Ownership::Registry => Ok(()),
            Ownership::AdHoc => {
                if self.is_open() {
                    return Err(DdcError::Locked(self.to_string()));
                }
                self.record.retired.store(true, Ordering::Release);
                Ok(())
            }
        }
    }

    /// Describe the display; detail follows the thread's output level
    pub fn report(&self, w: &mut dyn Write, depth: usize) -> io::Result<()> {
        let level = settings::output_level();
        match self.record.dispno {
            Some(n) if self.ownership == Ownership::Registry => {
                report::line(w, depth, format_args!("Display {}", n))?
            }
            _ if self.record.ddc_working => report::line(w, depth, "Display")?,
            _ => report::line(w, depth, "Invalid display")?,
        }
        let d1 = depth + 1;
        match self.record.location {
            ChannelLocation::I2c { .. } => {
                report::label_value(w, d1, "I2C bus", self.record.location)?
            }
            ChannelLocation::Usb { .. } => {
                report::label_value(w, d1, "USB device", self.record.location)?
            }
        }
        if let Some((adapter, display)) = self.record.adl {
            report::label_value(w, d1, "ADL adapter.display", format_args!("{}.{}", adapter, display))?;
        }
        if let Some(edid) = &self.record.edid {
            report::line(w, d1, "EDID synopsis:")?;
            let d2 = d1 + 1;
            report::label_value(w, d2, "Mfg id", &edid.mfg_id)?;
            report::label_value(w, d2, "Model", &edid.model)?;
            report::label_value(w, d2, "Serial number", &edid.serial_ascii)?;
            if level >= OutputLevel::Normal {
                report::label_value(w, d2, "Product code", edid.product_code)?;
                report::label_value(w, d2, "Manufacture year", edid.year)?;
            }
            if level >= OutputLevel::Verbose {
                report::label_value(
                    w,
                    d2,
                    "Binary serial number",
                    format_args!("{} (0x{:08x})", edid.serial_binary, edid.serial_binary),
                )?;
                report::line(w, d2, "EDID hex dump:")?;
                report::hex_dump(w, d2 + 1, &edid.bytes)?;
            }
        }
        if !self.record.ddc_working {
            report::line(w, d1, "DDC communication failed")?;
        } else if let Some(version) = self.cached_mccs_version() {
            report::label_value(w, d1, "VCP version", version)?;
        }
        Ok(())
    }
}

/// Release an optional reference; `None` is accepted
pub fn release_display_ref(dref: Option<DisplayRef>) -> Result<()> {
    match dref {
        Some(dref) => dref.release(),
        None => Ok(()),
    }
}

impl PartialEq for DisplayRef {
    fn eq(&self, other: &Self) -> bool {
        self.record.location == other.record.location
    }
}

impl Eq for DisplayRef {}

impl Hash for DisplayRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.record.location.hash(state);
    }
}

impl fmt::Display for DisplayRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.record.dispno {
            Some(n) if self.ownership == Ownership::Registry => {
                write!(f, "Display_Ref[dispno={}, {}]", n, self.record.location)
            }
            _ => write!(f, "Display_Ref[{}]", self.record.location),
        }
    }
}
