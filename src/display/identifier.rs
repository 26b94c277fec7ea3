// SPDX-License-Identifier: GPL-3.0-only
//! Display identifiers
//!
//! A [`DisplayIdentifier`] says how the caller wants to find a display. It is
//! resolved against the registry into a [`super::DisplayRef`].

use std::fmt;

use crate::error::{DdcError, Result};

/// Length of an EDID base block
pub const EDID_SIZE: usize = 128;

const MAX_MFG_LEN: usize = 3;
const MAX_MODEL_LEN: usize = 13;
const MAX_SERIAL_LEN: usize = 13;

/// Ways of identifying a display
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DisplayIdentifier {
    /// Display number assigned at detection, starting at 1
    Dispno(u32),
    /// I2C bus number, as in `/dev/i2c-N`
    Busno(u32),
    /// Adapter/display index pair of the legacy ADL enumeration
    Adlno { adapter: u32, display: u32 },
    /// Manufacturer id, model name and serial number; unset fields match anything
    MfgModelSn {
        mfg: Option<String>,
        model: Option<String>,
        serial: Option<String>,
    },
    /// Complete EDID base block
    Edid(Box<[u8; EDID_SIZE]>),
    /// USB bus and device number
    Usb { bus: u32, device: u32 },
    /// USB HID device number, as in `/dev/usb/hiddevN`
    HidDev(u32),
}

impl DisplayIdentifier {
    pub fn dispno(dispno: u32) -> Self {
        DisplayIdentifier::Dispno(dispno)
    }

    pub fn busno(busno: u32) -> Self {
        DisplayIdentifier::Busno(busno)
    }

    pub fn adlno(adapter: u32, display: u32) -> Self {
        DisplayIdentifier::Adlno { adapter, display }
    }

    /// Identifier from any combination of manufacturer id, model and serial
    ///
    /// At least one field must be given. Empty strings count as unset.
    pub fn mfg_model_sn(mfg: Option<&str>, model: Option<&str>, serial: Option<&str>) -> Result<Self> {
        fn field(value: Option<&str>, max: usize, what: &str) -> Result<Option<String>> {
            match value.filter(|s| !s.is_empty()) {
                Some(s) if s.chars().count() > max => Err(DdcError::InvalidArgument(format!(
                    "{} '{}' longer than {} characters",
                    what, s, max
                ))),
                other => Ok(other.map(str::to_string)),
            }
        }

        let mfg = field(mfg, MAX_MFG_LEN, "manufacturer id")?;
        let model = field(model, MAX_MODEL_LEN, "model name")?;
        let serial = field(serial, MAX_SERIAL_LEN, "serial number")?;
        if mfg.is_none() && model.is_none() && serial.is_none() {
            return Err(DdcError::InvalidArgument(
                "at least one of manufacturer id, model name and serial number is required".into(),
            ));
        }
        Ok(DisplayIdentifier::MfgModelSn { mfg, model, serial })
    }

    /// Identifier from a complete 128 byte EDID
    pub fn edid(bytes: &[u8]) -> Result<Self> {
        let block: [u8; EDID_SIZE] = bytes.try_into().map_err(|_| {
            DdcError::InvalidArgument(format!(
                "EDID must be {} bytes, got {}",
                EDID_SIZE,
                bytes.len()
            ))
        })?;
        Ok(DisplayIdentifier::Edid(Box::new(block)))
    }

    /// Check an identifier built directly from its variants
    ///
    /// Applies the rules of the validating constructors, so a
    /// [`DisplayIdentifier::MfgModelSn`] with no field set is rejected.
    pub fn validate(&self) -> Result<()> {
        match self {
            DisplayIdentifier::MfgModelSn { mfg, model, serial } => {
                Self::mfg_model_sn(mfg.as_deref(), model.as_deref(), serial.as_deref()).map(|_| ())
            }
            _ => Ok(()),
        }
    }

    pub fn usb(bus: u32, device: u32) -> Self {
        DisplayIdentifier::Usb { bus, device }
    }

    pub fn hiddev(hiddev: u32) -> Self {
        DisplayIdentifier::HidDev(hiddev)
    }
}

impl fmt::Display for DisplayIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayIdentifier::Dispno(n) => write!(f, "Display Id[type=Display Number, dispno={}]", n),
            DisplayIdentifier::Busno(n) => write!(f, "Display Id[type=I2C Bus Number, busno={}]", n),
            DisplayIdentifier::Adlno { adapter, display } => write!(
                f,
                "Display Id[type=ADL Adapter Number, adlno={}.{}]",
                adapter, display
            ),
            DisplayIdentifier::MfgModelSn { mfg, model, serial } => write!(
                f,
                "Display Id[type=Monitor Model Serial, mfg={}, model={}, sn={}]",
                mfg.as_deref().unwrap_or("*"),
                model.as_deref().unwrap_or("*"),
                serial.as_deref().unwrap_or("*")
            ),
            DisplayIdentifier::Edid(bytes) => {
                write!(f, "Display Id[type=EDID, edid=")?;
                for b in &bytes[..8] {
                    write!(f, "{:02x}", b)?;
                }
                write!(f, "...")?;
                for b in &bytes[EDID_SIZE - 8..] {
                    write!(f, "{:02x}", b)?;
                }
                write!(f, "]")
            }
            DisplayIdentifier::Usb { bus, device } => {
                write!(f, "Display Id[type=USB, usb bus:device={}.{}]", bus, device)
            }
            DisplayIdentifier::HidDev(n) => write!(f, "Display Id[type=HID Device, hiddev={}]", n),
        }
    }
}
