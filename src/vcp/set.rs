// SPDX-License-Identifier: GPL-3.0-only
//! Writing VCP values
//!
//! Every setter has a `_verify` form taking an optional read-back slot.
//! When a slot is given and verification is enabled on the calling thread,
//! the value is read back after the write:
//!
//! - read-back equal to the written value: `Ok`, slot filled
//! - read-back differs: [`DdcError::Verify`], slot filled with what was read
//! - read-back fails: [`DdcError::Verify`] with the read error as source,
//!   slot untouched
//!
//! A failed write is returned as is, without read-back.

use super::get::wrong_kind;
use super::value::{AnyVcpValue, NonTableValue, TableValue, VcpValue};
use crate::ddc;
use crate::display::DisplayHandle;
use crate::error::{DdcError, Result};
use crate::features::table::{self, FeatureKind};
use crate::features::MccsVersion;
use crate::settings;

/// Outcome of a write with optional read-back
struct Written<T> {
    result: Result<()>,
    readback: Option<T>,
}

impl<T> Written<T> {
    fn unverified(result: Result<()>) -> Self {
        Self { result, readback: None }
    }

    fn fill(self, slot: Option<&mut T>) -> Result<()> {
        if let (Some(slot), Some(value)) = (slot, self.readback) {
            *slot = value;
        }
        self.result
    }
}

fn verify_failed(code: u8, source: Option<DdcError>) -> DdcError {
    DdcError::Verify { feature_code: code, source: source.map(Box::new) }
}

impl DisplayHandle {
    /// Whether a requested verification actually runs for `code`
    fn should_verify(&self, requested: bool, code: u8) -> bool {
        if !requested || !settings::is_verify_enabled() {
            return false;
        }
        let vspec = self.display_ref().cached_mccs_version().unwrap_or(MccsVersion::ANY);
        // Write-only features cannot be read back
        table::lookup(code, vspec).map(|info| info.flags.readable()).unwrap_or(true)
    }

    fn write_non_table(&mut self, code: u8, value: u16, verify: bool) -> Written<NonTableValue> {
        let verify = self.should_verify(verify, code);
        let transport = match self.transport() {
            Ok(t) => t,
            Err(e) => return Written::unverified(Err(e)),
        };
        if let Err(e) = ddc::set_vcp(transport, code, value) {
            return Written::unverified(Err(e));
        }
        if !verify {
            return Written::unverified(Ok(()));
        }
        match ddc::get_vcp(transport, code) {
            Ok(read) if read.value() == value => Written { result: Ok(()), readback: Some(read) },
            Ok(read) => {
                warn!(
                    display = %self.display_ref().location(),
                    feature = format_args!("0x{:02x}", code),
                    written = value,
                    read = read.value(),
                    "Read-back does not match written value"
                );
                Written { result: Err(verify_failed(code, None)), readback: Some(read) }
            }
            Err(e) => Written::unverified(Err(verify_failed(code, Some(e)))),
        }
    }

    fn write_table(&mut self, code: u8, value: &TableValue, verify: bool) -> Written<TableValue> {
        let verify = self.should_verify(verify, code);
        let transport = match self.transport() {
            Ok(t) => t,
            Err(e) => return Written::unverified(Err(e)),
        };
        if let Err(e) = ddc::table_write(transport, code, value.bytes()) {
            return Written::unverified(Err(e));
        }
        if !verify {
            return Written::unverified(Ok(()));
        }
        match ddc::table_read(transport, code) {
            Ok(read) if read == value.bytes() => {
                Written { result: Ok(()), readback: Some(TableValue(read)) }
            }
            Ok(read) => {
                warn!(
                    display = %self.display_ref().location(),
                    feature = format_args!("0x{:02x}", code),
                    "Table read-back does not match written value"
                );
                Written { result: Err(verify_failed(code, None)), readback: Some(TableValue(read)) }
            }
            Err(e) => Written::unverified(Err(verify_failed(code, Some(e)))),
        }
    }

    /// Write the `sh`/`sl` bytes of a non-table feature
    pub fn set_non_table_vcp_value(&mut self, code: u8, hi: u8, lo: u8) -> Result<()> {
        self.set_non_table_vcp_value_verify(code, hi, lo, None, None)
    }

    /// Write the `sh`/`sl` bytes of a non-table feature and optionally read
    /// them back
    ///
    /// Either both slots or neither must be given.
    pub fn set_non_table_vcp_value_verify(
        &mut self,
        code: u8,
        hi: u8,
        lo: u8,
        verified_hi: Option<&mut u8>,
        verified_lo: Option<&mut u8>,
    ) -> Result<()> {
        let slots = match (verified_hi, verified_lo) {
            (Some(h), Some(l)) => Some((h, l)),
            (None, None) => None,
            _ => {
                return Err(DdcError::InvalidArgument(
                    "verified_hi and verified_lo must be given together".into(),
                ));
            }
        };
        if !table::kind_possible(code, |k| !k.is_table()) {
            return Err(wrong_kind(code, "table feature written as non-table"));
        }
        let written = self.write_non_table(code, u16::from_be_bytes([hi, lo]), slots.is_some());
        if let (Some((h, l)), Some(read)) = (slots, written.readback) {
            *h = read.sh;
            *l = read.sl;
        }
        written.result
    }

    /// Write a continuous feature
    pub fn set_continuous_vcp_value(&mut self, code: u8, value: u16) -> Result<()> {
        self.set_continuous_vcp_value_verify(code, value, None)
    }

    /// Write a continuous feature and optionally read it back
    pub fn set_continuous_vcp_value_verify(
        &mut self,
        code: u8,
        value: u16,
        verified: Option<&mut u16>,
    ) -> Result<()> {
        if !table::kind_possible(code, |k| k == FeatureKind::Continuous) {
            return Err(wrong_kind(code, "not a continuous feature"));
        }
        let written = self.write_non_table(code, value, verified.is_some());
        Written {
            result: written.result,
            readback: written.readback.map(|v| v.value()),
        }
        .fill(verified)
    }

    /// Write a table feature
    pub fn set_table_vcp_value(&mut self, code: u8, value: &TableValue) -> Result<()> {
        self.set_table_vcp_value_verify(code, value, None)
    }

    /// Write a table feature and optionally read it back
    pub fn set_table_vcp_value_verify(
        &mut self,
        code: u8,
        value: &TableValue,
        verified: Option<&mut TableValue>,
    ) -> Result<()> {
        if !table::kind_possible(code, FeatureKind::is_table) {
            return Err(wrong_kind(code, "non-table feature written as table"));
        }
        self.write_table(code, value, verified.is_some()).fill(verified)
    }

    /// Write a value of either type
    pub fn set_any_vcp_value(&mut self, code: u8, value: &AnyVcpValue) -> Result<()> {
        self.set_any_vcp_value_verify(code, value, None)
    }

    /// Write a value of either type and optionally read it back
    pub fn set_any_vcp_value_verify(
        &mut self,
        code: u8,
        value: &AnyVcpValue,
        verified: Option<&mut AnyVcpValue>,
    ) -> Result<()> {
        if value.feature_code != code {
            return Err(DdcError::InvalidArgument(format!(
                "value is for feature 0x{:02x}, not 0x{:02x}",
                value.feature_code, code
            )));
        }
        match &value.value {
            VcpValue::NonTable(v) => {
                if !table::kind_possible(code, |k| !k.is_table()) {
                    return Err(wrong_kind(code, "table feature written as non-table"));
                }
                let written = self.write_non_table(code, v.value(), verified.is_some());
                Written {
                    result: written.result,
                    readback: written.readback.map(|r| AnyVcpValue::non_table(code, r)),
                }
                .fill(verified)
            }
            VcpValue::Table(t) => {
                if !table::kind_possible(code, FeatureKind::is_table) {
                    return Err(wrong_kind(code, "non-table feature written as table"));
                }
                let written = self.write_table(code, t, verified.is_some());
                Written {
                    result: written.result,
                    readback: written.readback.map(|r| AnyVcpValue::table(code, r)),
                }
                .fill(verified)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::{ChannelLocation, DetectedDisplay, DisplayRef};
    use crate::error::Status;
    use crate::transport::simulated::{Fault, SimulatedMonitor};

    fn open(monitor: &SimulatedMonitor) -> DisplayHandle {
        let detected = DetectedDisplay::new(ChannelLocation::I2c { busno: 8 }, Box::new(monitor.clone()));
        DisplayRef::ad_hoc(detected).open().unwrap()
    }

    fn monitor() -> SimulatedMonitor {
        SimulatedMonitor::new()
            .with_continuous(0x10, 20, 100)
            .with_table(0x74, vec![0; 8])
    }

    /// Run `f` with verification set as requested on this thread
    fn with_verify<T>(onoff: bool, f: impl FnOnce() -> T) -> T {
        let prior = settings::enable_verify(onoff);
        let out = f();
        settings::enable_verify(prior);
        out
    }

    #[test]
    fn test_verify_disabled_skips_readback() {
        let monitor = monitor();
        let mut handle = open(&monitor);
        with_verify(false, || {
            handle.set_non_table_vcp_value_verify(0x10, 0x00, 0x32, None, None).unwrap();
        });
        assert_eq!(monitor.value(0x10), Some(0x32));
        assert_eq!(monitor.activity().get_requests, 0);
    }

    #[test]
    fn test_verify_enabled_matching_echo() {
        let monitor = monitor();
        let mut handle = open(&monitor);
        let (mut hi, mut lo) = (0xff, 0xff);
        with_verify(true, || {
            handle
                .set_non_table_vcp_value_verify(0x10, 0x00, 0x32, Some(&mut hi), Some(&mut lo))
                .unwrap();
        });
        assert_eq!((hi, lo), (0x00, 0x32));
        assert_eq!(monitor.activity().get_requests, 1);
    }

    #[test]
    fn test_verify_enabled_mismatching_echo() {
        let monitor = monitor();
        monitor.set_readback(0x10, 0x0030);
        let mut handle = open(&monitor);
        let (mut hi, mut lo) = (0xff, 0xff);
        let result = with_verify(true, || {
            handle.set_non_table_vcp_value_verify(0x10, 0x00, 0x32, Some(&mut hi), Some(&mut lo))
        });
        let err = result.unwrap_err();
        assert_eq!(err.status(), Status::Verify);
        assert!(matches!(err, DdcError::Verify { feature_code: 0x10, source: None }));
        assert_eq!((hi, lo), (0x00, 0x30));
    }

    #[test]
    fn test_single_slot_is_rejected_without_io() {
        let monitor = monitor();
        let mut handle = open(&monitor);
        let mut hi = 0;
        let err = handle
            .set_non_table_vcp_value_verify(0x10, 0x00, 0x32, Some(&mut hi), None)
            .unwrap_err();
        assert_eq!(err.status(), Status::Arg);
        let mut lo = 0;
        let err = handle
            .set_non_table_vcp_value_verify(0x10, 0x00, 0x32, None, Some(&mut lo))
            .unwrap_err();
        assert_eq!(err.status(), Status::Arg);
        assert_eq!(monitor.activity().sends, 0);
        assert_eq!(monitor.value(0x10), Some(20));
    }

    #[test]
    fn test_failed_write_is_not_verified() {
        let monitor = monitor();
        let faults = usize::from(crate::ddc::MAX_MAX_TRIES) + 1;
        monitor.inject_faults(std::iter::repeat_n(Fault::Nak, faults));
        let mut handle = open(&monitor);
        let mut value = 0;
        let err = with_verify(true, || handle.set_continuous_vcp_value_verify(0x10, 60, Some(&mut value)))
            .unwrap_err();
        assert_eq!(err.status(), Status::RetriesExhausted);
        assert_eq!(value, 0);
        assert_eq!(monitor.activity().get_requests, 0);
    }

    #[test]
    fn test_failed_readback_leaves_slot() {
        let monitor = monitor();
        let mut handle = open(&monitor);
        let mut value = 7;
        // The second write goes through, its read-back gets a structurally wrong reply
        let err = with_verify(true, || {
            handle.set_continuous_vcp_value_verify(0x10, 60, Some(&mut value))?;
            monitor.inject_faults([Fault::WrongOpcode]);
            handle.set_continuous_vcp_value_verify(0x10, 61, Some(&mut value))
        })
        .unwrap_err();
        assert!(matches!(err, DdcError::Verify { source: Some(_), .. }));
        assert_eq!(value, 60);
        assert_eq!(monitor.value(0x10), Some(61));
    }

    #[test]
    fn test_continuous_and_table_kind_checks() {
        let monitor = monitor();
        let mut handle = open(&monitor);
        let err = handle.set_continuous_vcp_value(0x60, 0x0f).unwrap_err();
        assert_eq!(err.status(), Status::InvalidOperation);
        let err = handle.set_table_vcp_value(0x10, &TableValue(vec![1])).unwrap_err();
        assert_eq!(err.status(), Status::InvalidOperation);
        assert_eq!(monitor.activity().sends, 0);
    }

    #[test]
    fn test_table_verify() {
        let monitor = monitor();
        let mut handle = open(&monitor);
        let lut = TableValue((0..40).collect());
        let mut read = TableValue::default();
        with_verify(true, || handle.set_table_vcp_value_verify(0x74, &lut, Some(&mut read))).unwrap();
        assert_eq!(read, lut);

        monitor.set_table_readback(0x74, vec![9; 4]);
        let err = with_verify(true, || handle.set_table_vcp_value_verify(0x74, &lut, Some(&mut read)))
            .unwrap_err();
        assert_eq!(err.status(), Status::Verify);
        assert_eq!(read, TableValue(vec![9; 4]));
    }

    #[test]
    fn test_any_value() {
        let monitor = monitor();
        let mut handle = open(&monitor);
        let value = AnyVcpValue::non_table(0x10, NonTableValue::new(0, 0, 0, 45));
        let mut read = AnyVcpValue::table(0, TableValue::default());
        with_verify(true, || handle.set_any_vcp_value_verify(0x10, &value, Some(&mut read))).unwrap();
        assert_eq!(read.feature_code, 0x10);
        assert!(matches!(read.value, VcpValue::NonTable(v) if v.value() == 45 && v.max_value() == 100));

        let err = handle.set_any_vcp_value(0x12, &value).unwrap_err();
        assert_eq!(err.status(), Status::Arg);
    }
}
