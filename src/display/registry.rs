// SPDX-License-Identifier: GPL-3.0-only
//! Display registry
//!
//! Holds the displays found by the last detection and resolves
//! [`DisplayIdentifier`]s against them.
//!
//! # Thread Safety
//!
//! Records live in an `Arc<RwLock<Vec<..>>>`. Resolution and listing take the
//! read lock, detection takes the write lock. [`DisplayRegistry::global`]
//! returns a view of one process-wide instance; [`DisplayRegistry::new`]
//! creates an isolated one.

use std::io::{self, Write};
use std::sync::atomic::Ordering;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use once_cell::sync::Lazy;
use serde::Serialize;

use super::detect::{DetectedDisplay, Detector};
use super::identifier::DisplayIdentifier;
use super::reference::{ChannelLocation, DisplayRecord, DisplayRef};
use crate::error::{DdcError, Result};

type Records = Arc<RwLock<Vec<Arc<DisplayRecord>>>>;

/// Global singleton display registry
static GLOBAL_DISPLAY_REGISTRY: Lazy<Records> = Lazy::new(|| Arc::new(RwLock::new(Vec::new())));

/// Summary of one detected display
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayInfo {
    pub dispno: Option<u32>,
    pub location: ChannelLocation,
    pub mfg_id: String,
    pub model: String,
    pub serial: String,
    pub product_code: u16,
    #[serde(skip)]
    pub edid: Option<Vec<u8>>,
    pub ddc_working: bool,
    #[serde(skip)]
    pub dref: DisplayRef,
}

impl DisplayInfo {
    fn from_ref(dref: DisplayRef) -> Self {
        let edid = dref.edid();
        Self {
            dispno: dref.dispno(),
            location: dref.location(),
            mfg_id: edid.map(|e| e.mfg_id.clone()).unwrap_or_default(),
            model: edid.map(|e| e.model.clone()).unwrap_or_default(),
            serial: edid.map(|e| e.serial_ascii.clone()).unwrap_or_default(),
            product_code: edid.map(|e| e.product_code).unwrap_or_default(),
            edid: edid.map(|e| e.bytes.to_vec()),
            ddc_working: dref.is_ddc_working(),
            dref,
        }
    }
}

/// Known displays, in detection order
#[derive(Debug, Clone)]
pub struct DisplayRegistry {
    records: Records,
}

impl DisplayRegistry {
    /// Isolated, empty registry
    pub fn new() -> Self {
        Self { records: Arc::new(RwLock::new(Vec::new())) }
    }

    /// The process-wide registry
    pub fn global() -> Self {
        Self { records: GLOBAL_DISPLAY_REGISTRY.clone() }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<Arc<DisplayRecord>>>> {
        self.records
            .read()
            .map_err(|_| DdcError::Internal("display registry lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<Arc<DisplayRecord>>>> {
        self.records
            .write()
            .map_err(|_| DdcError::Internal("display registry lock poisoned".into()))
    }

    /// Replace the known displays with what `detectors` find
    ///
    /// Records are ordered by channel: I2C buses ascending, then USB
    /// bus/device. Display numbers are assigned in that order, to displays
    /// with working DDC/CI only. References from an earlier detection stop
    /// working, but a handle still open on one keeps its channel locked.
    /// Returns the number of displays with working DDC/CI.
    pub fn detect(&self, detectors: &[&dyn Detector]) -> Result<usize> {
        let mut detected: Vec<DetectedDisplay> = detectors.iter().flat_map(|d| d.detect()).collect();
        detected.sort_by_key(|d| d.location);
        detected.dedup_by_key(|d| d.location);

        let mut guard = self.write()?;
        let mut dispno = 0;
        let records: Vec<Arc<DisplayRecord>> = detected
            .into_iter()
            .map(|d| {
                let n = d.ddc_working.then(|| {
                    dispno += 1;
                    dispno
                });
                let previous = guard.iter().find(|r| r.location == d.location);
                Arc::new(DisplayRecord::new(d, n, previous.map(|r| r.as_ref())))
            })
            .collect();

        for old in guard.iter() {
            old.retired.store(true, Ordering::Release);
        }
        *guard = records;
        info!(total = guard.len(), valid = dispno, "Display detection complete");
        Ok(dispno as usize)
    }

    /// [`DisplayRegistry::detect`] with the detectors of this build
    pub fn detect_system(&self) -> Result<usize> {
        let detectors = super::system_detectors();
        let detectors: Vec<&dyn Detector> = detectors.iter().map(|d| d.as_ref()).collect();
        self.detect(&detectors)
    }

    /// Add one display found outside of [`DisplayRegistry::detect`]
    ///
    /// Replaces a record on the same channel. Existing display numbers are
    /// kept; a new working display gets the next free number. A handle open
    /// on the replaced record keeps the channel locked.
    pub fn add(&self, display: DetectedDisplay) -> Result<DisplayRef> {
        let mut guard = self.write()?;
        let next = guard.iter().filter_map(|r| r.dispno).max().unwrap_or(0) + 1;
        let position = guard.iter().position(|r| r.location == display.location);
        let dispno = match position.and_then(|i| guard[i].dispno) {
            Some(n) if display.ddc_working => Some(n),
            _ => display.ddc_working.then_some(next),
        };
        let previous = position.map(|i| guard[i].as_ref());
        let record = Arc::new(DisplayRecord::new(display, dispno, previous));
        match position {
            Some(i) => {
                guard[i].retired.store(true, Ordering::Release);
                guard[i] = record.clone();
            }
            None => {
                let at = guard.partition_point(|r| r.location < record.location);
                guard.insert(at, record.clone());
            }
        }
        Ok(DisplayRef::registered(record))
    }

    /// Find the display an identifier denotes
    ///
    /// Manufacturer/model/serial identifiers may match several displays; the
    /// first one in detection order wins.
    pub fn resolve(&self, id: &DisplayIdentifier) -> Result<DisplayRef> {
        id.validate()?;
        let guard = self.read()?;
        let found = guard.iter().find(|r| Self::matches(r, id));
        match found {
            Some(record) => {
                debug!(identifier = %id, display = %record.location, "Identifier resolved");
                Ok(DisplayRef::registered(record.clone()))
            }
            None => Err(DdcError::InvalidDisplay(id.to_string())),
        }
    }

    fn matches(record: &DisplayRecord, id: &DisplayIdentifier) -> bool {
        fn field_matches(wanted: &Option<String>, actual: Option<&str>) -> bool {
            match wanted.as_deref().filter(|w| !w.is_empty()) {
                Some(w) => actual == Some(w),
                None => true,
            }
        }

        match id {
            DisplayIdentifier::Dispno(n) => record.dispno == Some(*n),
            DisplayIdentifier::Busno(b) => record.location == ChannelLocation::I2c { busno: *b },
            DisplayIdentifier::Adlno { adapter, display } => record.adl == Some((*adapter, *display)),
            DisplayIdentifier::MfgModelSn { mfg, model, serial } => {
                let edid = record.edid.as_ref();
                field_matches(mfg, edid.map(|e| e.mfg_id.as_str()))
                    && field_matches(model, edid.map(|e| e.model.as_str()))
                    && field_matches(serial, edid.map(|e| e.serial_ascii.as_str()))
            }
            DisplayIdentifier::Edid(bytes) => {
                record.edid.as_ref().is_some_and(|e| e.bytes == **bytes)
            }
            DisplayIdentifier::Usb { bus, device } => matches!(
                record.location,
                ChannelLocation::Usb { bus: b, device: d, .. } if b == *bus && d == *device
            ),
            DisplayIdentifier::HidDev(n) => matches!(
                record.location,
                ChannelLocation::Usb { hiddev, .. } if hiddev == *n
            ),
        }
    }

    /// References to the known displays, optionally including those without
    /// working DDC/CI
    pub fn display_refs(&self, include_invalid: bool) -> Result<Vec<DisplayRef>> {
        Ok(self
            .read()?
            .iter()
            .filter(|r| include_invalid || r.ddc_working)
            .map(|r| DisplayRef::registered(r.clone()))
            .collect())
    }

    pub fn display_info_list(&self, include_invalid: bool) -> Result<Vec<DisplayInfo>> {
        Ok(self
            .display_refs(include_invalid)?
            .into_iter()
            .map(DisplayInfo::from_ref)
            .collect())
    }

    /// Report the known displays; returns how many were reported
    pub fn report_active_displays(
        &self,
        w: &mut dyn Write,
        include_invalid: bool,
        depth: usize,
    ) -> io::Result<usize> {
        let refs = self.display_refs(include_invalid).map_err(io::Error::other)?;
        for dref in &refs {
            dref.report(w, depth)?;
            writeln!(w)?;
        }
        if refs.is_empty() {
            crate::report::line(w, depth, "No active displays found")?;
        }
        Ok(refs.len())
    }
}

impl Default for DisplayRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::detect::SimulatedDetector;
    use crate::display::edid::encode_edid;
    use crate::error::Status;
    use crate::transport::simulated::SimulatedMonitor;

    fn monitor() -> SimulatedMonitor {
        SimulatedMonitor::new().with_continuous(0x10, 40, 100)
    }

    /// Two identical Dell models, a dead LG and a USB monitor, listed out
    /// of channel order
    fn registry() -> DisplayRegistry {
        let detector = SimulatedDetector::new()
            .with_display(
                ChannelLocation::Usb { bus: 3, device: 7, hiddev: 1 },
                monitor(),
                Some(encode_edid("EIZ", 0x1234, "CG279X", "24880001")),
            )
            .with_display(
                ChannelLocation::I2c { busno: 6 },
                monitor(),
                Some(encode_edid("DEL", 0xa0c5, "DELL U2415", "SN-B")),
            )
            .with_display(
                ChannelLocation::I2c { busno: 5 },
                SimulatedMonitor::new().unresponsive(),
                Some(encode_edid("GSM", 0x5b09, "LG ULTRAFINE", "SN-LG")),
            )
            .with_display(
                ChannelLocation::I2c { busno: 4 },
                monitor(),
                Some(encode_edid("DEL", 0xa0c5, "DELL U2415", "SN-A")),
            );
        let registry = DisplayRegistry::new();
        assert_eq!(registry.detect(&[&detector]).unwrap(), 3);
        registry
    }

    #[test]
    fn test_display_numbers_follow_channel_order() {
        let registry = registry();
        let refs = registry.display_refs(true).unwrap();
        let order: Vec<(ChannelLocation, Option<u32>)> =
            refs.iter().map(|r| (r.location(), r.dispno())).collect();
        assert_eq!(
            order,
            vec![
                (ChannelLocation::I2c { busno: 4 }, Some(1)),
                (ChannelLocation::I2c { busno: 5 }, None),
                (ChannelLocation::I2c { busno: 6 }, Some(2)),
                (ChannelLocation::Usb { bus: 3, device: 7, hiddev: 1 }, Some(3)),
            ]
        );
        assert_eq!(registry.display_refs(false).unwrap().len(), 3);
    }

    #[test]
    fn test_resolve_each_identifier_kind() {
        let registry = registry();
        let bus = |dref: DisplayRef| dref.location();

        assert_eq!(
            bus(registry.resolve(&DisplayIdentifier::dispno(2)).unwrap()),
            ChannelLocation::I2c { busno: 6 }
        );
        assert_eq!(
            bus(registry.resolve(&DisplayIdentifier::busno(5)).unwrap()),
            ChannelLocation::I2c { busno: 5 }
        );
        let edid = encode_edid("DEL", 0xa0c5, "DELL U2415", "SN-B");
        assert_eq!(
            bus(registry.resolve(&DisplayIdentifier::edid(&edid).unwrap()).unwrap()),
            ChannelLocation::I2c { busno: 6 }
        );
        assert_eq!(
            registry.resolve(&DisplayIdentifier::usb(3, 7)).unwrap().dispno(),
            Some(3)
        );
        assert_eq!(
            registry.resolve(&DisplayIdentifier::hiddev(1)).unwrap().dispno(),
            Some(3)
        );
    }

    #[test]
    fn test_ambiguous_match_takes_first_in_detection_order() {
        let registry = registry();
        let id = DisplayIdentifier::mfg_model_sn(Some("DEL"), Some("DELL U2415"), None).unwrap();
        assert_eq!(registry.resolve(&id).unwrap().location(), ChannelLocation::I2c { busno: 4 });

        let id = DisplayIdentifier::mfg_model_sn(None, None, Some("SN-B")).unwrap();
        assert_eq!(registry.resolve(&id).unwrap().location(), ChannelLocation::I2c { busno: 6 });
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let registry = registry();
        let id = DisplayIdentifier::mfg_model_sn(None, Some("CG279X"), None).unwrap();
        let a = registry.resolve(&id).unwrap();
        let b = registry.resolve(&id).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, registry.resolve(&DisplayIdentifier::dispno(3)).unwrap());
    }

    #[test]
    fn test_no_match() {
        let registry = registry();
        for id in [
            DisplayIdentifier::dispno(4),
            DisplayIdentifier::busno(9),
            DisplayIdentifier::adlno(0, 0),
            DisplayIdentifier::mfg_model_sn(Some("ACI"), None, None).unwrap(),
        ] {
            assert_eq!(registry.resolve(&id).unwrap_err().status(), Status::InvalidDisplay);
        }
    }

    #[test]
    fn test_redetect_retires_old_refs() {
        let registry = registry();
        let old = registry.resolve(&DisplayIdentifier::dispno(1)).unwrap();
        let detector = SimulatedDetector::new().with_display(ChannelLocation::I2c { busno: 4 }, monitor(), None);
        registry.detect(&[&detector]).unwrap();
        assert_eq!(old.open().unwrap_err().status(), Status::InvalidDisplay);
        let new = registry.resolve(&DisplayIdentifier::dispno(1)).unwrap();
        assert_eq!(old, new);
        new.open().unwrap().close().unwrap();
    }

    #[test]
    fn test_resolve_rejects_empty_mfg_model_sn() {
        let registry = registry();
        let empty = DisplayIdentifier::MfgModelSn { mfg: None, model: None, serial: None };
        assert_eq!(registry.resolve(&empty).unwrap_err().status(), Status::Arg);

        let blank = DisplayIdentifier::MfgModelSn { mfg: Some(String::new()), model: None, serial: None };
        assert_eq!(registry.resolve(&blank).unwrap_err().status(), Status::Arg);

        let too_long = DisplayIdentifier::MfgModelSn { mfg: Some("DELL".into()), model: None, serial: None };
        assert_eq!(registry.resolve(&too_long).unwrap_err().status(), Status::Arg);
    }

    #[test]
    fn test_open_handle_survives_redetection() {
        let registry = registry();
        let old = registry.resolve(&DisplayIdentifier::busno(4)).unwrap();
        let mut handle = old.open().unwrap();

        let detector = SimulatedDetector::new().with_display(ChannelLocation::I2c { busno: 4 }, monitor(), None);
        registry.detect(&[&detector]).unwrap();
        let new = registry.resolve(&DisplayIdentifier::busno(4)).unwrap();
        assert!(new.is_open());
        assert_eq!(new.open().unwrap_err().status(), Status::Locked);

        let same_bus = DetectedDisplay::new(ChannelLocation::I2c { busno: 4 }, Box::new(monitor()));
        let added = registry.add(same_bus).unwrap();
        assert_eq!(added.open().unwrap_err().status(), Status::Locked);

        handle.close().unwrap();
        assert!(!added.is_open());
        added.open().unwrap().close().unwrap();
    }

    #[test]
    fn test_add_keeps_numbering() {
        let registry = registry();
        let usb = DetectedDisplay::new(ChannelLocation::Usb { bus: 1, device: 2, hiddev: 0 }, Box::new(monitor()));
        let dref = registry.add(usb).unwrap();
        assert_eq!(dref.dispno(), Some(4));
        let locations: Vec<ChannelLocation> =
            registry.display_refs(true).unwrap().iter().map(|r| r.location()).collect();
        assert_eq!(locations[3], ChannelLocation::Usb { bus: 1, device: 2, hiddev: 0 });
        assert_eq!(registry.resolve(&DisplayIdentifier::dispno(3)).unwrap().location().to_string(), "usb 3:7 (hiddev1)");
    }

    #[test]
    fn test_report_and_info_list() {
        let registry = registry();
        let infos = registry.display_info_list(false).unwrap();
        assert_eq!(infos.len(), 3);
        assert_eq!(infos[0].mfg_id, "DEL");
        assert_eq!(infos[0].serial, "SN-A");

        let mut out = Vec::new();
        assert_eq!(registry.report_active_displays(&mut out, true, 0).unwrap(), 4);
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Display 1"));
        assert!(text.contains("Invalid display"));
        assert!(text.contains("DDC communication failed"));
        assert!(text.contains("/dev/i2c-4"));
    }
}
