// SPDX-License-Identifier: GPL-3.0-only
//! Display detection
//!
//! Detectors enumerate the physical displays reachable on one kind of
//! channel. Every candidate is checked by reading feature 0x10; displays that
//! answer (even with "unsupported") have working DDC/CI.

use super::edid::ParsedEdid;
use super::identifier::EDID_SIZE;
use super::reference::ChannelLocation;
use crate::ddc;
use crate::error::DdcError;
use crate::transport::simulated::SimulatedMonitor;
use crate::transport::ChannelOpener;

/// Feature read to check whether DDC/CI works
const CHECK_FEATURE: u8 = 0x10;

/// One display found by a [`Detector`]
#[derive(Debug)]
pub struct DetectedDisplay {
    pub location: ChannelLocation,
    pub edid: Option<ParsedEdid>,
    /// Legacy ADL adapter/display slot, if the display has one
    pub adl: Option<(u32, u32)>,
    pub ddc_working: bool,
    pub opener: Box<dyn ChannelOpener>,
}

impl DetectedDisplay {
    pub fn new(location: ChannelLocation, opener: Box<dyn ChannelOpener>) -> Self {
        Self {
            location,
            edid: None,
            adl: None,
            ddc_working: true,
            opener,
        }
    }

    pub fn with_edid(mut self, edid: ParsedEdid) -> Self {
        self.edid = Some(edid);
        self
    }

    pub fn with_adl(mut self, adapter: u32, display: u32) -> Self {
        self.adl = Some((adapter, display));
        self
    }

    /// Check DDC/CI communication and record the outcome
    pub fn checked(mut self) -> Self {
        self.ddc_working = check_ddc(self.location, self.opener.as_ref());
        self
    }
}

fn check_ddc(location: ChannelLocation, opener: &dyn ChannelOpener) -> bool {
    let mut transport = match opener.open() {
        Ok(t) => t,
        Err(e) => {
            debug!(display = %location, error = %e, "Cannot open channel for probing");
            return false;
        }
    };
    match ddc::get_vcp(transport.as_mut(), CHECK_FEATURE) {
        Ok(_) | Err(DdcError::ReportedUnsupported(_)) => true,
        Err(e) => {
            debug!(display = %location, error = %e, "DDC/CI check failed");
            false
        }
    }
}

/// Source of displays for the registry
pub trait Detector {
    fn detect(&self) -> Vec<DetectedDisplay>;
}

/// Displays on `/dev/i2c-*` buses that carry an EDID
#[cfg(target_os = "linux")]
#[derive(Debug, Default, Clone, Copy)]
pub struct I2cDetector;

#[cfg(target_os = "linux")]
impl I2cDetector {
    fn buses() -> std::io::Result<Vec<u32>> {
        let mut enumerator = udev::Enumerator::new()?;
        enumerator.match_subsystem("i2c-dev")?;
        let mut buses: Vec<u32> = enumerator
            .scan_devices()?
            .filter_map(|device| device.sysname().to_str()?.strip_prefix("i2c-")?.parse().ok())
            .collect();
        buses.sort_unstable();
        Ok(buses)
    }
}

#[cfg(target_os = "linux")]
impl Detector for I2cDetector {
    fn detect(&self) -> Vec<DetectedDisplay> {
        use crate::ddc::packet::EDID_SLAVE_ADDR;
        use crate::transport::i2c::{I2cDevice, I2cOpener};

        let buses = match Self::buses() {
            Ok(buses) => buses,
            Err(e) => {
                warn!(error = %e, "Failed to enumerate i2c-dev devices");
                return Vec::new();
            }
        };
        debug!("Found {} i2c-dev bus(es)", buses.len());

        let mut found = Vec::new();
        for busno in buses {
            let raw = match I2cDevice::open(busno, EDID_SLAVE_ADDR).and_then(|mut dev| dev.read_edid()) {
                Ok(raw) => raw,
                Err(e) => {
                    debug!(busno, error = %e, "No EDID on bus");
                    continue;
                }
            };
            let edid = match ParsedEdid::parse(&raw) {
                Ok(edid) => edid,
                Err(e) => {
                    debug!(busno, error = %e, "Ignoring bus with invalid EDID");
                    continue;
                }
            };
            let detected = DetectedDisplay::new(ChannelLocation::I2c { busno }, Box::new(I2cOpener { busno }))
                .with_edid(edid)
                .checked();
            let (location, ddc_working) = (detected.location, detected.ddc_working);
            info!(display = %location, ddc_working, "Detected I2C display");
            found.push(detected);
        }
        found
    }
}

/// Monitors implementing the USB Monitor Control Class
#[cfg(feature = "usb-hid")]
#[derive(Debug, Default, Clone, Copy)]
pub struct HidDetector;

#[cfg(feature = "usb-hid")]
impl HidDetector {
    /// hidraw index of a device node path, e.g. 2 for `/dev/hidraw2`
    fn hidraw_index(path: &std::ffi::CStr) -> Option<u32> {
        path.to_str().ok()?.rsplit('/').next()?.strip_prefix("hidraw")?.parse().ok()
    }

    /// USB bus and device number of a hidraw node
    #[cfg(target_os = "linux")]
    fn usb_address(hiddev: u32) -> Option<(u32, u32)> {
        let hidraw = udev::Device::from_subsystem_sysname("hidraw".into(), format!("hidraw{}", hiddev)).ok()?;
        let usb = hidraw.parent_with_subsystem_devtype("usb", "usb_device").ok()??;
        let attr = |name: &str| -> Option<u32> { usb.attribute_value(name)?.to_str()?.trim().parse().ok() };
        Some((attr("busnum")?, attr("devnum")?))
    }

    #[cfg(not(target_os = "linux"))]
    fn usb_address(_hiddev: u32) -> Option<(u32, u32)> {
        None
    }
}

#[cfg(feature = "usb-hid")]
impl Detector for HidDetector {
    fn detect(&self) -> Vec<DetectedDisplay> {
        use crate::transport::hid::{HidOpener, MONITOR_USAGE_PAGE};

        // The api is dropped before probing, probing opens its own
        let paths: Vec<std::ffi::CString> = match hidapi::HidApi::new() {
            Ok(api) => api
                .device_list()
                .filter(|info| info.usage_page() == MONITOR_USAGE_PAGE)
                .map(|info| info.path().to_owned())
                .collect(),
            Err(e) => {
                warn!(error = %e, "Failed to initialize hidapi");
                return Vec::new();
            }
        };

        let mut found = Vec::new();
        for path in paths {
            let Some(hiddev) = Self::hidraw_index(&path) else {
                debug!(path = ?path, "Skipping HID monitor without hidraw node");
                continue;
            };
            let (bus, device) = Self::usb_address(hiddev).unwrap_or_default();
            let location = ChannelLocation::Usb { bus, device, hiddev };
            let detected = DetectedDisplay::new(location, Box::new(HidOpener { path })).checked();
            let ddc_working = detected.ddc_working;
            info!(display = %location, ddc_working, "Detected USB HID display");
            found.push(detected);
        }
        found
    }
}

/// Detector over simulated monitors
#[derive(Debug, Default, Clone)]
pub struct SimulatedDetector {
    displays: Vec<(ChannelLocation, SimulatedMonitor, Option<[u8; EDID_SIZE]>)>,
}

impl SimulatedDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_display(
        mut self,
        location: ChannelLocation,
        monitor: SimulatedMonitor,
        edid: Option<[u8; EDID_SIZE]>,
    ) -> Self {
        self.displays.push((location, monitor, edid));
        self
    }
}

impl Detector for SimulatedDetector {
    fn detect(&self) -> Vec<DetectedDisplay> {
        self.displays
            .iter()
            .map(|(location, monitor, edid)| {
                let mut detected = DetectedDisplay::new(*location, Box::new(monitor.clone()));
                detected.edid = edid.as_ref().and_then(|bytes| ParsedEdid::parse(bytes).ok());
                detected.checked()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_marks_unresponsive_display() {
        let working = SimulatedMonitor::new().with_continuous(0x10, 40, 100);
        // Answers, but without brightness support
        let no_brightness = SimulatedMonitor::new();
        let dead = SimulatedMonitor::new().unresponsive();
        let detector = SimulatedDetector::new()
            .with_display(ChannelLocation::I2c { busno: 1 }, working, None)
            .with_display(ChannelLocation::I2c { busno: 2 }, no_brightness, None)
            .with_display(ChannelLocation::I2c { busno: 3 }, dead, None);

        let found: Vec<bool> = detector.detect().iter().map(|d| d.ddc_working).collect();
        assert_eq!(found, vec![true, true, false]);
    }

    #[cfg(feature = "usb-hid")]
    #[test]
    fn test_hidraw_index() {
        let path = std::ffi::CString::new("/dev/hidraw12").unwrap();
        assert_eq!(HidDetector::hidraw_index(&path), Some(12));
        let path = std::ffi::CString::new("1-2:1.0").unwrap();
        assert_eq!(HidDetector::hidraw_index(&path), None);
    }
}
