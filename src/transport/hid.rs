// SPDX-License-Identifier: GPL-3.0-only
//! USB HID channel
//!
//! Monitors implementing the USB Monitor Control Class expose a HID
//! interface on usage page 0x80. They do not carry DDC/CI frames: every VCP
//! feature is a usage on the VESA Virtual Controls page (0x82), held in a
//! field of a feature report. The report descriptor says which report and
//! which bits hold each feature.
//!
//! [`UsbVcpChannel`] accepts DDC/CI requests and answers them from those
//! reports, so the engine talks to USB monitors the same way it talks to
//! I2C ones. The capabilities string is built from the declared features.

use std::collections::BTreeMap;
use std::ffi::CString;
use std::fmt;

use hidapi::{HidApi, HidDevice};

use super::{ChannelOpener, Timing, Transport};
use crate::ddc::packet::{self, opcode};
use crate::error::TransportError;

/// HID usage page of the USB Monitor Control Class
pub const MONITOR_USAGE_PAGE: u16 = 0x0080;

/// HID usage page whose usages are VCP feature codes
pub const VESA_VCP_USAGE_PAGE: u16 = 0x0082;

const MAX_REPORT_DESCRIPTOR_SIZE: usize = 4096;

/// Capabilities fragment size, as a DDC/CI display would send it
const FRAGMENT_SIZE: usize = 32;

/// Where one VCP feature lives in the feature reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VcpField {
    pub report_id: u8,
    /// Bit offset within the report, after the report ID byte
    pub bit_offset: usize,
    pub bit_size: usize,
    pub logical_max: u32,
}

/// VCP feature fields declared by a report descriptor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VcpReportMap {
    fields: BTreeMap<u8, VcpField>,
    /// Feature report sizes in bits, by report ID
    report_bits: BTreeMap<u8, usize>,
}

#[derive(Debug, Clone, Copy, Default)]
struct GlobalState {
    usage_page: u16,
    logical_max: u32,
    report_size: usize,
    report_count: usize,
    report_id: u8,
}

fn item_value(data: &[u8]) -> u32 {
    data.iter().rev().fold(0, |acc, &b| (acc << 8) | b as u32)
}

impl VcpReportMap {
    /// Collect the Virtual Controls fields of the feature reports
    pub fn parse(descriptor: &[u8]) -> Self {
        let mut map = Self::default();
        let mut global = GlobalState::default();
        let mut stack: Vec<GlobalState> = Vec::new();
        // Local usages as (page, id); a page of 0 means the global page
        let mut usages: Vec<(u16, u16)> = Vec::new();
        let mut usage_min: Option<(u16, u16)> = None;

        let mut i = 0;
        while i < descriptor.len() {
            let prefix = descriptor[i];
            if prefix == 0xfe {
                // Long item: size, tag, data
                let size = descriptor.get(i + 1).copied().unwrap_or(0) as usize;
                i += 3 + size;
                continue;
            }
            let size = match prefix & 0x03 {
                3 => 4,
                n => n as usize,
            };
            let Some(data) = descriptor.get(i + 1..i + 1 + size) else {
                debug!(offset = i, "Truncated HID report descriptor");
                break;
            };
            let value = item_value(data);
            let tag = prefix >> 4;
            match (prefix >> 2) & 0x03 {
                // Main
                0 => {
                    if tag == 0x0b {
                        map.add_feature(&global, &usages, data.first().copied().unwrap_or(0));
                    }
                    usages.clear();
                    usage_min = None;
                }
                // Global
                1 => match tag {
                    0x0 => global.usage_page = value as u16,
                    0x2 => global.logical_max = value,
                    0x7 => global.report_size = value as usize,
                    0x8 => global.report_id = value as u8,
                    0x9 => global.report_count = value as usize,
                    0xa => stack.push(global),
                    0xb => global = stack.pop().unwrap_or(global),
                    _ => {}
                },
                // Local
                2 => {
                    let usage = if size == 4 {
                        ((value >> 16) as u16, value as u16)
                    } else {
                        (0, value as u16)
                    };
                    match tag {
                        0x0 => usages.push(usage),
                        0x1 => usage_min = Some(usage),
                        0x2 => {
                            if let Some((page, min)) = usage_min.take() {
                                usages.extend((min..=usage.1).map(|id| (page, id)));
                            }
                        }
                        _ => {}
                    }
                }
                _ => {}
            }
            i += 1 + size;
        }
        map
    }

    fn add_feature(&mut self, global: &GlobalState, usages: &[(u16, u16)], flags: u8) {
        let offset = self.report_bits.entry(global.report_id).or_insert(0);
        let start = *offset;
        *offset += global.report_size * global.report_count;
        // Constant fields are padding
        if flags & 0x01 != 0 {
            return;
        }
        for n in 0..global.report_count {
            let Some(&(page, id)) = usages.get(n).or(usages.last()) else {
                break;
            };
            let page = if page == 0 { global.usage_page } else { page };
            let Ok(code) = u8::try_from(id) else {
                continue;
            };
            if page != VESA_VCP_USAGE_PAGE {
                continue;
            }
            self.fields.entry(code).or_insert(VcpField {
                report_id: global.report_id,
                bit_offset: start + n * global.report_size,
                bit_size: global.report_size,
                logical_max: global.logical_max,
            });
        }
    }

    pub fn field(&self, code: u8) -> Option<&VcpField> {
        self.fields.get(&code)
    }

    /// Declared feature codes, ascending
    pub fn codes(&self) -> impl Iterator<Item = u8> + '_ {
        self.fields.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Feature report length in bytes, including the report ID
    fn report_len(&self, report_id: u8) -> usize {
        1 + self.report_bits.get(&report_id).map_or(0, |bits| bits.div_ceil(8))
    }

    /// Capabilities string listing the declared features
    pub fn capabilities(&self) -> String {
        let codes: Vec<String> = self.codes().map(|c| format!("{:02X}", c)).collect();
        format!("(prot(monitor)type(lcd)cmds(01 02 03 F3)vcp({}))", codes.join(" "))
    }
}

fn extract_bits(bytes: &[u8], offset: usize, size: usize) -> u32 {
    (0..size.min(32)).fold(0, |acc, i| {
        let bit = offset + i;
        match bytes.get(bit / 8) {
            Some(b) if (b >> (bit % 8)) & 1 == 1 => acc | (1 << i),
            _ => acc,
        }
    })
}

fn insert_bits(bytes: &mut [u8], offset: usize, size: usize, value: u32) {
    for i in 0..size.min(32) {
        let bit = offset + i;
        if let Some(b) = bytes.get_mut(bit / 8) {
            if (value >> i) & 1 == 1 {
                *b |= 1 << (bit % 8);
            } else {
                *b &= !(1 << (bit % 8));
            }
        }
    }
}

/// Feature report access on one HID device
pub trait FeatureReports: Send {
    /// Read the report named by `buf[0]`; returns the length including the ID
    fn get_feature_report(&mut self, buf: &mut [u8]) -> Result<usize, TransportError>;

    /// Write a report whose ID is `buf[0]`
    fn send_feature_report(&mut self, buf: &[u8]) -> Result<(), TransportError>;
}

fn hid_error(e: hidapi::HidError) -> TransportError {
    TransportError::Hid(e.to_string())
}

impl FeatureReports for HidDevice {
    fn get_feature_report(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        HidDevice::get_feature_report(self, buf).map_err(hid_error)
    }

    fn send_feature_report(&mut self, buf: &[u8]) -> Result<(), TransportError> {
        HidDevice::send_feature_report(self, buf).map_err(hid_error)
    }
}

/// DDC/CI channel answered from USB Monitor Control Class reports
pub struct UsbVcpChannel<R> {
    reports: R,
    map: VcpReportMap,
    capabilities: Vec<u8>,
    /// Reply payload to the last request
    pending: Option<Vec<u8>>,
}

impl<R> fmt::Debug for UsbVcpChannel<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UsbVcpChannel").field("map", &self.map).finish_non_exhaustive()
    }
}

impl<R: FeatureReports> UsbVcpChannel<R> {
    pub fn new(reports: R, map: VcpReportMap) -> Self {
        let capabilities = map.capabilities().into_bytes();
        Self { reports, map, capabilities, pending: None }
    }

    fn read_report(&mut self, field: &VcpField) -> Result<Vec<u8>, TransportError> {
        let len = self.map.report_len(field.report_id);
        let mut buf = vec![0u8; len];
        buf[0] = field.report_id;
        let read = self.reports.get_feature_report(&mut buf)?;
        if read < len {
            return Err(TransportError::ShortTransfer { expected: len, actual: read });
        }
        Ok(buf)
    }

    fn get_vcp(&mut self, code: u8) -> Result<Vec<u8>, TransportError> {
        let Some(field) = self.map.field(code).copied() else {
            // Result code 1: unsupported feature
            return Ok(vec![opcode::GET_VCP_REPLY, 0x01, code, 0, 0, 0, 0, 0]);
        };
        let report = self.read_report(&field)?;
        let value = extract_bits(&report[1..], field.bit_offset, field.bit_size);
        let [_, _, mh, ml] = field.logical_max.min(u16::MAX as u32).to_be_bytes();
        let [_, _, sh, sl] = value.min(u16::MAX as u32).to_be_bytes();
        Ok(vec![opcode::GET_VCP_REPLY, 0x00, code, 0x00, mh, ml, sh, sl])
    }

    fn set_vcp(&mut self, code: u8, value: u16) -> Result<(), TransportError> {
        let field = self
            .map
            .field(code)
            .copied()
            .ok_or_else(|| TransportError::Hid(format!("feature 0x{:02x} has no HID usage", code)))?;
        let mut report = self.read_report(&field)?;
        insert_bits(&mut report[1..], field.bit_offset, field.bit_size, value as u32);
        self.reports.send_feature_report(&report)
    }

    fn capabilities_fragment(&self, oh: u8, ol: u8) -> Vec<u8> {
        let start = (u16::from_be_bytes([oh, ol]) as usize).min(self.capabilities.len());
        let end = (start + FRAGMENT_SIZE).min(self.capabilities.len());
        let mut reply = vec![opcode::CAPABILITIES_REPLY, oh, ol];
        reply.extend_from_slice(&self.capabilities[start..end]);
        reply
    }
}

impl<R: FeatureReports> Transport for UsbVcpChannel<R> {
    fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let payload = packet::decode_request(bytes).map_err(|e| TransportError::Hid(e.to_string()))?;
        self.pending = None;
        match payload.as_slice() {
            [opcode::GET_VCP_REQUEST, code] => self.pending = Some(self.get_vcp(*code)?),
            [opcode::SET_VCP_REQUEST, code, sh, sl] => self.set_vcp(*code, u16::from_be_bytes([*sh, *sl]))?,
            [opcode::CAPABILITIES_REQUEST, oh, ol] => self.pending = Some(self.capabilities_fragment(*oh, *ol)),
            // USB monitors keep settings without being told
            [opcode::SAVE_SETTINGS] => {}
            [op, ..] => {
                return Err(TransportError::Hid(format!(
                    "request 0x{:02x} is not available over USB",
                    op
                )));
            }
            [] => return Err(TransportError::Hid("empty request".into())),
        }
        Ok(())
    }

    fn receive(&mut self, _max_len: usize) -> Result<Vec<u8>, TransportError> {
        let payload = self.pending.take().ok_or(TransportError::Nak)?;
        packet::encode_reply(&payload).map_err(|e| TransportError::Hid(e.to_string()))
    }

    fn timing(&self) -> Timing {
        Timing::NONE
    }
}

/// Opens [`UsbVcpChannel`]s on one hidraw node
#[derive(Debug, Clone)]
pub struct HidOpener {
    pub path: CString,
}

impl HidOpener {
    fn open_device(&self) -> Result<(HidDevice, VcpReportMap), TransportError> {
        let api = HidApi::new().map_err(hid_error)?;
        let device = api.open_path(&self.path).map_err(hid_error)?;
        let mut descriptor = vec![0u8; MAX_REPORT_DESCRIPTOR_SIZE];
        let len = device.get_report_descriptor(&mut descriptor).map_err(hid_error)?;
        let map = VcpReportMap::parse(&descriptor[..len]);
        debug!(path = ?self.path, features = map.fields.len(), "Parsed monitor report descriptor");
        Ok((device, map))
    }
}

impl ChannelOpener for HidOpener {
    fn open(&self) -> Result<Box<dyn Transport>, TransportError> {
        let (device, map) = self.open_device()?;
        if map.is_empty() {
            return Err(TransportError::Hid(format!(
                "{} declares no VESA virtual controls",
                self.path.to_string_lossy()
            )));
        }
        Ok(Box::new(UsbVcpChannel::new(device, map)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ddc;
    use crate::error::DdcError;

    /// Monitor control descriptor: report 1 holds brightness (0x10, 16 bits,
    /// max 400), report 2 holds a constant byte followed by input source
    /// (0x60, 8 bits, max 0x12) and contrast (0x12, 8 bits, max 100)
    const DESCRIPTOR: &[u8] = &[
        0x05, 0x80, // Usage Page (Monitor)
        0x09, 0x01, // Usage (Monitor Control)
        0xa1, 0x01, // Collection (Application)
        0x85, 0x01, //   Report ID 1
        0x05, 0x82, //   Usage Page (VESA Virtual Controls)
        0x09, 0x10, //   Usage (Brightness)
        0x15, 0x00, //   Logical Minimum 0
        0x26, 0x90, 0x01, // Logical Maximum 400
        0x75, 0x10, //   Report Size 16
        0x95, 0x01, //   Report Count 1
        0xb1, 0x02, //   Feature (Data, Var, Abs)
        0x85, 0x02, //   Report ID 2
        0x75, 0x08, //   Report Size 8
        0x95, 0x01, //   Report Count 1
        0xb1, 0x03, //   Feature (Const)
        0x09, 0x60, //   Usage (Input Select)
        0x25, 0x12, //   Logical Maximum 0x12
        0xb1, 0x02, //   Feature (Data, Var, Abs)
        0x09, 0x12, //   Usage (Contrast)
        0x25, 0x64, //   Logical Maximum 100
        0xb1, 0x02, //   Feature (Data, Var, Abs)
        0xc0, // End Collection
    ];

    #[derive(Debug, Default)]
    struct FakeReports {
        reports: BTreeMap<u8, Vec<u8>>,
        sent: usize,
    }

    impl FeatureReports for FakeReports {
        fn get_feature_report(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
            let report = self.reports.get(&buf[0]).ok_or(TransportError::Nak)?;
            let len = report.len().min(buf.len());
            buf[..len].copy_from_slice(&report[..len]);
            Ok(len)
        }

        fn send_feature_report(&mut self, buf: &[u8]) -> Result<(), TransportError> {
            self.sent += 1;
            self.reports.insert(buf[0], buf.to_vec());
            Ok(())
        }
    }

    fn channel() -> UsbVcpChannel<FakeReports> {
        let mut fake = FakeReports::default();
        fake.reports.insert(1, vec![1, 0x2c, 0x01]);
        fake.reports.insert(2, vec![2, 0xaa, 0x0f, 50]);
        UsbVcpChannel::new(fake, VcpReportMap::parse(DESCRIPTOR))
    }

    #[test]
    fn test_parse_descriptor() {
        let map = VcpReportMap::parse(DESCRIPTOR);
        assert_eq!(map.codes().collect::<Vec<_>>(), vec![0x10, 0x12, 0x60]);
        assert_eq!(
            map.field(0x10),
            Some(&VcpField { report_id: 1, bit_offset: 0, bit_size: 16, logical_max: 400 })
        );
        assert_eq!(
            map.field(0x12),
            Some(&VcpField { report_id: 2, bit_offset: 16, bit_size: 8, logical_max: 100 })
        );
        assert_eq!(map.field(0x60).map(|f| f.bit_offset), Some(8));
        assert_eq!(map.report_len(2), 4);
    }

    #[test]
    fn test_get_and_set_through_engine() {
        let mut ch = channel();
        let brightness = ddc::get_vcp(&mut ch, 0x10).unwrap();
        assert_eq!((brightness.value(), brightness.max_value()), (300, 400));
        assert_eq!(ddc::get_vcp(&mut ch, 0x60).unwrap().sl, 0x0f);

        ddc::set_vcp(&mut ch, 0x12, 75).unwrap();
        assert_eq!(ch.reports.reports[&2], vec![2, 0xaa, 0x0f, 75]);
        assert_eq!(ddc::get_vcp(&mut ch, 0x12).unwrap().value(), 75);
        assert_eq!(ch.reports.sent, 1);
    }

    #[test]
    fn test_undeclared_feature_is_unsupported() {
        let mut ch = channel();
        let err = ddc::get_vcp(&mut ch, 0x14).unwrap_err();
        assert!(matches!(err, DdcError::ReportedUnsupported(_)), "{:?}", err);
        assert!(ddc::set_vcp(&mut ch, 0x14, 1).is_err());
        assert_eq!(ch.reports.sent, 0);
    }

    #[test]
    fn test_capabilities_from_descriptor() {
        let mut ch = channel();
        let caps = ddc::read_capabilities(&mut ch).unwrap();
        assert_eq!(caps, "(prot(monitor)type(lcd)cmds(01 02 03 F3)vcp(10 12 60))");
        assert!(ddc::table_read(&mut ch, 0x73).is_err());
    }

    #[test]
    fn test_bits() {
        let mut bytes = [0u8; 3];
        insert_bits(&mut bytes, 4, 12, 0xabc);
        assert_eq!(bytes, [0xc0, 0xab, 0x00]);
        assert_eq!(extract_bits(&bytes, 4, 12), 0xabc);
    }
}
