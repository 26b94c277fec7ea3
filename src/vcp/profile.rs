// SPDX-License-Identifier: GPL-3.0-only
//! Saving and restoring profile related values
//!
//! The saved form is line based text:
//!
//! ```text
//! MFG_ID  DEL
//! MODEL   DELL U2415
//! SN      7MT0186E1A4L
//! EDID    00ffffffffffff00...
//! VCP 10 75
//! VCP 14 5
//! ```
//!
//! Values are decimal `sh << 8 | sl`. The EDID identifies the display when
//! the values are restored.

use crate::display::{DisplayHandle, DisplayIdentifier, DisplayRegistry};
use crate::error::{DdcError, Result};
use crate::features::{feature_list, FeatureSubset};

/// Read the profile related features of a display into the saved form
pub fn get_profile_related_values(handle: &mut DisplayHandle) -> Result<String> {
    let vspec = handle.get_mccs_version()?;
    let mut out = String::new();
    if let Some(edid) = handle.display_ref().edid() {
        let hex: String = edid.bytes.iter().map(|b| format!("{:02x}", b)).collect();
        out.push_str(&format!("MFG_ID  {}\n", edid.mfg_id));
        out.push_str(&format!("MODEL   {}\n", edid.model));
        out.push_str(&format!("SN      {}\n", edid.serial_ascii));
        out.push_str(&format!("EDID    {}\n", hex));
    }
    for code in feature_list(FeatureSubset::Profile, vspec, false) {
        match handle.get_non_table_vcp_value(code) {
            Ok(value) => out.push_str(&format!("VCP {:02X} {}\n", code, value.value())),
            Err(DdcError::ReportedUnsupported(_)) => {
                trace!(feature = format_args!("0x{:02x}", code), "Profile feature not supported");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(out)
}

struct SavedProfile {
    edid: Vec<u8>,
    values: Vec<(u8, u16)>,
}

fn parse_hex_bytes(text: &str) -> Option<Vec<u8>> {
    if text.len() % 2 != 0 {
        return None;
    }
    (0..text.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(text.get(i..i + 2)?, 16).ok())
        .collect()
}

fn parse_profile(text: &str) -> Result<SavedProfile> {
    let bad = |line: &str| DdcError::InvalidArgument(format!("invalid profile line '{}'", line));

    let mut edid = None;
    let mut values = Vec::new();
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("EDID") => {
                let hex = parts.next().ok_or_else(|| bad(line))?;
                edid = Some(parse_hex_bytes(hex).ok_or_else(|| bad(line))?);
            }
            Some("VCP") => {
                let code = parts
                    .next()
                    .and_then(|c| u8::from_str_radix(c, 16).ok())
                    .ok_or_else(|| bad(line))?;
                let value = parts
                    .next()
                    .and_then(|v| v.parse::<u16>().ok())
                    .ok_or_else(|| bad(line))?;
                values.push((code, value));
            }
            // Identification lines are informational, the EDID decides
            _ => {}
        }
    }
    let edid = edid.ok_or_else(|| DdcError::InvalidArgument("profile has no EDID line".into()))?;
    Ok(SavedProfile { edid, values })
}

/// Restore values saved by [`get_profile_related_values`]
///
/// The display is found by its EDID. Nothing is written unless the whole
/// text parses.
pub fn set_profile_related_values(registry: &DisplayRegistry, text: &str) -> Result<()> {
    let profile = parse_profile(text)?;
    let id = DisplayIdentifier::edid(&profile.edid)?;
    let dref = registry.resolve(&id)?;
    let mut handle = dref.open()?;
    for (code, value) in profile.values {
        let [hi, lo] = value.to_be_bytes();
        handle.set_non_table_vcp_value(code, hi, lo)?;
        debug!(display = %dref.location(), feature = format_args!("0x{:02x}", code), value, "Profile value restored");
    }
    handle.close()
}
