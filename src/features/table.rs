// SPDX-License-Identifier: GPL-3.0-only
//! VCP feature metadata
//!
//! Static description of the MCCS features this crate knows about. Feature
//! semantics vary by MCCS version, so every definition carries one or more
//! versioned entries, listed in ascending version order. A versioned entry
//! stays in force for all later versions until a newer entry overrides it.
//!
//! Codes 0xE0..=0xFF are manufacturer specific and never have an entry.

use serde::{Deserialize, Serialize};

use super::version::MccsVersion;
use crate::error::{DdcError, Result};

/// First manufacturer specific feature code
pub const FIRST_MFG_CODE: u8 = 0xe0;

/// How the value of a feature is encoded and interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureKind {
    /// Non-table value with a current and a maximum value
    Continuous,
    /// Non-table value whose `sl` byte selects one of an enumerated set
    SimpleNc,
    /// Non-table value with feature specific interpretation of all 4 bytes
    ComplexNc,
    /// Variable length table value
    Table,
    /// Manufacturer specific, no interpretation known
    ManufacturerSpecific,
}

impl FeatureKind {
    pub fn is_table(self) -> bool {
        self == FeatureKind::Table
    }
}

/// Read/write capability of a feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Access {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

/// Flags describing a feature at one MCCS version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeatureFlags {
    pub kind: FeatureKind,
    pub access: Access,
}

impl FeatureFlags {
    /// Flags assumed for codes 0xE0..=0xFF
    pub const MANUFACTURER_SPECIFIC: FeatureFlags = FeatureFlags {
        kind: FeatureKind::ManufacturerSpecific,
        access: Access::ReadWrite,
    };

    pub fn readable(&self) -> bool {
        self.access != Access::WriteOnly
    }

    pub fn writable(&self) -> bool {
        self.access != Access::ReadOnly
    }
}

/// One enumerated value of a simple NC feature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureValueEntry {
    pub value: u8,
    pub name: &'static str,
}

/// Feature description in force from `since` onward
#[derive(Debug, Clone, Copy)]
pub struct VersionedFeature {
    pub since: MccsVersion,
    pub name: Option<&'static str>,
    pub flags: FeatureFlags,
    pub values: Option<&'static [FeatureValueEntry]>,
}

impl VersionedFeature {
    const fn named(mut self, name: &'static str) -> Self {
        self.name = Some(name);
        self
    }

    const fn with_values(mut self, values: &'static [FeatureValueEntry]) -> Self {
        self.values = Some(values);
        self
    }
}

/// Static definition of one VCP feature code
#[derive(Debug)]
pub struct FeatureDefinition {
    pub code: u8,
    pub default_name: &'static str,
    /// Member of the color feature subset
    pub color: bool,
    /// Member of the profile feature subset (values saved with a calibration)
    pub profile: bool,
    pub versions: &'static [VersionedFeature],
}

/// Result of a metadata lookup
#[derive(Debug, Clone, Copy)]
pub struct FeatureInfo {
    pub code: u8,
    /// Version the lookup was made for
    pub vspec: MccsVersion,
    /// Version of the entry that answered the lookup
    pub defined_at: MccsVersion,
    pub name: &'static str,
    pub flags: FeatureFlags,
    pub values: Option<&'static [FeatureValueEntry]>,
}

const fn at(since: MccsVersion, kind: FeatureKind, access: Access) -> VersionedFeature {
    VersionedFeature {
        since,
        name: None,
        flags: FeatureFlags { kind, access },
        values: None,
    }
}

const fn val(value: u8, name: &'static str) -> FeatureValueEntry {
    FeatureValueEntry { value, name }
}

const fn def(
    code: u8,
    default_name: &'static str,
    versions: &'static [VersionedFeature],
) -> FeatureDefinition {
    FeatureDefinition {
        code,
        default_name,
        color: false,
        profile: false,
        versions,
    }
}

const fn color(mut d: FeatureDefinition) -> FeatureDefinition {
    d.color = true;
    d
}

const fn profile(mut d: FeatureDefinition) -> FeatureDefinition {
    d.profile = true;
    d
}

use Access::{ReadOnly as RO, ReadWrite as RW, WriteOnly as WO};
use FeatureKind::{ComplexNc as CNC, Continuous as C, SimpleNc as SNC, Table as T};
use MccsVersion as V;

const NEW_CONTROL_VALUES: &[FeatureValueEntry] = &[
    val(0x01, "No new control values"),
    val(0x02, "One or more new control values have been saved"),
    val(0xff, "No user controls are present"),
];

const COLOR_PRESETS_V20: &[FeatureValueEntry] = &[
    val(0x01, "sRGB"),
    val(0x02, "Display Native"),
    val(0x03, "4000 K"),
    val(0x04, "5000 K"),
    val(0x05, "6500 K"),
    val(0x06, "7500 K"),
    val(0x07, "8200 K"),
    val(0x08, "9300 K"),
    val(0x09, "10000 K"),
    val(0x0a, "11500 K"),
    val(0x0b, "User 1"),
    val(0x0c, "User 2"),
    val(0x0d, "User 3"),
];

const AUTO_SETUP: &[FeatureValueEntry] = &[
    val(0x00, "Auto setup not active"),
    val(0x01, "Performing auto setup"),
    val(0x02, "Enable continuous/periodic auto setup"),
];

const INPUT_SOURCES: &[FeatureValueEntry] = &[
    val(0x01, "VGA-1"),
    val(0x02, "VGA-2"),
    val(0x03, "DVI-1"),
    val(0x04, "DVI-2"),
    val(0x05, "Composite video 1"),
    val(0x06, "Composite video 2"),
    val(0x07, "S-Video-1"),
    val(0x08, "S-Video-2"),
    val(0x09, "Tuner-1"),
    val(0x0a, "Tuner-2"),
    val(0x0b, "Tuner-3"),
    val(0x0c, "Component video (YPrPb/YCrCb) 1"),
    val(0x0d, "Component video (YPrPb/YCrCb) 2"),
    val(0x0e, "Component video (YPrPb/YCrCb) 3"),
    val(0x0f, "DisplayPort-1"),
    val(0x10, "DisplayPort-2"),
    val(0x11, "HDMI-1"),
    val(0x12, "HDMI-2"),
];

const AUDIO_MUTE: &[FeatureValueEntry] = &[
    val(0x01, "Mute the audio"),
    val(0x02, "Unmute the audio"),
];

const SUBPIXEL_LAYOUT: &[FeatureValueEntry] = &[
    val(0x00, "Sub-pixel layout not defined"),
    val(0x01, "Red/Green/Blue vertical stripe"),
    val(0x02, "Red/Green/Blue horizontal stripe"),
    val(0x03, "Blue/Green/Red vertical stripe"),
    val(0x04, "Blue/Green/Red horizontal stripe"),
    val(0x05, "Quad pixel, red at top left"),
    val(0x06, "Quad pixel, red at bottom left"),
    val(0x07, "Delta (triad)"),
    val(0x08, "Mosaic"),
];

const DISPLAY_TECHNOLOGY: &[FeatureValueEntry] = &[
    val(0x01, "CRT (shadow mask)"),
    val(0x02, "CRT (aperture grill)"),
    val(0x03, "LCD (active matrix)"),
    val(0x04, "LCos"),
    val(0x05, "Plasma"),
    val(0x06, "OLED"),
    val(0x07, "EL"),
    val(0x08, "Dynamic MEM"),
    val(0x09, "Static MEM"),
];

const OSD: &[FeatureValueEntry] = &[val(0x01, "OSD Disabled"), val(0x02, "OSD Enabled")];

const OSD_LANGUAGES: &[FeatureValueEntry] = &[
    val(0x00, "Reserved value, must be ignored"),
    val(0x01, "Chinese (traditional, Hantai)"),
    val(0x02, "English"),
    val(0x03, "French"),
    val(0x04, "German"),
    val(0x05, "Italian"),
    val(0x06, "Japanese"),
    val(0x07, "Korean"),
    val(0x08, "Portuguese (Portugal)"),
    val(0x09, "Russian"),
    val(0x0a, "Spanish"),
    val(0x0b, "Swedish"),
    val(0x0c, "Turkish"),
    val(0x0d, "Chinese (simplified / Kantai)"),
    val(0x0e, "Portuguese (Brazil)"),
    val(0x0f, "Arabic"),
    val(0x10, "Bulgarian"),
    val(0x11, "Croatian"),
    val(0x12, "Czech"),
    val(0x13, "Danish"),
    val(0x14, "Dutch"),
    val(0x15, "Estonian"),
    val(0x16, "Finnish"),
    val(0x17, "Greek"),
    val(0x18, "Hebrew"),
    val(0x19, "Hindi"),
    val(0x1a, "Hungarian"),
    val(0x1b, "Latvian"),
    val(0x1c, "Lithuanian"),
    val(0x1d, "Norwegian"),
    val(0x1e, "Polish"),
    val(0x1f, "Romanian"),
    val(0x20, "Serbian"),
    val(0x21, "Slovak"),
    val(0x22, "Slovenian"),
    val(0x23, "Thai"),
    val(0x24, "Ukranian"),
    val(0x25, "Vietnamese"),
];

const POWER_MODES: &[FeatureValueEntry] = &[
    val(0x01, "DPM: On,  DPMS: Off"),
    val(0x02, "DPM: Off, DPMS: Standby"),
    val(0x03, "DPM: Off, DPMS: Suspend"),
    val(0x04, "DPM: Off, DPMS: Off"),
    val(0x05, "Write only value to turn off display"),
];

const DISPLAY_MODES_V20: &[FeatureValueEntry] = &[
    val(0x00, "Standard/Default mode"),
    val(0x01, "Productivity"),
    val(0x02, "Mixed"),
    val(0x03, "Movie"),
    val(0x04, "User defined"),
    val(0x05, "Games"),
    val(0x06, "Sports"),
    val(0x07, "Professional (all signal processing disabled)"),
];

const DISPLAY_MODES_V30: &[FeatureValueEntry] = &[
    val(0x00, "Standard/Default mode"),
    val(0x01, "Productivity"),
    val(0x02, "Mixed"),
    val(0x03, "Movie"),
    val(0x04, "User defined"),
    val(0x05, "Games"),
    val(0x06, "Sports"),
    val(0x07, "Professional (all signal processing disabled)"),
    val(0x08, "Standard/Default mode with intermediate power consumption"),
    val(0x09, "Standard/Default mode with low power consumption"),
    val(0x0a, "Demonstration"),
    val(0xf0, "Dynamic contrast"),
];

const STEREO_VIDEO_MODES: &[FeatureValueEntry] = &[
    val(0x00, "No stereo"),
    val(0x01, "Field sequential, left eye first"),
    val(0x02, "Field sequential, right eye first"),
];

/// Known features, sorted by code
static FEATURES: &[FeatureDefinition] = &[
    def(0x01, "Degauss", &[at(V::V2_0, CNC, WO)]),
    def(
        0x02,
        "New control value",
        &[at(V::V2_0, SNC, RW).with_values(NEW_CONTROL_VALUES)],
    ),
    def(0x03, "Soft controls", &[at(V::V2_0, CNC, RW)]),
    def(0x04, "Restore factory defaults", &[at(V::V2_0, CNC, WO)]),
    def(
        0x05,
        "Restore factory brightness/contrast defaults",
        &[at(V::V2_0, CNC, WO)],
    ),
    def(0x06, "Restore factory geometry defaults", &[at(V::V2_0, CNC, WO)]),
    def(0x08, "Restore color defaults", &[at(V::V2_0, CNC, WO)]),
    def(0x0a, "Restore factory TV defaults", &[at(V::V2_0, CNC, WO)]),
    color(def(0x0b, "Color temperature increment", &[at(V::V2_0, CNC, RO)])),
    color(profile(def(0x0c, "Color temperature request", &[at(V::V2_0, C, RW)]))),
    def(0x0e, "Clock", &[at(V::V2_0, C, RW)]),
    profile(def(0x10, "Brightness", &[at(V::V2_0, C, RW)])),
    def(0x11, "Flesh tone enhancement", &[at(V::V2_1, CNC, RW)]),
    profile(def(0x12, "Contrast", &[at(V::V2_0, C, RW)])),
    def(0x13, "Backlight control", &[at(V::V2_0, C, RW)]),
    color(profile(def(
        0x14,
        "Select color preset",
        &[
            at(V::V2_0, SNC, RW).with_values(COLOR_PRESETS_V20),
            at(V::V3_0, CNC, RW),
        ],
    ))),
    color(profile(def(0x16, "Video gain: Red", &[at(V::V2_0, C, RW)]))),
    color(def(0x17, "User color vision compensation", &[at(V::V2_1, C, RW)])),
    color(profile(def(0x18, "Video gain: Green", &[at(V::V2_0, C, RW)]))),
    color(profile(def(0x1a, "Video gain: Blue", &[at(V::V2_0, C, RW)]))),
    def(
        0x1e,
        "Auto setup",
        &[at(V::V2_0, SNC, RW).with_values(AUTO_SETUP)],
    ),
    def(
        0x1f,
        "Auto color setup",
        &[at(V::V2_0, SNC, RW).with_values(AUTO_SETUP)],
    ),
    def(0x20, "Horizontal Position (Phase)", &[at(V::V2_0, C, RW)]),
    def(0x22, "Horizontal Size", &[at(V::V2_0, C, RW)]),
    def(0x30, "Vertical Position (Phase)", &[at(V::V2_0, C, RW)]),
    def(0x32, "Vertical Size", &[at(V::V2_0, C, RW)]),
    def(0x3e, "Clock phase", &[at(V::V2_0, C, RW)]),
    def(0x52, "Active control", &[at(V::V2_0, CNC, RO)]),
    def(
        0x60,
        "Input Source",
        &[
            at(V::V2_0, SNC, RW).with_values(INPUT_SOURCES),
            at(V::V3_0, T, RW),
        ],
    ),
    def(0x62, "Audio speaker volume", &[at(V::V2_0, C, RW)]),
    color(profile(def(0x6c, "Video black level: Red", &[at(V::V2_0, C, RW)]))),
    color(profile(def(0x6e, "Video black level: Green", &[at(V::V2_0, C, RW)]))),
    color(profile(def(0x70, "Video black level: Blue", &[at(V::V2_0, C, RW)]))),
    color(def(0x72, "Gamma", &[at(V::V2_2, CNC, RW)])),
    color(def(0x73, "LUT Size", &[at(V::V2_0, T, RO)])),
    color(def(0x74, "Single point LUT operation", &[at(V::V2_0, T, RW)])),
    color(def(0x75, "Block LUT operation", &[at(V::V2_0, T, RW)])),
    profile(def(0x87, "Sharpness", &[at(V::V2_0, C, RW)])),
    color(profile(def(0x8a, "Color Saturation", &[at(V::V2_0, C, RW)]))),
    def(
        0x8d,
        "Audio Mute",
        &[
            at(V::V2_0, SNC, RW).with_values(AUDIO_MUTE),
            at(V::V2_2, SNC, RW)
                .named("Audio mute/Screen blank")
                .with_values(AUDIO_MUTE),
        ],
    ),
    color(profile(def(0x90, "Hue", &[at(V::V2_0, C, RW)]))),
    def(0xac, "Horizontal frequency", &[at(V::V2_0, CNC, RO)]),
    def(0xae, "Vertical frequency", &[at(V::V2_0, C, RO)]),
    def(
        0xb2,
        "Flat panel sub-pixel layout",
        &[at(V::V2_0, SNC, RO).with_values(SUBPIXEL_LAYOUT)],
    ),
    def(
        0xb6,
        "Display technology type",
        &[at(V::V2_0, SNC, RO).with_values(DISPLAY_TECHNOLOGY)],
    ),
    def(0xc0, "Display usage time", &[at(V::V2_0, CNC, RO)]),
    def(0xc6, "Application enable key", &[at(V::V2_0, CNC, RO)]),
    def(0xc8, "Display controller type", &[at(V::V2_0, CNC, RW)]),
    def(0xc9, "Display firmware level", &[at(V::V2_0, CNC, RO)]),
    def(
        0xca,
        "OSD",
        &[
            at(V::V2_0, SNC, RW).with_values(OSD),
            at(V::V2_2, CNC, RW).named("OSD/Button Control"),
        ],
    ),
    def(
        0xcc,
        "OSD Language",
        &[at(V::V2_0, SNC, RW).with_values(OSD_LANGUAGES)],
    ),
    def(
        0xd4,
        "Stereo video mode",
        &[at(V::V2_0, SNC, RW).with_values(STEREO_VIDEO_MODES)],
    ),
    def(
        0xd6,
        "Power mode",
        &[at(V::V2_0, SNC, RW).with_values(POWER_MODES)],
    ),
    def(
        0xdc,
        "Display Mode",
        &[
            at(V::V2_0, SNC, RW).with_values(DISPLAY_MODES_V20),
            at(V::V3_0, SNC, RW).with_values(DISPLAY_MODES_V30),
        ],
    ),
    def(0xdf, "VCP Version", &[at(V::V2_0, CNC, RO)]),
];

/// All known feature definitions, sorted by code
pub fn definitions() -> &'static [FeatureDefinition] {
    FEATURES
}

/// Definition for a code, if the code is known
pub fn find_definition(code: u8) -> Option<&'static FeatureDefinition> {
    FEATURES
        .binary_search_by_key(&code, |d| d.code)
        .ok()
        .map(|i| &FEATURES[i])
}

pub fn is_manufacturer_specific(code: u8) -> bool {
    code >= FIRST_MFG_CODE
}

impl FeatureDefinition {
    /// Entry in force at `vspec`
    ///
    /// An exact entry wins. Otherwise the entries are scanned in ascending
    /// version order and the last one not newer than `vspec` is used. An
    /// unspecified version gets the first entry at or after 2.0.
    pub fn effective(&self, vspec: MccsVersion) -> Option<&'static VersionedFeature> {
        if vspec.is_unspecified() {
            return self
                .versions
                .iter()
                .find(|v| v.since >= MccsVersion::V2_0)
                .or(self.versions.first());
        }
        if let Some(exact) = self.versions.iter().find(|v| v.since == vspec) {
            return Some(exact);
        }
        let mut found = None;
        for entry in self.versions {
            if entry.since <= vspec {
                found = Some(entry);
            }
        }
        found
    }

    fn info(&self, vspec: MccsVersion, entry: &'static VersionedFeature) -> FeatureInfo {
        FeatureInfo {
            code: self.code,
            vspec,
            defined_at: entry.since,
            name: entry.name.unwrap_or(self.default_name),
            flags: entry.flags,
            values: entry.values,
        }
    }
}

/// Look up the flags, name and value table of a feature at an MCCS version
pub fn lookup(code: u8, vspec: MccsVersion) -> Result<FeatureInfo> {
    let def = find_definition(code).ok_or(DdcError::UnknownFeature(code))?;
    let entry = def.effective(vspec).ok_or(DdcError::UnknownFeature(code))?;
    Ok(def.info(vspec, entry))
}

/// Flags of a feature at an MCCS version
pub fn feature_flags(code: u8, vspec: MccsVersion) -> Result<FeatureFlags> {
    lookup(code, vspec).map(|info| info.flags)
}

/// Version appropriate feature name
///
/// Without a version the name is a best guess. Returns `None` for codes that
/// are neither known nor manufacturer specific.
pub fn feature_name(code: u8, vspec: Option<MccsVersion>) -> Option<&'static str> {
    if is_manufacturer_specific(code) {
        return Some("Manufacturer Specific");
    }
    let def = find_definition(code)?;
    let entry = def.effective(vspec.unwrap_or(MccsVersion::ANY));
    Some(entry.and_then(|e| e.name).unwrap_or(def.default_name))
}

/// True if `kind` is the feature's kind in at least one defined version
pub fn kind_possible(code: u8, kind_matches: impl Fn(FeatureKind) -> bool) -> bool {
    match find_definition(code) {
        Some(def) => def.versions.iter().any(|v| kind_matches(v.flags.kind)),
        None => true,
    }
}

/// Value table of a simple NC feature at an MCCS version
pub fn simple_nc_value_table(
    code: u8,
    vspec: MccsVersion,
) -> Result<&'static [FeatureValueEntry]> {
    let info = lookup(code, vspec)?;
    if info.flags.kind != FeatureKind::SimpleNc {
        return Err(DdcError::InvalidOperation {
            feature_code: code,
            reason: "not a simple non-continuous feature".into(),
        });
    }
    Ok(info.values.unwrap_or(&[]))
}

/// Name of one value of a simple NC feature
///
/// The value table of the entry in force at `vspec` is checked first, then
/// the tables of every later version in ascending order.
pub fn simple_nc_value_name(vspec: MccsVersion, code: u8, value: u8) -> Result<&'static str> {
    let info = lookup(code, vspec)?;
    if info.flags.kind != FeatureKind::SimpleNc {
        return Err(DdcError::InvalidOperation {
            feature_code: code,
            reason: "not a simple non-continuous feature".into(),
        });
    }
    let def = find_definition(code).ok_or(DdcError::UnknownFeature(code))?;
    def.versions
        .iter()
        .filter(|entry| entry.since >= info.defined_at)
        .filter_map(|entry| entry.values)
        .find_map(|values| values.iter().find(|e| e.value == value))
        .map(|e| e.name)
        .ok_or_else(|| {
            DdcError::NotFound(format!("value 0x{:02x} of feature 0x{:02x}", value, code))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Status;

    #[test]
    fn test_table_sorted_and_versions_ascending() {
        for pair in FEATURES.windows(2) {
            assert!(pair[0].code < pair[1].code, "table not sorted at 0x{:02x}", pair[1].code);
        }
        for def in FEATURES {
            assert!(!def.versions.is_empty());
            assert!(!is_manufacturer_specific(def.code));
            for pair in def.versions.windows(2) {
                assert!(pair[0].since < pair[1].since, "0x{:02x} versions out of order", def.code);
            }
        }
    }

    #[test]
    fn test_exact_lookup() {
        let info = lookup(0x10, MccsVersion::V2_0).unwrap();
        assert_eq!(info.name, "Brightness");
        assert_eq!(info.flags.kind, FeatureKind::Continuous);
        assert!(info.flags.readable());
        assert!(info.flags.writable());
    }

    #[test]
    fn test_forward_fallback_from_definition_version() {
        // 0x10 is only defined at 2.0
        for vspec in [MccsVersion::V2_1, MccsVersion::V2_2, MccsVersion::V3_0, MccsVersion::new(3, 1)] {
            let info = lookup(0x10, vspec).unwrap();
            assert_eq!(info.defined_at, MccsVersion::V2_0);
        }
        let err = lookup(0x10, MccsVersion::V1_0).unwrap_err();
        assert_eq!(err.status(), Status::UnknownFeature);
    }

    #[test]
    fn test_override_applies_from_its_version() {
        assert_eq!(feature_flags(0x14, MccsVersion::V2_1).unwrap().kind, FeatureKind::SimpleNc);
        assert_eq!(feature_flags(0x14, MccsVersion::V2_2).unwrap().kind, FeatureKind::SimpleNc);
        assert_eq!(feature_flags(0x14, MccsVersion::V3_0).unwrap().kind, FeatureKind::ComplexNc);
        assert_eq!(feature_flags(0x60, MccsVersion::V3_0).unwrap().kind, FeatureKind::Table);
        // 0x72 appears only at 2.2
        assert!(lookup(0x72, MccsVersion::V2_1).is_err());
        assert!(lookup(0x72, MccsVersion::V3_0).is_ok());
    }

    #[test]
    fn test_unspecified_version_best_guess() {
        assert_eq!(feature_flags(0x60, MccsVersion::ANY).unwrap().kind, FeatureKind::SimpleNc);
        assert_eq!(feature_flags(0x72, MccsVersion::UNKNOWN).unwrap().kind, FeatureKind::ComplexNc);
    }

    #[test]
    fn test_manufacturer_specific_codes() {
        for code in [0xe0u8, 0xf0, 0xff] {
            assert_eq!(lookup(code, MccsVersion::V2_1).unwrap_err().status(), Status::UnknownFeature);
            assert_eq!(feature_name(code, None), Some("Manufacturer Specific"));
        }
        assert_eq!(feature_name(0x09, None), None);
    }

    #[test]
    fn test_version_specific_name() {
        assert_eq!(feature_name(0xca, Some(MccsVersion::V2_1)), Some("OSD"));
        assert_eq!(feature_name(0xca, Some(MccsVersion::V2_2)), Some("OSD/Button Control"));
        assert_eq!(feature_name(0x8d, None), Some("Audio Mute"));
        assert_eq!(feature_name(0x8d, Some(MccsVersion::V3_0)), Some("Audio mute/Screen blank"));
    }

    #[test]
    fn test_simple_nc_value_names() {
        assert_eq!(
            simple_nc_value_name(MccsVersion::V2_1, 0x60, 0x0f).unwrap(),
            "DisplayPort-1"
        );
        // value only present in the 3.0 table, found by scanning later versions
        assert_eq!(
            simple_nc_value_name(MccsVersion::V2_0, 0xdc, 0xf0).unwrap(),
            "Dynamic contrast"
        );
        let missing = simple_nc_value_name(MccsVersion::V2_0, 0x60, 0x77).unwrap_err();
        assert_eq!(missing.status(), Status::NotFound);

        let continuous = simple_nc_value_name(MccsVersion::V2_0, 0x10, 0x01).unwrap_err();
        assert_eq!(continuous.status(), Status::InvalidOperation);

        let unknown = simple_nc_value_name(MccsVersion::V2_0, 0xe3, 0x01).unwrap_err();
        assert_eq!(unknown.status(), Status::UnknownFeature);
    }

    #[test]
    fn test_value_table() {
        let table = simple_nc_value_table(0xd6, MccsVersion::V2_1).unwrap();
        assert_eq!(table.len(), 5);
        assert!(simple_nc_value_table(0x14, MccsVersion::V3_0).is_err());
    }
}
