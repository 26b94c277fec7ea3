// SPDX-License-Identifier: GPL-3.0-only
//! MCCS version specification

use std::fmt;

use serde::{Deserialize, Serialize};

/// Monitor Control Command Set version, as reported by feature 0xDF or the
/// `mccs_ver` segment of the capabilities string
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MccsVersion {
    pub major: u8,
    pub minor: u8,
}

impl MccsVersion {
    /// No version supplied; lookups make a best guess
    pub const ANY: MccsVersion = MccsVersion::new(0, 0);
    /// Version was queried but could not be determined
    pub const UNKNOWN: MccsVersion = MccsVersion::new(0xff, 0xff);
    pub const V1_0: MccsVersion = MccsVersion::new(1, 0);
    pub const V2_0: MccsVersion = MccsVersion::new(2, 0);
    pub const V2_1: MccsVersion = MccsVersion::new(2, 1);
    pub const V2_2: MccsVersion = MccsVersion::new(2, 2);
    pub const V3_0: MccsVersion = MccsVersion::new(3, 0);

    pub const fn new(major: u8, minor: u8) -> Self {
        MccsVersion { major, minor }
    }

    /// True for [`MccsVersion::ANY`] and [`MccsVersion::UNKNOWN`]
    pub fn is_unspecified(self) -> bool {
        self == Self::ANY || self == Self::UNKNOWN
    }

    /// Parse "2.1", "02.01" or "3.0"
    pub fn parse(s: &str) -> Option<Self> {
        let (major, minor) = s.trim().split_once('.')?;
        let major = major.trim().parse::<u8>().ok()?;
        let minor = minor.trim().parse::<u8>().ok()?;
        Some(Self::new(major, minor))
    }
}

impl fmt::Display for MccsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::ANY {
            f.write_str("any")
        } else if *self == Self::UNKNOWN {
            f.write_str("unknown")
        } else {
            write!(f, "{}.{}", self.major, self.minor)
        }
    }
}
