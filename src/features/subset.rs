// SPDX-License-Identifier: GPL-3.0-only
//! Named feature subsets

use serde::{Deserialize, Serialize};

use super::list::FeatureList;
use super::table::{self, FeatureKind, FIRST_MFG_CODE};
use super::version::MccsVersion;

/// Predefined groups of feature codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureSubset {
    /// Every feature defined at the version
    Known,
    /// Color related features
    Color,
    /// Features saved and restored with a monitor calibration
    Profile,
    /// Manufacturer specific codes 0xE0..=0xFF
    Mfg,
}

/// Feature list for a subset at an MCCS version
///
/// Table features are left out unless `include_table` is set.
pub fn feature_list(subset: FeatureSubset, vspec: MccsVersion, include_table: bool) -> FeatureList {
    if subset == FeatureSubset::Mfg {
        return (FIRST_MFG_CODE..=u8::MAX).collect();
    }

    table::definitions()
        .iter()
        .filter(|def| match subset {
            FeatureSubset::Known | FeatureSubset::Mfg => true,
            FeatureSubset::Color => def.color,
            FeatureSubset::Profile => def.profile,
        })
        .filter_map(|def| def.effective(vspec).map(|entry| (def.code, entry.flags.kind)))
        .filter(|&(_, kind)| include_table || kind != FeatureKind::Table)
        .map(|(code, _)| code)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mfg_subset() {
        let l = feature_list(FeatureSubset::Mfg, MccsVersion::V2_1, false);
        assert_eq!(l.len(), 32);
        assert!(l.contains(0xe0));
        assert!(l.contains(0xff));
        assert!(!l.contains(0xdf));
    }

    #[test]
    fn test_table_features_excluded_by_default() {
        let without = feature_list(FeatureSubset::Known, MccsVersion::V3_0, false);
        let with = feature_list(FeatureSubset::Known, MccsVersion::V3_0, true);
        assert!(!without.contains(0x73));
        assert!(with.contains(0x73));
        // input source is a table feature at 3.0 only
        assert!(!without.contains(0x60));
        assert!(feature_list(FeatureSubset::Known, MccsVersion::V2_1, false).contains(0x60));
    }

    #[test]
    fn test_known_depends_on_version() {
        let v21 = feature_list(FeatureSubset::Known, MccsVersion::V2_1, true);
        let v22 = feature_list(FeatureSubset::Known, MccsVersion::V2_2, true);
        assert!(!v21.contains(0x72));
        assert!(v22.contains(0x72));
        assert!(v21.is_subset(&v22));
    }

    #[test]
    fn test_profile_and_color_subsets() {
        let profile = feature_list(FeatureSubset::Profile, MccsVersion::V2_1, false);
        assert!(profile.contains(0x10));
        assert!(profile.contains(0x12));
        assert!(!profile.contains(0x60));

        let color = feature_list(FeatureSubset::Color, MccsVersion::V2_1, false);
        assert!(color.contains(0x16));
        assert!(!color.contains(0x10));
    }
}
