// SPDX-License-Identifier: GPL-3.0-only
//! VCP feature codes: metadata, versions and feature lists

pub mod list;
pub mod subset;
pub mod table;
pub mod version;

pub use list::FeatureList;
pub use subset::{feature_list, FeatureSubset};
pub use table::{
    feature_flags, feature_name, lookup, simple_nc_value_name, simple_nc_value_table, Access,
    FeatureFlags, FeatureInfo, FeatureKind, FeatureValueEntry,
};
pub use version::MccsVersion;
