// SPDX-License-Identifier: GPL-3.0-only
//! VCP values: reading, writing with verification, formatting

pub mod format;
pub mod get;
pub mod profile;
pub mod set;
pub mod value;

pub use format::{format_any_vcp_value, format_non_table_vcp_value, format_table_vcp_value};
pub use profile::{get_profile_related_values, set_profile_related_values};
pub use value::{AnyVcpValue, NonTableValue, TableValue, ValueType, ValueTypeParm, VcpValue};
