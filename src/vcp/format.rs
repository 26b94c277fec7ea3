// SPDX-License-Identifier: GPL-3.0-only
//! Human readable VCP values

use super::get::VCP_VERSION_FEATURE;
use super::value::{AnyVcpValue, NonTableValue, TableValue, VcpValue};
use crate::features::table::{self, FeatureKind};
use crate::features::MccsVersion;

fn raw(value: &NonTableValue) -> String {
    format!(
        "mh=0x{:02x}, ml=0x{:02x}, sh=0x{:02x}, sl=0x{:02x}",
        value.mh, value.ml, value.sh, value.sl
    )
}

/// Format a non-table value according to the feature's kind at `vspec`
pub fn format_non_table_vcp_value(code: u8, vspec: MccsVersion, value: &NonTableValue) -> String {
    if code == VCP_VERSION_FEATURE {
        return MccsVersion::new(value.sh, value.sl).to_string();
    }
    let Ok(info) = table::lookup(code, vspec) else {
        return raw(value);
    };
    match info.flags.kind {
        FeatureKind::Continuous => format!(
            "current value = {}, max value = {}",
            value.value(),
            value.max_value()
        ),
        FeatureKind::SimpleNc => match table::simple_nc_value_name(vspec, code, value.sl) {
            Ok(name) => format!("{} (sl=0x{:02x})", name, value.sl),
            Err(_) => format!("Invalid value (sl=0x{:02x})", value.sl),
        },
        _ => raw(value),
    }
}

/// Format a table value as hex bytes
pub fn format_table_vcp_value(_code: u8, _vspec: MccsVersion, value: &TableValue) -> String {
    if value.is_empty() {
        return "empty table".to_string();
    }
    value
        .bytes()
        .chunks(16)
        .map(|chunk| chunk.iter().map(|b| format!("{:02x}", b)).collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_any_vcp_value(code: u8, vspec: MccsVersion, value: &AnyVcpValue) -> String {
    match &value.value {
        VcpValue::NonTable(v) => format_non_table_vcp_value(code, vspec, v),
        VcpValue::Table(t) => format_table_vcp_value(code, vspec, t),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_continuous() {
        let v = NonTableValue::new(0, 100, 0, 50);
        assert_eq!(
            format_non_table_vcp_value(0x10, MccsVersion::V2_1, &v),
            "current value = 50, max value = 100"
        );
    }

    #[test]
    fn test_simple_nc_value_names() {
        let v = NonTableValue::new(0, 0, 0, 0x0f);
        assert_eq!(format_non_table_vcp_value(0x60, MccsVersion::V2_0, &v), "DisplayPort-1 (sl=0x0f)");
        let v = NonTableValue::new(0, 0, 0, 0x77);
        assert_eq!(format_non_table_vcp_value(0x60, MccsVersion::V2_0, &v), "Invalid value (sl=0x77)");
    }

    #[test]
    fn test_version_and_raw() {
        let v = NonTableValue::new(0, 0, 2, 2);
        assert_eq!(format_non_table_vcp_value(0xdf, MccsVersion::UNKNOWN, &v), "2.2");
        let v = NonTableValue::new(1, 2, 3, 4);
        assert_eq!(
            format_non_table_vcp_value(0xe2, MccsVersion::V2_1, &v),
            "mh=0x01, ml=0x02, sh=0x03, sl=0x04"
        );
    }

    #[test]
    fn test_table() {
        let t = TableValue((0..18).collect());
        let text = format_table_vcp_value(0x73, MccsVersion::V2_1, &t);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], "10 11");
    }
}
