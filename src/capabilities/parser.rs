// SPDX-License-Identifier: GPL-3.0-only
//! Capabilities string parser
//!
//! A capabilities string is a parenthesized list of named segments:
//!
//! ```text
//! (prot(monitor)type(lcd)model(U2415)cmds(01 02 03 07 0C E3 F3)
//!  vcp(02 04 10 12 14(04 05 08 0B) 60(0F 11 12) DF)mccs_ver(2.1))
//! ```
//!
//! Monitors get this wrong in many ways. The parser keeps going after a
//! malformed span, records an error for it and returns everything it could
//! make sense of.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{DdcError, Result};
use crate::features::table::{self, FeatureKind};
use crate::features::{FeatureList, MccsVersion};

/// One feature declared in the `vcp` segment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapFeature {
    /// Declared values, for features followed by a value list
    pub values: Option<Vec<u8>>,
    /// Name given in the `vcpname` segment
    pub name: Option<String>,
}

/// Parsed capabilities string
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub raw: String,
    pub protocol: Option<String>,
    pub display_type: Option<String>,
    pub model: Option<String>,
    pub commands: Vec<u8>,
    pub mccs_version: Option<MccsVersion>,
    pub features: BTreeMap<u8, CapFeature>,
    /// Segments this parser does not interpret, as (name, value)
    pub unknown_segments: Vec<(String, String)>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Index of the paren closing the one at `open`
fn matching_paren(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, &b) in bytes.iter().enumerate().skip(open) {
        match b {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn skip_whitespace(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

/// End of a malformed token: next whitespace or paren
fn skip_token(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'(' && bytes[i] != b')' {
        i += 1;
    }
    i
}

fn hex_pair(bytes: &[u8], i: usize) -> Option<u8> {
    let pair = bytes.get(i..i + 2)?;
    if !pair.iter().all(u8::is_ascii_hexdigit) {
        return None;
    }
    let text = std::str::from_utf8(pair).ok()?;
    u8::from_str_radix(text, 16).ok()
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Parser state for one capabilities string
struct Parser<'a> {
    caps: Capabilities,
    names: Vec<(u8, String)>,
    raw: &'a str,
}

impl<'a> Parser<'a> {
    fn error(&mut self, message: String) {
        warn!(error = %message, "Capabilities parse error");
        self.caps.errors.push(message);
    }

    /// Hex byte list such as `01 02 0C` or `01020C`
    fn hex_list(&mut self, segment: &str, text: &str) -> Vec<u8> {
        let bytes = text.as_bytes();
        let mut out = Vec::new();
        let mut i = skip_whitespace(bytes, 0);
        while i < bytes.len() {
            match hex_pair(bytes, i) {
                Some(b) => {
                    out.push(b);
                    i += 2;
                }
                None => {
                    let end = skip_token(bytes, i + 1);
                    self.error(format!("invalid token '{}' in {}", lossy(&bytes[i..end]), segment));
                    i = end;
                    if i < bytes.len() && (bytes[i] == b'(' || bytes[i] == b')') {
                        i += 1;
                    }
                }
            }
            i = skip_whitespace(bytes, i);
        }
        out
    }

    /// Segments of the top level: `name(value)name(value)...`
    fn segments(&mut self, body: &str) -> Vec<(String, String)> {
        let bytes = body.as_bytes();
        let mut out = Vec::new();
        let mut i = skip_whitespace(bytes, 0);
        while i < bytes.len() {
            let start = i;
            while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                i += 1;
            }
            let name = lossy(&bytes[start..i]);
            i = skip_whitespace(bytes, i);
            if i >= bytes.len() {
                self.error(format!("segment '{}' has no value", name));
                break;
            }
            if bytes[i] != b'(' {
                let end = skip_token(bytes, i + 1);
                self.error(format!("unexpected '{}' at offset {}", lossy(&bytes[i..end]), i));
                i = skip_whitespace(bytes, end);
                continue;
            }
            match matching_paren(bytes, i) {
                Some(close) => {
                    let value = lossy(&bytes[i + 1..close]);
                    if name.is_empty() {
                        self.error(format!("segment without name: '({})'", value));
                    } else {
                        out.push((name, value));
                    }
                    i = skip_whitespace(bytes, close + 1);
                }
                None => {
                    self.error(format!("unbalanced parentheses in segment '{}'", name));
                    out.push((name, lossy(&bytes[i + 1..])));
                    break;
                }
            }
        }
        out
    }

    fn vcp(&mut self, text: &str) {
        let bytes = text.as_bytes();
        let mut i = skip_whitespace(bytes, 0);
        while i < bytes.len() {
            match bytes[i] {
                b'(' => {
                    self.error(format!("value list without feature code at offset {}", i));
                    i = matching_paren(bytes, i).map_or(bytes.len(), |close| close + 1);
                }
                b')' => {
                    self.error(format!("unbalanced ')' at offset {}", i));
                    i += 1;
                }
                _ => match hex_pair(bytes, i) {
                    Some(code) => i = self.vcp_feature(bytes, code, i + 2),
                    None => {
                        let end = skip_token(bytes, i + 1);
                        self.error(format!("invalid feature code '{}'", lossy(&bytes[i..end])));
                        // A value list of the bad code is skipped with it
                        let next = skip_whitespace(bytes, end);
                        i = if next < bytes.len() && bytes[next] == b'(' {
                            matching_paren(bytes, next).map_or(bytes.len(), |close| close + 1)
                        } else {
                            end
                        };
                    }
                },
            }
            i = skip_whitespace(bytes, i);
        }
    }

    /// One feature code at `i - 2` with an optional value list; returns the
    /// index after it
    fn vcp_feature(&mut self, bytes: &[u8], code: u8, i: usize) -> usize {
        let next = skip_whitespace(bytes, i);
        let mut feature = CapFeature::default();
        let end = if next < bytes.len() && bytes[next] == b'(' {
            match matching_paren(bytes, next) {
                Some(close) => {
                    let list = lossy(&bytes[next + 1..close]);
                    feature.values = Some(self.hex_list(&format!("values of feature {:02X}", code), &list));
                    close + 1
                }
                None => {
                    self.error(format!("unbalanced value list for feature {:02X}", code));
                    bytes.len()
                }
            }
        } else {
            i
        };
        if self.caps.features.insert(code, feature).is_some() {
            self.caps.warnings.push(format!("feature {:02X} declared more than once", code));
        }
        end
    }

    /// `vcpname(F0(Custom A) F1(Custom B))`
    fn vcpname(&mut self, text: &str) {
        let bytes = text.as_bytes();
        let mut i = skip_whitespace(bytes, 0);
        while i < bytes.len() {
            let Some(code) = hex_pair(bytes, i) else {
                let end = skip_token(bytes, i + 1);
                self.error(format!("invalid feature code '{}' in vcpname", lossy(&bytes[i..end])));
                i = skip_whitespace(bytes, end.max(i + 1));
                continue;
            };
            let open = skip_whitespace(bytes, i + 2);
            if open >= bytes.len() || bytes[open] != b'(' {
                self.error(format!("feature {:02X} in vcpname has no name", code));
                i = skip_whitespace(bytes, i + 2);
                continue;
            }
            let Some(close) = matching_paren(bytes, open) else {
                self.error(format!("unbalanced name of feature {:02X} in vcpname", code));
                break;
            };
            self.names.push((code, lossy(&bytes[open + 1..close]).trim().to_string()));
            i = skip_whitespace(bytes, close + 1);
        }
    }

    fn segment(&mut self, name: String, value: String) {
        match name.to_ascii_lowercase().as_str() {
            "prot" => self.caps.protocol = Some(value.trim().to_string()),
            "type" => self.caps.display_type = Some(value.trim().to_string()),
            "model" => self.caps.model = Some(value.trim().to_string()),
            "cmds" => self.caps.commands = self.hex_list("cmds", &value),
            "vcp" => self.vcp(&value),
            "vcpname" => self.vcpname(&value),
            "mccs_ver" => match MccsVersion::parse(value.trim()) {
                Some(v) => self.caps.mccs_version = Some(v),
                None => self.error(format!("invalid mccs_ver '{}'", value)),
            },
            _ => self.caps.unknown_segments.push((name, value)),
        }
    }

    /// Compare declared features with the metadata table
    fn validate(&mut self) {
        let vspec = self.caps.mccs_version.unwrap_or(MccsVersion::ANY);
        for (&code, feature) in &self.caps.features {
            if table::is_manufacturer_specific(code) {
                continue;
            }
            let Ok(info) = table::lookup(code, vspec) else {
                self.caps.warnings.push(format!("feature {:02X} is not defined for MCCS {}", code, vspec));
                continue;
            };
            let Some(values) = &feature.values else {
                continue;
            };
            match info.flags.kind {
                FeatureKind::SimpleNc => {
                    for &value in values {
                        if table::simple_nc_value_name(vspec, code, value).is_err() {
                            self.caps.warnings.push(format!(
                                "value {:02X} of feature {:02X} ({}) is not a defined value",
                                value, code, info.name
                            ));
                        }
                    }
                }
                FeatureKind::ComplexNc => {}
                _ => self.caps.warnings.push(format!(
                    "feature {:02X} ({}) does not take a value list",
                    code, info.name
                )),
            }
        }
    }

    fn run(mut self) -> Capabilities {
        let trimmed = self.raw.trim();
        let bytes = trimmed.as_bytes();
        let body = match bytes.first() {
            Some(b'(') => match matching_paren(bytes, 0) {
                Some(close) => {
                    if close + 1 < bytes.len() {
                        self.caps
                            .warnings
                            .push(format!("ignored text after capabilities: '{}'", &trimmed[close + 1..]));
                    }
                    &trimmed[1..close]
                }
                None => {
                    self.error("unbalanced outer parentheses".to_string());
                    &trimmed[1..]
                }
            },
            Some(_) => {
                self.caps.warnings.push("missing outer parentheses".to_string());
                trimmed
            }
            None => {
                self.error("empty capabilities string".to_string());
                return self.caps;
            }
        };

        for (name, value) in self.segments(body) {
            self.segment(name, value);
        }
        for (code, name) in std::mem::take(&mut self.names) {
            match self.caps.features.get_mut(&code) {
                Some(feature) => feature.name = Some(name),
                None => {
                    self.caps
                        .warnings
                        .push(format!("vcpname names feature {:02X}, which vcp does not declare", code));
                    self.caps.features.insert(code, CapFeature { values: None, name: Some(name) });
                }
            }
        }
        self.validate();
        self.caps
    }
}

impl Capabilities {
    /// Parse a capabilities string
    ///
    /// Never fails; problems are recorded in `errors` and `warnings`.
    pub fn parse(raw: &str) -> Capabilities {
        let parser = Parser {
            caps: Capabilities { raw: raw.to_string(), ..Default::default() },
            names: Vec::new(),
            raw,
        };
        parser.run()
    }

    /// `Err` if the string had errors; warnings do not count
    pub fn status(&self) -> Result<()> {
        match self.errors.first() {
            None => Ok(()),
            Some(first) => Err(DdcError::CapabilitiesParse {
                count: self.errors.len(),
                first: first.clone(),
            }),
        }
    }

    /// Declared feature codes
    pub fn feature_list(&self) -> FeatureList {
        self.features.keys().copied().collect()
    }
}

/// Parse a capabilities string, returning the partial result with the status
pub fn parse_capabilities_string(raw: &str) -> (Capabilities, Result<()>) {
    let caps = Capabilities::parse(raw);
    let status = caps.status();
    (caps, status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Status;

    const DELL: &str = "(prot(monitor)type(lcd)model(U2415)cmds(01 02 03 07 0C E3 F3)vcp(02 04 05 08 10 12 14(05 08 0B 0C) 16 18 1A 52 60(01 0F 11) AA(01 02) AC AE B2 B6 C6 C8 C9 D6(01 04 05) DC(00 02 03 05) DF)mccs_ver(2.1)mswhql(1))";

    #[test]
    fn test_well_formed() {
        let (caps, status) = parse_capabilities_string(DELL);
        status.unwrap();
        assert_eq!(caps.protocol.as_deref(), Some("monitor"));
        assert_eq!(caps.display_type.as_deref(), Some("lcd"));
        assert_eq!(caps.model.as_deref(), Some("U2415"));
        assert_eq!(caps.commands, vec![0x01, 0x02, 0x03, 0x07, 0x0c, 0xe3, 0xf3]);
        assert_eq!(caps.mccs_version, Some(MccsVersion::V2_1));
        assert_eq!(caps.features[&0x60].values, Some(vec![0x01, 0x0f, 0x11]));
        assert_eq!(caps.features[&0x10].values, None);
        assert!(caps.features.contains_key(&0xdf));
        assert_eq!(caps.unknown_segments, vec![("mswhql".to_string(), "1".to_string())]);
        assert!(caps.feature_list().contains(0xd6));
    }

    #[test]
    fn test_garbled_clause_keeps_the_rest() {
        let (caps, status) = parse_capabilities_string("(vcp(10 Q7(01 02) 60(0F 11))mccs_ver(2.2))");
        assert_eq!(status.unwrap_err().status(), Status::BadData);
        assert_eq!(caps.errors.len(), 1);
        assert!(caps.features.contains_key(&0x10));
        assert_eq!(caps.features[&0x60].values, Some(vec![0x0f, 0x11]));
        assert_eq!(caps.mccs_version, Some(MccsVersion::V2_2));
    }

    #[test]
    fn test_run_together_codes() {
        let caps = Capabilities::parse("(vcp(021012)cmds(0102))");
        caps.status().unwrap();
        assert_eq!(caps.feature_list().codes(), vec![0x02, 0x10, 0x12]);
        assert_eq!(caps.commands, vec![0x01, 0x02]);
    }

    #[test]
    fn test_unbalanced_value_list() {
        let caps = Capabilities::parse("(mccs_ver(2.0)vcp(10 14(05 06 60(01))");
        assert!(caps.status().is_err());
        assert!(caps.features.contains_key(&0x10));
        assert_eq!(caps.mccs_version, Some(MccsVersion::V2_0));
    }

    #[test]
    fn test_missing_outer_parens_is_a_warning() {
        let caps = Capabilities::parse("prot(monitor)vcp(10 12)mccs_ver(3.0)");
        caps.status().unwrap();
        assert_eq!(caps.mccs_version, Some(MccsVersion::V3_0));
        assert!(!caps.warnings.is_empty());
    }

    #[test]
    fn test_vcpname() {
        let caps = Capabilities::parse("(vcp(10 E0)vcpname(E0(Custom Mode) E1(Other)))");
        caps.status().unwrap();
        assert_eq!(caps.features[&0xe0].name.as_deref(), Some("Custom Mode"));
        assert_eq!(caps.features[&0xe1].name.as_deref(), Some("Other"));
    }

    #[test]
    fn test_validation_warnings() {
        let caps = Capabilities::parse("(vcp(10(01 02) 60(0F 77))mccs_ver(2.1))");
        caps.status().unwrap();
        assert!(caps.warnings.iter().any(|w| w.contains("feature 10")));
        assert!(caps.warnings.iter().any(|w| w.contains("value 77 of feature 60")));
    }

    #[test]
    fn test_signed_token_is_not_a_code() {
        let caps = Capabilities::parse("(vcp(+1 10)cmds(-1 01))");
        assert_eq!(caps.errors.len(), 2);
        assert_eq!(caps.feature_list().codes(), vec![0x10]);
        assert_eq!(caps.commands, vec![0x01]);
    }

    #[test]
    fn test_empty_and_garbage() {
        assert!(Capabilities::parse("").status().is_err());
        let caps = Capabilities::parse("(!!!)");
        assert!(caps.status().is_err());
        assert!(caps.features.is_empty());
    }
}
