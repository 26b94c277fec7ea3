// SPDX-License-Identifier: GPL-3.0-only

use std::io::{self, Write};

use super::parser::Capabilities;
use crate::features::table;
use crate::features::MccsVersion;
use crate::report;
use crate::settings::{self, OutputLevel};

fn hex_list(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02X}", b)).collect::<Vec<_>>().join(" ")
}

impl Capabilities {
    /// Write the parsed capabilities, feature names resolved at the declared
    /// MCCS version
    pub fn report(&self, w: &mut dyn Write, depth: usize) -> io::Result<()> {
        let level = settings::output_level();
        let vspec = self.mccs_version.unwrap_or(MccsVersion::ANY);
        if level >= OutputLevel::Verbose {
            report::label_value(w, depth, "Unparsed string", &self.raw)?;
        }
        report::label_value(w, depth, "MCCS version", vspec)?;
        if let Some(protocol) = &self.protocol {
            report::label_value(w, depth, "Protocol", protocol)?;
        }
        if let Some(display_type) = &self.display_type {
            report::label_value(w, depth, "Type", display_type)?;
        }
        if let Some(model) = &self.model {
            report::label_value(w, depth, "Model", model)?;
        }
        if !self.commands.is_empty() {
            report::label_value(w, depth, "Commands", hex_list(&self.commands))?;
        }

        report::line(w, depth, "VCP Features:")?;
        for (&code, feature) in &self.features {
            let name = feature
                .name
                .as_deref()
                .or_else(|| table::feature_name(code, Some(vspec)))
                .unwrap_or("Unrecognized feature");
            report::line(w, depth + 1, format_args!("Feature: {:02X} ({})", code, name))?;
            let Some(values) = &feature.values else {
                continue;
            };
            if level == OutputLevel::Terse {
                report::line(w, depth + 2, format_args!("Values: {}", hex_list(values)))?;
                continue;
            }
            report::line(w, depth + 2, "Values:")?;
            for &value in values {
                match table::simple_nc_value_name(vspec, code, value) {
                    Ok(value_name) => report::line(w, depth + 3, format_args!("{:02X}: {}", value, value_name))?,
                    Err(_) => report::line(w, depth + 3, format_args!("{:02X}", value))?,
                }
            }
        }

        if level >= OutputLevel::Verbose {
            for (name, value) in &self.unknown_segments {
                report::label_value(w, depth, "Unrecognized segment", format_args!("{}({})", name, value))?;
            }
            for warning in &self.warnings {
                report::label_value(w, depth, "Warning", warning)?;
            }
        }
        for error in &self.errors {
            report::label_value(w, depth, "Parse error", error)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_names_features_and_values() {
        let caps = Capabilities::parse("(prot(monitor)vcp(10 60(0F 11 77))mccs_ver(2.1))");
        let mut out = Vec::new();
        caps.report(&mut out, 0).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Protocol:"));
        assert!(text.contains("Feature: 10 (Brightness)"));
        assert!(text.contains("      0F: DisplayPort-1"));
        assert!(text.contains("      77\n"));
        assert!(!text.contains("Parse error"));
    }

    #[test]
    fn test_report_lists_errors() {
        let caps = Capabilities::parse("(vcp(10 zz))");
        let mut out = Vec::new();
        caps.report(&mut out, 1).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("   Parse error:"));
        assert!(text.contains("invalid feature code 'zz'"));
    }
}
