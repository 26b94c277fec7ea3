// SPDX-License-Identifier: GPL-3.0-only
//! Capabilities strings: parsing and reporting

pub mod parser;
mod report;

pub use parser::{parse_capabilities_string, CapFeature, Capabilities};
