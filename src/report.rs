// SPDX-License-Identifier: GPL-3.0-only
//! Indented human readable reports
//!
//! Reports go to any [`std::io::Write`], nested by depth with three spaces
//! per level.

use std::fmt::Display;
use std::io::{self, Write};

pub const INDENT_WIDTH: usize = 3;

/// Width of the label column in [`label_value`]
const LABEL_WIDTH: usize = 25;

/// Write one line at `depth`
pub fn line(w: &mut dyn Write, depth: usize, text: impl Display) -> io::Result<()> {
    writeln!(w, "{:indent$}{}", "", text, indent = depth * INDENT_WIDTH)
}

/// Write a `label:   value` line with the value column aligned
pub fn label_value(w: &mut dyn Write, depth: usize, label: &str, value: impl Display) -> io::Result<()> {
    let label = format!("{}:", label);
    writeln!(
        w,
        "{:indent$}{:<width$} {}",
        "",
        label,
        value,
        indent = depth * INDENT_WIDTH,
        width = LABEL_WIDTH
    )
}

/// Hex dump, 16 bytes per line with an ASCII column
pub fn hex_dump(w: &mut dyn Write, depth: usize, bytes: &[u8]) -> io::Result<()> {
    for (i, chunk) in bytes.chunks(16).enumerate() {
        let hex: Vec<String> = chunk.iter().map(|b| format!("{:02x}", b)).collect();
        let ascii: String = chunk
            .iter()
            .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '.' })
            .collect();
        line(w, depth, format_args!("+{:04}   {:<47}   {}", i * 16, hex.join(" "), ascii))?;
    }
    Ok(())
}
