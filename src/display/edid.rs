// SPDX-License-Identifier: GPL-3.0-only
//! EDID base block parsing
//!
//! Only the identification fields are decoded: manufacturer id, product
//! code, serial numbers, model name and manufacture year.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::identifier::EDID_SIZE;
use crate::error::{DdcError, Result};

const HEADER: [u8; 8] = [0x00, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x00];
const DESCRIPTOR_OFFSETS: [usize; 4] = [54, 72, 90, 108];
const DESCRIPTOR_LEN: usize = 18;
const TAG_SERIAL: u8 = 0xff;
const TAG_MODEL: u8 = 0xfc;

/// Identification data decoded from an EDID
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedEdid {
    /// Three letter PNP manufacturer id, e.g. "DEL"
    pub mfg_id: String,
    pub product_code: u16,
    /// Binary serial number from bytes 12..16
    pub serial_binary: u32,
    /// Model name from the 0xFC descriptor
    pub model: String,
    /// Serial number from the 0xFF descriptor
    pub serial_ascii: String,
    pub year: u16,
    pub edid_version: (u8, u8),
    #[serde(with = "edid_bytes")]
    pub bytes: [u8; EDID_SIZE],
}

mod edid_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::EDID_SIZE;

    pub fn serialize<S: Serializer>(bytes: &[u8; EDID_SIZE], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_bytes(bytes)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<[u8; EDID_SIZE], D::Error> {
        let v: Vec<u8> = Deserialize::deserialize(d)?;
        v.try_into()
            .map_err(|_| serde::de::Error::custom("EDID must be 128 bytes"))
    }
}

fn descriptor_text(data: &[u8]) -> String {
    let text: Vec<u8> = data.iter().copied().take_while(|&b| b != 0x0a).collect();
    String::from_utf8_lossy(&text).trim_end().to_string()
}

fn mfg_letter(bits: u16) -> char {
    char::from(b'A' + (bits as u8).wrapping_sub(1) % 26)
}

impl ParsedEdid {
    /// Decode an EDID base block
    ///
    /// A bad header is an error. A bad checksum is only logged, some
    /// monitors ship with one.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; EDID_SIZE] = bytes.try_into().map_err(|_| {
            DdcError::InvalidArgument(format!("EDID must be {} bytes, got {}", EDID_SIZE, bytes.len()))
        })?;
        if bytes[..8] != HEADER {
            return Err(DdcError::InvalidArgument("invalid EDID header".into()));
        }
        let sum = bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
        if sum != 0 {
            debug!(checksum = sum, "EDID checksum mismatch");
        }

        let packed = u16::from_be_bytes([bytes[8], bytes[9]]);
        let mfg_id: String = [
            mfg_letter((packed >> 10) & 0x1f),
            mfg_letter((packed >> 5) & 0x1f),
            mfg_letter(packed & 0x1f),
        ]
        .into_iter()
        .collect();

        let mut model = String::new();
        let mut serial_ascii = String::new();
        for offset in DESCRIPTOR_OFFSETS {
            let desc = &bytes[offset..offset + DESCRIPTOR_LEN];
            if desc[..3] != [0, 0, 0] {
                continue;
            }
            match desc[3] {
                TAG_MODEL => model = descriptor_text(&desc[5..]),
                TAG_SERIAL => serial_ascii = descriptor_text(&desc[5..]),
                _ => {}
            }
        }

        Ok(Self {
            mfg_id,
            product_code: u16::from_le_bytes([bytes[10], bytes[11]]),
            serial_binary: u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]),
            model,
            serial_ascii,
            year: 1990 + bytes[17] as u16,
            edid_version: (bytes[18], bytes[19]),
            bytes,
        })
    }
}

impl fmt::Display for ParsedEdid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.mfg_id, self.model, self.serial_ascii)
    }
}

fn put_descriptor(block: &mut [u8; EDID_SIZE], offset: usize, tag: u8, text: &str) {
    let desc = &mut block[offset..offset + DESCRIPTOR_LEN];
    desc[3] = tag;
    let field = &mut desc[5..];
    field.fill(0x20);
    let text = text.as_bytes();
    let n = text.len().min(field.len());
    field[..n].copy_from_slice(&text[..n]);
    if n < field.len() {
        field[n] = 0x0a;
    }
}

/// Encode a minimal EDID base block with identification fields only
///
/// Used to give simulated monitors a realistic identity.
pub fn encode_edid(mfg_id: &str, product_code: u16, model: &str, serial: &str) -> [u8; EDID_SIZE] {
    let mut block = [0u8; EDID_SIZE];
    block[..8].copy_from_slice(&HEADER);

    let letters: Vec<u16> = mfg_id
        .bytes()
        .take(3)
        .map(|c| u16::from(c.to_ascii_uppercase().saturating_sub(b'A') + 1) & 0x1f)
        .collect();
    let packed = letters.iter().fold(0u16, |acc, l| (acc << 5) | l);
    block[8..10].copy_from_slice(&packed.to_be_bytes());
    block[10..12].copy_from_slice(&product_code.to_le_bytes());
    block[17] = 30;
    block[18] = 1;
    block[19] = 4;

    put_descriptor(&mut block, DESCRIPTOR_OFFSETS[2], TAG_MODEL, model);
    put_descriptor(&mut block, DESCRIPTOR_OFFSETS[3], TAG_SERIAL, serial);

    let sum = block[..EDID_SIZE - 1].iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    block[EDID_SIZE - 1] = 0u8.wrapping_sub(sum);
    block
}
