// SPDX-License-Identifier: GPL-3.0-only
//! Feature lists
//!
//! A [`FeatureList`] is a 256 bit set keyed by VCP feature code. It is a plain
//! value type: set operations return a new list and never touch their operands.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Set of VCP feature codes
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeatureList {
    bytes: [u8; 32],
}

impl FeatureList {
    /// Empty list
    pub const fn new() -> Self {
        FeatureList { bytes: [0; 32] }
    }

    /// Remove all codes
    pub fn clear(&mut self) {
        self.bytes = [0; 32];
    }

    pub fn add(&mut self, code: u8) {
        self.bytes[(code >> 3) as usize] |= 1 << (code & 0x07);
    }

    pub fn contains(&self, code: u8) -> bool {
        self.bytes[(code >> 3) as usize] & (1 << (code & 0x07)) != 0
    }

    /// Codes in either list
    pub fn union(&self, other: &FeatureList) -> FeatureList {
        let mut result = FeatureList::new();
        for (i, byte) in result.bytes.iter_mut().enumerate() {
            *byte = self.bytes[i] | other.bytes[i];
        }
        result
    }

    /// Codes in `self` that are not in `other`
    pub fn subtract(&self, other: &FeatureList) -> FeatureList {
        let mut result = FeatureList::new();
        for (i, byte) in result.bytes.iter_mut().enumerate() {
            *byte = self.bytes[i] & !other.bytes[i];
        }
        result
    }

    /// Contained codes in ascending order
    pub fn codes(&self) -> Vec<u8> {
        (0..=u8::MAX).filter(|&code| self.contains(code)).collect()
    }

    pub fn len(&self) -> usize {
        self.bytes.iter().map(|b| b.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.iter().all(|&b| b == 0)
    }

    /// True if every code in `self` is also in `other`
    pub fn is_subset(&self, other: &FeatureList) -> bool {
        self.subtract(other).is_empty()
    }
}

impl FromIterator<u8> for FeatureList {
    fn from_iter<I: IntoIterator<Item = u8>>(iter: I) -> Self {
        let mut list = FeatureList::new();
        for code in iter {
            list.add(code);
        }
        list
    }
}

impl IntoIterator for FeatureList {
    type Item = u8;
    type IntoIter = std::vec::IntoIter<u8>;

    fn into_iter(self) -> Self::IntoIter {
        self.codes().into_iter()
    }
}

impl fmt::Display for FeatureList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let codes: Vec<String> = self.codes().iter().map(|c| format!("{:02X}", c)).collect();
        f.write_str(&codes.join(" "))
    }
}

impl fmt::Debug for FeatureList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FeatureList[{}]", self)
    }
}
