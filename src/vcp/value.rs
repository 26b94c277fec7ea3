// SPDX-License-Identifier: GPL-3.0-only
//! VCP value types

use serde::{Deserialize, Serialize};

/// Fixed size value of a non-table feature
///
/// For continuous features `mh`/`ml` hold the maximum and `sh`/`sl` the
/// current value. Non-continuous features interpret the bytes individually.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NonTableValue {
    pub mh: u8,
    pub ml: u8,
    pub sh: u8,
    pub sl: u8,
}

impl NonTableValue {
    pub fn new(mh: u8, ml: u8, sh: u8, sl: u8) -> Self {
        Self { mh, ml, sh, sl }
    }

    pub fn max_value(&self) -> u16 {
        u16::from_be_bytes([self.mh, self.ml])
    }

    pub fn value(&self) -> u16 {
        u16::from_be_bytes([self.sh, self.sl])
    }
}

/// Variable length value of a table feature
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableValue(pub Vec<u8>);

impl TableValue {
    pub fn bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for TableValue {
    fn from(bytes: Vec<u8>) -> Self {
        TableValue(bytes)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    NonTable,
    Table,
}

/// Requested value type; `Unset` asks for the type to be taken from the
/// feature metadata
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueTypeParm {
    #[default]
    Unset,
    NonTable,
    Table,
}

impl From<ValueType> for ValueTypeParm {
    fn from(t: ValueType) -> Self {
        match t {
            ValueType::NonTable => ValueTypeParm::NonTable,
            ValueType::Table => ValueTypeParm::Table,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VcpValue {
    NonTable(NonTableValue),
    Table(TableValue),
}

impl VcpValue {
    pub fn value_type(&self) -> ValueType {
        match self {
            VcpValue::NonTable(_) => ValueType::NonTable,
            VcpValue::Table(_) => ValueType::Table,
        }
    }
}

/// Value of either type together with the feature it belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnyVcpValue {
    pub feature_code: u8,
    pub value: VcpValue,
}

impl AnyVcpValue {
    pub fn non_table(feature_code: u8, value: NonTableValue) -> Self {
        Self { feature_code, value: VcpValue::NonTable(value) }
    }

    pub fn table(feature_code: u8, value: TableValue) -> Self {
        Self { feature_code, value: VcpValue::Table(value) }
    }

    pub fn value_type(&self) -> ValueType {
        self.value.value_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_table_value_halves() {
        let v = NonTableValue::new(0x01, 0x2c, 0x00, 0x32);
        assert_eq!(v.max_value(), 300);
        assert_eq!(v.value(), 50);
    }

    #[test]
    fn test_any_value_type() {
        let any = AnyVcpValue::table(0x73, TableValue(vec![1, 2, 3]));
        assert_eq!(any.value_type(), ValueType::Table);
        assert_eq!(ValueTypeParm::from(any.value_type()), ValueTypeParm::Table);
    }
}
