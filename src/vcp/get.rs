// SPDX-License-Identifier: GPL-3.0-only
//! Reading VCP values

use super::format;
use super::value::{AnyVcpValue, NonTableValue, TableValue, ValueTypeParm};
use crate::capabilities::Capabilities;
use crate::ddc;
use crate::display::DisplayHandle;
use crate::error::{DdcError, Result};
use crate::features::table::{self, FeatureKind};
use crate::features::MccsVersion;

/// Feature holding the display's MCCS version
pub const VCP_VERSION_FEATURE: u8 = 0xdf;

pub(crate) fn wrong_kind(code: u8, reason: &str) -> DdcError {
    DdcError::InvalidOperation { feature_code: code, reason: reason.to_string() }
}

impl DisplayHandle {
    /// Read the value of a non-table feature
    pub fn get_non_table_vcp_value(&mut self, code: u8) -> Result<NonTableValue> {
        if !table::kind_possible(code, |k| !k.is_table()) {
            return Err(wrong_kind(code, "table feature read as non-table"));
        }
        let value = ddc::get_vcp(self.transport()?, code)?;
        trace!(
            display = %self.display_ref().location(),
            feature = format_args!("0x{:02x}", code),
            value = value.value(),
            "VCP value read"
        );
        Ok(value)
    }

    /// Read the value of a table feature
    pub fn get_table_vcp_value(&mut self, code: u8) -> Result<TableValue> {
        if !table::kind_possible(code, FeatureKind::is_table) {
            return Err(wrong_kind(code, "non-table feature read as table"));
        }
        let bytes = ddc::table_read(self.transport()?, code)?;
        Ok(TableValue(bytes))
    }

    /// Read a value of the given type; `Unset` takes the type from the
    /// feature metadata
    pub fn get_any_vcp_value_using_explicit_type(
        &mut self,
        code: u8,
        value_type: ValueTypeParm,
    ) -> Result<AnyVcpValue> {
        match value_type {
            ValueTypeParm::Unset => self.get_any_vcp_value_using_implicit_type(code),
            ValueTypeParm::NonTable => {
                Ok(AnyVcpValue::non_table(code, self.get_non_table_vcp_value(code)?))
            }
            ValueTypeParm::Table => Ok(AnyVcpValue::table(code, self.get_table_vcp_value(code)?)),
        }
    }

    /// Read a value whose type comes from the feature metadata at the
    /// display's MCCS version
    ///
    /// Fails for manufacturer specific and unrecognized codes.
    pub fn get_any_vcp_value_using_implicit_type(&mut self, code: u8) -> Result<AnyVcpValue> {
        let vspec = self.get_mccs_version()?;
        let info = table::lookup(code, vspec)?;
        match info.flags.kind {
            FeatureKind::Table => Ok(AnyVcpValue::table(code, self.get_table_vcp_value(code)?)),
            FeatureKind::ManufacturerSpecific => Err(wrong_kind(code, "value type cannot be inferred")),
            _ => Ok(AnyVcpValue::non_table(code, self.get_non_table_vcp_value(code)?)),
        }
    }

    /// MCCS version of the display
    ///
    /// Taken from feature 0xDF, else from the capabilities string, else
    /// [`MccsVersion::UNKNOWN`]. The result is cached on the display
    /// reference, except an `UNKNOWN` that comes from failed communication.
    pub fn get_mccs_version(&mut self) -> Result<MccsVersion> {
        if let Some(version) = self.display_ref().cached_mccs_version() {
            return Ok(version);
        }
        let mut answered = true;
        let version = match ddc::get_vcp(self.transport()?, VCP_VERSION_FEATURE) {
            Ok(value) if value.sh != 0 => MccsVersion::new(value.sh, value.sl),
            result => {
                if let Err(e) = result {
                    debug!(display = %self.display_ref().location(), error = %e, "Reading VCP version failed");
                    answered &= matches!(e, DdcError::ReportedUnsupported(_));
                }
                let from_capabilities = match self.get_capabilities_string() {
                    Ok(caps) => Capabilities::parse(&caps).mccs_version,
                    Err(e) => {
                        debug!(display = %self.display_ref().location(), error = %e, "Reading capabilities failed");
                        answered = false;
                        None
                    }
                };
                from_capabilities.unwrap_or(MccsVersion::UNKNOWN)
            }
        };
        if version != MccsVersion::UNKNOWN || answered {
            let _ = self.display_ref().record.mccs_version.set(version);
        }
        debug!(display = %self.display_ref().location(), %version, "MCCS version determined");
        Ok(version)
    }

    /// Capabilities string of the display, read once per reference
    pub fn get_capabilities_string(&mut self) -> Result<String> {
        if let Some(caps) = self.display_ref().record.capabilities.get() {
            return Ok(caps.clone());
        }
        let caps = ddc::read_capabilities(self.transport()?)?;
        let _ = self.display_ref().record.capabilities.set(caps.clone());
        Ok(caps)
    }

    /// Read and parse the capabilities string
    pub fn get_capabilities(&mut self) -> Result<Capabilities> {
        Ok(Capabilities::parse(&self.get_capabilities_string()?))
    }

    /// Read a value and format it for display
    pub fn get_formatted_vcp_value(&mut self, code: u8) -> Result<String> {
        let vspec = self.get_mccs_version()?;
        let value = match table::lookup(code, vspec) {
            Ok(info) if !info.flags.readable() => {
                return Err(wrong_kind(code, "feature is write-only"));
            }
            Ok(info) if info.flags.kind.is_table() => {
                AnyVcpValue::table(code, self.get_table_vcp_value(code)?)
            }
            Ok(_) => AnyVcpValue::non_table(code, self.get_non_table_vcp_value(code)?),
            Err(DdcError::UnknownFeature(_)) if table::is_manufacturer_specific(code) => {
                AnyVcpValue::non_table(code, self.get_non_table_vcp_value(code)?)
            }
            Err(e) => return Err(e),
        };
        Ok(format::format_any_vcp_value(code, vspec, &value))
    }
}
