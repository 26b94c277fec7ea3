// SPDX-License-Identifier: GPL-3.0-only
//! Settings file
//!
//! `$XDG_CONFIG_HOME/ddcci-control/config.kdl`, every node optional:
//!
//! ```kdl
//! max-tries write-read=10 write-only=4 multi-part=8
//! verify #true
//! output-level "normal"
//! report-ddc-errors #false
//! sleep-multiplier 1.0
//! ```

use std::path::PathBuf;

use kdl::{KdlDocument, KdlValue};

use crate::ddc::retry::{self, RetryType};
use crate::error::{DdcError, Result};
use crate::settings::{self, OutputLevel};

pub const CONFIG_DIR: &str = "ddcci-control";
pub const CONFIG_FILE: &str = "config.kdl";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MaxTries {
    pub write_read: u8,
    pub write_only: u8,
    pub multi_part: u8,
}

impl Default for MaxTries {
    fn default() -> Self {
        Self {
            write_read: RetryType::WriteRead.default_tries(),
            write_only: RetryType::WriteOnly.default_tries(),
            multi_part: RetryType::MultiPart.default_tries(),
        }
    }
}

impl MaxTries {
    fn get(&self, retry_type: RetryType) -> u8 {
        match retry_type {
            RetryType::WriteRead => self.write_read,
            RetryType::WriteOnly => self.write_only,
            RetryType::MultiPart => self.multi_part,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub max_tries: MaxTries,
    pub verify: bool,
    pub output_level: OutputLevel,
    pub report_ddc_errors: bool,
    pub sleep_multiplier: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_tries: MaxTries::default(),
            verify: true,
            output_level: OutputLevel::Normal,
            report_ddc_errors: false,
            sleep_multiplier: 1.0,
        }
    }
}

fn invalid(node: &str, value: &KdlValue) -> DdcError {
    DdcError::Config(format!("invalid value {} for {}", value, node))
}

fn as_tries(node: &str, value: &KdlValue) -> Result<u8> {
    value
        .as_integer()
        .and_then(|v| u8::try_from(v).ok())
        .ok_or_else(|| invalid(node, value))
}

impl Config {
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Load the settings file, or the defaults if there is none
    pub fn load() -> Result<Self> {
        let Some(path) = Self::path() else {
            debug!("No config directory, using defaults");
            return Ok(Self::default());
        };
        match std::fs::read_to_string(&path) {
            Ok(text) => {
                info!("Loading config from {}", path.display());
                Self::parse(&text)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(DdcError::Config(format!("{}: {}", path.display(), e))),
        }
    }

    /// Parse KDL text; unknown nodes are logged and ignored
    pub fn parse(text: &str) -> Result<Self> {
        let doc: KdlDocument = text
            .parse()
            .map_err(|e: kdl::KdlError| DdcError::Config(e.to_string()))?;
        let mut config = Self::default();

        for node in doc.nodes() {
            let name = node.name().value();
            let first = node.entries().iter().find(|e| e.name().is_none()).map(|e| e.value());
            match name {
                "max-tries" => {
                    for entry in node.entries() {
                        let Some(key) = entry.name() else {
                            return Err(DdcError::Config("max-tries takes named values".into()));
                        };
                        let tries = as_tries(key.value(), entry.value())?;
                        match key.value() {
                            "write-read" => config.max_tries.write_read = tries,
                            "write-only" => config.max_tries.write_only = tries,
                            "multi-part" => config.max_tries.multi_part = tries,
                            other => {
                                return Err(DdcError::Config(format!("unknown retry type '{}'", other)));
                            }
                        }
                    }
                }
                "verify" | "report-ddc-errors" => {
                    let value = first.ok_or_else(|| DdcError::Config(format!("{} needs a value", name)))?;
                    let flag = value.as_bool().ok_or_else(|| invalid(name, value))?;
                    if name == "verify" {
                        config.verify = flag;
                    } else {
                        config.report_ddc_errors = flag;
                    }
                }
                "output-level" => {
                    let value = first.ok_or_else(|| DdcError::Config("output-level needs a value".into()))?;
                    config.output_level = value.as_string().ok_or_else(|| invalid(name, value))?.parse()?;
                }
                "sleep-multiplier" => {
                    let value = first.ok_or_else(|| DdcError::Config("sleep-multiplier needs a value".into()))?;
                    let multiplier = value
                        .as_float()
                        .or_else(|| value.as_integer().map(|i| i as f64))
                        .ok_or_else(|| invalid(name, value))?;
                    config.sleep_multiplier = multiplier as f32;
                }
                other => warn!("Ignoring unknown config node '{}'", other),
            }
        }
        Ok(config)
    }

    /// Check every value without changing any setting
    pub fn validate(&self) -> Result<()> {
        let limit = retry::max_max_tries();
        for retry_type in RetryType::ALL {
            let tries = self.max_tries.get(retry_type);
            if !(1..=limit).contains(&tries) {
                return Err(DdcError::Config(format!(
                    "max tries {} for {} outside 1..={}",
                    tries, retry_type, limit
                )));
            }
        }
        if !(0.0..=10.0).contains(&self.sleep_multiplier) {
            return Err(DdcError::Config(format!(
                "sleep multiplier {} outside 0.0..=10.0",
                self.sleep_multiplier
            )));
        }
        Ok(())
    }

    /// Push the values into the process-wide settings and those of the
    /// calling thread
    ///
    /// Nothing changes if any value is out of range.
    pub fn apply(&self) -> Result<()> {
        self.validate()?;
        for retry_type in RetryType::ALL {
            retry::set_max_tries(retry_type, self.max_tries.get(retry_type))?;
        }
        settings::set_sleep_multiplier(self.sleep_multiplier)?;
        settings::enable_verify(self.verify);
        settings::set_output_level(self.output_level);
        settings::enable_report_ddc_errors(self.report_ddc_errors);
        Ok(())
    }
}
