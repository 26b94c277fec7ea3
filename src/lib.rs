// SPDX-License-Identifier: GPL-3.0-only
//! Control external displays over DDC/CI
//!
//! Displays are found by a [`DisplayRegistry`], named with a
//! [`DisplayIdentifier`] and opened into a [`DisplayHandle`], on which VCP
//! feature values are read and written. All bus traffic goes through the
//! [`transport::Transport`] trait with retries managed by [`ddc::retry`].

#[macro_use]
extern crate tracing;

pub mod capabilities;
pub mod config;
pub mod ddc;
pub mod display;
pub mod error;
pub mod features;
pub mod report;
pub mod settings;
pub mod transport;
pub mod vcp;

pub use capabilities::{parse_capabilities_string, Capabilities};
pub use config::Config;
pub use display::{
    release_display_ref, DisplayHandle, DisplayIdentifier, DisplayInfo, DisplayRef, DisplayRegistry,
};
pub use error::{DdcError, Result, Status};
pub use features::{FeatureList, FeatureSubset, MccsVersion};
pub use settings::OutputLevel;
pub use vcp::{AnyVcpValue, NonTableValue, TableValue, ValueType, ValueTypeParm, VcpValue};
