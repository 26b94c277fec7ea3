// SPDX-License-Identifier: GPL-3.0-only
//! Display resolution
//!
//! Identifier → reference → handle:
//!
//! - [`DisplayIdentifier`] names a display the way the caller knows it
//! - [`DisplayRegistry::resolve`] turns it into a [`DisplayRef`]
//! - [`DisplayRef::open`] yields the [`DisplayHandle`] VCP operations run on

pub mod detect;
pub mod edid;
pub mod handle;
pub mod identifier;
pub mod reference;
pub mod registry;

pub use detect::{DetectedDisplay, Detector, SimulatedDetector};
#[cfg(target_os = "linux")]
pub use detect::I2cDetector;
#[cfg(feature = "usb-hid")]
pub use detect::HidDetector;
pub use edid::ParsedEdid;
pub use handle::DisplayHandle;
pub use identifier::DisplayIdentifier;
pub use reference::{release_display_ref, ChannelLocation, DisplayRef, Ownership};
pub use registry::{DisplayInfo, DisplayRegistry};

/// Detectors for every channel type this build supports
pub fn system_detectors() -> Vec<Box<dyn Detector>> {
    let mut detectors: Vec<Box<dyn Detector>> = Vec::new();
    #[cfg(target_os = "linux")]
    detectors.push(Box::new(I2cDetector));
    #[cfg(feature = "usb-hid")]
    detectors.push(Box::new(HidDetector));
    detectors
}
