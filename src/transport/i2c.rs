// SPDX-License-Identifier: GPL-3.0-only
//! Linux i2c-dev channel
//!
//! DDC/CI over the `/dev/i2c-N` device nodes. Requires read/write access to
//! the node, usually granted through the `i2c` group.

use std::fmt;
use std::path::PathBuf;

use i2cdev::core::I2CDevice;
use i2cdev::linux::{LinuxI2CDevice, LinuxI2CError};

use super::{ChannelOpener, Transport};
use crate::ddc::packet::{DDC_SLAVE_ADDR, EDID_SLAVE_ADDR};
use crate::error::TransportError;

/// Size of the EDID base block
pub const EDID_LENGTH: usize = 128;

pub fn device_path(busno: u32) -> PathBuf {
    PathBuf::from(format!("/dev/i2c-{}", busno))
}

impl From<LinuxI2CError> for TransportError {
    fn from(e: LinuxI2CError) -> Self {
        TransportError::Io(e.into())
    }
}

/// Open i2c-dev node
pub struct I2cDevice {
    device: LinuxI2CDevice,
    busno: u32,
}

impl fmt::Debug for I2cDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("I2cDevice").field("busno", &self.busno).finish_non_exhaustive()
    }
}

impl I2cDevice {
    /// Open the bus with transfers directed to `addr`
    pub fn open(busno: u32, addr: u16) -> Result<Self, TransportError> {
        let device = LinuxI2CDevice::new(device_path(busno), addr)?;
        Ok(Self { device, busno })
    }

    pub fn busno(&self) -> u32 {
        self.busno
    }

    /// Direct subsequent transfers to `addr`
    pub fn set_slave_address(&mut self, addr: u16) -> Result<(), TransportError> {
        Ok(self.device.set_slave_address(addr)?)
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        Ok(self.device.write(bytes)?)
    }

    fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>, TransportError> {
        let mut buf = vec![0u8; len];
        self.device.read(&mut buf)?;
        Ok(buf)
    }

    /// Read the 128 byte EDID base block from the EEPROM at 0x50
    pub fn read_edid(&mut self) -> Result<Vec<u8>, TransportError> {
        self.set_slave_address(EDID_SLAVE_ADDR)?;
        self.write_bytes(&[0x00])?;
        self.read_bytes(EDID_LENGTH)
    }
}

/// DDC/CI channel on an I2C bus
#[derive(Debug)]
pub struct I2cTransport {
    device: I2cDevice,
}

impl I2cTransport {
    pub fn open(busno: u32) -> Result<Self, TransportError> {
        Ok(Self { device: I2cDevice::open(busno, DDC_SLAVE_ADDR)? })
    }
}

impl Transport for I2cTransport {
    fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.device.write_bytes(bytes)
    }

    fn receive(&mut self, max_len: usize) -> Result<Vec<u8>, TransportError> {
        self.device.read_bytes(max_len)
    }
}

/// Opens [`I2cTransport`] channels for one bus
#[derive(Debug, Clone, Copy)]
pub struct I2cOpener {
    pub busno: u32,
}

impl ChannelOpener for I2cOpener {
    fn open(&self) -> Result<Box<dyn Transport>, TransportError> {
        Ok(Box::new(I2cTransport::open(self.busno)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_path() {
        assert_eq!(device_path(7), PathBuf::from("/dev/i2c-7"));
    }

    #[test]
    fn test_bus_errors_keep_errno() {
        let err = TransportError::from(LinuxI2CError::Io(std::io::Error::from_raw_os_error(libc::EIO)));
        assert!(err.is_transient());

        let err = I2cTransport::open(u32::MAX).unwrap_err();
        match &err {
            TransportError::Io(e) => assert_eq!(e.raw_os_error(), Some(libc::ENOENT)),
            other => panic!("unexpected error {:?}", other),
        }
        assert!(!err.is_transient());
    }
}
