// SPDX-License-Identifier: GPL-3.0-only
//! Error types for the DDC/CI engine
//!
//! Every fallible operation returns a [`DdcError`]. Callers that need the
//! symbolic status taxonomy (the `DDCRC_*` style codes) use [`DdcError::status`].

use thiserror::Error;

use crate::ddc::retry::RetryType;

/// Failure of a single exchange on the underlying bus channel
#[derive(Error, Debug)]
pub enum TransportError {
    /// I/O error from the OS device node
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The device did not acknowledge the transfer
    #[error("device did not acknowledge")]
    Nak,

    /// Fewer bytes than requested were transferred
    #[error("short transfer: expected {expected} bytes, got {actual}")]
    ShortTransfer { expected: usize, actual: usize },

    /// HID layer error
    #[error("HID error: {0}")]
    Hid(String),
}

impl TransportError {
    /// Whether repeating the exchange has a reasonable chance of succeeding
    pub fn is_transient(&self) -> bool {
        match self {
            TransportError::Io(e) => match e.raw_os_error() {
                Some(code) => matches!(
                    code,
                    libc::EIO
                        | libc::ENXIO
                        | libc::EREMOTEIO
                        | libc::ETIMEDOUT
                        | libc::EAGAIN
                        | libc::EBUSY
                        | libc::EPROTO
                ),
                None => matches!(
                    e.kind(),
                    std::io::ErrorKind::TimedOut
                        | std::io::ErrorKind::WouldBlock
                        | std::io::ErrorKind::Interrupted
                        | std::io::ErrorKind::UnexpectedEof
                ),
            },
            TransportError::Nak | TransportError::ShortTransfer { .. } => true,
            TransportError::Hid(_) => false,
        }
    }
}

/// Malformed or unexpected DDC/CI response
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Response checksum does not match its content
    #[error("checksum mismatch: calculated 0x{calculated:02x}, received 0x{received:02x}")]
    Checksum { calculated: u8, received: u8 },

    /// Response does not start with a valid source address and length byte
    #[error("invalid response envelope")]
    Envelope,

    /// Length byte claims more data than was read
    #[error("invalid packet size: declared {declared}, available {available}")]
    PacketSize { declared: usize, available: usize },

    /// Display replied with the DDC Null Message
    #[error("DDC null response")]
    NullResponse,

    /// Reply opcode does not answer the request
    #[error("unexpected reply opcode 0x{actual:02x}, expected 0x{expected:02x}")]
    UnexpectedOpcode { expected: u8, actual: u8 },

    /// Reply refers to a different feature than the one requested
    #[error("reply for feature 0x{actual:02x}, requested 0x{expected:02x}")]
    FeatureMismatch { expected: u8, actual: u8 },

    /// Reply payload has the wrong length for its opcode
    #[error("reply payload length {actual}, expected {expected}")]
    PayloadLength { expected: usize, actual: usize },

    /// Multi-part fragment arrived for an offset other than the one requested
    #[error("fragment offset {actual}, expected {expected}")]
    FragmentOffset { expected: u16, actual: u16 },

    /// Get VCP reply carries a result code other than success or unsupported
    #[error("invalid result code 0x{0:02x}")]
    ResultCode(u8),

    /// Request payload does not fit in a single DDC/CI packet
    #[error("request payload too large: {0} bytes")]
    RequestTooLarge(usize),
}

impl ProtocolError {
    /// Bus noise produces envelope, size, checksum and null errors; a reply
    /// that is well-formed but answers the wrong question is structural.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProtocolError::Checksum { .. }
                | ProtocolError::Envelope
                | ProtocolError::PacketSize { .. }
                | ProtocolError::NullResponse
                | ProtocolError::FragmentOffset { .. }
                | ProtocolError::ResultCode(_)
        )
    }
}

/// Main error type of the crate
#[derive(Error, Debug)]
pub enum DdcError {
    /// Invalid argument supplied by the caller
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Display handle was used after it was closed
    #[error("display handle for {0} is closed")]
    HandleClosed(String),

    /// No physical display matches the identifier
    #[error("display not found: {0}")]
    InvalidDisplay(String),

    /// Display reference is already open on another handle
    #[error("display {0} is already open")]
    Locked(String),

    /// Feature code has no entry in the metadata table
    #[error("unknown feature code 0x{0:02x}")]
    UnknownFeature(u8),

    /// Operation does not apply to the feature's kind
    #[error("invalid operation for feature 0x{feature_code:02x}: {reason}")]
    InvalidOperation { feature_code: u8, reason: String },

    /// Lookup succeeded structurally but found no entry
    #[error("not found: {0}")]
    NotFound(String),

    /// Value was written but the read-back did not confirm it
    #[error("verification failed for feature 0x{feature_code:02x}")]
    Verify {
        feature_code: u8,
        #[source]
        source: Option<Box<DdcError>>,
    },

    /// Display reported the feature as unsupported
    #[error("display reports feature 0x{0:02x} as unsupported")]
    ReportedUnsupported(u8),

    /// Malformed or unexpected response
    #[error("DDC/CI protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Failure of the bus channel
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Retry budget consumed without success
    #[error("{retry_type} retries exhausted after {tries} tries")]
    RetriesExhausted {
        retry_type: RetryType,
        tries: u8,
        #[source]
        source: Box<DdcError>,
    },

    /// Capabilities string could not be fully parsed
    #[error("capabilities string has {count} error(s), first: {first}")]
    CapabilitiesParse { count: usize, first: String },

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal state could not be accessed
    #[error("internal error: {0}")]
    Internal(String),
}

impl DdcError {
    /// Whether the retry engine should try the exchange again
    pub fn is_transient(&self) -> bool {
        match self {
            DdcError::Protocol(e) => e.is_transient(),
            DdcError::Transport(e) => e.is_transient(),
            _ => false,
        }
    }

    /// Symbolic status of this error
    pub fn status(&self) -> Status {
        match self {
            DdcError::InvalidArgument(_) | DdcError::HandleClosed(_) => Status::Arg,
            DdcError::InvalidDisplay(_) => Status::InvalidDisplay,
            DdcError::Locked(_) => Status::Locked,
            DdcError::UnknownFeature(_) => Status::UnknownFeature,
            DdcError::InvalidOperation { .. } => Status::InvalidOperation,
            DdcError::NotFound(_) => Status::NotFound,
            DdcError::Verify { .. } => Status::Verify,
            DdcError::ReportedUnsupported(_) => Status::ReportedUnsupported,
            DdcError::Protocol(_) => Status::DdcData,
            DdcError::Transport(_) => Status::Io,
            DdcError::RetriesExhausted { .. } => Status::RetriesExhausted,
            DdcError::CapabilitiesParse { .. } => Status::BadData,
            DdcError::Config(_) => Status::Config,
            DdcError::Internal(_) => Status::Internal,
        }
    }
}

/// Result type alias for DdcError
pub type Result<T> = std::result::Result<T, DdcError>;

/// Symbolic status codes reported to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Ok,
    Arg,
    InvalidDisplay,
    UnknownFeature,
    InvalidOperation,
    Verify,
    RetriesExhausted,
    Locked,
    NotFound,
    ReportedUnsupported,
    DdcData,
    Io,
    BadData,
    Config,
    Internal,
}

impl Status {
    /// Status of an operation result
    pub fn of<T>(result: &Result<T>) -> Status {
        match result {
            Ok(_) => Status::Ok,
            Err(e) => e.status(),
        }
    }

    /// Symbolic name, e.g. "DDCRC_VERIFY"
    pub fn name(self) -> &'static str {
        match self {
            Status::Ok => "DDCRC_OK",
            Status::Arg => "DDCRC_ARG",
            Status::InvalidDisplay => "DDCRC_INVALID_DISPLAY",
            Status::UnknownFeature => "DDCRC_UNKNOWN_FEATURE",
            Status::InvalidOperation => "DDCRC_INVALID_OPERATION",
            Status::Verify => "DDCRC_VERIFY",
            Status::RetriesExhausted => "DDCRC_RETRIES",
            Status::Locked => "DDCRC_LOCKED",
            Status::NotFound => "DDCRC_NOT_FOUND",
            Status::ReportedUnsupported => "DDCRC_REPORTED_UNSUPPORTED",
            Status::DdcData => "DDCRC_DDC_DATA",
            Status::Io => "DDCRC_IO",
            Status::BadData => "DDCRC_BAD_DATA",
            Status::Config => "DDCRC_CONFIG_ERROR",
            Status::Internal => "DDCRC_INTERNAL_ERROR",
        }
    }

    /// Human readable description
    pub fn description(self) -> &'static str {
        match self {
            Status::Ok => "success",
            Status::Arg => "invalid argument",
            Status::InvalidDisplay => "display not found",
            Status::UnknownFeature => "unrecognized VCP feature code",
            Status::InvalidOperation => "operation not valid for this feature",
            Status::Verify => "value written, read-back did not confirm it",
            Status::RetriesExhausted => "maximum retries exceeded",
            Status::Locked => "display already open",
            Status::NotFound => "entry not found",
            Status::ReportedUnsupported => "display reports feature as unsupported",
            Status::DdcData => "invalid DDC/CI response",
            Status::Io => "I/O error on display channel",
            Status::BadData => "invalid data",
            Status::Config => "invalid configuration",
            Status::Internal => "internal error",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_classification() {
        let eio = TransportError::Io(std::io::Error::from_raw_os_error(libc::EIO));
        assert!(eio.is_transient());

        let enoent = TransportError::Io(std::io::Error::from_raw_os_error(libc::ENOENT));
        assert!(!enoent.is_transient());

        let eacces = TransportError::Io(std::io::Error::from_raw_os_error(libc::EACCES));
        assert!(!eacces.is_transient());
    }

    #[test]
    fn test_protocol_error_classification() {
        assert!(ProtocolError::Checksum { calculated: 1, received: 2 }.is_transient());
        assert!(ProtocolError::NullResponse.is_transient());
        assert!(!ProtocolError::UnexpectedOpcode { expected: 2, actual: 7 }.is_transient());
        assert!(!ProtocolError::FeatureMismatch { expected: 0x10, actual: 0x12 }.is_transient());
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(DdcError::UnknownFeature(0xe0).status(), Status::UnknownFeature);
        assert_eq!(DdcError::HandleClosed("bus 4".into()).status(), Status::Arg);
        let verify = DdcError::Verify { feature_code: 0x10, source: None };
        assert_eq!(verify.status(), Status::Verify);
        assert_eq!(verify.status().name(), "DDCRC_VERIFY");
        assert_eq!(Status::of::<()>(&Ok(())), Status::Ok);
        assert!(!DdcError::ReportedUnsupported(0x10).is_transient());
    }
}
