// SPDX-License-Identifier: GPL-3.0-only
//! DDC/CI exchanges
//!
//! Every operation here runs inside one retry context. Single exchanges use
//! the write-read or write-only budget; multi-part operations (capabilities,
//! table read and write) retry the whole sequence under the multi-part
//! budget, their inner exchanges are single attempts.

pub mod packet;
pub mod retry;

use std::thread;

use crate::error::{DdcError, ProtocolError, Result};
use crate::settings;
use crate::transport::Transport;
use crate::vcp::value::NonTableValue;
use packet::{opcode, MAX_PAYLOAD, REPLY_OVERHEAD};
pub use retry::{get_max_tries, max_max_tries, set_max_tries, RetryType, MAX_MAX_TRIES};

/// Payload length of a Get VCP Feature reply
const GET_VCP_REPLY_LEN: usize = 8;

/// Header of a multi-part reply: opcode and offset
const FRAGMENT_HEADER: usize = 3;

/// Data bytes per table write fragment
const TABLE_WRITE_CHUNK: usize = MAX_PAYLOAD - 4;

/// Get VCP result code for an unsupported feature
const RESULT_UNSUPPORTED: u8 = 0x01;

fn write(transport: &mut dyn Transport, payload: &[u8]) -> Result<()> {
    let bytes = packet::encode_request(payload)?;
    trace!(request = ?bytes, "DDC write");
    transport.send(&bytes)?;
    Ok(())
}

/// One request/reply round trip, no retries
fn exchange(transport: &mut dyn Transport, request: &[u8], reply_len: usize) -> Result<Vec<u8>> {
    let timing = transport.timing();
    write(transport, request)?;
    thread::sleep(settings::scaled(timing.write_read_delay));
    let bytes = transport.receive(reply_len + REPLY_OVERHEAD)?;
    trace!(reply = ?bytes, "DDC read");
    let reply = packet::decode_reply(&bytes);
    thread::sleep(settings::scaled(timing.post_command_delay));
    Ok(reply?)
}

/// One request without reply, no retries
fn write_only(transport: &mut dyn Transport, request: &[u8]) -> Result<()> {
    let timing = transport.timing();
    write(transport, request)?;
    thread::sleep(settings::scaled(timing.post_command_delay));
    Ok(())
}

fn expect_opcode(reply: &[u8], expected: u8) -> Result<()> {
    match reply.first() {
        Some(&actual) if actual == expected => Ok(()),
        Some(&actual) => Err(ProtocolError::UnexpectedOpcode { expected, actual }.into()),
        None => Err(ProtocolError::NullResponse.into()),
    }
}

fn parse_get_vcp_reply(code: u8, reply: &[u8]) -> Result<NonTableValue> {
    expect_opcode(reply, opcode::GET_VCP_REPLY)?;
    if reply.len() != GET_VCP_REPLY_LEN {
        return Err(ProtocolError::PayloadLength {
            expected: GET_VCP_REPLY_LEN,
            actual: reply.len(),
        }
        .into());
    }
    match reply[1] {
        0x00 => {}
        RESULT_UNSUPPORTED => return Err(DdcError::ReportedUnsupported(code)),
        rc => return Err(ProtocolError::ResultCode(rc).into()),
    }
    if reply[2] != code {
        return Err(ProtocolError::FeatureMismatch { expected: code, actual: reply[2] }.into());
    }
    Ok(NonTableValue::new(reply[4], reply[5], reply[6], reply[7]))
}

/// Read a non-table feature value (write-read context)
pub fn get_vcp(transport: &mut dyn Transport, code: u8) -> Result<NonTableValue> {
    retry::with_retries(RetryType::WriteRead, "get vcp", |_| {
        let reply = exchange(transport, &[opcode::GET_VCP_REQUEST, code], GET_VCP_REPLY_LEN)?;
        parse_get_vcp_reply(code, &reply)
    })
}

/// Write a non-table feature value (write-only context)
pub fn set_vcp(transport: &mut dyn Transport, code: u8, value: u16) -> Result<()> {
    let [hi, lo] = value.to_be_bytes();
    retry::with_retries(RetryType::WriteOnly, "set vcp", |_| {
        write_only(transport, &[opcode::SET_VCP_REQUEST, code, hi, lo])
    })
}

/// Ask the display to store its current settings (write-only context)
pub fn save_current_settings(transport: &mut dyn Transport) -> Result<()> {
    retry::with_retries(RetryType::WriteOnly, "save settings", |_| {
        write_only(transport, &[opcode::SAVE_SETTINGS])
    })
}

/// Collect the fragments of a multi-part read until an empty one arrives
fn multi_part_read(
    transport: &mut dyn Transport,
    reply_opcode: u8,
    request_for: impl Fn(u8, u8) -> Vec<u8>,
) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    loop {
        let offset = u16::try_from(data.len()).map_err(|_| ProtocolError::PayloadLength {
            expected: u16::MAX as usize,
            actual: data.len(),
        })?;
        let [oh, ol] = offset.to_be_bytes();
        let reply = exchange(transport, &request_for(oh, ol), MAX_PAYLOAD + FRAGMENT_HEADER)?;
        expect_opcode(&reply, reply_opcode)?;
        if reply.len() < FRAGMENT_HEADER {
            return Err(ProtocolError::PayloadLength {
                expected: FRAGMENT_HEADER,
                actual: reply.len(),
            }
            .into());
        }
        let actual = u16::from_be_bytes([reply[1], reply[2]]);
        if actual != offset {
            return Err(ProtocolError::FragmentOffset { expected: offset, actual }.into());
        }
        let fragment = &reply[FRAGMENT_HEADER..];
        if fragment.is_empty() {
            return Ok(data);
        }
        data.extend_from_slice(fragment);
    }
}

/// Read the capabilities string (multi-part context)
pub fn read_capabilities(transport: &mut dyn Transport) -> Result<String> {
    let bytes = retry::with_retries(RetryType::MultiPart, "capabilities", |_| {
        multi_part_read(transport, opcode::CAPABILITIES_REPLY, |oh, ol| {
            vec![opcode::CAPABILITIES_REQUEST, oh, ol]
        })
    })?;
    let text = String::from_utf8_lossy(&bytes);
    Ok(text.trim_end_matches('\0').trim().to_string())
}

/// Read a table feature value (multi-part context)
pub fn table_read(transport: &mut dyn Transport, code: u8) -> Result<Vec<u8>> {
    retry::with_retries(RetryType::MultiPart, "table read", |_| {
        multi_part_read(transport, opcode::TABLE_READ_REPLY, |oh, ol| {
            vec![opcode::TABLE_READ_REQUEST, code, oh, ol]
        })
    })
}

/// Write a table feature value (multi-part context)
///
/// The value goes out in fragments at increasing offsets, terminated by an
/// empty fragment.
pub fn table_write(transport: &mut dyn Transport, code: u8, bytes: &[u8]) -> Result<()> {
    if bytes.len() > u16::MAX as usize {
        return Err(DdcError::InvalidArgument(format!(
            "table value of {} bytes is too large",
            bytes.len()
        )));
    }
    retry::with_retries(RetryType::MultiPart, "table write", |_| {
        let mut offset = 0usize;
        for chunk in bytes.chunks(TABLE_WRITE_CHUNK) {
            write_fragment(transport, code, offset, chunk)?;
            offset += chunk.len();
        }
        write_fragment(transport, code, offset, &[])
    })
}

fn write_fragment(transport: &mut dyn Transport, code: u8, offset: usize, chunk: &[u8]) -> Result<()> {
    let [oh, ol] = (offset as u16).to_be_bytes();
    let mut request = Vec::with_capacity(4 + chunk.len());
    request.extend_from_slice(&[opcode::TABLE_WRITE_REQUEST, code, oh, ol]);
    request.extend_from_slice(chunk);
    write_only(transport, &request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Status;
    use crate::transport::simulated::{Fault, SimulatedMonitor};

    fn brightness_monitor() -> SimulatedMonitor {
        SimulatedMonitor::new().with_continuous(0x10, 50, 100)
    }

    #[test]
    fn test_get_vcp() {
        let monitor = brightness_monitor();
        let mut ch = monitor.channel();
        let value = get_vcp(&mut ch, 0x10).unwrap();
        assert_eq!(value.value(), 50);
        assert_eq!(value.max_value(), 100);
    }

    #[test]
    fn test_unsupported_feature_is_not_retried() {
        let monitor = brightness_monitor();
        let mut ch = monitor.channel();
        let err = get_vcp(&mut ch, 0x12).unwrap_err();
        assert_eq!(err.status(), Status::ReportedUnsupported);
        assert_eq!(monitor.activity().sends, 1);
    }

    #[test]
    fn test_transient_faults_are_retried() {
        let monitor = brightness_monitor();
        monitor.inject_faults([Fault::Nak, Fault::NullReply, Fault::BadChecksum, Fault::Garbage]);
        let mut ch = monitor.channel();
        assert_eq!(get_vcp(&mut ch, 0x10).unwrap().value(), 50);
        assert_eq!(monitor.activity().sends, 5);

        // Attempts are counted per operation, not accumulated
        monitor.inject_faults([Fault::NullReply, Fault::NullReply]);
        assert_eq!(get_vcp(&mut ch, 0x10).unwrap().value(), 50);
    }

    #[test]
    fn test_structural_error_fails_immediately() {
        let monitor = brightness_monitor();
        monitor.inject_faults([Fault::WrongOpcode]);
        let mut ch = monitor.channel();
        let err = get_vcp(&mut ch, 0x10).unwrap_err();
        assert!(matches!(
            err,
            DdcError::Protocol(ProtocolError::UnexpectedOpcode { expected: 0x02, .. })
        ));
        assert_eq!(monitor.activity().sends, 1);
    }

    #[test]
    fn test_exhaustion_reports_last_cause() {
        let monitor = brightness_monitor();
        let faults = usize::from(MAX_MAX_TRIES) + 1;
        monitor.inject_faults(std::iter::repeat_n(Fault::NullReply, faults));
        let mut ch = monitor.channel();
        let err = get_vcp(&mut ch, 0x10).unwrap_err();
        assert_eq!(err.status(), Status::RetriesExhausted);
        match err {
            DdcError::RetriesExhausted { retry_type, source, .. } => {
                assert_eq!(retry_type, RetryType::WriteRead);
                assert!(matches!(*source, DdcError::Protocol(ProtocolError::NullResponse)));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_set_vcp() {
        let monitor = brightness_monitor();
        let mut ch = monitor.channel();
        set_vcp(&mut ch, 0x10, 70).unwrap();
        assert_eq!(monitor.value(0x10), Some(70));
        assert_eq!(monitor.activity().receives, 0);
    }

    #[test]
    fn test_read_capabilities_across_fragments() {
        let caps = "(prot(monitor)type(lcd)model(P2419H)cmds(01 02 03 07 0C E3 F3)vcp(02 04 10 12 14(05 08 0B) 60(0F 11))mccs_ver(2.1))";
        let monitor = SimulatedMonitor::new().with_capabilities(caps);
        let mut ch = monitor.channel();
        assert_eq!(read_capabilities(&mut ch).unwrap(), caps);
        let fragments = caps.len().div_ceil(32) + 1;
        assert_eq!(monitor.activity().capabilities_requests, fragments);
    }

    #[test]
    fn test_multi_part_retries_whole_operation() {
        let caps = "(prot(monitor)type(lcd)vcp(10 12)mccs_ver(2.2)model(TEST))";
        let monitor = SimulatedMonitor::new().with_capabilities(caps);
        let mut ch = monitor.channel();
        // The first attempt is not acknowledged; the read restarts at offset 0
        monitor.inject_faults([Fault::Nak]);
        assert_eq!(read_capabilities(&mut ch).unwrap(), caps);
        assert_eq!(monitor.activity().capabilities_requests, caps.len().div_ceil(32) + 1);
    }

    #[test]
    fn test_table_write_then_read() {
        let monitor = SimulatedMonitor::new().with_table(0x73, vec![0; 4]);
        let mut ch = monitor.channel();
        let lut: Vec<u8> = (0..70).collect();
        table_write(&mut ch, 0x73, &lut).unwrap();
        assert_eq!(monitor.table(0x73), Some(lut.clone()));
        // 28 + 28 + 14 bytes, then the terminating fragment
        assert_eq!(monitor.activity().table_writes, 4);
        assert_eq!(table_read(&mut ch, 0x73).unwrap(), lut);
    }

    #[test]
    fn test_save_current_settings() {
        let monitor = brightness_monitor();
        let mut ch = monitor.channel();
        save_current_settings(&mut ch).unwrap();
        assert_eq!(monitor.activity().saves, 1);
    }
}
