// SPDX-License-Identifier: GPL-3.0-only
//! In-memory DDC/CI monitor
//!
//! Answers DDC/CI requests from a feature map, the way a real monitor would,
//! with optional fault injection. Used to exercise the engine without
//! hardware.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use super::{ChannelOpener, Timing, Transport};
use crate::ddc::packet::{self, opcode};
use crate::error::TransportError;

const FRAGMENT_SIZE: usize = 32;

/// Fault applied to the next exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// The write is not acknowledged
    Nak,
    /// The reply is the DDC Null Message
    NullReply,
    /// The reply has a corrupted checksum
    BadChecksum,
    /// The reply is bus noise
    Garbage,
    /// The reply carries an unexpected opcode
    WrongOpcode,
}

impl Fault {
    fn affects_send(self) -> bool {
        self == Fault::Nak
    }
}

#[derive(Debug, Clone)]
enum SimValue {
    NonTable { mh: u8, ml: u8, sh: u8, sl: u8 },
    Table(Vec<u8>),
}

/// Counters of what the monitor has seen
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Activity {
    pub sends: usize,
    pub receives: usize,
    pub get_requests: usize,
    pub set_requests: usize,
    pub table_reads: usize,
    pub table_writes: usize,
    pub capabilities_requests: usize,
    pub saves: usize,
}

#[derive(Debug, Default)]
struct MonitorState {
    features: BTreeMap<u8, SimValue>,
    capabilities: String,
    readback: HashMap<u8, u16>,
    table_readback: HashMap<u8, Vec<u8>>,
    faults: VecDeque<Fault>,
    pending: Option<Vec<u8>>,
    table_write: Vec<u8>,
    unresponsive: bool,
    activity: Activity,
}

impl MonitorState {
    fn handle_request(&mut self, payload: &[u8]) {
        let Some((&op, args)) = payload.split_first() else {
            return;
        };
        let reply = match op {
            opcode::GET_VCP_REQUEST if args.len() == 1 => {
                self.activity.get_requests += 1;
                let code = args[0];
                match self.features.get(&code) {
                    Some(SimValue::NonTable { mh, ml, sh, sl }) => {
                        Some(vec![opcode::GET_VCP_REPLY, 0x00, code, 0x00, *mh, *ml, *sh, *sl])
                    }
                    _ => Some(vec![opcode::GET_VCP_REPLY, 0x01, code, 0, 0, 0, 0, 0]),
                }
            }
            opcode::SET_VCP_REQUEST if args.len() == 3 => {
                self.activity.set_requests += 1;
                let code = args[0];
                let written = u16::from_be_bytes([args[1], args[2]]);
                let stored = self.readback.get(&code).copied().unwrap_or(written);
                if let Some(SimValue::NonTable { sh, sl, .. }) = self.features.get_mut(&code) {
                    [*sh, *sl] = stored.to_be_bytes();
                }
                None
            }
            opcode::CAPABILITIES_REQUEST if args.len() == 2 => {
                self.activity.capabilities_requests += 1;
                let offset = u16::from_be_bytes([args[0], args[1]]);
                let chunk = fragment(self.capabilities.as_bytes(), offset);
                let mut reply = vec![opcode::CAPABILITIES_REPLY, args[0], args[1]];
                reply.extend_from_slice(chunk);
                Some(reply)
            }
            opcode::TABLE_READ_REQUEST if args.len() == 3 => {
                self.activity.table_reads += 1;
                let code = args[0];
                let offset = u16::from_be_bytes([args[1], args[2]]);
                match self.features.get(&code) {
                    Some(SimValue::Table(bytes)) => {
                        let mut reply = vec![opcode::TABLE_READ_REPLY, args[1], args[2]];
                        reply.extend_from_slice(fragment(bytes, offset));
                        Some(reply)
                    }
                    _ => None,
                }
            }
            opcode::TABLE_WRITE_REQUEST if args.len() >= 3 => {
                self.activity.table_writes += 1;
                let code = args[0];
                let offset = u16::from_be_bytes([args[1], args[2]]) as usize;
                let data = &args[3..];
                if offset == 0 {
                    self.table_write.clear();
                }
                if data.is_empty() {
                    let written = std::mem::take(&mut self.table_write);
                    let stored = self.table_readback.get(&code).cloned().unwrap_or(written);
                    if let Some(SimValue::Table(bytes)) = self.features.get_mut(&code) {
                        *bytes = stored;
                    }
                } else if offset == self.table_write.len() {
                    self.table_write.extend_from_slice(data);
                }
                None
            }
            opcode::SAVE_SETTINGS => {
                self.activity.saves += 1;
                None
            }
            _ => None,
        };
        self.pending = reply.and_then(|payload| packet::encode_reply(&payload).ok());
    }
}

fn fragment(bytes: &[u8], offset: u16) -> &[u8] {
    let start = (offset as usize).min(bytes.len());
    let end = (start + FRAGMENT_SIZE).min(bytes.len());
    &bytes[start..end]
}

/// Simulated monitor; clones share state
#[derive(Debug, Clone, Default)]
pub struct SimulatedMonitor {
    state: Arc<Mutex<MonitorState>>,
}

impl SimulatedMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MonitorState> {
        // A panicking test thread must not hide the monitor from the others
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Add a continuous feature with its current and maximum value
    pub fn with_continuous(self, code: u8, current: u16, max: u16) -> Self {
        let [mh, ml] = max.to_be_bytes();
        let [sh, sl] = current.to_be_bytes();
        self.lock().features.insert(code, SimValue::NonTable { mh, ml, sh, sl });
        self
    }

    /// Add a non-continuous feature with raw bytes
    pub fn with_non_table(self, code: u8, mh: u8, ml: u8, sh: u8, sl: u8) -> Self {
        self.lock().features.insert(code, SimValue::NonTable { mh, ml, sh, sl });
        self
    }

    pub fn with_table(self, code: u8, bytes: Vec<u8>) -> Self {
        self.lock().features.insert(code, SimValue::Table(bytes));
        self
    }

    /// Report an MCCS version through feature 0xDF
    pub fn with_vcp_version(self, major: u8, minor: u8) -> Self {
        self.with_non_table(0xdf, 0, 0, major, minor)
    }

    pub fn with_capabilities(self, caps: &str) -> Self {
        self.lock().capabilities = caps.to_string();
        self
    }

    /// Never acknowledge anything, like a monitor with DDC/CI switched off
    pub fn unresponsive(self) -> Self {
        self.lock().unresponsive = true;
        self
    }

    /// Stop or resume acknowledging requests
    pub fn set_unresponsive(&self, unresponsive: bool) {
        self.lock().unresponsive = unresponsive;
    }

    /// Store `value` instead of whatever is written to `code`
    pub fn set_readback(&self, code: u8, value: u16) {
        self.lock().readback.insert(code, value);
    }

    /// Store `bytes` instead of whatever table is written to `code`
    pub fn set_table_readback(&self, code: u8, bytes: Vec<u8>) {
        self.lock().table_readback.insert(code, bytes);
    }

    /// Queue faults for the next exchanges
    pub fn inject_faults(&self, faults: impl IntoIterator<Item = Fault>) {
        self.lock().faults.extend(faults);
    }

    pub fn activity(&self) -> Activity {
        self.lock().activity.clone()
    }

    /// Current value of a non-table feature as (sh << 8) | sl
    pub fn value(&self, code: u8) -> Option<u16> {
        match self.lock().features.get(&code) {
            Some(SimValue::NonTable { sh, sl, .. }) => Some(u16::from_be_bytes([*sh, *sl])),
            _ => None,
        }
    }

    pub fn table(&self, code: u8) -> Option<Vec<u8>> {
        match self.lock().features.get(&code) {
            Some(SimValue::Table(bytes)) => Some(bytes.clone()),
            _ => None,
        }
    }

    /// Channel talking to this monitor
    pub fn channel(&self) -> SimulatedChannel {
        SimulatedChannel { monitor: self.clone() }
    }
}

impl ChannelOpener for SimulatedMonitor {
    fn open(&self) -> Result<Box<dyn Transport>, TransportError> {
        Ok(Box::new(self.channel()))
    }
}

/// Open channel to a [`SimulatedMonitor`]
#[derive(Debug)]
pub struct SimulatedChannel {
    monitor: SimulatedMonitor,
}

impl Transport for SimulatedChannel {
    fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let mut state = self.monitor.lock();
        state.activity.sends += 1;
        if state.unresponsive {
            return Err(TransportError::Nak);
        }
        if state.faults.front().is_some_and(|f| f.affects_send()) {
            state.faults.pop_front();
            return Err(TransportError::Nak);
        }
        let payload = packet::decode_request(bytes).map_err(|_| TransportError::Nak)?;
        state.handle_request(&payload);
        Ok(())
    }

    fn receive(&mut self, max_len: usize) -> Result<Vec<u8>, TransportError> {
        let mut state = self.monitor.lock();
        state.activity.receives += 1;
        let reply = state.pending.take();
        let fault = match state.faults.front() {
            Some(f) if !f.affects_send() => state.faults.pop_front(),
            _ => None,
        };

        let mut bytes = match (fault, reply) {
            (Some(Fault::NullReply), _) => packet::encode_reply(&[]).unwrap_or_default(),
            (Some(Fault::Garbage), _) | (_, None) => vec![0xff; max_len],
            (Some(Fault::BadChecksum), Some(mut r)) => {
                if let Some(last) = r.last_mut() {
                    *last ^= 0x5a;
                }
                r
            }
            (Some(Fault::WrongOpcode), Some(_)) => {
                packet::encode_reply(&[0x55, 0x00]).unwrap_or_default()
            }
            (_, Some(r)) => r,
        };
        bytes.resize(max_len, 0xff);
        Ok(bytes)
    }

    fn timing(&self) -> Timing {
        Timing::NONE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exchange(ch: &mut SimulatedChannel, payload: &[u8], len: usize) -> Vec<u8> {
        ch.send(&packet::encode_request(payload).unwrap()).unwrap();
        packet::decode_reply(&ch.receive(len).unwrap()).unwrap()
    }

    #[test]
    fn test_get_and_set() {
        let monitor = SimulatedMonitor::new().with_continuous(0x10, 50, 100);
        let mut ch = monitor.channel();

        let reply = exchange(&mut ch, &[0x01, 0x10], 11);
        assert_eq!(reply, vec![0x02, 0x00, 0x10, 0x00, 0x00, 0x64, 0x00, 0x32]);

        ch.send(&packet::encode_request(&[0x03, 0x10, 0x00, 0x46]).unwrap()).unwrap();
        assert_eq!(monitor.value(0x10), Some(70));

        let reply = exchange(&mut ch, &[0x01, 0x42], 11);
        assert_eq!(reply[1], 0x01, "unsupported result code");
    }

    #[test]
    fn test_faults_are_consumed_in_order() {
        let monitor = SimulatedMonitor::new().with_continuous(0x10, 50, 100);
        monitor.inject_faults([Fault::Nak, Fault::NullReply]);
        let mut ch = monitor.channel();

        let request = packet::encode_request(&[0x01, 0x10]).unwrap();
        assert!(ch.send(&request).is_err());
        ch.send(&request).unwrap();
        let null = ch.receive(11).unwrap();
        assert!(packet::decode_reply(&null).is_err());

        assert_eq!(exchange(&mut ch, &[0x01, 0x10], 11)[7], 0x32);
        assert_eq!(monitor.activity().sends, 3);
    }

    #[test]
    fn test_capabilities_fragments() {
        let caps = "(prot(monitor)type(lcd)vcp(10 12)mccs_ver(2.1))";
        let monitor = SimulatedMonitor::new().with_capabilities(caps);
        let mut ch = monitor.channel();

        let first = exchange(&mut ch, &[0xf3, 0x00, 0x00], 38);
        assert_eq!(&first[..3], &[0xe3, 0x00, 0x00]);
        assert_eq!(first.len(), 3 + 32);

        let tail = exchange(&mut ch, &[0xf3, 0x00, 0x20], 38);
        assert_eq!(tail.len(), 3 + caps.len() - 32);

        let end = exchange(&mut ch, &[0xf3, 0x00, caps.len() as u8], 38);
        assert_eq!(end.len(), 3);
    }
}
