// SPDX-License-Identifier: GPL-3.0-only
//! DDC/CI packet framing
//!
//! Host to display:
//! ```text
//! ┌────────┬─────────────┬──────────────┬──────────┐
//! │ SOURCE │ 0x80 | LEN  │ PAYLOAD      │ CHECKSUM │
//! │ 0x51   │ 1B          │ 0–32B        │ 1B       │
//! └────────┴─────────────┴──────────────┴──────────┘
//! ```
//! The checksum is the XOR of the destination address 0x6E and every byte
//! written. Replies start with 0x6E and are checksummed against the virtual
//! host address 0x50. A reply with length 0 is the DDC Null Message.

use crate::error::ProtocolError;

/// I2C slave address of the DDC/CI endpoint
pub const DDC_SLAVE_ADDR: u16 = 0x37;
/// I2C slave address of the EDID EEPROM
pub const EDID_SLAVE_ADDR: u16 = 0x50;

const DISPLAY_ADDR: u8 = 0x6e;
const HOST_SOURCE_ADDR: u8 = 0x51;
const HOST_VIRTUAL_ADDR: u8 = 0x50;
const LENGTH_FLAG: u8 = 0x80;

/// Largest payload a single packet may carry
pub const MAX_PAYLOAD: usize = 32;

/// Bytes surrounding the payload in a reply (source, length, checksum)
pub const REPLY_OVERHEAD: usize = 3;

pub mod opcode {
    pub const GET_VCP_REQUEST: u8 = 0x01;
    pub const GET_VCP_REPLY: u8 = 0x02;
    pub const SET_VCP_REQUEST: u8 = 0x03;
    pub const SAVE_SETTINGS: u8 = 0x0c;
    pub const TABLE_READ_REQUEST: u8 = 0xe2;
    pub const CAPABILITIES_REPLY: u8 = 0xe3;
    pub const TABLE_READ_REPLY: u8 = 0xe4;
    pub const TABLE_WRITE_REQUEST: u8 = 0xe7;
    pub const CAPABILITIES_REQUEST: u8 = 0xf3;
}

fn xor(seed: u8, bytes: &[u8]) -> u8 {
    bytes.iter().fold(seed, |acc, b| acc ^ b)
}

/// Frame a request payload for writing to the DDC/CI slave address
pub fn encode_request(payload: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    if payload.len() > MAX_PAYLOAD {
        return Err(ProtocolError::RequestTooLarge(payload.len()));
    }
    let mut packet = Vec::with_capacity(payload.len() + REPLY_OVERHEAD);
    packet.push(HOST_SOURCE_ADDR);
    packet.push(LENGTH_FLAG | payload.len() as u8);
    packet.extend_from_slice(payload);
    packet.push(xor(DISPLAY_ADDR, &packet));
    Ok(packet)
}

/// Frame a reply payload as a display would send it
pub fn encode_reply(payload: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    if payload.len() > MAX_PAYLOAD + 3 {
        return Err(ProtocolError::RequestTooLarge(payload.len()));
    }
    let mut packet = Vec::with_capacity(payload.len() + REPLY_OVERHEAD);
    packet.push(DISPLAY_ADDR);
    packet.push(LENGTH_FLAG | payload.len() as u8);
    packet.extend_from_slice(payload);
    packet.push(xor(HOST_VIRTUAL_ADDR, &packet));
    Ok(packet)
}

/// Validate a reply read from the display and return its payload
pub fn decode_reply(bytes: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    if bytes.len() < REPLY_OVERHEAD || bytes[0] != DISPLAY_ADDR || bytes[1] & LENGTH_FLAG == 0 {
        return Err(ProtocolError::Envelope);
    }
    let len = (bytes[1] & !LENGTH_FLAG) as usize;
    let available = bytes.len() - REPLY_OVERHEAD;
    if len > available {
        return Err(ProtocolError::PacketSize { declared: len, available });
    }
    let frame = &bytes[..2 + len];
    let received = bytes[2 + len];
    let calculated = xor(HOST_VIRTUAL_ADDR, frame);
    if calculated != received {
        return Err(ProtocolError::Checksum { calculated, received });
    }
    if len == 0 {
        return Err(ProtocolError::NullResponse);
    }
    Ok(frame[2..].to_vec())
}

/// Validate a request as a display would receive it
pub fn decode_request(bytes: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    if bytes.len() < REPLY_OVERHEAD || bytes[0] != HOST_SOURCE_ADDR || bytes[1] & LENGTH_FLAG == 0 {
        return Err(ProtocolError::Envelope);
    }
    let len = (bytes[1] & !LENGTH_FLAG) as usize;
    if len + REPLY_OVERHEAD != bytes.len() {
        return Err(ProtocolError::PacketSize {
            declared: len,
            available: bytes.len().saturating_sub(REPLY_OVERHEAD),
        });
    }
    let calculated = xor(DISPLAY_ADDR, &bytes[..2 + len]);
    let received = bytes[2 + len];
    if calculated != received {
        return Err(ProtocolError::Checksum { calculated, received });
    }
    Ok(bytes[2..2 + len].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_vcp_request_bytes() {
        // Well known brightness query: 51 82 01 10 ac
        let packet = encode_request(&[opcode::GET_VCP_REQUEST, 0x10]).unwrap();
        assert_eq!(packet, vec![0x51, 0x82, 0x01, 0x10, 0xac]);
        assert_eq!(decode_request(&packet).unwrap(), vec![0x01, 0x10]);
    }

    #[test]
    fn test_null_message() {
        assert_eq!(encode_reply(&[]).unwrap(), vec![0x6e, 0x80, 0xbe]);
        assert_eq!(decode_reply(&[0x6e, 0x80, 0xbe]), Err(ProtocolError::NullResponse));
    }

    #[test]
    fn test_reply_with_trailing_padding() {
        let payload = [0x02, 0x00, 0x10, 0x00, 0x00, 0x64, 0x00, 0x32];
        let mut bytes = encode_reply(&payload).unwrap();
        bytes.extend_from_slice(&[0xff, 0xff]);
        assert_eq!(decode_reply(&bytes).unwrap(), payload.to_vec());
    }

    #[test]
    fn test_corrupted_reply() {
        let mut bytes = encode_reply(&[0x02, 0x00, 0x10, 0x00, 0x00, 0x64, 0x00, 0x32]).unwrap();
        bytes[5] ^= 0x01;
        assert!(matches!(decode_reply(&bytes), Err(ProtocolError::Checksum { .. })));

        assert_eq!(decode_reply(&[0xff; 11]), Err(ProtocolError::Envelope));
        assert!(matches!(
            decode_reply(&[0x6e, 0x88, 0x02, 0x00]),
            Err(ProtocolError::PacketSize { declared: 8, .. })
        ));
    }

    #[test]
    fn test_oversized_request() {
        assert_eq!(encode_request(&[0; 33]), Err(ProtocolError::RequestTooLarge(33)));
    }
}
