//! Packet framing for the brick protocol
//!
//! Every request and response is a single framed packet: an 8-byte header
//! followed by a payload laid out according to the function's wire format
//! descriptor. Responses carry an error code in the upper two bits of the
//! flags byte.

use thiserror::Error;

use crate::uid::Uid;

/// Size of the fixed packet header
pub const HEADER_LEN: usize = 8;

/// Largest whole packet (the length field is a single byte)
pub const MAX_PACKET_LEN: usize = 255;

/// Largest payload that fits into one packet
pub const MAX_PAYLOAD_LEN: usize = MAX_PACKET_LEN - HEADER_LEN;

/// Response error codes (upper two bits of the flags byte)
pub const ERROR_CODE_OK: u8 = 0;
pub const ERROR_CODE_INVALID_PARAMETER: u8 = 1;
pub const ERROR_CODE_FUNCTION_NOT_SUPPORTED: u8 = 2;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PacketError {
    #[error("Packet truncated: expected {expected} bytes, got {got}")]
    Truncated { expected: usize, got: usize },
    #[error("Payload of {0} bytes does not fit into one packet")]
    PayloadTooLarge(usize),
    #[error("Header length field {length} does not match packet size {actual}")]
    LengthMismatch { length: u8, actual: usize },
}

/// The fixed 8-byte packet header
///
/// Layout: uid (u32 LE), length (header + payload), function id,
/// sequence/options byte (bits 4-7 sequence number, bit 3 response
/// expected), flags byte (bits 6-7 error code on responses).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    pub uid: Uid,
    pub length: u8,
    pub function_id: u8,
    /// Sequence number 1..=15; 0 marks an unsolicited callback packet
    pub sequence_number: u8,
    pub response_expected: bool,
    pub flags: u8,
}

impl PacketHeader {
    /// Build a request header for a payload of the given size
    pub fn request(
        uid: Uid,
        function_id: u8,
        sequence_number: u8,
        response_expected: bool,
        payload_len: usize,
    ) -> Result<Self, PacketError> {
        if payload_len > MAX_PAYLOAD_LEN {
            return Err(PacketError::PayloadTooLarge(payload_len));
        }

        Ok(Self {
            uid,
            length: (HEADER_LEN + payload_len) as u8,
            function_id,
            sequence_number,
            response_expected,
            flags: 0,
        })
    }

    /// Build a response header carrying the given error code
    pub fn response(
        uid: Uid,
        function_id: u8,
        sequence_number: u8,
        payload_len: usize,
        error_code: u8,
    ) -> Result<Self, PacketError> {
        if payload_len > MAX_PAYLOAD_LEN {
            return Err(PacketError::PayloadTooLarge(payload_len));
        }

        Ok(Self {
            uid,
            length: (HEADER_LEN + payload_len) as u8,
            function_id,
            sequence_number,
            response_expected: true,
            flags: (error_code & 0x03) << 6,
        })
    }

    /// Error code reported by the device (0 means success)
    pub fn error_code(&self) -> u8 {
        self.flags >> 6
    }

    /// Encode the header into its 8-byte wire form
    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut header = [0u8; HEADER_LEN];
        header[0..4].copy_from_slice(&self.uid.value().to_le_bytes());
        header[4] = self.length;
        header[5] = self.function_id;
        header[6] = (self.sequence_number << 4) | ((self.response_expected as u8) << 3);
        header[7] = self.flags;
        header
    }

    /// Decode a header from the first 8 bytes of a packet
    pub fn decode(data: &[u8]) -> Result<Self, PacketError> {
        if data.len() < HEADER_LEN {
            return Err(PacketError::Truncated {
                expected: HEADER_LEN,
                got: data.len(),
            });
        }

        let uid = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);

        Ok(Self {
            uid: Uid::new(uid),
            length: data[4],
            function_id: data[5],
            sequence_number: data[6] >> 4,
            response_expected: data[6] & (1 << 3) != 0,
            flags: data[7],
        })
    }
}

/// A framed packet: header plus payload bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub header: PacketHeader,
    pub payload: Vec<u8>,
}

impl Packet {
    /// Frame the packet into its full wire form
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_LEN + self.payload.len());
        bytes.extend_from_slice(&self.header.encode());
        bytes.extend_from_slice(&self.payload);
        bytes
    }

    /// Parse a whole packet, validating the header length field
    pub fn from_bytes(data: &[u8]) -> Result<Self, PacketError> {
        let header = PacketHeader::decode(data)?;

        if data.len() < header.length as usize {
            return Err(PacketError::Truncated {
                expected: header.length as usize,
                got: data.len(),
            });
        }
        if (header.length as usize) < HEADER_LEN {
            return Err(PacketError::LengthMismatch {
                length: header.length,
                actual: data.len(),
            });
        }

        Ok(Self {
            header,
            payload: data[HEADER_LEN..header.length as usize].to_vec(),
        })
    }

    /// Error code reported by the device (0 means success)
    pub fn error_code(&self) -> u8 {
        self.header.error_code()
    }
}

/// Wrapping request sequence number generator
///
/// Sequence numbers cycle through 1..=15; 0 is reserved for callback
/// packets pushed by the device.
#[derive(Debug)]
pub struct SequenceNumber(u8);

impl SequenceNumber {
    pub fn new() -> Self {
        Self(0)
    }

    /// Get the next sequence number
    pub fn next(&mut self) -> u8 {
        self.0 = if self.0 >= 15 { 1 } else { self.0 + 1 };
        self.0
    }
}

impl Default for SequenceNumber {
    fn default() -> Self {
        Self::new()
    }
}
