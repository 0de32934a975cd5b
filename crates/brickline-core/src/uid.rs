//! Base58 device UID handling
//!
//! Devices identify themselves with a short base58 string (the UID printed
//! on the module). On the wire the UID travels as a 32-bit integer.

use thiserror::Error;

/// Base58 alphabet used by the brick protocol (no `0`, `O`, `I` or `l`).
const ALPHABET: &[u8; 58] = b"123456789abcdefghijkmnopqrstuvwxyzABCDEFGHJKLMNPQRSTUVWXYZ";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum UidError {
    #[error("Invalid base58 character {0:?} in UID")]
    InvalidCharacter(char),
    #[error("UID {0:?} does not fit in 32 bits")]
    Overflow(String),
    #[error("UID must not be empty")]
    Empty,
}

/// Numeric device UID as it appears in packet headers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Uid(u32);

impl Uid {
    /// Wrap a raw 32-bit UID
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    /// Decode a base58 UID string (e.g. "XYZ") into its numeric form
    pub fn from_base58(s: &str) -> Result<Self, UidError> {
        if s.is_empty() {
            return Err(UidError::Empty);
        }

        let mut value: u64 = 0;
        for c in s.chars() {
            let digit = ALPHABET
                .iter()
                .position(|&a| a as char == c)
                .ok_or(UidError::InvalidCharacter(c))? as u64;
            value = value
                .checked_mul(58)
                .and_then(|v| v.checked_add(digit))
                .ok_or_else(|| UidError::Overflow(s.to_string()))?;
        }

        if value > u32::MAX as u64 {
            return Err(UidError::Overflow(s.to_string()));
        }

        Ok(Self(value as u32))
    }

    /// Encode the numeric UID back into its base58 form
    pub fn to_base58(self) -> String {
        let mut value = self.0;
        let mut digits = Vec::new();

        loop {
            digits.push(ALPHABET[(value % 58) as usize] as char);
            value /= 58;
            if value == 0 {
                break;
            }
        }

        digits.iter().rev().collect()
    }

    /// Raw 32-bit value as sent in packet headers
    pub fn value(self) -> u32 {
        self.0
    }
}

impl From<u32> for Uid {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl std::str::FromStr for Uid {
    type Err = UidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_base58(s)
    }
}

impl std::fmt::Display for Uid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_base58())
    }
}
