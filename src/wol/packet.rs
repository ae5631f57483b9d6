//! Hardware address parsing and magic packet construction

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use super::{WakeError, WakeResult};

/// Length of a `XX:XX:XX:XX:XX:XX` address string
pub const ADDRESS_STR_LEN: usize = 6 * 2 + 5;

/// Number of times the address is repeated in the payload
const REPETITIONS: usize = 16;

/// Total payload length: sync stream plus 16 copies of the address
pub const MAGIC_PACKET_LEN: usize = 6 + REPETITIONS * 6;

/// Errors hex-decoding an address of the right length
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("invalid hex character '{character}' at position {index}")]
    InvalidCharacter { character: char, index: usize },

    #[error("odd number of hex digits ({0})")]
    OddLength(usize),

    #[error("address decodes to {0} bytes, expected 6")]
    WrongLength(usize),
}

/// A 6-byte hardware (MAC) address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HardwareAddress([u8; 6]);

impl HardwareAddress {
    #[cfg(test)]
    pub fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    /// Parse a colon separated address.
    ///
    /// Only the overall length and the hex digits are checked; colons are
    /// stripped wherever they appear.
    pub fn parse(input: &str) -> WakeResult<Self> {
        if input.len() != ADDRESS_STR_LEN {
            return Err(WakeError::InvalidAddress(input.to_string()));
        }

        let mut nibbles = Vec::with_capacity(12);
        for (index, character) in input.char_indices().filter(|(_, c)| *c != ':') {
            let nibble = character
                .to_digit(16)
                .ok_or(DecodeError::InvalidCharacter { character, index })?;
            nibbles.push(nibble as u8);
        }

        if nibbles.len() % 2 != 0 {
            return Err(DecodeError::OddLength(nibbles.len()).into());
        }

        let bytes: Vec<u8> = nibbles.chunks(2).map(|pair| pair[0] << 4 | pair[1]).collect();
        let bytes: [u8; 6] = bytes
            .try_into()
            .map_err(|b: Vec<u8>| DecodeError::WrongLength(b.len()))?;

        Ok(Self(bytes))
    }

    pub fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl FromStr for HardwareAddress {
    type Err = WakeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for HardwareAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}", a, b, c, d, e, g)
    }
}

/// The Wake-on-LAN payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MagicPacket([u8; MAGIC_PACKET_LEN]);

impl MagicPacket {
    pub fn new(address: &HardwareAddress) -> Self {
        let mut packet = [0xFFu8; MAGIC_PACKET_LEN];

        // the first 6 bytes stay 0xFF
        for copy in packet[6..].chunks_exact_mut(6) {
            copy.copy_from_slice(&address.octets());
        }

        Self(packet)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}
