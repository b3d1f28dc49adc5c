//! 128-bit identifiers for requests and trace contexts.

use std::fmt;
use std::str::FromStr;

use crate::error::WireError;

/// A 128-bit identifier.
///
/// Used as the correlation id binding a request to its response stream, and
/// as the optional trace id carried alongside it.
///
/// The textual form is four dash-separated hex groups of 32 bits each,
/// e.g. `3fe0eca-60150ad2-abcdef12-1`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Guid(u128);

impl Guid {
    /// Size of the wire representation in bytes.
    pub const WIRE_SIZE: usize = 16;

    pub const fn new(value: u128) -> Self {
        Guid(value)
    }

    /// Generate a random identifier.
    pub fn random() -> Self {
        Guid(rand::random())
    }

    /// Whether this is the all-zero identifier.
    pub fn is_nil(&self) -> bool {
        self.0 == 0
    }

    pub fn as_u128(&self) -> u128 {
        self.0
    }

    pub fn to_bytes(self) -> [u8; Self::WIRE_SIZE] {
        self.0.to_be_bytes()
    }

    pub fn from_bytes(bytes: [u8; Self::WIRE_SIZE]) -> Self {
        Guid(u128::from_be_bytes(bytes))
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts = [
            (self.0 >> 96) as u32,
            (self.0 >> 64) as u32,
            (self.0 >> 32) as u32,
            self.0 as u32,
        ];
        write!(f, "{:x}-{:x}-{:x}-{:x}", parts[0], parts[1], parts[2], parts[3])
    }
}

impl FromStr for Guid {
    type Err = WireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut value: u128 = 0;
        let mut parts = 0;
        for part in s.split('-') {
            let word = u32::from_str_radix(part, 16)
                .map_err(|_| WireError::Corrupt(format!("invalid guid: {s:?}")))?;
            value = (value << 32) | u128::from(word);
            parts += 1;
        }
        if parts != 4 {
            return Err(WireError::Corrupt(format!("invalid guid: {s:?}")));
        }
        Ok(Guid(value))
    }
}
