//! Register word decoding.

use serde::{Deserialize, Serialize};

/// Two consecutive 16-bit holding registers as returned by one read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRegisterPair {
    /// Word at the requested address (high-order 16 bits).
    pub high: u16,
    /// Word at the requested address + 1 (low-order 16 bits).
    pub low: u16,
}

impl RawRegisterPair {
    pub fn new(high: u16, low: u16) -> Self {
        Self { high, low }
    }

    /// Take the first two words of a read response.
    ///
    /// Returns `None` when the response carries fewer than two words.
    pub fn from_words(words: &[u16]) -> Option<Self> {
        match words {
            [high, low, ..] => Some(Self::new(*high, *low)),
            _ => None,
        }
    }

    /// The combined 32-bit pattern, high word first.
    pub fn bits(self) -> u32 {
        ((self.high as u32) << 16) | (self.low as u32)
    }
}

/// Decode a big-endian register pair as an IEEE-754 single-precision float.
///
/// Every bit pattern is a valid `f32`; NaN and infinities pass through as-is.
pub fn decode(pair: RawRegisterPair) -> f32 {
    f32::from_bits(pair.bits())
}
