//! Rolling 16-bit message hash
//!
//! Every byte written to or read from a message body is folded into the hash.
//! The encoder appends the final value low byte first; the decoder recomputes
//! it over the bytes it consumes and compares against the trailer.

/// Largest prime below 2^16, used as both seed and multiplier
pub const LARGEST_16BIT_PRIME: u16 = 0xFFF1;

/// Size of the hash trailer in bytes
pub const HASH_SIZE: usize = 2;

/// Fold one byte into a hash value
///
/// The multiplier is odd, so changing any single byte by a non-zero delta
/// always changes the result.
#[inline]
pub const fn hash16(byte: u8, hash: u16) -> u16 {
    hash.wrapping_add((byte as u16).wrapping_mul(LARGEST_16BIT_PRIME))
}

/// Running hash over a message body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollingHash {
    value: u16,
}

impl Default for RollingHash {
    fn default() -> Self {
        Self::new()
    }
}

impl RollingHash {
    /// Start a new hash at the seed value
    #[inline]
    pub const fn new() -> Self {
        Self {
            value: LARGEST_16BIT_PRIME,
        }
    }

    /// Fold a byte into the hash
    #[inline]
    pub fn update(&mut self, byte: u8) {
        self.value = hash16(byte, self.value);
    }

    /// Fold a run of bytes into the hash
    #[inline]
    pub fn update_slice(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.update(byte);
        }
    }

    /// Current hash value
    #[inline]
    pub const fn value(&self) -> u16 {
        self.value
    }

    /// Trailer bytes, low byte first
    #[inline]
    pub const fn to_le_bytes(&self) -> [u8; HASH_SIZE] {
        self.value.to_le_bytes()
    }

    /// Reset to the seed value
    #[inline]
    pub fn reset(&mut self) {
        self.value = LARGEST_16BIT_PRIME;
    }

    /// Check a received trailer against the running value
    #[inline]
    pub fn verify(&self, trailer: [u8; HASH_SIZE]) -> bool {
        u16::from_le_bytes(trailer) == self.value
    }
}

/// Hash a complete message body in one call
#[inline]
pub fn hash_of(body: &[u8]) -> u16 {
    let mut hash = RollingHash::new();
    hash.update_slice(body);
    hash.value()
}
