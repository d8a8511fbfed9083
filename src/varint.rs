//! Variable-length integer encoding
//!
//! Values are split into 7-bit groups, least significant group first. The
//! byte holding the final group has the 0x80 bit set; all earlier bytes have
//! it clear. A 64-bit value that still has its top bit left after nine groups
//! spends a tenth byte carrying that bit raw, without the terminator bit.
//!
//! Signed values are zigzag-mapped first so small magnitudes stay short.

use crate::error::{Error, ErrorKind, Result};

/// Maximum bytes needed for a 16-bit varint
pub const MAX_VARINT_U16_SIZE: usize = 3;

/// Maximum bytes needed for a 32-bit varint
pub const MAX_VARINT_U32_SIZE: usize = 5;

/// Maximum bytes needed for a 64-bit varint
pub const MAX_VARINT_U64_SIZE: usize = 10;

/// Marks the byte carrying the final 7-bit group
pub const TERMINATOR: u8 = 0x80;

const GROUP_MASK: u64 = 0x7F;

/// Index of the raw tenth byte of a 64-bit varint
const RAW_BYTE_INDEX: usize = 9;

#[inline]
fn pack(mut value: u64, buf: &mut [u8]) -> Result<usize> {
    let mut pos = 0;

    loop {
        if pos >= buf.len() {
            return Err(Error::new(ErrorKind::BufferOverflow));
        }

        if pos == RAW_BYTE_INDEX {
            buf[pos] = value as u8;
            return Ok(pos + 1);
        }

        let group = (value & GROUP_MASK) as u8;
        value >>= 7;

        if value == 0 {
            buf[pos] = group | TERMINATOR;
            return Ok(pos + 1);
        }

        buf[pos] = group;
        pos += 1;
    }
}

#[inline]
fn unpack(buf: &[u8], width: u32, max_bytes: usize) -> Result<(u64, usize)> {
    let mut result = 0u64;

    for pos in 0..max_bytes {
        let Some(&byte) = buf.get(pos) else {
            return Err(Error::new(ErrorKind::BufferUnderflow));
        };

        if pos == RAW_BYTE_INDEX {
            if byte > 1 {
                return Err(Error::new(ErrorKind::VarintOverflow));
            }
            return Ok((result | ((byte as u64) << 63), pos + 1));
        }

        let shift = 7 * pos as u32;
        let value = ((byte as u64) & GROUP_MASK) << shift;
        if width < 64 && value >> width != 0 {
            return Err(Error::new(ErrorKind::VarintOverflow));
        }
        result |= value;

        if byte & TERMINATOR != 0 {
            return Ok((result, pos + 1));
        }
    }

    Err(Error::new(ErrorKind::VarintOverflow))
}

/// Number of bytes `value` occupies as a varint
#[inline]
pub fn encoded_len_u16(value: u16) -> usize {
    encoded_len_u64(value as u64)
}

/// Number of bytes `value` occupies as a varint
#[inline]
pub fn encoded_len_u32(value: u32) -> usize {
    encoded_len_u64(value as u64)
}

/// Number of bytes `value` occupies as a varint
#[inline]
pub fn encoded_len_u64(value: u64) -> usize {
    if value >> 63 != 0 {
        return MAX_VARINT_U64_SIZE;
    }
    let bits = 64 - value.leading_zeros() as usize;
    bits.div_ceil(7).max(1)
}

/// Encode a u16 as varint into the given buffer
///
/// Returns the number of bytes written, or `BufferOverflow` if `buf` is too short.
#[inline]
pub fn pack_u16(value: u16, buf: &mut [u8]) -> Result<usize> {
    pack(value as u64, buf)
}

/// Encode a u32 as varint into the given buffer
#[inline]
pub fn pack_u32(value: u32, buf: &mut [u8]) -> Result<usize> {
    pack(value as u64, buf)
}

/// Encode a u64 as varint into the given buffer
#[inline]
pub fn pack_u64(value: u64, buf: &mut [u8]) -> Result<usize> {
    pack(value, buf)
}

/// Decode a u16 varint
///
/// Returns (value, bytes_consumed) or an error.
#[inline]
pub fn unpack_u16(buf: &[u8]) -> Result<(u16, usize)> {
    unpack(buf, 16, MAX_VARINT_U16_SIZE).map(|(v, n)| (v as u16, n))
}

/// Decode a u32 varint
#[inline]
pub fn unpack_u32(buf: &[u8]) -> Result<(u32, usize)> {
    unpack(buf, 32, MAX_VARINT_U32_SIZE).map(|(v, n)| (v as u32, n))
}

/// Decode a u64 varint
#[inline]
pub fn unpack_u64(buf: &[u8]) -> Result<(u64, usize)> {
    unpack(buf, 64, MAX_VARINT_U64_SIZE)
}

/// Zigzag-map a signed 16-bit value
#[inline]
pub const fn zigzag_i16(n: i16) -> u16 {
    ((n << 1) ^ (n >> 15)) as u16
}

/// Zigzag-map a signed 32-bit value
#[inline]
pub const fn zigzag_i32(n: i32) -> u32 {
    ((n << 1) ^ (n >> 31)) as u32
}

/// Zigzag-map a signed 64-bit value
#[inline]
pub const fn zigzag_i64(n: i64) -> u64 {
    ((n << 1) ^ (n >> 63)) as u64
}

/// Inverse of [`zigzag_i16`]
#[inline]
pub const fn unzigzag_u16(n: u16) -> i16 {
    ((n >> 1) as i16) ^ -((n & 1) as i16)
}

/// Inverse of [`zigzag_i32`]
#[inline]
pub const fn unzigzag_u32(n: u32) -> i32 {
    ((n >> 1) as i32) ^ -((n & 1) as i32)
}

/// Inverse of [`zigzag_i64`]
#[inline]
pub const fn unzigzag_u64(n: u64) -> i64 {
    ((n >> 1) as i64) ^ -((n & 1) as i64)
}

/// Encode an i16 as a zigzag varint
#[inline]
pub fn pack_i16(value: i16, buf: &mut [u8]) -> Result<usize> {
    pack_u16(zigzag_i16(value), buf)
}

/// Encode an i32 as a zigzag varint
#[inline]
pub fn pack_i32(value: i32, buf: &mut [u8]) -> Result<usize> {
    pack_u32(zigzag_i32(value), buf)
}

/// Encode an i64 as a zigzag varint
#[inline]
pub fn pack_i64(value: i64, buf: &mut [u8]) -> Result<usize> {
    pack_u64(zigzag_i64(value), buf)
}

/// Decode a zigzag i16 varint
#[inline]
pub fn unpack_i16(buf: &[u8]) -> Result<(i16, usize)> {
    unpack_u16(buf).map(|(v, n)| (unzigzag_u16(v), n))
}

/// Decode a zigzag i32 varint
#[inline]
pub fn unpack_i32(buf: &[u8]) -> Result<(i32, usize)> {
    unpack_u32(buf).map(|(v, n)| (unzigzag_u32(v), n))
}

/// Decode a zigzag i64 varint
#[inline]
pub fn unpack_i64(buf: &[u8]) -> Result<(i64, usize)> {
    unpack_u64(buf).map(|(v, n)| (unzigzag_u64(v), n))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u16_roundtrip() {
        for &val in &[0, 1, 127, 128, 16383, 16384, u16::MAX] {
            let mut buf = [0u8; MAX_VARINT_U16_SIZE];
            let encoded_len = pack_u16(val, &mut buf).unwrap();
            let (decoded_val, decoded_len) = unpack_u16(&buf[..encoded_len]).unwrap();

            assert_eq!(val, decoded_val);
            assert_eq!(encoded_len, decoded_len);
        }
    }

    #[test]
    fn test_u32_roundtrip() {
        for &val in &[0, 1, 127, 128, 16383, 16384, 1 << 28, u32::MAX] {
            let mut buf = [0u8; MAX_VARINT_U32_SIZE];
            let encoded_len = pack_u32(val, &mut buf).unwrap();
            let (decoded_val, decoded_len) = unpack_u32(&buf[..encoded_len]).unwrap();

            assert_eq!(val, decoded_val);
            assert_eq!(encoded_len, decoded_len);
        }
    }

    #[test]
    fn test_u64_roundtrip() {
        let test_values = [0, 1, 127, 128, 16384, u32::MAX as u64, 1 << 62, 1 << 63, u64::MAX];

        for &val in &test_values {
            let mut buf = [0u8; MAX_VARINT_U64_SIZE];
            let encoded_len = pack_u64(val, &mut buf).unwrap();
            let (decoded_val, decoded_len) = unpack_u64(&buf[..encoded_len]).unwrap();

            assert_eq!(val, decoded_val);
            assert_eq!(encoded_len, decoded_len);
            assert_eq!(encoded_len, encoded_len_u64(val));
        }
    }

    #[test]
    fn test_signed_boundaries() {
        let mut buf = [0u8; MAX_VARINT_U64_SIZE];

        for &val in &[0i16, 1, -1, i16::MIN, i16::MAX] {
            let n = pack_i16(val, &mut buf).unwrap();
            assert_eq!(unpack_i16(&buf[..n]).unwrap(), (val, n));
        }
        for &val in &[0i32, 1, -1, i32::MIN, i32::MAX] {
            let n = pack_i32(val, &mut buf).unwrap();
            assert_eq!(unpack_i32(&buf[..n]).unwrap(), (val, n));
        }
        for &val in &[0i64, 1, -1, i64::MIN, i64::MAX] {
            let n = pack_i64(val, &mut buf).unwrap();
            assert_eq!(unpack_i64(&buf[..n]).unwrap(), (val, n));
        }
    }

    #[test]
    fn test_zigzag_keeps_small_values_small() {
        assert_eq!(zigzag_i32(0), 0);
        assert_eq!(zigzag_i32(-1), 1);
        assert_eq!(zigzag_i32(1), 2);
        assert_eq!(zigzag_i32(-2), 3);
        assert_eq!(zigzag_i64(i64::MIN), u64::MAX);
        assert_eq!(unzigzag_u16(u16::MAX), i16::MIN);
    }

    #[test]
    fn test_terminator_on_last_byte() {
        let mut buf = [0u8; MAX_VARINT_U32_SIZE];
        assert_eq!(pack_u32(0, &mut buf).unwrap(), 1);
        assert_eq!(buf[0], 0x80);

        assert_eq!(pack_u32(300, &mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], &[0x2C, 0x82]);
    }

    #[test]
    fn test_max_lengths() {
        let mut buf = [0u8; MAX_VARINT_U64_SIZE];
        assert_eq!(pack_u16(u16::MAX, &mut buf).unwrap(), MAX_VARINT_U16_SIZE);
        assert_eq!(pack_u32(u32::MAX, &mut buf).unwrap(), MAX_VARINT_U32_SIZE);
        assert_eq!(pack_u32(1 << 30, &mut buf).unwrap(), 5);
        assert_eq!(encoded_len_u32(1 << 30), 5);
        assert_eq!(encoded_len_u16(127), 1);
        assert_eq!(encoded_len_u16(128), 2);
        assert_eq!(pack_u64(u64::MAX, &mut buf).unwrap(), MAX_VARINT_U64_SIZE);
        // Tenth byte carries the top bit raw
        assert_eq!(buf[9], 0x01);
        assert_eq!(buf[8] & TERMINATOR, 0);
    }

    #[test]
    fn test_buffer_too_small() {
        let mut buf = [0u8; 2];
        assert_eq!(
            pack_u32(u32::MAX, &mut buf).unwrap_err(),
            ErrorKind::BufferOverflow
        );
    }

    #[test]
    fn test_truncated_input() {
        let buf = [0x01]; // No terminator yet
        assert_eq!(unpack_u32(&buf).unwrap_err(), ErrorKind::BufferUnderflow);
    }

    #[test]
    fn test_missing_terminator() {
        let buf = [0x01, 0x01, 0x01];
        assert_eq!(unpack_u16(&buf).unwrap_err(), ErrorKind::VarintOverflow);
    }

    #[test]
    fn test_bits_beyond_width() {
        // Third group of a u16 may only carry two bits
        let buf = [0x7F, 0x7F, 0x87];
        assert_eq!(unpack_u16(&buf).unwrap_err(), ErrorKind::VarintOverflow);

        let mut raw = [0u8; MAX_VARINT_U64_SIZE];
        raw[9] = 0x02;
        assert_eq!(unpack_u64(&raw).unwrap_err(), ErrorKind::VarintOverflow);
    }
}
