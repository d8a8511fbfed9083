//! Message encoder
//!
//! The encoder writes fields at the ring's `stop` cursor, folding every byte
//! into a rolling hash, and appends the 2-byte trailer once the body is
//! complete. `stop` only moves at field boundaries: a field that does not fit
//! leaves the ring exactly as it was after the previous field.

use core::mem;

use tracing::{debug, trace};

use crate::config::CodecConfig;
use crate::error::{Error, ErrorKind, Result};
use crate::hash::{RollingHash, HASH_SIZE};
use crate::params::{Param, Params, Qualifier};
use crate::ring::{advance, space, RingBuffer};
use crate::types::{ObjSize, TypeTag};
use crate::value::Value;
use crate::varint;

/// Writes messages into a borrowed ring buffer
#[derive(Debug)]
pub struct Encoder<'a> {
    ring: &'a mut RingBuffer,
    config: CodecConfig,
    cursor: usize,
    begin: usize,
    hash: RollingHash,
}

impl<'a> Encoder<'a> {
    /// Create an encoder with default limits
    #[inline]
    pub fn new(ring: &'a mut RingBuffer) -> Self {
        Self::with_config(ring, CodecConfig::default())
    }

    /// Create an encoder with explicit limits
    pub fn with_config(ring: &'a mut RingBuffer, config: CodecConfig) -> Self {
        let cursor = ring.stop();
        Self {
            ring,
            config,
            cursor,
            begin: cursor,
            hash: RollingHash::new(),
        }
    }

    /// Limits in use
    #[inline]
    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Encode one message: every argument in descriptor order, then the hash
    ///
    /// Returns the number of bytes written including the trailer. An empty
    /// descriptor with no arguments writes nothing and returns `Ok(0)`.
    pub fn encode(&mut self, params: &Params, args: &[Value]) -> Result<usize> {
        if params.len() > self.config.max_params {
            return Err(Error::new(ErrorKind::TooManyParameters).at_index(self.config.max_params));
        }
        check_arity(params, args)?;
        if params.is_empty() {
            return Ok(0);
        }

        self.rewind();
        debug!(
            params = params.len(),
            space = self.remaining(),
            stop = self.cursor,
            "encoding message"
        );

        let result = self
            .write_fields(params, args, 0)
            .and_then(|()| self.finish());
        if result.is_err() {
            self.rewind();
        }
        result
    }

    /// Append the hash trailer of the bytes written since the last message
    ///
    /// Used after hand-built messages made of `put_*` calls; [`encode`]
    /// calls it internally.
    ///
    /// [`encode`]: Encoder::encode
    pub fn finish(&mut self) -> Result<usize> {
        let trailer = self.hash.to_le_bytes();
        self.reserve(HASH_SIZE)?;
        self.write_raw(&trailer);
        self.commit();

        let size = crate::ring::length(self.begin, self.cursor, self.ring.capacity());
        debug!(bytes = size, hash = self.hash.value(), "message encoded");
        self.begin = self.cursor;
        self.hash.reset();
        Ok(size)
    }

    /// Write one byte
    pub fn put_u8(&mut self, value: u8) -> Result<()> {
        self.put_le(value as u64, 1)
    }

    /// Write a u16 (little-endian)
    pub fn put_u16(&mut self, value: u16) -> Result<()> {
        self.put_le(value as u64, 2)
    }

    /// Write a u32 (little-endian)
    pub fn put_u32(&mut self, value: u32) -> Result<()> {
        self.put_le(value as u64, 4)
    }

    /// Write a u64 (little-endian)
    pub fn put_u64(&mut self, value: u64) -> Result<()> {
        self.put_le(value, 8)
    }

    /// Write an i32 (little-endian)
    pub fn put_i32(&mut self, value: i32) -> Result<()> {
        self.put_u32(value as u32)
    }

    /// Write an i64 (little-endian)
    pub fn put_i64(&mut self, value: i64) -> Result<()> {
        self.put_u64(value as u64)
    }

    /// Write an f32 (little-endian IEEE 754 bits)
    pub fn put_f32(&mut self, value: f32) -> Result<()> {
        self.put_u32(value.to_bits())
    }

    /// Write an f64 (little-endian IEEE 754 bits)
    pub fn put_f64(&mut self, value: f64) -> Result<()> {
        self.put_u64(value.to_bits())
    }

    /// Write a varint-encoded u32
    pub fn put_varint_u32(&mut self, value: u32) -> Result<()> {
        let mut buf = [0u8; varint::MAX_VARINT_U32_SIZE];
        let n = varint::pack_u32(value, &mut buf)?;
        self.put_bytes(&buf[..n])
    }

    /// Write a varint-encoded u64
    pub fn put_varint_u64(&mut self, value: u64) -> Result<()> {
        let mut buf = [0u8; varint::MAX_VARINT_U64_SIZE];
        let n = varint::pack_u64(value, &mut buf)?;
        self.put_bytes(&buf[..n])
    }

    /// Write a zigzag varint-encoded i32
    pub fn put_varint_i32(&mut self, value: i32) -> Result<()> {
        self.put_varint_u32(varint::zigzag_i32(value))
    }

    /// Write a zigzag varint-encoded i64
    pub fn put_varint_i64(&mut self, value: i64) -> Result<()> {
        self.put_varint_u64(varint::zigzag_i64(value))
    }

    /// Write a string followed by its NUL terminator
    pub fn put_str(&mut self, text: &str) -> Result<()> {
        if text.as_bytes().contains(&0) {
            return Err(Error::new(ErrorKind::InvalidArgument));
        }
        self.reserve(text.len() + 1)?;
        self.write_bytes(text.as_bytes());
        self.write_byte(0);
        self.commit();
        Ok(())
    }

    /// Write raw bytes
    pub fn put_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.reserve(bytes.len())?;
        self.write_bytes(bytes);
        self.commit();
        Ok(())
    }

    /// Ring position the next byte will be written to
    #[inline]
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// Free bytes left in the ring
    #[inline]
    pub fn remaining(&self) -> usize {
        space(self.ring.start(), self.cursor, self.ring.capacity())
    }

    fn put_le(&mut self, bits: u64, width: usize) -> Result<()> {
        self.reserve(width)?;
        self.write_le(bits, width);
        self.commit();
        Ok(())
    }

    fn write_fields(&mut self, params: &Params, args: &[Value], depth: usize) -> Result<()> {
        for (index, (param, value)) in params.iter().zip(args).enumerate() {
            self.write_field(param, value, depth)
                .map_err(|e| e.or_index(index))?;
            trace!(index, depth, tag = %param.tag(), value = value.kind_name(), "field encoded");
            if depth == 0 {
                self.commit();
            }
        }
        Ok(())
    }

    fn write_field(&mut self, param: &Param, value: &Value, depth: usize) -> Result<()> {
        let tag = param.tag();
        if !value.fits(tag) {
            return Err(Error::new(ErrorKind::InvalidArgument).at_offset(self.cursor));
        }

        match (tag, value) {
            (TypeTag::Adr, Value::Address(address)) => {
                let width = param.max_len().unwrap_or(self.config.max_address_length);
                self.write_address(address, width)
            }
            (TypeTag::Str, Value::Str(text)) => {
                let max_len = param.max_len().unwrap_or(0);
                if text.as_bytes().contains(&0) {
                    return Err(Error::new(ErrorKind::InvalidArgument));
                }
                if text.len() > max_len {
                    return Err(Error::new(ErrorKind::StringOverflow).at_offset(self.cursor));
                }
                self.reserve(text.len() + 1)?;
                self.write_bytes(text.as_bytes());
                self.write_byte(0);
                Ok(())
            }
            (TypeTag::St2, Value::Str16(text)) => self.write_utf16(text, param.max_len().unwrap_or(0)),
            (TypeTag::St4, Value::Str32(text)) => self.write_utf32(text, param.max_len().unwrap_or(0)),
            (TypeTag::Sv2, Value::I16(v)) => self.write_varint(varint::zigzag_i16(*v) as u64),
            (TypeTag::Uv2, Value::U16(v)) => self.write_varint(*v as u64),
            (TypeTag::Sv4, Value::I32(v)) => self.write_varint(varint::zigzag_i32(*v) as u64),
            (TypeTag::Uv4, Value::U32(v)) => self.write_varint(*v as u64),
            (TypeTag::Sv8, Value::I64(v)) => self.write_varint(varint::zigzag_i64(*v)),
            (TypeTag::Uv8, Value::U64(v)) => self.write_varint(*v),
            (TypeTag::Ar1 | TypeTag::Ar2 | TypeTag::Ar4 | TypeTag::Ar8, Value::Array(array)) => {
                let Qualifier::Array { count, .. } = *param.qualifier() else {
                    return Err(Error::new(ErrorKind::InvalidType));
                };
                let width = tag.array_element_width().unwrap_or(1);
                if array.element_width() != width {
                    return Err(Error::new(ErrorKind::InvalidArgument));
                }
                if array.len() != count {
                    return Err(Error::new(ErrorKind::ArrayOverflow).at_offset(self.cursor));
                }
                let bytes = count
                    .checked_mul(width)
                    .ok_or(Error::new(ErrorKind::ArrayOverflow).at_offset(self.cursor))?;
                self.reserve(bytes)?;
                for i in 0..count {
                    self.write_le(array.word(i), width);
                }
                Ok(())
            }
            (TypeTag::Bsc, Value::Args(inner_args)) => {
                let Qualifier::Nested(inner) = param.qualifier() else {
                    return Err(Error::new(ErrorKind::InvalidType));
                };
                self.write_nested(inner, inner_args, depth + 1)
            }
            (TypeTag::Obj, Value::Object(payload)) => {
                let Qualifier::Object { width, max_len } = *param.qualifier() else {
                    return Err(Error::new(ErrorKind::InvalidType));
                };
                self.write_object(width, max_len, payload)
            }
            _ => {
                let (Some(width), Some(bits)) = (tag.fixed_width(), value.scalar_bits()) else {
                    return Err(Error::new(ErrorKind::InvalidArgument));
                };
                self.reserve(width)?;
                self.write_le(bits, width);
                Ok(())
            }
        }
    }

    fn write_address(&mut self, address: &str, width: usize) -> Result<()> {
        let bytes = address.as_bytes();
        if bytes.contains(&0) {
            return Err(Error::new(ErrorKind::InvalidArgument));
        }
        if bytes.len() > width {
            return Err(Error::new(ErrorKind::StringOverflow).at_offset(self.cursor));
        }
        self.reserve(width)?;
        self.write_bytes(bytes);
        for _ in bytes.len()..width {
            self.write_byte(0);
        }
        Ok(())
    }

    #[cfg(feature = "utf16")]
    fn write_utf16(&mut self, text: &str, max_len: usize) -> Result<()> {
        if text.contains('\0') {
            return Err(Error::new(ErrorKind::InvalidArgument));
        }
        let units = text.encode_utf16().count();
        if units > max_len {
            return Err(Error::new(ErrorKind::StringOverflow).at_offset(self.cursor));
        }
        self.reserve((units + 1) * 2)?;
        for unit in text.encode_utf16().chain(core::iter::once(0)) {
            self.write_le(unit as u64, 2);
        }
        Ok(())
    }

    #[cfg(not(feature = "utf16"))]
    fn write_utf16(&mut self, _text: &str, _max_len: usize) -> Result<()> {
        Err(Error::new(ErrorKind::Utf16))
    }

    #[cfg(feature = "utf32")]
    fn write_utf32(&mut self, text: &str, max_len: usize) -> Result<()> {
        if text.contains('\0') {
            return Err(Error::new(ErrorKind::InvalidArgument));
        }
        let chars = text.chars().count();
        if chars > max_len {
            return Err(Error::new(ErrorKind::StringOverflow).at_offset(self.cursor));
        }
        self.reserve((chars + 1) * 4)?;
        for c in text.chars().chain(core::iter::once('\0')) {
            self.write_le(c as u64, 4);
        }
        Ok(())
    }

    #[cfg(not(feature = "utf32"))]
    fn write_utf32(&mut self, _text: &str, _max_len: usize) -> Result<()> {
        Err(Error::new(ErrorKind::Utf32))
    }

    fn write_varint(&mut self, value: u64) -> Result<()> {
        let mut buf = [0u8; varint::MAX_VARINT_U64_SIZE];
        let n = varint::pack_u64(value, &mut buf)?;
        self.reserve(n)?;
        self.write_bytes(&buf[..n]);
        Ok(())
    }

    /// Nested message with its own trailer; its bytes also feed the outer hash
    fn write_nested(&mut self, params: &Params, args: &[Value], depth: usize) -> Result<()> {
        if depth > self.config.max_nesting {
            return Err(Error::new(ErrorKind::StackOverflow).at_offset(self.cursor));
        }
        check_arity(params, args)?;

        let from = self.cursor;
        let outer = mem::replace(&mut self.hash, RollingHash::new());
        self.write_fields(params, args, depth)?;

        let trailer = self.hash.to_le_bytes();
        self.reserve(HASH_SIZE)?;
        self.write_raw(&trailer);

        self.hash = outer;
        let mut pos = from;
        while pos != self.cursor {
            self.hash.update(self.ring.byte_at(pos));
            pos = advance(pos, self.ring.capacity());
        }
        Ok(())
    }

    fn write_object(&mut self, width: ObjSize, max_len: usize, payload: &[u8]) -> Result<()> {
        let limit = max_len.min(self.config.max_object_size);
        if payload.len() > limit || payload.len() as u64 > width.max_len() {
            return Err(Error::new(ErrorKind::ArrayOverflow).at_offset(self.cursor));
        }
        self.reserve(width.bytes() + payload.len())?;
        match width {
            ObjSize::W8 => self.write_le(payload.len() as u8 as u64, 1),
            ObjSize::W16 => self.write_le(payload.len() as u16 as u64, 2),
            ObjSize::W32 => self.write_le(payload.len() as u32 as u64, 4),
            ObjSize::W64 => self.write_le(payload.len() as u64, 8),
        }
        self.write_bytes(payload);
        Ok(())
    }

    /// Fail unless `n` more bytes fit between the cursor and `start`
    #[inline]
    fn reserve(&self, n: usize) -> Result<()> {
        if n > self.remaining() {
            return Err(Error::new(ErrorKind::BufferOverflow).at_offset(self.cursor));
        }
        Ok(())
    }

    #[inline]
    fn write_byte(&mut self, byte: u8) {
        self.ring.set_byte(self.cursor, byte);
        self.hash.update(byte);
        self.cursor = advance(self.cursor, self.ring.capacity());
    }

    #[inline]
    fn write_bytes(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.write_byte(byte);
        }
    }

    /// Little-endian byte disassembly of the low `width` bytes of `bits`
    #[inline]
    fn write_le(&mut self, bits: u64, width: usize) {
        for i in 0..width {
            self.write_byte((bits >> (8 * i)) as u8);
        }
    }

    /// Trailer bytes, kept out of the running hash
    fn write_raw(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.ring.set_byte(self.cursor, byte);
            self.cursor = advance(self.cursor, self.ring.capacity());
        }
    }

    #[inline]
    fn commit(&mut self) {
        self.ring.set_stop(self.cursor);
    }

    /// Drop uncommitted bytes and start a fresh message at `stop`
    fn rewind(&mut self) {
        self.cursor = self.ring.stop();
        self.begin = self.cursor;
        self.hash.reset();
    }
}

fn check_arity(params: &Params, args: &[Value]) -> Result<()> {
    if args.len() > params.len() {
        return Err(Error::new(ErrorKind::TooManyPops).at_index(params.len()));
    }
    if args.len() < params.len() {
        return Err(Error::new(ErrorKind::InvalidIndex).at_index(args.len()));
    }
    Ok(())
}
