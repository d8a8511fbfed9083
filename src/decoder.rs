//! Message decoder and receive state machine
//!
//! The decoder reads from the ring's `start` cursor through a private read
//! cursor and only moves `start` once the whole message, hash included, has
//! checked out. A failed decode leaves every buffered byte in place.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use core::mem;

use tracing::{debug, trace, warn};

use crate::config::CodecConfig;
use crate::error::{Error, ErrorKind, Result};
use crate::hash::{RollingHash, HASH_SIZE};
use crate::params::{Param, Params, Qualifier};
use crate::ring::{advance, length, RingBuffer};
use crate::types::{ObjSize, TypeTag};
use crate::value::{ArrayValue, Value};
use crate::varint;
use crate::BEL;

/// Receive states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    /// Reading an address field
    Address,
    /// Between fields, ready for the next argument
    Args,
    /// Reading a UTF-8 string
    Utf8,
    /// Reading a UTF-16 string
    Utf16,
    /// Reading a UTF-32 string
    Utf32,
    /// Reading a varint
    Varint,
    /// Reading an object with an 8-bit length prefix
    Object8,
    /// Reading an object with a 16-bit length prefix
    Object16,
    /// Reading an object with a 32-bit length prefix
    Object32,
    /// Reading an object with a 64-bit length prefix
    Object64,
    /// Checking the hash trailer
    Hash,
    /// A decode failed; cleared by `reset` or `recover`
    Error,
    /// Session not yet established
    Disconnected,
    /// Handshake accepted, waiting for the first message
    Ack,
    /// Reserved by the caller
    Locked,
    /// Reading fixed-width scalars or arrays
    Pod,
}

impl State {
    /// Human-readable state name
    pub const fn name(self) -> &'static str {
        match self {
            State::Address => "Address",
            State::Args => "Args",
            State::Utf8 => "UTF-8",
            State::Utf16 => "UTF-16",
            State::Utf32 => "UTF-32",
            State::Varint => "Varint",
            State::Object8 => "Object8",
            State::Object16 => "Object16",
            State::Object32 => "Object32",
            State::Object64 => "Object64",
            State::Hash => "Hash",
            State::Error => "Error",
            State::Disconnected => "Disconnected",
            State::Ack => "Ack",
            State::Locked => "Locked",
            State::Pod => "POD",
        }
    }

    /// True for states that refuse further decoding
    pub const fn is_terminal(self) -> bool {
        matches!(self, State::Error | State::Disconnected)
    }

    fn for_tag(param: &Param) -> State {
        match (param.tag(), param.qualifier()) {
            (TypeTag::Adr, _) => State::Address,
            (TypeTag::Str, _) => State::Utf8,
            (TypeTag::St2, _) => State::Utf16,
            (TypeTag::St4, _) => State::Utf32,
            (TypeTag::Bsc, _) => State::Args,
            (_, Qualifier::Object { width, .. }) => match width {
                ObjSize::W8 => State::Object8,
                ObjSize::W16 => State::Object16,
                ObjSize::W32 => State::Object32,
                ObjSize::W64 => State::Object64,
            },
            (tag, _) if tag.varint_max_size().is_some() => State::Varint,
            _ => State::Pod,
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Reads messages out of a borrowed ring buffer
#[derive(Debug)]
pub struct Decoder<'a> {
    ring: &'a mut RingBuffer,
    config: CodecConfig,
    state: State,
    locked_from: State,
    connected: bool,
    cursor: usize,
    hash: RollingHash,
}

impl<'a> Decoder<'a> {
    /// Decoder ready for messages, with default limits
    #[inline]
    pub fn new(ring: &'a mut RingBuffer) -> Self {
        Self::with_config(ring, CodecConfig::default())
    }

    /// Decoder ready for messages, with explicit limits
    pub fn with_config(ring: &'a mut RingBuffer, config: CodecConfig) -> Self {
        Self::build(ring, config, true)
    }

    /// Decoder that must [`accept`](Decoder::accept) a connect record first
    #[inline]
    pub fn session(ring: &'a mut RingBuffer) -> Self {
        Self::session_with_config(ring, CodecConfig::default())
    }

    /// Session decoder with explicit limits
    pub fn session_with_config(ring: &'a mut RingBuffer, config: CodecConfig) -> Self {
        Self::build(ring, config, false)
    }

    fn build(ring: &'a mut RingBuffer, config: CodecConfig, connected: bool) -> Self {
        let cursor = ring.start();
        let state = if connected {
            State::Args
        } else {
            State::Disconnected
        };
        Self {
            ring,
            config,
            state,
            locked_from: state,
            connected,
            cursor,
            hash: RollingHash::new(),
        }
    }

    /// Current state
    #[inline]
    pub fn state(&self) -> State {
        self.state
    }

    /// Limits in use
    #[inline]
    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Bytes buffered and not yet consumed
    #[inline]
    pub fn buffered(&self) -> usize {
        self.ring.len()
    }

    /// Decode one complete message
    ///
    /// On success `start` moves past the message and its trailer. On failure
    /// the decoder enters [`State::Error`] and nothing is consumed.
    pub fn decode(&mut self, params: &Params) -> Result<Vec<Value>> {
        self.check_ready()?;
        match self.run(params) {
            Ok(values) => Ok(values),
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Decode one message if it is fully buffered
    ///
    /// Returns `Ok(None)` when the buffered bytes end before the message does;
    /// the decoder stays ready and nothing is consumed. Other faults behave
    /// like [`decode`](Decoder::decode).
    pub fn try_decode(&mut self, params: &Params) -> Result<Option<Vec<Value>>> {
        self.check_ready()?;
        match self.run(params) {
            Ok(values) => Ok(Some(values)),
            Err(err) if err.kind() == ErrorKind::BufferUnderflow => {
                trace!(buffered = self.ring.len(), "incomplete message");
                self.state = State::Args;
                Ok(None)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Read a connect record and establish the session
    ///
    /// The record is two address fields: the peer address and a BEL marker.
    /// Returns the peer address. A record with the wrong marker is rejected
    /// with `Room`. Failures consume nothing and leave the session
    /// disconnected.
    pub fn accept(&mut self) -> Result<String> {
        match self.state {
            State::Disconnected => {}
            State::Locked => return Err(Error::new(ErrorKind::Locked)),
            _ => return Err(Error::new(ErrorKind::InvalidOperation)),
        }

        let record = Params::builder().address().address().build()?;
        self.state = State::Address;
        self.begin();
        let result = self.read_message(&record, 0).and_then(|mut fields| {
            let marker = fields.pop();
            let address = fields.pop();
            match (address, marker) {
                (Some(Value::Address(address)), Some(Value::Address(marker)))
                    if marker.as_bytes() == [BEL] =>
                {
                    Ok(address)
                }
                _ => Err(Error::new(ErrorKind::Room)),
            }
        });

        match result {
            Ok(address) => {
                self.ring.set_start(self.cursor);
                self.connected = true;
                self.state = State::Ack;
                debug!(peer = %address, "session accepted");
                Ok(address)
            }
            Err(err) => {
                warn!(error = %err, "connect record rejected");
                self.cursor = self.ring.start();
                self.state = State::Disconnected;
                Err(err)
            }
        }
    }

    /// Reserve the decoder; decodes fail with `Locked` until [`unlock`](Decoder::unlock)
    pub fn lock(&mut self) -> Result<()> {
        if self.state == State::Locked {
            return Err(Error::new(ErrorKind::Locked));
        }
        self.locked_from = self.state;
        self.state = State::Locked;
        Ok(())
    }

    /// Release a [`lock`](Decoder::lock)
    pub fn unlock(&mut self) -> Result<()> {
        if self.state != State::Locked {
            return Err(Error::new(ErrorKind::InvalidOperation));
        }
        self.state = self.locked_from;
        Ok(())
    }

    /// Discard all buffered data and return to the initial state
    pub fn reset(&mut self) {
        self.ring.reset();
        self.cursor = 0;
        self.hash.reset();
        self.state = if self.connected {
            State::Args
        } else {
            State::Disconnected
        };
    }

    /// Leave [`State::Error`] keeping buffered data
    ///
    /// An established session returns to `Args`; one that never completed its
    /// handshake returns to `Disconnected`.
    pub fn recover(&mut self) {
        self.cursor = self.ring.start();
        self.hash.reset();
        self.state = if self.connected {
            State::Args
        } else {
            State::Disconnected
        };
    }

    fn check_ready(&self) -> Result<()> {
        match self.state {
            State::Args | State::Ack => Ok(()),
            State::Locked => Err(Error::new(ErrorKind::Locked)),
            State::Disconnected => Err(Error::new(ErrorKind::Disconnected)),
            state => {
                warn!(%state, "decode refused");
                Err(Error::new(ErrorKind::InvalidOperation))
            }
        }
    }

    fn run(&mut self, params: &Params) -> Result<Vec<Value>> {
        if params.len() > self.config.max_params {
            return Err(Error::new(ErrorKind::TooManyParameters).at_index(self.config.max_params));
        }
        if params.is_empty() {
            self.state = State::Args;
            return Ok(Vec::new());
        }

        self.begin();
        debug!(
            params = params.len(),
            buffered = self.ring.len(),
            start = self.cursor,
            "decoding message"
        );
        let values = self.read_message(params, 0)?;

        let consumed = length(self.ring.start(), self.cursor, self.ring.capacity());
        self.ring.set_start(self.cursor);
        self.state = State::Args;
        debug!(bytes = consumed, "message decoded");
        Ok(values)
    }

    fn fail(&mut self, err: Error) -> Error {
        if err.kind() == ErrorKind::InvalidHash {
            warn!(error = %err, "hash mismatch");
        } else {
            debug!(error = %err, state = %self.state, "decode failed");
        }
        self.cursor = self.ring.start();
        self.state = State::Error;
        err
    }

    fn begin(&mut self) {
        self.cursor = self.ring.start();
        self.hash.reset();
    }

    /// Fields in order, then the trailer over them
    fn read_message(&mut self, params: &Params, depth: usize) -> Result<Vec<Value>> {
        let mut values = Vec::with_capacity(params.len());
        for (index, param) in params.iter().enumerate() {
            self.state = State::for_tag(param);
            let value = self
                .read_field(param, depth)
                .map_err(|e| e.or_index(index))?;
            trace!(index, depth, tag = %param.tag(), value = value.kind_name(), "field decoded");
            values.push(value);
            self.state = State::Args;
        }

        self.state = State::Hash;
        self.need(HASH_SIZE)?;
        let at = self.cursor;
        let trailer = [self.read_raw(), self.read_raw()];
        if !self.hash.verify(trailer) {
            return Err(Error::new(ErrorKind::InvalidHash).at_offset(at));
        }
        Ok(values)
    }

    fn read_field(&mut self, param: &Param, depth: usize) -> Result<Value> {
        let tag = param.tag();
        match tag {
            TypeTag::Adr => {
                let width = param.max_len().unwrap_or(self.config.max_address_length);
                self.read_address(width)
            }
            TypeTag::Str => self.read_utf8(param.max_len().unwrap_or(0)),
            TypeTag::St2 => self.read_utf16(param.max_len().unwrap_or(0)),
            TypeTag::St4 => self.read_utf32(param.max_len().unwrap_or(0)),
            TypeTag::Sv2 => self
                .read_varint(varint::unpack_i16, varint::MAX_VARINT_U16_SIZE)
                .map(Value::I16),
            TypeTag::Uv2 => self
                .read_varint(varint::unpack_u16, varint::MAX_VARINT_U16_SIZE)
                .map(Value::U16),
            TypeTag::Sv4 => self
                .read_varint(varint::unpack_i32, varint::MAX_VARINT_U32_SIZE)
                .map(Value::I32),
            TypeTag::Uv4 => self
                .read_varint(varint::unpack_u32, varint::MAX_VARINT_U32_SIZE)
                .map(Value::U32),
            TypeTag::Sv8 => self
                .read_varint(varint::unpack_i64, varint::MAX_VARINT_U64_SIZE)
                .map(Value::I64),
            TypeTag::Uv8 => self
                .read_varint(varint::unpack_u64, varint::MAX_VARINT_U64_SIZE)
                .map(Value::U64),
            TypeTag::Ar1 | TypeTag::Ar2 | TypeTag::Ar4 | TypeTag::Ar8 => {
                let Qualifier::Array { count, .. } = *param.qualifier() else {
                    return Err(Error::new(ErrorKind::InvalidType));
                };
                let width = tag.array_element_width().unwrap_or(1);
                let bytes = count
                    .checked_mul(width)
                    .ok_or(Error::new(ErrorKind::ArrayOverflow).at_offset(self.cursor))?;
                self.need(bytes)?;
                let mut array = ArrayValue::with_width(width, count)
                    .ok_or(Error::new(ErrorKind::InvalidType))?;
                for _ in 0..count {
                    array.push_word(self.read_le(width));
                }
                Ok(Value::Array(array))
            }
            TypeTag::Bsc => {
                let Qualifier::Nested(inner) = param.qualifier() else {
                    return Err(Error::new(ErrorKind::InvalidType));
                };
                self.read_nested(inner, depth + 1).map(Value::Args)
            }
            TypeTag::Obj => {
                let Qualifier::Object { width, max_len } = *param.qualifier() else {
                    return Err(Error::new(ErrorKind::InvalidType));
                };
                self.read_object(width, max_len)
            }
            _ => {
                let width = tag.fixed_width().ok_or(Error::new(ErrorKind::InvalidType))?;
                self.need(width)?;
                let bits = self.read_le(width);
                Value::from_scalar_bits(tag, bits).ok_or(Error::new(ErrorKind::InvalidType))
            }
        }
    }

    fn read_address(&mut self, width: usize) -> Result<Value> {
        let at = self.cursor;
        self.need(width)?;
        let mut bytes = Vec::with_capacity(width);
        for _ in 0..width {
            bytes.push(self.read_byte());
        }
        if let Some(end) = bytes.iter().position(|&b| b == 0) {
            bytes.truncate(end);
        }
        String::from_utf8(bytes)
            .map(Value::Address)
            .map_err(|_| Error::new(ErrorKind::Utf8).at_offset(at))
    }

    fn read_utf8(&mut self, max_len: usize) -> Result<Value> {
        let at = self.cursor;
        let mut bytes = Vec::new();
        loop {
            self.need(1)?;
            match self.read_byte() {
                0 => break,
                _ if bytes.len() == max_len => {
                    return Err(Error::new(ErrorKind::StringOverflow).at_offset(at));
                }
                byte => bytes.push(byte),
            }
        }
        String::from_utf8(bytes)
            .map(Value::Str)
            .map_err(|_| Error::new(ErrorKind::Utf8).at_offset(at))
    }

    #[cfg(feature = "utf16")]
    fn read_utf16(&mut self, max_len: usize) -> Result<Value> {
        let at = self.cursor;
        let mut units = Vec::new();
        loop {
            self.need(2)?;
            match self.read_le(2) as u16 {
                0 => break,
                _ if units.len() == max_len => {
                    return Err(Error::new(ErrorKind::StringOverflow).at_offset(at));
                }
                unit => units.push(unit),
            }
        }
        String::from_utf16(&units)
            .map(Value::Str16)
            .map_err(|_| Error::new(ErrorKind::Utf16).at_offset(at))
    }

    #[cfg(not(feature = "utf16"))]
    fn read_utf16(&mut self, _max_len: usize) -> Result<Value> {
        Err(Error::new(ErrorKind::Utf16).at_offset(self.cursor))
    }

    #[cfg(feature = "utf32")]
    fn read_utf32(&mut self, max_len: usize) -> Result<Value> {
        let at = self.cursor;
        let mut text = String::new();
        let mut chars = 0;
        loop {
            self.need(4)?;
            match self.read_le(4) as u32 {
                0 => break,
                _ if chars == max_len => {
                    return Err(Error::new(ErrorKind::StringOverflow).at_offset(at));
                }
                scalar => {
                    let c = char::from_u32(scalar)
                        .ok_or(Error::new(ErrorKind::Utf32).at_offset(at))?;
                    text.push(c);
                    chars += 1;
                }
            }
        }
        Ok(Value::Str32(text))
    }

    #[cfg(not(feature = "utf32"))]
    fn read_utf32(&mut self, _max_len: usize) -> Result<Value> {
        Err(Error::new(ErrorKind::Utf32).at_offset(self.cursor))
    }

    /// Gather up to `max` bytes without consuming, unpack, then consume what was used
    fn read_varint<T>(&mut self, unpack: fn(&[u8]) -> Result<(T, usize)>, max: usize) -> Result<T> {
        let at = self.cursor;
        let mut buf = [0u8; varint::MAX_VARINT_U64_SIZE];
        let n = max.min(self.available());
        let mut pos = self.cursor;
        for slot in buf.iter_mut().take(n) {
            *slot = self.ring.byte_at(pos);
            pos = advance(pos, self.ring.capacity());
        }

        let (value, used) = unpack(&buf[..n]).map_err(|e| e.at_offset(at))?;
        for _ in 0..used {
            self.read_byte();
        }
        Ok(value)
    }

    fn read_nested(&mut self, params: &Params, depth: usize) -> Result<Vec<Value>> {
        if depth > self.config.max_nesting {
            return Err(Error::new(ErrorKind::StackOverflow).at_offset(self.cursor));
        }
        let from = self.cursor;
        let outer = mem::replace(&mut self.hash, RollingHash::new());
        let values = self.read_message(params, depth)?;

        self.hash = outer;
        let mut pos = from;
        while pos != self.cursor {
            self.hash.update(self.ring.byte_at(pos));
            pos = advance(pos, self.ring.capacity());
        }
        Ok(values)
    }

    fn read_object(&mut self, width: ObjSize, max_len: usize) -> Result<Value> {
        let at = self.cursor;
        self.need(width.bytes())?;
        let len = match width {
            ObjSize::W8 => self.read_le(1) as u8 as u64,
            ObjSize::W16 => self.read_le(2) as u16 as u64,
            ObjSize::W32 => self.read_le(4) as u32 as u64,
            ObjSize::W64 => self.read_le(8),
        };
        let limit = max_len.min(self.config.max_object_size) as u64;
        if len > limit {
            return Err(Error::new(ErrorKind::ArrayOverflow).at_offset(at));
        }

        let len = len as usize;
        self.need(len)?;
        let mut payload = Vec::with_capacity(len);
        for _ in 0..len {
            payload.push(self.read_byte());
        }
        Ok(Value::Object(payload))
    }

    /// Bytes between the read cursor and `stop`
    #[inline]
    fn available(&self) -> usize {
        length(self.cursor, self.ring.stop(), self.ring.capacity())
    }

    #[inline]
    fn need(&self, n: usize) -> Result<()> {
        if n > self.available() {
            return Err(Error::new(ErrorKind::BufferUnderflow).at_offset(self.cursor));
        }
        Ok(())
    }

    #[inline]
    fn read_byte(&mut self) -> u8 {
        let byte = self.read_raw();
        self.hash.update(byte);
        byte
    }

    #[inline]
    fn read_raw(&mut self) -> u8 {
        let byte = self.ring.byte_at(self.cursor);
        self.cursor = advance(self.cursor, self.ring.capacity());
        byte
    }

    /// Little-endian assembly of `width` bytes
    #[inline]
    fn read_le(&mut self, width: usize) -> u64 {
        let mut bits = 0u64;
        for i in 0..width {
            bits |= (self.read_byte() as u64) << (8 * i);
        }
        bits
    }
}
