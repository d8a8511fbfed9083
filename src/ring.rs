//! Fixed-capacity circular byte buffer
//!
//! The occupied region runs from `start` (inclusive) to `stop` (exclusive),
//! wrapping through zero. One byte is always kept free so that a full buffer
//! never satisfies `start == stop`.

use alloc::boxed::Box;
use alloc::vec;
use alloc::vec::Vec;

use crate::error::{Error, ErrorKind, Result};

/// Smallest usable ring: room for one byte of body plus the hash trailer
pub const MIN_RING_SIZE: usize = 4;

/// Free bytes available for writing between `start` and `stop`
#[inline]
pub const fn space(start: usize, stop: usize, capacity: usize) -> usize {
    if start <= stop {
        capacity - (stop - start) - 1
    } else {
        start - stop - 1
    }
}

/// Occupied bytes between `start` and `stop`
#[inline]
pub const fn length(start: usize, stop: usize, capacity: usize) -> usize {
    if start <= stop {
        stop - start
    } else {
        capacity - start + stop
    }
}

/// Advance a cursor by one byte, wrapping to zero at `capacity`
#[inline]
pub const fn advance(cursor: usize, capacity: usize) -> usize {
    let next = cursor + 1;
    if next >= capacity {
        0
    } else {
        next
    }
}

/// Advance a cursor by `n` bytes with wraparound
#[inline]
pub const fn advance_by(cursor: usize, n: usize, capacity: usize) -> usize {
    (cursor + n % capacity) % capacity
}

/// Ring buffer backed by a fixed byte arena and two indices
#[derive(Clone, PartialEq, Eq)]
pub struct RingBuffer {
    storage: Box<[u8]>,
    start: usize,
    stop: usize,
}

impl core::fmt::Debug for RingBuffer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RingBuffer")
            .field("capacity", &self.capacity())
            .field("start", &self.start)
            .field("stop", &self.stop)
            .field("len", &self.len())
            .finish()
    }
}

impl RingBuffer {
    /// Allocate an empty ring of the given capacity
    ///
    /// Allocation happens once here; no operation on the ring allocates
    /// afterwards.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity < MIN_RING_SIZE {
            return Err(Error::new(ErrorKind::InvalidArgument));
        }
        Ok(Self {
            storage: vec![0u8; capacity].into_boxed_slice(),
            start: 0,
            stop: 0,
        })
    }

    /// Build a ring holding `bytes`, as a receiver would after a transport read
    pub fn with_contents(capacity: usize, bytes: &[u8]) -> Result<Self> {
        let mut ring = Self::new(capacity)?;
        ring.write_slice(bytes)?;
        Ok(ring)
    }

    /// Total size of the arena
    #[inline]
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Index of the first occupied byte
    #[inline]
    pub fn start(&self) -> usize {
        self.start
    }

    /// Index one past the last occupied byte
    #[inline]
    pub fn stop(&self) -> usize {
        self.stop
    }

    /// Free bytes available for writing
    #[inline]
    pub fn space(&self) -> usize {
        space(self.start, self.stop, self.capacity())
    }

    /// Occupied bytes
    #[inline]
    pub fn len(&self) -> usize {
        length(self.start, self.stop, self.capacity())
    }

    /// True when no bytes are buffered
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.stop
    }

    /// True when advancing `stop` would collide with `start`
    #[inline]
    pub fn is_full(&self) -> bool {
        advance(self.stop, self.capacity()) == self.start
    }

    /// Append one byte
    #[inline]
    pub fn push(&mut self, byte: u8) -> Result<()> {
        if self.is_full() {
            return Err(Error::new(ErrorKind::BufferOverflow).at_offset(self.stop));
        }
        self.storage[self.stop] = byte;
        self.stop = advance(self.stop, self.capacity());
        Ok(())
    }

    /// Remove and return the oldest byte
    #[inline]
    pub fn pop(&mut self) -> Result<u8> {
        if self.is_empty() {
            return Err(Error::new(ErrorKind::BufferUnderflow).at_offset(self.start));
        }
        let byte = self.storage[self.start];
        self.start = advance(self.start, self.capacity());
        Ok(byte)
    }

    /// Byte at `offset` past `start` without consuming it
    #[inline]
    pub fn peek(&self, offset: usize) -> Option<u8> {
        if offset >= self.len() {
            return None;
        }
        Some(self.storage[advance_by(self.start, offset, self.capacity())])
    }

    /// Append `bytes`, writing up to the physical end and continuing from zero
    ///
    /// All-or-nothing: fails with `BufferOverflow` before touching the arena
    /// when the slice does not fit.
    pub fn write_slice(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.len() > self.space() {
            return Err(Error::new(ErrorKind::BufferOverflow).at_offset(self.stop));
        }
        self.stop = self.copy_in(self.stop, bytes);
        Ok(())
    }

    /// Fill `dst` from the front of the ring, consuming the bytes
    pub fn read_slice(&mut self, dst: &mut [u8]) -> Result<()> {
        if dst.len() > self.len() {
            return Err(Error::new(ErrorKind::BufferUnderflow).at_offset(self.start));
        }
        self.start = self.copy_out(self.start, dst);
        Ok(())
    }

    /// The occupied region as two contiguous halves
    ///
    /// The second half is empty unless the data wraps past the physical end.
    pub fn as_slices(&self) -> (&[u8], &[u8]) {
        if self.start <= self.stop {
            (&self.storage[self.start..self.stop], &[])
        } else {
            (&self.storage[self.start..], &self.storage[..self.stop])
        }
    }

    /// Copy the occupied region into a vector
    pub fn to_vec(&self) -> Vec<u8> {
        let (head, tail) = self.as_slices();
        let mut out = Vec::with_capacity(head.len() + tail.len());
        out.extend_from_slice(head);
        out.extend_from_slice(tail);
        out
    }

    /// Discard all buffered data
    #[inline]
    pub fn reset(&mut self) {
        self.start = 0;
        self.stop = 0;
    }

    /// Discard all buffered data and place both cursors at `position`
    pub fn reset_to(&mut self, position: usize) -> Result<()> {
        if position >= self.capacity() {
            return Err(Error::new(ErrorKind::InvalidIndex).at_offset(position));
        }
        self.start = position;
        self.stop = position;
        Ok(())
    }

    #[inline]
    pub(crate) fn byte_at(&self, position: usize) -> u8 {
        self.storage[position]
    }

    #[inline]
    pub(crate) fn set_byte(&mut self, position: usize, byte: u8) {
        self.storage[position] = byte;
    }

    #[inline]
    pub(crate) fn set_start(&mut self, start: usize) {
        debug_assert!(start < self.capacity());
        self.start = start;
    }

    #[inline]
    pub(crate) fn set_stop(&mut self, stop: usize) {
        debug_assert!(stop < self.capacity());
        self.stop = stop;
    }

    /// Copy `bytes` into the arena at `at`, wrapping; returns the new cursor
    fn copy_in(&mut self, at: usize, bytes: &[u8]) -> usize {
        let capacity = self.capacity();
        let first = bytes.len().min(capacity - at);
        self.storage[at..at + first].copy_from_slice(&bytes[..first]);
        let rest = bytes.len() - first;
        self.storage[..rest].copy_from_slice(&bytes[first..]);
        advance_by(at, bytes.len(), capacity)
    }

    /// Copy out of the arena from `at`, wrapping; returns the new cursor
    fn copy_out(&self, at: usize, dst: &mut [u8]) -> usize {
        let capacity = self.capacity();
        let first = dst.len().min(capacity - at);
        dst[..first].copy_from_slice(&self.storage[at..at + first]);
        let rest = dst.len() - first;
        dst[first..].copy_from_slice(&self.storage[..rest]);
        advance_by(at, dst.len(), capacity)
    }
}
