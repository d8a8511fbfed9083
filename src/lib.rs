//! slotcodec: typed parameter lists over a fixed ring buffer
//!
//! This crate encodes ordered, typed argument lists into a circular byte
//! buffer and decodes them back, for small devices that exchange messages
//! without blocking and without allocating per byte.
//!
//! Both ends agree on a parameter descriptor out of band. Nothing describing
//! the types is transmitted; the byte stream is just the fields followed by a
//! 16-bit rolling hash.
//!
//! # Message Format
//!
//! ```text
//! +---------+---------+-----+---------+-------------------+
//! | field 0 | field 1 | ... | field N | hash u16 (LE)     |
//! +---------+---------+-----+---------+-------------------+
//!
//! scalars   little-endian, fixed width
//! varints   7-bit groups, low first, 0x80 set on the last byte
//! STR       UTF-8 bytes then NUL
//! ADR       fixed width, zero padded
//! AR*       count x element width
//! BSC       nested fields + nested hash
//! OBJ       length prefix (1/2/4/8 bytes) + payload
//! ```
//!
//! # Features
//!
//! - Ring buffer arena with wraparound reads and writes
//! - 31 field types: scalars, varints, strings, arrays, nested messages, objects
//! - Rolling hash that catches every single-byte corruption
//! - Receive state machine with streaming decode, locking and sessions
//! - Bell / acknowledge / connect control signals
//! - `no_std` support with `alloc`
//!
//! # Example
//!
//! ```rust
//! use slotcodec::*;
//!
//! let mut ring = RingBuffer::new(64)?;
//! let params = Params::builder()
//!     .str(5)
//!     .push(TypeTag::Si4)
//!     .build()?;
//!
//! let size = Encoder::new(&mut ring).encode(&params, &[Value::str("abcd"), Value::I32(-7)])?;
//! assert_eq!(size, 5 + 4 + 2);
//!
//! let values = Decoder::new(&mut ring).decode(&params)?;
//! assert_eq!(values, [Value::str("abcd"), Value::I32(-7)]);
//! # Ok::<(), slotcodec::Error>(())
//! ```

#![no_std]
#![deny(unsafe_code)]
#![warn(missing_docs)]

#[cfg(feature = "std")]
extern crate std;

extern crate alloc;

pub mod config;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod hash;
pub mod params;
pub mod ring;
pub mod signal;
pub mod types;
pub mod value;
pub mod varint;

// Re-export main types
pub use config::CodecConfig;
pub use decoder::{Decoder, State};
pub use encoder::Encoder;
pub use error::{Error, ErrorKind, Result};
pub use hash::RollingHash;
pub use params::{Param, Params, ParamsBuilder, Qualifier};
pub use ring::RingBuffer;
pub use signal::{ack_back, connect, connect_with_config, read_signal, ring_bell, Signal};
pub use types::{ObjSize, TypeTag};
pub use value::{ArrayValue, Value};

/// Control byte announcing a peer
pub const BEL: u8 = 7;

/// Control byte acknowledging a peer
pub const ACK: u8 = 6;
