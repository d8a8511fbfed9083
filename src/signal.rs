//! Control signals
//!
//! Bell and acknowledge are single control bytes followed by the raw address,
//! with no terminator and no hash. They are written whole or not at all.

use alloc::string::String;

use tracing::debug;

use crate::config::CodecConfig;
use crate::encoder::Encoder;
use crate::error::{Error, ErrorKind, Result};
use crate::params::Params;
use crate::ring::RingBuffer;
use crate::value::Value;
use crate::{ACK, BEL};

/// A control signal read back from a ring
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    /// BEL followed by the sender's address
    Bell(String),
    /// ACK followed by the sender's address
    Ack(String),
}

impl Signal {
    /// Address carried by the signal
    pub fn address(&self) -> &str {
        match self {
            Signal::Bell(address) | Signal::Ack(address) => address,
        }
    }
}

/// Write BEL followed by `address`
pub fn ring_bell(ring: &mut RingBuffer, address: &str) -> Result<()> {
    write_signal(ring, BEL, address)
}

/// Write ACK followed by `address`
pub fn ack_back(ring: &mut RingBuffer, address: &str) -> Result<()> {
    write_signal(ring, ACK, address)
}

fn write_signal(ring: &mut RingBuffer, control: u8, address: &str) -> Result<()> {
    let bytes = address.as_bytes();
    if bytes.contains(&0) {
        return Err(Error::new(ErrorKind::InvalidArgument));
    }
    if bytes.len() + 1 > ring.space() {
        return Err(Error::new(ErrorKind::BufferOverflow).at_offset(ring.stop()));
    }
    ring.push(control)?;
    ring.write_slice(bytes)?;
    debug!(control, address, "signal sent");
    Ok(())
}

/// Encode a connect record: the address and a BEL marker as two address fields
///
/// Fields use the default address width. Returns the number of bytes written.
pub fn connect(ring: &mut RingBuffer, address: &str) -> Result<usize> {
    connect_with_config(ring, address, CodecConfig::default())
}

/// Encode a connect record at `config.max_address_length`
///
/// Pair with a decoder built by
/// [`Decoder::session_with_config`](crate::Decoder::session_with_config)
/// using the same address width.
pub fn connect_with_config(
    ring: &mut RingBuffer,
    address: &str,
    config: CodecConfig,
) -> Result<usize> {
    let record = Params::builder().address().address().build()?;
    let marker = String::from(char::from(BEL));
    Encoder::with_config(ring, config)
        .encode(&record, &[Value::address(address), Value::Address(marker)])
}

/// Consume a bell or acknowledge signal
///
/// Everything buffered after the control byte is taken as the address.
pub fn read_signal(ring: &mut RingBuffer) -> Result<Signal> {
    let control = ring
        .peek(0)
        .ok_or(Error::new(ErrorKind::BufferUnderflow).at_offset(ring.start()))?;
    if control != BEL && control != ACK {
        return Err(Error::new(ErrorKind::InvalidType).at_offset(ring.start()));
    }

    let at = ring.start();
    let mut bytes = ring.to_vec();
    bytes.remove(0);
    let address = String::from_utf8(bytes).map_err(|_| Error::new(ErrorKind::Utf8).at_offset(at))?;

    ring.set_start(ring.stop());
    Ok(if control == BEL {
        Signal::Bell(address)
    } else {
        Signal::Ack(address)
    })
}
