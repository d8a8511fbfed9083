//! Error types for the slotcodec wire protocol
//!
//! Every encode/decode operation stops at the first fault and returns a single
//! [`Error`] carrying the fault kind, the descriptor index being processed and,
//! where it is known, the ring buffer position of the offending byte.

use core::fmt;

/// Kinds of faults reported by the codec
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum ErrorKind {
    /// Not enough free space in the ring buffer to write a field
    #[error("buffer overflow")]
    BufferOverflow,
    /// The ring buffer ran out of data before the message ended
    #[error("buffer underflow")]
    BufferUnderflow,
    /// A varint did not terminate within the maximum byte count of its width
    #[error("varint overflow")]
    VarintOverflow,
    /// The hash trailer did not match the message body
    #[error("invalid hash")]
    InvalidHash,
    /// A descriptor tag was unrecognized or disabled by build configuration
    #[error("invalid type")]
    InvalidType,
    /// A descriptor slot had no matching argument, or a header was truncated
    #[error("invalid index")]
    InvalidIndex,
    /// An argument did not match the tag of its descriptor slot
    #[error("invalid argument")]
    InvalidArgument,
    /// The descriptor exceeds the configured parameter limit
    #[error("too many parameters")]
    TooManyParameters,
    /// Nested sub-messages exceed the configured depth
    #[error("stack overflow")]
    StackOverflow,
    /// More arguments were supplied than the descriptor has slots
    #[error("too many pops")]
    TooManyPops,
    /// A string exceeds its declared maximum length
    #[error("string overflow")]
    StringOverflow,
    /// An array or object payload exceeds its declared size
    #[error("array overflow")]
    ArrayOverflow,
    /// Internal contract violation, such as using a decoder in a terminal state
    #[error("invalid operation")]
    InvalidOperation,
    /// A UTF-8 string field holds invalid UTF-8
    #[error("invalid UTF-8")]
    Utf8,
    /// UTF-16 field is malformed or UTF-16 support is disabled
    #[error("invalid UTF-16")]
    Utf16,
    /// UTF-32 field is malformed or UTF-32 support is disabled
    #[error("invalid UTF-32")]
    Utf32,
    /// The buffer is reserved by another in-flight operation
    #[error("locked")]
    Locked,
    /// The session has not completed its handshake
    #[error("disconnected")]
    Disconnected,
    /// The session record was rejected
    #[error("room error")]
    Room,
}

impl ErrorKind {
    /// Returns a human-readable description of the error kind
    pub const fn description(&self) -> &'static str {
        match self {
            ErrorKind::BufferOverflow => "not enough space in the ring buffer",
            ErrorKind::BufferUnderflow => "ring buffer ran out of data mid-message",
            ErrorKind::VarintOverflow => "varint exceeds the maximum byte count of its width",
            ErrorKind::InvalidHash => "hash trailer does not match the message body",
            ErrorKind::InvalidType => "unrecognized or disabled type tag",
            ErrorKind::InvalidIndex => "descriptor slot has no matching argument",
            ErrorKind::InvalidArgument => "argument does not match its type tag",
            ErrorKind::TooManyParameters => "descriptor exceeds the parameter limit",
            ErrorKind::StackOverflow => "nested messages exceed the depth limit",
            ErrorKind::TooManyPops => "more arguments than descriptor slots",
            ErrorKind::StringOverflow => "string exceeds its maximum length",
            ErrorKind::ArrayOverflow => "array or object exceeds its declared size",
            ErrorKind::InvalidOperation => "operation not valid in the current state",
            ErrorKind::Utf8 => "string field is not valid UTF-8",
            ErrorKind::Utf16 => "UTF-16 field is malformed or unsupported",
            ErrorKind::Utf32 => "UTF-32 field is malformed or unsupported",
            ErrorKind::Locked => "buffer is locked by another operation",
            ErrorKind::Disconnected => "session has not completed its handshake",
            ErrorKind::Room => "session record rejected",
        }
    }
}

/// A codec fault with its location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
#[error("{kind}{}", Location(.index, .offset))]
pub struct Error {
    kind: ErrorKind,
    index: Option<usize>,
    offset: Option<usize>,
}

impl Error {
    /// Create an error with no location attached
    #[inline]
    pub const fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            index: None,
            offset: None,
        }
    }

    /// Attach the descriptor index being processed
    #[inline]
    pub const fn at_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    /// Attach the ring buffer position where the fault was detected
    #[inline]
    pub const fn at_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Attach the descriptor index unless one is already set
    #[inline]
    pub(crate) fn or_index(mut self, index: usize) -> Self {
        if self.index.is_none() {
            self.index = Some(index);
        }
        self
    }

    /// The fault kind
    #[inline]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The descriptor index, if the fault happened inside a field
    #[inline]
    pub const fn index(&self) -> Option<usize> {
        self.index
    }

    /// The ring buffer position, if known
    #[inline]
    pub const fn offset(&self) -> Option<usize> {
        self.offset
    }

    /// Returns a human-readable description of the error
    #[inline]
    pub const fn description(&self) -> &'static str {
        self.kind.description()
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl PartialEq<ErrorKind> for Error {
    fn eq(&self, other: &ErrorKind) -> bool {
        self.kind == *other
    }
}

struct Location<'a>(&'a Option<usize>, &'a Option<usize>);

impl fmt::Display for Location<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(index) = self.0 {
            write!(f, " at param {}", index)?;
        }
        if let Some(offset) = self.1 {
            write!(f, " (buffer offset {})", offset)?;
        }
        Ok(())
    }
}

/// Result type alias for slotcodec operations
pub type Result<T> = core::result::Result<T, Error>;
