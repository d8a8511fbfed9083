//! Wire type tags
//!
//! Tags are schema-time constants shared by both ends of a link. They are
//! never written to the byte stream; they only select how the next field's
//! bytes are laid out.

use core::fmt;

use crate::error::{Error, ErrorKind, Result};

/// Closed set of field types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TypeTag {
    /// No-op placeholder
    Nil = 0,
    /// Fixed-width address string
    Adr = 1,
    /// Null-terminated UTF-8 string
    Str = 2,
    /// Null-terminated UTF-16 string
    St2 = 3,
    /// Null-terminated UTF-32 string
    St4 = 4,
    /// 8-bit signed integer
    Si1 = 5,
    /// 8-bit unsigned integer
    Ui1 = 6,
    /// 8-bit boolean
    Bol = 7,
    /// 16-bit signed integer
    Si2 = 8,
    /// 16-bit unsigned integer
    Ui2 = 9,
    /// 16-bit half-precision float, raw bits
    Hlf = 10,
    /// 32-bit signed integer
    Si4 = 11,
    /// 32-bit unsigned integer
    Ui4 = 12,
    /// 32-bit float
    Flt = 13,
    /// 32-bit timestamp in seconds
    Tms = 14,
    /// 64-bit signed integer
    Si8 = 15,
    /// 64-bit unsigned integer
    Ui8 = 16,
    /// 64-bit float
    Dbl = 17,
    /// 64-bit timestamp
    Tmu = 18,
    /// 16-bit signed varint
    Sv2 = 19,
    /// 16-bit unsigned varint
    Uv2 = 20,
    /// 32-bit signed varint
    Sv4 = 21,
    /// 32-bit unsigned varint
    Uv4 = 22,
    /// 64-bit signed varint
    Sv8 = 23,
    /// 64-bit unsigned varint
    Uv8 = 24,
    /// Array of 1-byte elements
    Ar1 = 25,
    /// Array of 2-byte elements
    Ar2 = 26,
    /// Array of 4-byte elements
    Ar4 = 27,
    /// Array of 8-byte elements
    Ar8 = 28,
    /// Nested sub-message
    Bsc = 29,
    /// Size-prefixed generic object
    Obj = 31,
}

/// Mask selecting the tag bits of a numeric type code
pub const TYPE_MASK: u32 = 0x1F;

/// Shift of the object size-width bits in a numeric type code
pub const OBJ_WIDTH_SHIFT: u32 = 5;

impl TypeTag {
    /// All tags in code order
    pub const ALL: [TypeTag; 31] = [
        TypeTag::Nil,
        TypeTag::Adr,
        TypeTag::Str,
        TypeTag::St2,
        TypeTag::St4,
        TypeTag::Si1,
        TypeTag::Ui1,
        TypeTag::Bol,
        TypeTag::Si2,
        TypeTag::Ui2,
        TypeTag::Hlf,
        TypeTag::Si4,
        TypeTag::Ui4,
        TypeTag::Flt,
        TypeTag::Tms,
        TypeTag::Si8,
        TypeTag::Ui8,
        TypeTag::Dbl,
        TypeTag::Tmu,
        TypeTag::Sv2,
        TypeTag::Uv2,
        TypeTag::Sv4,
        TypeTag::Uv4,
        TypeTag::Sv8,
        TypeTag::Uv8,
        TypeTag::Ar1,
        TypeTag::Ar2,
        TypeTag::Ar4,
        TypeTag::Ar8,
        TypeTag::Bsc,
        TypeTag::Obj,
    ];

    /// Look up a tag by its code (the low five bits of a type word)
    pub fn from_code(code: u32) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|tag| *tag as u32 == code)
            .ok_or(Error::new(ErrorKind::InvalidType))
    }

    /// Numeric code of the tag
    #[inline]
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Three-letter mnemonic
    pub const fn name(self) -> &'static str {
        match self {
            TypeTag::Nil => "NIL",
            TypeTag::Adr => "ADR",
            TypeTag::Str => "STR",
            TypeTag::St2 => "ST2",
            TypeTag::St4 => "ST4",
            TypeTag::Si1 => "SI1",
            TypeTag::Ui1 => "UI1",
            TypeTag::Bol => "BOL",
            TypeTag::Si2 => "SI2",
            TypeTag::Ui2 => "UI2",
            TypeTag::Hlf => "HLF",
            TypeTag::Si4 => "SI4",
            TypeTag::Ui4 => "UI4",
            TypeTag::Flt => "FLT",
            TypeTag::Tms => "TMS",
            TypeTag::Si8 => "SI8",
            TypeTag::Ui8 => "UI8",
            TypeTag::Dbl => "DBL",
            TypeTag::Tmu => "TMU",
            TypeTag::Sv2 => "SV2",
            TypeTag::Uv2 => "UV2",
            TypeTag::Sv4 => "SV4",
            TypeTag::Uv4 => "UV4",
            TypeTag::Sv8 => "SV8",
            TypeTag::Uv8 => "UV8",
            TypeTag::Ar1 => "AR1",
            TypeTag::Ar2 => "AR2",
            TypeTag::Ar4 => "AR4",
            TypeTag::Ar8 => "AR8",
            TypeTag::Bsc => "BSC",
            TypeTag::Obj => "OBJ",
        }
    }

    /// Byte width of fixed-width scalars, `None` for everything else
    pub const fn fixed_width(self) -> Option<usize> {
        match self {
            TypeTag::Nil => Some(0),
            TypeTag::Si1 | TypeTag::Ui1 | TypeTag::Bol => Some(1),
            TypeTag::Si2 | TypeTag::Ui2 | TypeTag::Hlf => Some(2),
            TypeTag::Si4 | TypeTag::Ui4 | TypeTag::Flt | TypeTag::Tms => Some(4),
            TypeTag::Si8 | TypeTag::Ui8 | TypeTag::Dbl | TypeTag::Tmu => Some(8),
            _ => None,
        }
    }

    /// Element width of an array tag
    pub const fn array_element_width(self) -> Option<usize> {
        match self {
            TypeTag::Ar1 => Some(1),
            TypeTag::Ar2 => Some(2),
            TypeTag::Ar4 => Some(4),
            TypeTag::Ar8 => Some(8),
            _ => None,
        }
    }

    /// Array tag holding elements of `width` bytes
    pub const fn array_for_width(width: usize) -> Option<TypeTag> {
        match width {
            1 => Some(TypeTag::Ar1),
            2 => Some(TypeTag::Ar2),
            4 => Some(TypeTag::Ar4),
            8 => Some(TypeTag::Ar8),
            _ => None,
        }
    }

    /// Maximum encoded size of a varint tag
    pub const fn varint_max_size(self) -> Option<usize> {
        match self {
            TypeTag::Sv2 | TypeTag::Uv2 => Some(crate::varint::MAX_VARINT_U16_SIZE),
            TypeTag::Sv4 | TypeTag::Uv4 => Some(crate::varint::MAX_VARINT_U32_SIZE),
            TypeTag::Sv8 | TypeTag::Uv8 => Some(crate::varint::MAX_VARINT_U64_SIZE),
            _ => None,
        }
    }

    /// True for scalars, varints and arrays, whose arguments are plain numbers
    pub const fn is_pod(self) -> bool {
        self.fixed_width().is_some() || self.array_element_width().is_some()
    }

    /// False when the build leaves the tag out
    pub const fn is_enabled(self) -> bool {
        match self {
            TypeTag::St2 => cfg!(feature = "utf16"),
            TypeTag::St4 => cfg!(feature = "utf32"),
            _ => true,
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Width of the length prefix of a generic object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjSize {
    /// 8-bit length prefix
    W8,
    /// 16-bit length prefix
    W16,
    /// 32-bit length prefix
    W32,
    /// 64-bit length prefix
    W64,
}

impl ObjSize {
    /// Size of the prefix in bytes
    #[inline]
    pub const fn bytes(self) -> usize {
        match self {
            ObjSize::W8 => 1,
            ObjSize::W16 => 2,
            ObjSize::W32 => 4,
            ObjSize::W64 => 8,
        }
    }

    /// Largest payload length the prefix can express
    #[inline]
    pub const fn max_len(self) -> u64 {
        match self {
            ObjSize::W8 => u8::MAX as u64,
            ObjSize::W16 => u16::MAX as u64,
            ObjSize::W32 => u32::MAX as u64,
            ObjSize::W64 => u64::MAX,
        }
    }

    /// Two-bit selector stored above the tag bits of an OBJ code
    #[inline]
    pub const fn selector(self) -> u32 {
        match self {
            ObjSize::W8 => 0,
            ObjSize::W16 => 1,
            ObjSize::W32 => 2,
            ObjSize::W64 => 3,
        }
    }

    /// Inverse of [`ObjSize::selector`]
    pub const fn from_selector(selector: u32) -> Option<Self> {
        match selector {
            0 => Some(ObjSize::W8),
            1 => Some(ObjSize::W16),
            2 => Some(ObjSize::W32),
            3 => Some(ObjSize::W64),
            _ => None,
        }
    }

    /// Full numeric type code of an OBJ field with this prefix width
    #[inline]
    pub const fn code(self) -> u32 {
        TypeTag::Obj.code() | (self.selector() << OBJ_WIDTH_SHIFT)
    }
}
