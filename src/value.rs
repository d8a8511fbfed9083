//! Argument and result values
//!
//! One [`Value`] fills one descriptor slot. The encoder checks that each
//! value's variant fits the slot's tag; the decoder produces the same
//! variants back.

use alloc::string::String;
use alloc::vec::Vec;

use crate::types::TypeTag;

/// Elements of a fixed array, stored as raw little-endian words
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArrayValue {
    /// 1-byte elements (AR1)
    U8(Vec<u8>),
    /// 2-byte elements (AR2)
    U16(Vec<u16>),
    /// 4-byte elements (AR4)
    U32(Vec<u32>),
    /// 8-byte elements (AR8)
    U64(Vec<u64>),
}

impl ArrayValue {
    /// Number of elements
    pub fn len(&self) -> usize {
        match self {
            ArrayValue::U8(v) => v.len(),
            ArrayValue::U16(v) => v.len(),
            ArrayValue::U32(v) => v.len(),
            ArrayValue::U64(v) => v.len(),
        }
    }

    /// True when the array holds no elements
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Byte width of one element
    pub const fn element_width(&self) -> usize {
        match self {
            ArrayValue::U8(_) => 1,
            ArrayValue::U16(_) => 2,
            ArrayValue::U32(_) => 4,
            ArrayValue::U64(_) => 8,
        }
    }

    /// Element `i` widened to 64 bits
    pub(crate) fn word(&self, i: usize) -> u64 {
        match self {
            ArrayValue::U8(v) => v[i] as u64,
            ArrayValue::U16(v) => v[i] as u64,
            ArrayValue::U32(v) => v[i] as u64,
            ArrayValue::U64(v) => v[i],
        }
    }

    /// Empty array of the given element width
    pub(crate) fn with_width(width: usize, count: usize) -> Option<Self> {
        match width {
            1 => Some(ArrayValue::U8(Vec::with_capacity(count))),
            2 => Some(ArrayValue::U16(Vec::with_capacity(count))),
            4 => Some(ArrayValue::U32(Vec::with_capacity(count))),
            8 => Some(ArrayValue::U64(Vec::with_capacity(count))),
            _ => None,
        }
    }

    /// Append a word, truncating it to the element width
    pub(crate) fn push_word(&mut self, word: u64) {
        match self {
            ArrayValue::U8(v) => v.push(word as u8),
            ArrayValue::U16(v) => v.push(word as u16),
            ArrayValue::U32(v) => v.push(word as u32),
            ArrayValue::U64(v) => v.push(word),
        }
    }
}

/// A single argument or decoded field
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// NIL placeholder
    Nil,
    /// ADR address string
    Address(String),
    /// STR UTF-8 string
    Str(String),
    /// ST2 string, carried as UTF-16 on the wire
    Str16(String),
    /// ST4 string, carried as UTF-32 on the wire
    Str32(String),
    /// SI1
    I8(i8),
    /// UI1
    U8(u8),
    /// BOL
    Bool(bool),
    /// SI2 or SV2
    I16(i16),
    /// UI2 or UV2
    U16(u16),
    /// HLF raw half-precision bits
    Half(u16),
    /// SI4 or SV4
    I32(i32),
    /// UI4 or UV4
    U32(u32),
    /// FLT
    F32(f32),
    /// TMS seconds
    Timestamp32(i32),
    /// SI8 or SV8
    I64(i64),
    /// UI8 or UV8
    U64(u64),
    /// DBL
    F64(f64),
    /// TMU
    Timestamp64(i64),
    /// AR1 to AR8
    Array(ArrayValue),
    /// BSC nested sub-message arguments
    Args(Vec<Value>),
    /// OBJ payload; the length prefix is derived from it
    Object(Vec<u8>),
}

impl Value {
    /// Build an ADR value
    pub fn address(address: impl Into<String>) -> Self {
        Value::Address(address.into())
    }

    /// Build a STR value
    pub fn str(text: impl Into<String>) -> Self {
        Value::Str(text.into())
    }

    /// Short name of the variant, for log lines
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Address(_) => "address",
            Value::Str(_) => "str",
            Value::Str16(_) => "str16",
            Value::Str32(_) => "str32",
            Value::I8(_) => "i8",
            Value::U8(_) => "u8",
            Value::Bool(_) => "bool",
            Value::I16(_) => "i16",
            Value::U16(_) => "u16",
            Value::Half(_) => "half",
            Value::I32(_) => "i32",
            Value::U32(_) => "u32",
            Value::F32(_) => "f32",
            Value::Timestamp32(_) => "timestamp32",
            Value::I64(_) => "i64",
            Value::U64(_) => "u64",
            Value::F64(_) => "f64",
            Value::Timestamp64(_) => "timestamp64",
            Value::Array(_) => "array",
            Value::Args(_) => "args",
            Value::Object(_) => "object",
        }
    }

    /// True when this value may fill a slot of type `tag`
    pub fn fits(&self, tag: TypeTag) -> bool {
        matches!(
            (tag, self),
            (TypeTag::Nil, Value::Nil)
                | (TypeTag::Adr, Value::Address(_))
                | (TypeTag::Str, Value::Str(_))
                | (TypeTag::St2, Value::Str16(_))
                | (TypeTag::St4, Value::Str32(_))
                | (TypeTag::Si1, Value::I8(_))
                | (TypeTag::Ui1, Value::U8(_))
                | (TypeTag::Bol, Value::Bool(_))
                | (TypeTag::Si2 | TypeTag::Sv2, Value::I16(_))
                | (TypeTag::Ui2 | TypeTag::Uv2, Value::U16(_))
                | (TypeTag::Hlf, Value::Half(_))
                | (TypeTag::Si4 | TypeTag::Sv4, Value::I32(_))
                | (TypeTag::Ui4 | TypeTag::Uv4, Value::U32(_))
                | (TypeTag::Flt, Value::F32(_))
                | (TypeTag::Tms, Value::Timestamp32(_))
                | (TypeTag::Si8 | TypeTag::Sv8, Value::I64(_))
                | (TypeTag::Ui8 | TypeTag::Uv8, Value::U64(_))
                | (TypeTag::Dbl, Value::F64(_))
                | (TypeTag::Tmu, Value::Timestamp64(_))
                | (TypeTag::Ar1 | TypeTag::Ar2 | TypeTag::Ar4 | TypeTag::Ar8, Value::Array(_))
                | (TypeTag::Bsc, Value::Args(_))
                | (TypeTag::Obj, Value::Object(_))
        )
    }

    /// Fixed-width scalar as little-endian word, for SI1 through TMU
    pub(crate) fn scalar_bits(&self) -> Option<u64> {
        let bits = match *self {
            Value::Nil => 0,
            Value::I8(v) => v as u8 as u64,
            Value::U8(v) => v as u64,
            Value::Bool(v) => v as u64,
            Value::I16(v) => v as u16 as u64,
            Value::U16(v) | Value::Half(v) => v as u64,
            Value::I32(v) | Value::Timestamp32(v) => v as u32 as u64,
            Value::U32(v) => v as u64,
            Value::F32(v) => v.to_bits() as u64,
            Value::I64(v) | Value::Timestamp64(v) => v as u64,
            Value::U64(v) => v,
            Value::F64(v) => v.to_bits(),
            _ => return None,
        };
        Some(bits)
    }

    /// Rebuild a fixed-width scalar of type `tag` from its little-endian word
    pub(crate) fn from_scalar_bits(tag: TypeTag, bits: u64) -> Option<Self> {
        let value = match tag {
            TypeTag::Nil => Value::Nil,
            TypeTag::Si1 => Value::I8(bits as u8 as i8),
            TypeTag::Ui1 => Value::U8(bits as u8),
            TypeTag::Bol => Value::Bool(bits as u8 != 0),
            TypeTag::Si2 => Value::I16(bits as u16 as i16),
            TypeTag::Ui2 => Value::U16(bits as u16),
            TypeTag::Hlf => Value::Half(bits as u16),
            TypeTag::Si4 => Value::I32(bits as u32 as i32),
            TypeTag::Ui4 => Value::U32(bits as u32),
            TypeTag::Flt => Value::F32(f32::from_bits(bits as u32)),
            TypeTag::Tms => Value::Timestamp32(bits as u32 as i32),
            TypeTag::Si8 => Value::I64(bits as i64),
            TypeTag::Ui8 => Value::U64(bits),
            TypeTag::Dbl => Value::F64(f64::from_bits(bits)),
            TypeTag::Tmu => Value::Timestamp64(bits as i64),
            _ => return None,
        };
        Some(value)
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

value_from! {
    i8 => I8,
    u8 => U8,
    bool => Bool,
    i16 => I16,
    u16 => U16,
    i32 => I32,
    u32 => U32,
    f32 => F32,
    i64 => I64,
    u64 => U64,
    f64 => F64,
    ArrayValue => Array,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.into())
    }
}
