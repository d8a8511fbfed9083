//! Parameter descriptors
//!
//! A descriptor is the agreed, out-of-band schema of one message: an ordered
//! list of type tags with their qualifiers. Both ends build the same
//! descriptor; nothing about it is transmitted.
//!
//! Descriptors can be built in code with [`ParamsBuilder`], or parsed from the
//! flat numeric header form:
//!
//! ```text
//! [count, code, (qualifier words)..., code, ...]
//!
//! STR/ST2/ST4  code, max_len
//! ADR          code                 (default width)
//! AR1..AR8     code, element_code, count
//! BSC          code, <nested header>
//! OBJ          code | width << 5, max_len
//! ```

use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::config::DEFAULT_MAX_PARAMS;
use crate::error::{Error, ErrorKind, Result};
use crate::types::{ObjSize, TypeTag, OBJ_WIDTH_SHIFT, TYPE_MASK};

/// Extra information attached to a descriptor entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Qualifier {
    /// No qualifier
    None,
    /// Maximum string length (STR/ST2/ST4 units, ADR bytes)
    MaxLength(usize),
    /// Array element type and element count
    Array {
        /// Fixed-width scalar tag of each element
        element: TypeTag,
        /// Exact number of elements
        count: usize,
    },
    /// Inner descriptor of a nested sub-message
    Nested(Box<Params>),
    /// Length-prefix width and maximum payload of a generic object
    Object {
        /// Width of the length prefix
        width: ObjSize,
        /// Maximum payload length in bytes
        max_len: usize,
    },
}

/// One descriptor entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    tag: TypeTag,
    qualifier: Qualifier,
}

impl Param {
    /// Entry with an explicit qualifier; checked when the descriptor is built
    pub const fn new(tag: TypeTag, qualifier: Qualifier) -> Self {
        Self { tag, qualifier }
    }

    /// The entry's type tag
    #[inline]
    pub const fn tag(&self) -> TypeTag {
        self.tag
    }

    /// The entry's qualifier
    #[inline]
    pub const fn qualifier(&self) -> &Qualifier {
        &self.qualifier
    }

    /// Declared maximum length, if any
    pub fn max_len(&self) -> Option<usize> {
        match self.qualifier {
            Qualifier::MaxLength(n) => Some(n),
            Qualifier::Object { max_len, .. } => Some(max_len),
            _ => None,
        }
    }

    fn validate(&self) -> Result<()> {
        // Qualifier values travel as u32 header words
        let word = match self.qualifier {
            Qualifier::MaxLength(n) | Qualifier::Object { max_len: n, .. } => n,
            Qualifier::Array { count, .. } => count,
            _ => 0,
        };
        if u32::try_from(word).is_err() {
            return Err(Error::new(match self.qualifier {
                Qualifier::Array { .. } | Qualifier::Object { .. } => ErrorKind::ArrayOverflow,
                _ => ErrorKind::StringOverflow,
            }));
        }

        let ok = match (&self.qualifier, self.tag) {
            (Qualifier::None | Qualifier::MaxLength(_), TypeTag::Adr) => true,
            (Qualifier::MaxLength(_), TypeTag::Str | TypeTag::St2 | TypeTag::St4) => true,
            (Qualifier::Array { element, .. }, tag) => {
                tag.array_element_width().is_some()
                    && element.fixed_width() == tag.array_element_width()
            }
            (Qualifier::Nested(_), TypeTag::Bsc) => true,
            (Qualifier::Object { .. }, TypeTag::Obj) => true,
            (Qualifier::None, tag) => tag.fixed_width().is_some() || tag.varint_max_size().is_some(),
            _ => false,
        };
        if ok {
            Ok(())
        } else {
            Err(Error::new(ErrorKind::InvalidType))
        }
    }
}

impl From<TypeTag> for Param {
    fn from(tag: TypeTag) -> Self {
        Self::new(tag, Qualifier::None)
    }
}

/// A validated descriptor
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Params {
    entries: Vec<Param>,
}

impl Params {
    /// Validate `entries` against the default parameter limit
    pub fn new(entries: Vec<Param>) -> Result<Self> {
        Self::with_limit(entries, DEFAULT_MAX_PARAMS)
    }

    /// Validate `entries` against an explicit parameter limit
    pub fn with_limit(entries: Vec<Param>, max_params: usize) -> Result<Self> {
        if entries.len() > max_params {
            return Err(Error::new(ErrorKind::TooManyParameters).at_index(max_params));
        }
        for (index, param) in entries.iter().enumerate() {
            param.validate().map_err(|e| e.at_index(index))?;
        }
        Ok(Self { entries })
    }

    /// Start building a descriptor
    pub fn builder() -> ParamsBuilder {
        ParamsBuilder::default()
    }

    /// Parse the flat numeric header form
    pub fn parse(header: &[u32]) -> Result<Self> {
        let mut words = header.iter().copied();
        let params = parse_nested(&mut words, 0)?;
        Ok(params)
    }

    /// Flatten back into the numeric header form
    ///
    /// Lossless: validation rejects qualifier values wider than a `u32` word.
    pub fn to_header(&self) -> Vec<u32> {
        let mut out = Vec::new();
        self.write_header(&mut out);
        out
    }

    fn write_header(&self, out: &mut Vec<u32>) {
        out.push(self.entries.len() as u32);
        for param in &self.entries {
            match &param.qualifier {
                Qualifier::None => out.push(param.tag.code()),
                Qualifier::MaxLength(n) => {
                    out.push(param.tag.code());
                    if param.tag != TypeTag::Adr {
                        out.push(*n as u32);
                    }
                }
                Qualifier::Array { element, count } => {
                    out.extend_from_slice(&[param.tag.code(), element.code(), *count as u32]);
                }
                Qualifier::Nested(inner) => {
                    out.push(param.tag.code());
                    inner.write_header(out);
                }
                Qualifier::Object { width, max_len } => {
                    out.extend_from_slice(&[width.code(), *max_len as u32]);
                }
            }
        }
    }

    /// Number of entries
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True for the empty descriptor
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry at `index`
    #[inline]
    pub fn get(&self, index: usize) -> Option<&Param> {
        self.entries.get(index)
    }

    /// Iterate over entries in order
    pub fn iter(&self) -> core::slice::Iter<'_, Param> {
        self.entries.iter()
    }

    /// Deepest BSC nesting level, zero for a flat descriptor
    pub fn depth(&self) -> usize {
        self.entries
            .iter()
            .filter_map(|p| match &p.qualifier {
                Qualifier::Nested(inner) => Some(1 + inner.depth()),
                _ => None,
            })
            .max()
            .unwrap_or(0)
    }
}

impl<'a> IntoIterator for &'a Params {
    type Item = &'a Param;
    type IntoIter = core::slice::Iter<'a, Param>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Parsing recursion cap; deeper headers are rejected as malformed
const MAX_HEADER_DEPTH: usize = 32;

fn parse_nested<I: Iterator<Item = u32>>(words: &mut I, depth: usize) -> Result<Params> {
    if depth > MAX_HEADER_DEPTH {
        return Err(Error::new(ErrorKind::StackOverflow));
    }
    let count = words.next().ok_or(Error::new(ErrorKind::InvalidIndex))? as usize;
    if count > DEFAULT_MAX_PARAMS {
        return Err(Error::new(ErrorKind::TooManyParameters));
    }

    let mut entries = Vec::with_capacity(count);
    for index in 0..count {
        let missing = || Error::new(ErrorKind::InvalidIndex).at_index(index);
        let code = words.next().ok_or_else(missing)?;
        let tag = TypeTag::from_code(code & TYPE_MASK).map_err(|e| e.at_index(index))?;
        if tag != TypeTag::Obj && code > TYPE_MASK {
            return Err(Error::new(ErrorKind::InvalidType).at_index(index));
        }

        let qualifier = match tag {
            TypeTag::Str | TypeTag::St2 | TypeTag::St4 => {
                Qualifier::MaxLength(words.next().ok_or_else(missing)? as usize)
            }
            TypeTag::Ar1 | TypeTag::Ar2 | TypeTag::Ar4 | TypeTag::Ar8 => {
                let element = words.next().ok_or_else(missing)?;
                let element = TypeTag::from_code(element).map_err(|e| e.at_index(index))?;
                let count = words.next().ok_or_else(missing)? as usize;
                Qualifier::Array { element, count }
            }
            TypeTag::Bsc => Qualifier::Nested(Box::new(
                parse_nested(&mut *words, depth + 1).map_err(|e| e.or_index(index))?,
            )),
            TypeTag::Obj => {
                let width = ObjSize::from_selector(code >> OBJ_WIDTH_SHIFT)
                    .ok_or(Error::new(ErrorKind::InvalidType).at_index(index))?;
                let max_len = words.next().ok_or_else(missing)? as usize;
                Qualifier::Object { width, max_len }
            }
            _ => Qualifier::None,
        };
        entries.push(Param::new(tag, qualifier));
    }

    Params::new(entries)
}

/// Fluent descriptor builder
#[derive(Debug, Clone, Default)]
pub struct ParamsBuilder {
    entries: Vec<Param>,
}

impl ParamsBuilder {
    /// Append a tag that takes no qualifier (scalars, varints, NIL, ADR)
    pub fn push(mut self, tag: TypeTag) -> Self {
        self.entries.push(Param::from(tag));
        self
    }

    /// Append an ADR entry using the codec's default address width
    pub fn address(self) -> Self {
        self.push(TypeTag::Adr)
    }

    /// Append an ADR entry with an explicit width
    pub fn address_max(mut self, max_len: usize) -> Self {
        self.entries
            .push(Param::new(TypeTag::Adr, Qualifier::MaxLength(max_len)));
        self
    }

    /// Append a STR entry
    pub fn str(mut self, max_len: usize) -> Self {
        self.entries
            .push(Param::new(TypeTag::Str, Qualifier::MaxLength(max_len)));
        self
    }

    /// Append a ST2 entry
    pub fn str16(mut self, max_len: usize) -> Self {
        self.entries
            .push(Param::new(TypeTag::St2, Qualifier::MaxLength(max_len)));
        self
    }

    /// Append a ST4 entry
    pub fn str32(mut self, max_len: usize) -> Self {
        self.entries
            .push(Param::new(TypeTag::St4, Qualifier::MaxLength(max_len)));
        self
    }

    /// Append a fixed array of `count` elements of type `element`
    ///
    /// The array tag is picked from the element's width.
    pub fn array(mut self, element: TypeTag, count: usize) -> Self {
        let tag = element
            .fixed_width()
            .and_then(TypeTag::array_for_width)
            .unwrap_or(TypeTag::Ar1);
        self.entries
            .push(Param::new(tag, Qualifier::Array { element, count }));
        self
    }

    /// Append a nested sub-message
    pub fn nested(mut self, inner: Params) -> Self {
        self.entries
            .push(Param::new(TypeTag::Bsc, Qualifier::Nested(Box::new(inner))));
        self
    }

    /// Append a size-prefixed object
    pub fn object(mut self, width: ObjSize, max_len: usize) -> Self {
        self.entries
            .push(Param::new(TypeTag::Obj, Qualifier::Object { width, max_len }));
        self
    }

    /// Validate and finish
    pub fn build(self) -> Result<Params> {
        Params::new(self.entries)
    }
}
