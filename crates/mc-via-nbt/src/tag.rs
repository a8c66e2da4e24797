use std::borrow::Cow;

use indexmap::IndexMap;

use crate::error::NbtError;

/// A compound tag: map of name -> tag, kept in wire order so an untouched
/// tree re-encodes to the same bytes.
pub type NbtCompound = IndexMap<String, NbtTag>;

/// A root compound together with its (usually empty) name.
///
/// Only the named framing carries a name; nameless trees are plain
/// [`NbtCompound`]s.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NbtRoot {
    pub name: String,
    pub compound: NbtCompound,
}

impl NbtRoot {
    pub fn new(name: impl Into<String>, compound: NbtCompound) -> Self {
        Self {
            name: name.into(),
            compound,
        }
    }
}

impl From<NbtCompound> for NbtRoot {
    fn from(compound: NbtCompound) -> Self {
        Self::new("", compound)
    }
}

/// Wire type id preceding every named tag and every list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TagType {
    End = 0,
    Byte = 1,
    Short = 2,
    Int = 3,
    Long = 4,
    Float = 5,
    Double = 6,
    ByteArray = 7,
    String = 8,
    List = 9,
    Compound = 10,
    IntArray = 11,
    LongArray = 12,
}

impl TryFrom<u8> for TagType {
    type Error = NbtError;

    fn try_from(id: u8) -> Result<Self, NbtError> {
        Ok(match id {
            0 => TagType::End,
            1 => TagType::Byte,
            2 => TagType::Short,
            3 => TagType::Int,
            4 => TagType::Long,
            5 => TagType::Float,
            6 => TagType::Double,
            7 => TagType::ByteArray,
            8 => TagType::String,
            9 => TagType::List,
            10 => TagType::Compound,
            11 => TagType::IntArray,
            12 => TagType::LongArray,
            _ => return Err(NbtError::UnknownTagType(id)),
        })
    }
}

/// String payload exactly as sent, in Java's modified UTF-8 (CESU-8 with
/// NUL as `C0 80`). Decoded only when a caller asks for the text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NbtString(Vec<u8>);

impl NbtString {
    pub fn from_java_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_java_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_str(&self) -> Result<Cow<'_, str>, NbtError> {
        cesu8::from_java_cesu8(&self.0).map_err(|_| NbtError::InvalidUtf8)
    }
}

impl From<&str> for NbtString {
    fn from(text: &str) -> Self {
        Self(cesu8::to_java_cesu8(text).into_owned())
    }
}

impl From<String> for NbtString {
    fn from(text: String) -> Self {
        Self::from(text.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NbtTag {
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    ByteArray(Vec<i8>),
    String(NbtString),
    /// Elements share `element`, written once before the length. The type
    /// is kept for empty lists too.
    List { element: TagType, items: Vec<NbtTag> },
    Compound(NbtCompound),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
}

impl NbtTag {
    /// List typed after its first element, or a `TAG_End` list when empty.
    pub fn list(items: Vec<NbtTag>) -> Self {
        let element = items.first().map_or(TagType::End, NbtTag::tag_type);
        NbtTag::List { element, items }
    }

    pub fn tag_type(&self) -> TagType {
        match self {
            NbtTag::Byte(_) => TagType::Byte,
            NbtTag::Short(_) => TagType::Short,
            NbtTag::Int(_) => TagType::Int,
            NbtTag::Long(_) => TagType::Long,
            NbtTag::Float(_) => TagType::Float,
            NbtTag::Double(_) => TagType::Double,
            NbtTag::ByteArray(_) => TagType::ByteArray,
            NbtTag::String(_) => TagType::String,
            NbtTag::List { .. } => TagType::List,
            NbtTag::Compound(_) => TagType::Compound,
            NbtTag::IntArray(_) => TagType::IntArray,
            NbtTag::LongArray(_) => TagType::LongArray,
        }
    }

    /// Byte, short, int or long widened to i64.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            NbtTag::Byte(v) => Some(v.into()),
            NbtTag::Short(v) => Some(v.into()),
            NbtTag::Int(v) => Some(v.into()),
            NbtTag::Long(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        if let NbtTag::Int(v) = *self {
            Some(v)
        } else {
            None
        }
    }

    pub fn as_string(&self) -> Option<&NbtString> {
        if let NbtTag::String(v) = self {
            Some(v)
        } else {
            None
        }
    }

    pub fn as_compound(&self) -> Option<&NbtCompound> {
        if let NbtTag::Compound(v) = self {
            Some(v)
        } else {
            None
        }
    }

    pub fn as_list(&self) -> Option<&[NbtTag]> {
        if let NbtTag::List { items, .. } = self {
            Some(items)
        } else {
            None
        }
    }
}
