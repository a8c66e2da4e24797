//! Data-driven field codecs for pipeline operations.
//!
//! A [`FieldType`] reads a [`Value`]; writing that value back with a
//! different but compatible [`FieldType`] performs the conversion (integer
//! width changes, legacy vs packed positions, named vs nameless tag roots).

use bytes::{Buf, BufMut};
use mc_via_nbt::{read_nameless_nbt, read_nbt, write_nameless_nbt, write_nbt, NbtCompound, NbtRoot};
use mc_via_proto::codec::{read_array, read_string, write_array, write_string};
use mc_via_proto::types::{BlockPos, ChunkPos, VarInt, VarLong};
use mc_via_proto::{ProtoDecode, ProtoEncode};

use crate::error::RewriteError;
use crate::item::{read_item, read_item_array, write_item, write_item_array, ArrayLength, ItemFormat, ItemStack};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Bool,
    Byte,
    UByte,
    Short,
    UShort,
    Int,
    Long,
    Float,
    Double,
    VarInt,
    VarLong,
    String,
    StringArray,
    /// 1.14+ packed position.
    Position,
    /// Pre-1.14 packed position.
    LegacyPosition,
    ChunkPosition,
    Nbt,
    NamelessNbt,
    Item(ItemFormat),
    ItemArray(ItemFormat, ArrayLength),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Byte(i8),
    UByte(u8),
    Short(i16),
    UShort(u16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    VarInt(i32),
    VarLong(i64),
    String(String),
    StringArray(Vec<String>),
    Position(BlockPos),
    ChunkPosition(ChunkPos),
    Nbt(Option<NbtRoot>),
    NamelessNbt(Option<NbtCompound>),
    Item(Option<ItemStack>),
    ItemArray(Vec<Option<ItemStack>>),
}

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Byte(_) => "byte",
            Value::UByte(_) => "ubyte",
            Value::Short(_) => "short",
            Value::UShort(_) => "ushort",
            Value::Int(_) => "int",
            Value::Long(_) => "long",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::VarInt(_) => "varint",
            Value::VarLong(_) => "varlong",
            Value::String(_) => "string",
            Value::StringArray(_) => "string array",
            Value::Position(_) => "position",
            Value::ChunkPosition(_) => "chunk position",
            Value::Nbt(_) => "nbt",
            Value::NamelessNbt(_) => "nameless nbt",
            Value::Item(_) => "item",
            Value::ItemArray(_) => "item array",
        }
    }

    /// Any integer value widened to i64.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Byte(v) => Some(v.into()),
            Value::UByte(v) => Some(v.into()),
            Value::Short(v) => Some(v.into()),
            Value::UShort(v) => Some(v.into()),
            Value::Int(v) | Value::VarInt(v) => Some(v.into()),
            Value::Long(v) | Value::VarLong(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Float(v) => Some(v.into()),
            Value::Double(v) => Some(v),
            _ => None,
        }
    }
}

impl FieldType {
    pub fn kind(&self) -> &'static str {
        match self {
            FieldType::Bool => "bool",
            FieldType::Byte => "byte",
            FieldType::UByte => "ubyte",
            FieldType::Short => "short",
            FieldType::UShort => "ushort",
            FieldType::Int => "int",
            FieldType::Long => "long",
            FieldType::Float => "float",
            FieldType::Double => "double",
            FieldType::VarInt => "varint",
            FieldType::VarLong => "varlong",
            FieldType::String => "string",
            FieldType::StringArray => "string array",
            FieldType::Position => "position",
            FieldType::LegacyPosition => "legacy position",
            FieldType::ChunkPosition => "chunk position",
            FieldType::Nbt => "nbt",
            FieldType::NamelessNbt => "nameless nbt",
            FieldType::Item(_) => "item",
            FieldType::ItemArray(..) => "item array",
        }
    }

    pub fn read(&self, buf: &mut impl Buf) -> Result<Value, RewriteError> {
        Ok(match *self {
            FieldType::Bool => Value::Bool(bool::proto_decode(buf)?),
            FieldType::Byte => Value::Byte(i8::proto_decode(buf)?),
            FieldType::UByte => Value::UByte(u8::proto_decode(buf)?),
            FieldType::Short => Value::Short(i16::proto_decode(buf)?),
            FieldType::UShort => Value::UShort(u16::proto_decode(buf)?),
            FieldType::Int => Value::Int(i32::proto_decode(buf)?),
            FieldType::Long => Value::Long(i64::proto_decode(buf)?),
            FieldType::Float => Value::Float(f32::proto_decode(buf)?),
            FieldType::Double => Value::Double(f64::proto_decode(buf)?),
            FieldType::VarInt => Value::VarInt(VarInt::proto_decode(buf)?.0),
            FieldType::VarLong => Value::VarLong(VarLong::proto_decode(buf)?.0),
            FieldType::String => Value::String(read_string(buf)?),
            FieldType::StringArray => Value::StringArray(read_array(buf)?),
            FieldType::Position => Value::Position(BlockPos::proto_decode(buf)?),
            FieldType::LegacyPosition => Value::Position(BlockPos::from_legacy_packed(i64::proto_decode(buf)?)),
            FieldType::ChunkPosition => Value::ChunkPosition(ChunkPos::proto_decode(buf)?),
            FieldType::Nbt => Value::Nbt(read_nbt(buf)?),
            FieldType::NamelessNbt => Value::NamelessNbt(read_nameless_nbt(buf)?),
            FieldType::Item(format) => Value::Item(read_item(buf, format)?),
            FieldType::ItemArray(format, length) => Value::ItemArray(read_item_array(buf, format, length)?),
        })
    }

    pub fn write(&self, buf: &mut impl BufMut, value: &Value) -> Result<(), RewriteError> {
        let mismatch = || RewriteError::TypeMismatch {
            expected: self.kind(),
            got: value.kind(),
        };
        match (*self, value) {
            (FieldType::Bool, Value::Bool(v)) => v.proto_encode(buf),
            (FieldType::Float, v) => (v.as_f64().ok_or_else(mismatch)? as f32).proto_encode(buf),
            (FieldType::Double, v) => v.as_f64().ok_or_else(mismatch)?.proto_encode(buf),
            (FieldType::String, Value::String(s)) => write_string(buf, s),
            (FieldType::StringArray, Value::StringArray(items)) => write_array(buf, items),
            (FieldType::Position, Value::Position(pos)) => pos.proto_encode(buf),
            (FieldType::LegacyPosition, Value::Position(pos)) => pos.to_legacy_packed().proto_encode(buf),
            (FieldType::ChunkPosition, Value::ChunkPosition(pos)) => pos.proto_encode(buf),
            (FieldType::Nbt, Value::Nbt(root)) => write_nbt(buf, root.as_ref()),
            (FieldType::Nbt, Value::NamelessNbt(compound)) => {
                write_nbt(buf, compound.clone().map(NbtRoot::from).as_ref())
            }
            (FieldType::NamelessNbt, Value::NamelessNbt(compound)) => write_nameless_nbt(buf, compound.as_ref()),
            (FieldType::NamelessNbt, Value::Nbt(root)) => {
                write_nameless_nbt(buf, root.as_ref().map(|root| &root.compound))
            }
            (FieldType::Item(format), Value::Item(item)) => write_item(buf, format, item.as_ref())?,
            (FieldType::ItemArray(format, length), Value::ItemArray(items)) => {
                write_item_array(buf, format, length, items)?
            }
            (ty, v) => match v.as_i64() {
                Some(n) => ty.write_integer(buf, n).ok_or_else(mismatch)?,
                None => return Err(mismatch()),
            },
        }
        Ok(())
    }

    /// Write an integer in this field's width. `None` if this is not an
    /// integer field or `n` does not fit.
    fn write_integer(&self, buf: &mut impl BufMut, n: i64) -> Option<()> {
        match self {
            FieldType::Byte => i8::try_from(n).ok()?.proto_encode(buf),
            FieldType::UByte => u8::try_from(n).ok()?.proto_encode(buf),
            FieldType::Short => i16::try_from(n).ok()?.proto_encode(buf),
            FieldType::UShort => u16::try_from(n).ok()?.proto_encode(buf),
            FieldType::Int => i32::try_from(n).ok()?.proto_encode(buf),
            FieldType::VarInt => VarInt(i32::try_from(n).ok()?).proto_encode(buf),
            FieldType::Long => n.proto_encode(buf),
            FieldType::VarLong => VarLong(n).proto_encode(buf),
            _ => return None,
        }
        Some(())
    }
}
