//! Big-endian tag payload codec.

use bytes::{Buf, BufMut};

use crate::error::NbtError;
use crate::tag::{NbtCompound, NbtString, NbtTag, TagType};

const MAX_DEPTH: usize = 512;

// -----------------------------------------------------------------------
// Reading
// -----------------------------------------------------------------------

/// Read the root type byte. `false` means TAG_End (no tree present).
pub(crate) fn read_root_marker(buf: &mut impl Buf) -> Result<bool, NbtError> {
    match read_type(buf)? {
        TagType::End => Ok(false),
        TagType::Compound => Ok(true),
        other => Err(NbtError::RootNotCompound(other)),
    }
}

fn read_type(buf: &mut impl Buf) -> Result<TagType, NbtError> {
    need(buf, 1)?;
    TagType::try_from(buf.get_u8())
}

fn read_payload(buf: &mut impl Buf, ty: TagType, depth: usize) -> Result<NbtTag, NbtError> {
    if depth > MAX_DEPTH {
        return Err(NbtError::TooDeep { limit: MAX_DEPTH });
    }

    Ok(match ty {
        TagType::End => return Err(NbtError::UnknownTagType(TagType::End as u8)),
        TagType::Byte => {
            need(buf, 1)?;
            NbtTag::Byte(buf.get_i8())
        }
        TagType::Short => {
            need(buf, 2)?;
            NbtTag::Short(buf.get_i16())
        }
        TagType::Int => {
            need(buf, 4)?;
            NbtTag::Int(buf.get_i32())
        }
        TagType::Long => {
            need(buf, 8)?;
            NbtTag::Long(buf.get_i64())
        }
        TagType::Float => {
            need(buf, 4)?;
            NbtTag::Float(buf.get_f32())
        }
        TagType::Double => {
            need(buf, 8)?;
            NbtTag::Double(buf.get_f64())
        }
        TagType::ByteArray => NbtTag::ByteArray(read_numbers(buf, 1, |b| b.get_i8())?),
        TagType::String => NbtTag::String(NbtString::from_java_bytes(read_java_bytes(buf)?)),
        TagType::List => {
            let element = read_type(buf)?;
            let len = read_array_len(buf)?;
            if element == TagType::End && len > 0 {
                return Err(NbtError::EndList(len));
            }
            let mut items = Vec::with_capacity(len.min(buf.remaining()));
            for _ in 0..len {
                items.push(read_payload(buf, element, depth + 1)?);
            }
            NbtTag::List { element, items }
        }
        TagType::Compound => NbtTag::Compound(read_compound(buf, depth + 1)?),
        TagType::IntArray => NbtTag::IntArray(read_numbers(buf, 4, |b| b.get_i32())?),
        TagType::LongArray => NbtTag::LongArray(read_numbers(buf, 8, |b| b.get_i64())?),
    })
}

/// Body of a compound: named entries up to TAG_End.
pub(crate) fn read_compound(buf: &mut impl Buf, depth: usize) -> Result<NbtCompound, NbtError> {
    if depth > MAX_DEPTH {
        return Err(NbtError::TooDeep { limit: MAX_DEPTH });
    }
    let mut compound = NbtCompound::new();
    loop {
        let ty = read_type(buf)?;
        if ty == TagType::End {
            return Ok(compound);
        }
        let name = read_string(buf)?;
        let tag = read_payload(buf, ty, depth)?;
        compound.insert(name, tag);
    }
}

fn read_numbers<B: Buf, T>(buf: &mut B, width: usize, mut get: impl FnMut(&mut B) -> T) -> Result<Vec<T>, NbtError> {
    let len = read_array_len(buf)?;
    need(buf, len.saturating_mul(width))?;
    Ok((0..len).map(|_| get(buf)).collect())
}

fn read_array_len(buf: &mut impl Buf) -> Result<usize, NbtError> {
    need(buf, 4)?;
    let len = buf.get_i32();
    usize::try_from(len).map_err(|_| NbtError::NegativeLength(len))
}

/// u16-length prefixed modified UTF-8, left undecoded.
fn read_java_bytes(buf: &mut impl Buf) -> Result<Vec<u8>, NbtError> {
    need(buf, 2)?;
    let len = buf.get_u16() as usize;
    need(buf, len)?;
    Ok(buf.copy_to_bytes(len).to_vec())
}

/// Entry and root names, decoded from modified UTF-8.
pub(crate) fn read_string(buf: &mut impl Buf) -> Result<String, NbtError> {
    let bytes = read_java_bytes(buf)?;
    Ok(NbtString::from_java_bytes(bytes).to_str()?.into_owned())
}

fn need(buf: &impl Buf, needed: usize) -> Result<(), NbtError> {
    let remaining = buf.remaining();
    if remaining < needed {
        return Err(NbtError::Truncated { needed, remaining });
    }
    Ok(())
}

// -----------------------------------------------------------------------
// Writing
// -----------------------------------------------------------------------

fn write_payload(buf: &mut impl BufMut, tag: &NbtTag) {
    match tag {
        NbtTag::Byte(v) => buf.put_i8(*v),
        NbtTag::Short(v) => buf.put_i16(*v),
        NbtTag::Int(v) => buf.put_i32(*v),
        NbtTag::Long(v) => buf.put_i64(*v),
        NbtTag::Float(v) => buf.put_f32(*v),
        NbtTag::Double(v) => buf.put_f64(*v),
        NbtTag::ByteArray(values) => {
            buf.put_i32(values.len() as i32);
            values.iter().for_each(|&v| buf.put_i8(v));
        }
        NbtTag::String(s) => write_java_bytes(buf, s.as_java_bytes()),
        NbtTag::List { element, items } => {
            let element = items.first().map_or(*element, NbtTag::tag_type);
            write_type(buf, element);
            buf.put_i32(items.len() as i32);
            for item in items {
                write_payload(buf, item);
            }
        }
        NbtTag::Compound(compound) => write_compound(buf, compound),
        NbtTag::IntArray(values) => {
            buf.put_i32(values.len() as i32);
            values.iter().for_each(|&v| buf.put_i32(v));
        }
        NbtTag::LongArray(values) => {
            buf.put_i32(values.len() as i32);
            values.iter().for_each(|&v| buf.put_i64(v));
        }
    }
}

pub(crate) fn write_type(buf: &mut impl BufMut, ty: TagType) {
    buf.put_u8(ty as u8);
}

pub(crate) fn write_compound(buf: &mut impl BufMut, compound: &NbtCompound) {
    for (name, tag) in compound {
        write_type(buf, tag.tag_type());
        write_string(buf, name);
        write_payload(buf, tag);
    }
    write_type(buf, TagType::End);
}

fn write_java_bytes(buf: &mut impl BufMut, bytes: &[u8]) {
    buf.put_u16(bytes.len() as u16);
    buf.put_slice(bytes);
}

pub(crate) fn write_string(buf: &mut impl BufMut, s: &str) {
    write_java_bytes(buf, &cesu8::to_java_cesu8(s));
}
