//! Protocol encoding/decoding traits and helpers.

use bytes::{Buf, BufMut, Bytes};

use crate::error::ProtoError;
use crate::types::VarInt;

/// Longest string the protocol allows, in UTF-16 units.
pub const MAX_STRING_CHARS: usize = 32767;

/// Encode a value onto a buffer.
pub trait ProtoEncode {
    fn proto_encode(&self, buf: &mut impl BufMut);
}

/// Decode a value from a buffer.
pub trait ProtoDecode: Sized {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError>;
}

/// Fail with [`ProtoError::BufferTooShort`] unless `needed` bytes remain.
pub fn ensure_remaining(buf: &impl Buf, needed: usize) -> Result<(), ProtoError> {
    if buf.remaining() < needed {
        Err(ProtoError::BufferTooShort {
            needed,
            remaining: buf.remaining(),
        })
    } else {
        Ok(())
    }
}

/// Read exactly `len` bytes.
pub fn read_bytes(buf: &mut impl Buf, len: usize) -> Result<Bytes, ProtoError> {
    ensure_remaining(buf, len)?;
    Ok(buf.copy_to_bytes(len))
}

/// Read a VarInt length prefix, rejecting negative values.
pub fn read_len(buf: &mut impl Buf) -> Result<usize, ProtoError> {
    let len = VarInt::proto_decode(buf)?.0;
    if len < 0 {
        return Err(ProtoError::NegativeLength(len));
    }
    Ok(len as usize)
}

/// Write a protocol string (VarInt byte length + UTF-8).
pub fn write_string(buf: &mut impl BufMut, s: &str) {
    VarInt(s.len() as i32).proto_encode(buf);
    buf.put_slice(s.as_bytes());
}

/// Read a protocol string (VarInt byte length + UTF-8).
pub fn read_string(buf: &mut impl Buf) -> Result<String, ProtoError> {
    let len = read_len(buf)?;
    let max = MAX_STRING_CHARS * 3;
    if len > max {
        return Err(ProtoError::StringTooLong { len, max });
    }
    let data = read_bytes(buf, len)?;
    String::from_utf8(data.to_vec()).map_err(|_| ProtoError::InvalidUtf8)
}

/// Read a VarInt-prefixed array.
pub fn read_array<T: ProtoDecode>(buf: &mut impl Buf) -> Result<Vec<T>, ProtoError> {
    let len = read_len(buf)?;
    // Every element takes at least one byte.
    let mut items = Vec::with_capacity(len.min(buf.remaining()));
    for _ in 0..len {
        items.push(T::proto_decode(buf)?);
    }
    Ok(items)
}

/// Write a VarInt-prefixed array.
pub fn write_array<T: ProtoEncode>(buf: &mut impl BufMut, items: &[T]) {
    VarInt(items.len() as i32).proto_encode(buf);
    for item in items {
        item.proto_encode(buf);
    }
}

impl ProtoEncode for String {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        write_string(buf, self);
    }
}

impl ProtoDecode for String {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        read_string(buf)
    }
}

impl ProtoEncode for str {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        write_string(buf, self);
    }
}
