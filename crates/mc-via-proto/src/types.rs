//! Base data types used throughout the Java Edition protocol.

use std::fmt;

use bytes::{Buf, BufMut};
use thiserror::Error;

use crate::codec::{ensure_remaining, ProtoDecode, ProtoEncode};
use crate::error::ProtoError;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum VarIntError {
    #[error("buffer too short")]
    BufferTooShort,
    #[error("VarInt is too long (more than {max_bytes} bytes)")]
    TooLong { max_bytes: usize },
}

// ---------------------------------------------------------------------------
// VarInt: i32, two's complement, 7 bits per byte
// ---------------------------------------------------------------------------

/// Variable-length i32. Negative values are written as their unsigned
/// two's complement bit pattern, so `-1` always takes the full five bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct VarInt(pub i32);

impl VarInt {
    /// Maximum bytes a VarInt can occupy.
    pub const MAX_BYTES: usize = 5;

    /// Number of bytes `value` occupies on the wire.
    pub fn written_len(value: i32) -> usize {
        let mut value = value as u32;
        let mut len = 1;
        while value & !0x7F != 0 {
            value >>= 7;
            len += 1;
        }
        len
    }
}

impl ProtoEncode for VarInt {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        let mut value = self.0 as u32;
        loop {
            if value & !0x7F == 0 {
                buf.put_u8(value as u8);
                return;
            }
            buf.put_u8((value & 0x7F | 0x80) as u8);
            value >>= 7;
        }
    }
}

impl ProtoDecode for VarInt {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        let mut result: u32 = 0;
        for i in 0..Self::MAX_BYTES {
            if !buf.has_remaining() {
                return Err(VarIntError::BufferTooShort.into());
            }
            let byte = buf.get_u8();
            result |= ((byte & 0x7F) as u32) << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(VarInt(result as i32));
            }
        }
        Err(VarIntError::TooLong {
            max_bytes: Self::MAX_BYTES,
        }
        .into())
    }
}

// ---------------------------------------------------------------------------
// VarLong: i64, same scheme as VarInt
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct VarLong(pub i64);

impl VarLong {
    /// Maximum bytes a VarLong can occupy.
    pub const MAX_BYTES: usize = 10;
}

impl ProtoEncode for VarLong {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        let mut value = self.0 as u64;
        loop {
            if value & !0x7F == 0 {
                buf.put_u8(value as u8);
                return;
            }
            buf.put_u8((value & 0x7F | 0x80) as u8);
            value >>= 7;
        }
    }
}

impl ProtoDecode for VarLong {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        let mut result: u64 = 0;
        for i in 0..Self::MAX_BYTES {
            if !buf.has_remaining() {
                return Err(VarIntError::BufferTooShort.into());
            }
            let byte = buf.get_u8();
            result |= ((byte & 0x7F) as u64) << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(VarLong(result as i64));
            }
        }
        Err(VarIntError::TooLong {
            max_bytes: Self::MAX_BYTES,
        }
        .into())
    }
}

// ---------------------------------------------------------------------------
// Fixed-width primitives (big-endian)
// ---------------------------------------------------------------------------

macro_rules! fixed_width {
    ($($ty:ty => $get:ident, $put:ident, $len:expr;)*) => {
        $(
            impl ProtoEncode for $ty {
                fn proto_encode(&self, buf: &mut impl BufMut) {
                    buf.$put(*self);
                }
            }

            impl ProtoDecode for $ty {
                fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
                    ensure_remaining(buf, $len)?;
                    Ok(buf.$get())
                }
            }
        )*
    };
}

fixed_width! {
    u8 => get_u8, put_u8, 1;
    i8 => get_i8, put_i8, 1;
    u16 => get_u16, put_u16, 2;
    i16 => get_i16, put_i16, 2;
    i32 => get_i32, put_i32, 4;
    i64 => get_i64, put_i64, 8;
    f32 => get_f32, put_f32, 4;
    f64 => get_f64, put_f64, 8;
}

impl ProtoEncode for bool {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        buf.put_u8(*self as u8);
    }
}

/// Any non-zero byte reads as `true`.
impl ProtoDecode for bool {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        Ok(u8::proto_decode(buf)? != 0)
    }
}

// ---------------------------------------------------------------------------
// BlockPos (i32 x, y, z packed into one i64)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Convert to the chunk position that contains this block.
    pub fn chunk_pos(&self) -> ChunkPos {
        ChunkPos::new(self.x >> 4, self.z >> 4)
    }

    /// 1.14+ packing: `x` 26 bits | `z` 26 bits | `y` 12 bits.
    pub fn to_packed(&self) -> i64 {
        ((self.x as i64 & 0x3FF_FFFF) << 38)
            | ((self.z as i64 & 0x3FF_FFFF) << 12)
            | (self.y as i64 & 0xFFF)
    }

    pub fn from_packed(value: i64) -> Self {
        Self {
            x: (value >> 38) as i32,
            y: (value << 52 >> 52) as i32,
            z: (value << 26 >> 38) as i32,
        }
    }

    /// Pre-1.14 packing: `x` 26 bits | `y` 12 bits | `z` 26 bits.
    pub fn to_legacy_packed(&self) -> i64 {
        ((self.x as i64 & 0x3FF_FFFF) << 38)
            | ((self.y as i64 & 0xFFF) << 26)
            | (self.z as i64 & 0x3FF_FFFF)
    }

    pub fn from_legacy_packed(value: i64) -> Self {
        Self {
            x: (value >> 38) as i32,
            y: (value << 26 >> 52) as i32,
            z: (value << 38 >> 38) as i32,
        }
    }
}

/// Wire format: 1.14+ packed i64.
impl ProtoEncode for BlockPos {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        buf.put_i64(self.to_packed());
    }
}

impl ProtoDecode for BlockPos {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        Ok(Self::from_packed(i64::proto_decode(buf)?))
    }
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

// ---------------------------------------------------------------------------
// ChunkPos (i32 x, z)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// `x` in the low 32 bits, `z` in the high 32 bits.
    pub fn to_packed(&self) -> i64 {
        (self.x as u32 as i64) | ((self.z as i64) << 32)
    }

    pub fn from_packed(value: i64) -> Self {
        Self {
            x: value as i32,
            z: (value >> 32) as i32,
        }
    }

    /// X coordinate of the first block in this chunk.
    pub fn block_x(&self) -> i32 {
        self.x << 4
    }

    /// Z coordinate of the first block in this chunk.
    pub fn block_z(&self) -> i32 {
        self.z << 4
    }
}

/// Wire format: packed i64 (1.20.2+ chunk position).
impl ProtoEncode for ChunkPos {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        buf.put_i64(self.to_packed());
    }
}

impl ProtoDecode for ChunkPos {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        Ok(Self::from_packed(i64::proto_decode(buf)?))
    }
}

impl fmt::Display for ChunkPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;
    use proptest::prelude::*;

    fn encode<T: ProtoEncode>(value: T) -> BytesMut {
        let mut buf = BytesMut::new();
        value.proto_encode(&mut buf);
        buf
    }

    fn roundtrip_varint(value: i32) {
        let buf = encode(VarInt(value));
        assert_eq!(buf.len(), VarInt::written_len(value));
        let decoded = VarInt::proto_decode(&mut buf.freeze()).unwrap();
        assert_eq!(decoded.0, value, "VarInt roundtrip failed for {value}");
    }

    #[test]
    fn varint_known_encodings() {
        assert_eq!(&encode(VarInt(0))[..], &[0x00]);
        assert_eq!(&encode(VarInt(1))[..], &[0x01]);
        assert_eq!(&encode(VarInt(127))[..], &[0x7F]);
        assert_eq!(&encode(VarInt(128))[..], &[0x80, 0x01]);
        assert_eq!(&encode(VarInt(25565))[..], &[0xDD, 0xC7, 0x01]);
        assert_eq!(&encode(VarInt(-1))[..], &[0xFF, 0xFF, 0xFF, 0xFF, 0x0F]);
        assert_eq!(&encode(VarInt(i32::MIN))[..], &[0x80, 0x80, 0x80, 0x80, 0x08]);
    }

    #[test]
    fn varint_extremes() {
        roundtrip_varint(i32::MAX);
        roundtrip_varint(i32::MIN);
        roundtrip_varint(-1);
    }

    #[test]
    fn varint_buffer_too_short() {
        assert!(VarInt::proto_decode(&mut &[][..]).is_err());
        assert!(VarInt::proto_decode(&mut &[0x80][..]).is_err());
    }

    #[test]
    fn varint_too_long() {
        let data = [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01];
        assert!(matches!(
            VarInt::proto_decode(&mut &data[..]),
            Err(ProtoError::VarInt(VarIntError::TooLong { max_bytes: 5 }))
        ));
    }

    #[test]
    fn varlong_known_encodings() {
        assert_eq!(&encode(VarLong(0))[..], &[0x00]);
        assert_eq!(&encode(VarLong(2_147_483_648))[..], &[0x80, 0x80, 0x80, 0x80, 0x08]);
        assert_eq!(encode(VarLong(-1)).len(), VarLong::MAX_BYTES);
    }

    #[test]
    fn varlong_too_long() {
        let data = [0xFF; 11];
        assert!(VarLong::proto_decode(&mut &data[..]).is_err());
    }

    proptest! {
        #[test]
        fn prop_varint_roundtrip(value in any::<i32>()) {
            let buf = encode(VarInt(value));
            prop_assert!(buf.len() <= VarInt::MAX_BYTES);
            let decoded = VarInt::proto_decode(&mut buf.freeze()).unwrap();
            prop_assert_eq!(decoded.0, value);
        }

        #[test]
        fn prop_varlong_roundtrip(value in any::<i64>()) {
            let buf = encode(VarLong(value));
            prop_assert!(buf.len() <= VarLong::MAX_BYTES);
            let decoded = VarLong::proto_decode(&mut buf.freeze()).unwrap();
            prop_assert_eq!(decoded.0, value);
        }
    }

    #[test]
    fn fixed_width_is_big_endian() {
        assert_eq!(&encode(0x1234i16)[..], &[0x12, 0x34]);
        assert_eq!(&encode(1i32)[..], &[0, 0, 0, 1]);
        assert!(i64::proto_decode(&mut &[0u8; 7][..]).is_err());
    }

    #[test]
    fn bool_nonzero_is_true() {
        assert!(bool::proto_decode(&mut &[0x02][..]).unwrap());
        assert!(!bool::proto_decode(&mut &[0x00][..]).unwrap());
    }

    #[test]
    fn block_pos_packing() {
        let pos = BlockPos::new(-30_000_000 / 16, -64, 1234);
        assert_eq!(BlockPos::from_packed(pos.to_packed()), pos);
        assert_eq!(BlockPos::from_legacy_packed(pos.to_legacy_packed()), pos);

        let neg = BlockPos::new(-1, -1, -1);
        assert_eq!(BlockPos::from_packed(neg.to_packed()), neg);
        assert_ne!(neg.to_packed(), BlockPos::new(-1, 0, -1).to_packed());
    }

    #[test]
    fn chunk_pos_packing() {
        let pos = ChunkPos::new(-5, 12);
        assert_eq!(ChunkPos::from_packed(pos.to_packed()), pos);
        assert_eq!(pos.to_packed() & 0xFFFF_FFFF, -5i32 as u32 as i64);
        assert_eq!(pos.block_x(), -80);
        assert_eq!(BlockPos::new(-1, 70, 17).chunk_pos(), ChunkPos::new(-1, 1));
    }
}
