//! Chunk codec errors.

use mc_via_nbt::NbtError;
use mc_via_proto::ProtoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorldError {
    #[error(transparent)]
    Proto(#[from] ProtoError),

    #[error(transparent)]
    Nbt(#[from] NbtError),

    #[error("declared chunk data length {declared} exceeds the {remaining} bytes left in the message")]
    DeclaredLengthExceedsBuffer { declared: usize, remaining: usize },

    #[error("section bitmask {bitmask:#x} addresses sections past the column height {section_count}")]
    BitmaskOutOfRange { bitmask: i32, section_count: usize },

    #[error("column has {got} section slots, format allows {max}")]
    TooManySections { got: usize, max: usize },

    #[error("column has {got} sections, the world has {expected}")]
    SectionCount { expected: usize, got: usize },

    #[error("unsupported bits per block: {0}")]
    InvalidBitsPerBlock(u8),

    #[error("section data array has {got} longs, expected {expected}")]
    DataArrayLength { expected: usize, got: usize },

    #[error("palette index {index} out of range for palette of {len}")]
    PaletteIndex { index: u32, len: usize },

    #[error("block state {id} does not fit in {bits} bits")]
    BlockStateOutOfRange { id: i32, bits: u8 },

    #[error("light array must be {expected} bytes, got {got}")]
    LightLength { expected: usize, got: usize },
}
