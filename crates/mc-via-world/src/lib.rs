//! Chunk column model and the chunk wire formats the translation layer
//! converts between.
//!
//! - [`legacy`]: the 1.8 format (`u16` cells, `u16` bitmask).
//! - [`paletted`]: the 1.9 format (per-section palette, packed longs).
//! - [`column`]: the 1.18 format and its 1.20.2 variant (block and biome
//!   containers, padded longs).
//!
//! The first two decode into the same [`Chunk`] so a protocol can read one
//! format, remap block states and write the other. [`Column`] is read and
//! written by one codec with different parameters on each side.

pub mod bits;
pub mod chunk;
pub mod column;
pub mod error;
pub mod legacy;
pub mod paletted;
pub mod tracker;

pub use chunk::{Chunk, ChunkSection, NibbleArray, Palette};
pub use column::{Column, ColumnBlockEntity, ColumnCodec, ColumnSection, TagFraming};
pub use error::WorldError;
pub use paletted::ChunkCodec;
pub use tracker::ClientChunks;
