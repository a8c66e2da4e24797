//! NBT (Named Binary Tag) implementation for Minecraft Java Edition.
//!
//! All multi-byte values are big-endian. Strings are u16-length prefixed
//! modified UTF-8 and string payloads are kept as sent.
//! Two root framings exist on the wire:
//! - **Named**: `TAG_Compound`, a root name, then the payload. Used up to 1.20.1.
//! - **Nameless**: `TAG_Compound` then the payload, no name. Used from 1.20.2.
//!
//! In both framings a single `TAG_End` byte in place of the root means "no tree".

pub mod error;
mod io;
pub mod tag;

pub use error::NbtError;
pub use tag::{NbtCompound, NbtRoot, NbtString, NbtTag, TagType};

use bytes::{Buf, BufMut};

/// Read a named-root tree. Returns `None` for a lone `TAG_End`.
pub fn read_nbt(buf: &mut impl Buf) -> Result<Option<NbtRoot>, NbtError> {
    if !io::read_root_marker(buf)? {
        return Ok(None);
    }
    let name = io::read_string(buf)?;
    let compound = io::read_compound(buf, 0)?;
    Ok(Some(NbtRoot { name, compound }))
}

/// Write a named-root tree, or `TAG_End` for `None`.
pub fn write_nbt(buf: &mut impl BufMut, root: Option<&NbtRoot>) {
    match root {
        Some(root) => {
            io::write_type(buf, TagType::Compound);
            io::write_string(buf, &root.name);
            io::write_compound(buf, &root.compound);
        }
        None => io::write_type(buf, TagType::End),
    }
}

/// Read a nameless-root tree. Returns `None` for a lone `TAG_End`.
pub fn read_nameless_nbt(buf: &mut impl Buf) -> Result<Option<NbtCompound>, NbtError> {
    if !io::read_root_marker(buf)? {
        return Ok(None);
    }
    io::read_compound(buf, 0).map(Some)
}

/// Write a nameless-root tree, or `TAG_End` for `None`.
pub fn write_nameless_nbt(buf: &mut impl BufMut, compound: Option<&NbtCompound>) {
    match compound {
        Some(compound) => {
            io::write_type(buf, TagType::Compound);
            io::write_compound(buf, compound);
        }
        None => io::write_type(buf, TagType::End),
    }
}
