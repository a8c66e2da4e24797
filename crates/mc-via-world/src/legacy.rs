//! 1.8 chunk format.
//!
//! ```text
//! i32 x | i32 z | bool full_chunk | u16 bitmask | VarInt data_length | data
//! ```
//!
//! `data` holds, for the present sections in ascending order: 4096 `u16` LE
//! cells (`block_type << 4 | meta`) per section, then 2048 bytes of block
//! light per section, then optionally 2048 bytes of sky light per section,
//! then optionally 256 bytes of biomes. Sky light and biomes are only known
//! to be present from the bytes left in `data`.

use bytes::{Buf, BufMut, BytesMut};
use mc_via_proto::codec::{ensure_remaining, read_bytes, read_len};
use mc_via_proto::types::{ChunkPos, VarInt};
use mc_via_proto::{ProtoDecode, ProtoEncode};
use tracing::{debug, warn};

use crate::chunk::{Chunk, ChunkSection, NibbleArray, Palette, BIOME_DATA_LENGTH, CELLS, LIGHT_LENGTH};
use crate::error::WorldError;
use crate::tracker::ClientChunks;

/// Sections in a 1.8 column (the bitmask is 16 bits wide).
pub const SECTION_COUNT: usize = 16;

/// Decode a 1.8 chunk, updating the client's loaded-chunk record.
///
/// Returns [`Chunk::unload`] when the message is the legacy unload form.
pub fn read_chunk(buf: &mut impl Buf, chunks: &mut ClientChunks) -> Result<Chunk, WorldError> {
    let x = i32::proto_decode(buf)?;
    let z = i32::proto_decode(buf)?;
    let full_chunk = bool::proto_decode(buf)?;
    let bitmask = u16::proto_decode(buf)?;
    let declared = read_len(buf)?;
    let pos = ChunkPos::new(x, z);

    if buf.remaining() < declared {
        return Err(WorldError::DeclaredLengthExceedsBuffer {
            declared,
            remaining: buf.remaining(),
        });
    }
    let mut data = buf.copy_to_bytes(declared);

    let from_bulk = chunks.take_bulk(pos);
    let count = bitmask.count_ones() as usize;
    if count == 0 && full_chunk && !from_bulk && chunks.is_loaded(pos) {
        chunks.unload(pos);
        debug!(x, z, "empty full chunk for a loaded position, treating as unload");
        return Ok(Chunk::unload(pos));
    }
    chunks.mark_loaded(pos);

    let mut sections: Vec<Option<ChunkSection>> = vec![None; SECTION_COUNT];
    let present: Vec<usize> = (0..SECTION_COUNT).filter(|&i| bitmask & (1 << i) != 0).collect();

    for &i in &present {
        ensure_remaining(&data, CELLS * 2)?;
        let palette = Palette::from_ids((0..CELLS).map(|_| data.get_u16_le() as i32));
        sections[i] = Some(ChunkSection::new(palette));
    }

    for &i in &present {
        let light = NibbleArray::from_bytes(read_bytes(&mut data, LIGHT_LENGTH)?.to_vec())?;
        if let Some(section) = sections[i].as_mut() {
            section.block_light = light;
        }
    }

    if count > 0 && data.remaining() >= LIGHT_LENGTH * count {
        for &i in &present {
            let light = NibbleArray::from_bytes(read_bytes(&mut data, LIGHT_LENGTH)?.to_vec())?;
            if let Some(section) = sections[i].as_mut() {
                section.sky_light = Some(light);
            }
        }
    }

    let biome_data = if data.remaining() >= BIOME_DATA_LENGTH {
        Some(read_bytes(&mut data, BIOME_DATA_LENGTH)?.to_vec())
    } else {
        None
    };

    let leftover_bytes = data.remaining();
    if leftover_bytes > 0 {
        warn!(x, z, full_chunk, leftover_bytes, "bytes left after reading legacy chunk");
    }

    Ok(Chunk {
        pos,
        full_chunk,
        sections,
        biome_data,
        block_entities: Vec::new(),
        unload: false,
        leftover_bytes,
    })
}

/// Encode a chunk in the 1.8 format. Block entities are not part of it.
pub fn write_chunk(buf: &mut impl BufMut, chunk: &Chunk) -> Result<(), WorldError> {
    if chunk.sections.len() > SECTION_COUNT {
        return Err(WorldError::TooManySections {
            got: chunk.sections.len(),
            max: SECTION_COUNT,
        });
    }

    let mut data = BytesMut::new();
    for (_, section) in chunk.present_sections() {
        for id in section.palette.ids() {
            let cell = u16::try_from(id).map_err(|_| WorldError::BlockStateOutOfRange { id, bits: 16 })?;
            data.put_u16_le(cell);
        }
    }
    for (_, section) in chunk.present_sections() {
        data.put_slice(section.block_light.as_bytes());
    }
    for (_, section) in chunk.present_sections() {
        if let Some(sky_light) = &section.sky_light {
            data.put_slice(sky_light.as_bytes());
        }
    }
    if let Some(biomes) = &chunk.biome_data {
        data.put_slice(biomes);
    }

    chunk.pos.x.proto_encode(buf);
    chunk.pos.z.proto_encode(buf);
    (chunk.full_chunk || chunk.unload).proto_encode(buf);
    (chunk.bitmask() as u16).proto_encode(buf);
    VarInt(data.len() as i32).proto_encode(buf);
    buf.put_slice(&data);
    Ok(())
}
