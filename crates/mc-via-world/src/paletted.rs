//! 1.9 paletted chunk format.
//!
//! ```text
//! i32 x | i32 z | bool full_chunk | VarInt bitmask | VarInt size | data
//!   [VarInt count | named NBT * count]          (when block entities are on)
//! ```
//!
//! Each present section in `data`:
//!
//! ```text
//! u8 bits | VarInt palette_len | VarInt id * palette_len
//! VarInt long_count | i64 * long_count | block light | [sky light]
//! ```
//!
//! Widths above 8 bits use the global id space directly and send an empty
//! palette. Full chunks append 256 bytes of biomes after the last section.

use bytes::{Buf, BufMut, BytesMut};
use mc_via_nbt::{read_nbt, write_nbt};
use mc_via_proto::codec::{read_bytes, read_len};
use mc_via_proto::types::{ChunkPos, VarInt};
use mc_via_proto::{ProtoDecode, ProtoEncode};
use tracing::{trace, warn};

use crate::bits::{ceil_log2, longs_needed, pack, unpack};
use crate::chunk::{Chunk, ChunkSection, NibbleArray, Palette, BIOME_DATA_LENGTH, CELLS, LIGHT_LENGTH};
use crate::error::WorldError;

/// Smallest width an indirect palette is sent with.
pub const MIN_BITS_PER_BLOCK: u8 = 4;

/// Widest indirect palette. Anything larger is sent as global ids.
pub const MAX_PALETTE_BITS: u8 = 8;

/// Codec parameters for one target version and world.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkCodec {
    /// Sections in a column of the current world.
    pub section_count: usize,
    /// Width of a global block state id, `ceil_log2(mapped_size)`.
    pub global_bits: u8,
    /// Whether the block entity list follows the section data.
    pub block_entities: bool,
}

impl ChunkCodec {
    pub fn new(section_count: usize, global_bits: u8) -> Self {
        Self {
            section_count,
            global_bits,
            block_entities: false,
        }
    }

    pub fn with_block_entities(mut self, enabled: bool) -> Self {
        self.block_entities = enabled;
        self
    }

    /// Decode a chunk. `has_sky_light` comes from the current dimension.
    pub fn read(&self, buf: &mut impl Buf, has_sky_light: bool) -> Result<Chunk, WorldError> {
        let x = i32::proto_decode(buf)?;
        let z = i32::proto_decode(buf)?;
        let full_chunk = bool::proto_decode(buf)?;
        let bitmask = VarInt::proto_decode(buf)?.0;
        if (bitmask as u32).checked_shr(self.section_count as u32).unwrap_or(0) != 0 {
            return Err(WorldError::BitmaskOutOfRange {
                bitmask,
                section_count: self.section_count,
            });
        }

        let declared = read_len(buf)?;
        if buf.remaining() < declared {
            return Err(WorldError::DeclaredLengthExceedsBuffer {
                declared,
                remaining: buf.remaining(),
            });
        }
        let mut data = buf.copy_to_bytes(declared);

        let mut sections = vec![None; self.section_count];
        for (i, slot) in sections.iter_mut().enumerate() {
            if i < 32 && bitmask & (1 << i) != 0 {
                *slot = Some(read_section(&mut data, has_sky_light)?);
            }
        }

        let biome_data = if full_chunk && data.remaining() >= BIOME_DATA_LENGTH {
            Some(read_bytes(&mut data, BIOME_DATA_LENGTH)?.to_vec())
        } else {
            None
        };

        let leftover_bytes = data.remaining();
        if leftover_bytes > 0 {
            warn!(x, z, leftover_bytes, "bytes left after reading paletted chunk");
        }

        let mut block_entities = Vec::new();
        if self.block_entities {
            let count = read_len(buf)?;
            for _ in 0..count {
                if let Some(root) = read_nbt(buf)? {
                    block_entities.push(root);
                }
            }
        }

        Ok(Chunk {
            pos: ChunkPos::new(x, z),
            full_chunk,
            sections,
            biome_data,
            block_entities,
            unload: false,
            leftover_bytes,
        })
    }

    /// Encode a chunk. An unload chunk is written as its coordinates only.
    pub fn write(&self, buf: &mut impl BufMut, chunk: &Chunk) -> Result<(), WorldError> {
        chunk.pos.x.proto_encode(buf);
        chunk.pos.z.proto_encode(buf);
        if chunk.unload {
            return Ok(());
        }
        // Trailing empty slots are fine, only present sections must fit.
        if let Some((highest, _)) = chunk.present_sections().last() {
            if highest >= self.section_count {
                return Err(WorldError::TooManySections {
                    got: highest + 1,
                    max: self.section_count,
                });
            }
        }

        let mut data = BytesMut::new();
        for (_, section) in chunk.present_sections() {
            self.write_section(&mut data, section)?;
        }
        if let Some(biomes) = &chunk.biome_data {
            data.put_slice(biomes);
        }

        chunk.full_chunk.proto_encode(buf);
        VarInt(chunk.bitmask()).proto_encode(buf);
        VarInt(data.len() as i32).proto_encode(buf);
        buf.put_slice(&data);

        if self.block_entities {
            VarInt(chunk.block_entities.len() as i32).proto_encode(buf);
            for root in &chunk.block_entities {
                write_nbt(buf, Some(root));
            }
        }
        Ok(())
    }

    fn write_section(&self, buf: &mut BytesMut, section: &ChunkSection) -> Result<(), WorldError> {
        let palette = section.palette.compacted();
        let bits = ceil_log2(palette.len()).max(MIN_BITS_PER_BLOCK);

        if bits <= MAX_PALETTE_BITS {
            buf.put_u8(bits);
            VarInt(palette.len() as i32).proto_encode(buf);
            for &id in palette.entries() {
                VarInt(id).proto_encode(buf);
            }
            let values: Vec<u32> = palette.indices().iter().map(|&i| i as u32).collect();
            write_longs(buf, &pack(&values, bits));
        } else {
            let bits = self.global_bits;
            if bits <= MAX_PALETTE_BITS || bits > 32 {
                return Err(WorldError::InvalidBitsPerBlock(bits));
            }
            let limit = 1i64 << bits;
            let values = palette
                .ids()
                .map(|id| {
                    if id < 0 || id as i64 >= limit {
                        Err(WorldError::BlockStateOutOfRange { id, bits })
                    } else {
                        Ok(id as u32)
                    }
                })
                .collect::<Result<Vec<_>, _>>()?;
            trace!(palette = palette.len(), bits, "section uses global palette");
            buf.put_u8(bits);
            VarInt(0).proto_encode(buf);
            write_longs(buf, &pack(&values, bits));
        }

        buf.put_slice(section.block_light.as_bytes());
        if let Some(sky_light) = &section.sky_light {
            buf.put_slice(sky_light.as_bytes());
        }
        Ok(())
    }
}

fn write_longs(buf: &mut BytesMut, longs: &[i64]) {
    VarInt(longs.len() as i32).proto_encode(buf);
    for &long in longs {
        buf.put_i64(long);
    }
}

fn read_section(buf: &mut impl Buf, has_sky_light: bool) -> Result<ChunkSection, WorldError> {
    let bits = u8::proto_decode(buf)?;
    if bits == 0 || bits > 32 {
        return Err(WorldError::InvalidBitsPerBlock(bits));
    }

    let palette_len = read_len(buf)?;
    let mut entries = Vec::with_capacity(palette_len.min(CELLS));
    for _ in 0..palette_len {
        entries.push(VarInt::proto_decode(buf)?.0);
    }

    let long_count = read_len(buf)?;
    let expected = longs_needed(CELLS, bits);
    if long_count != expected {
        return Err(WorldError::DataArrayLength {
            expected,
            got: long_count,
        });
    }
    let mut longs = Vec::with_capacity(long_count);
    for _ in 0..long_count {
        longs.push(i64::proto_decode(buf)?);
    }
    let values = unpack(&longs, bits, CELLS);

    let palette = if bits > MAX_PALETTE_BITS {
        Palette::from_ids(values.into_iter().map(|v| v as i32))
    } else {
        Palette::from_parts(entries, values)?
    };

    let block_light = NibbleArray::from_bytes(read_bytes(buf, LIGHT_LENGTH)?.to_vec())?;
    let sky_light = if has_sky_light {
        Some(NibbleArray::from_bytes(read_bytes(buf, LIGHT_LENGTH)?.to_vec())?)
    } else {
        None
    };

    Ok(ChunkSection {
        palette,
        block_light,
        sky_light,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::cell_index;
    use mc_via_nbt::{NbtCompound, NbtRoot, NbtTag};
    use proptest::prelude::*;

    fn section(palette: Palette, sky: bool) -> ChunkSection {
        let mut section = ChunkSection::new(palette);
        section.block_light.set(0, 0xC);
        if sky {
            section.sky_light = Some(NibbleArray::new());
        }
        section
    }

    fn column(sections: Vec<Option<ChunkSection>>) -> Chunk {
        Chunk {
            pos: ChunkPos::new(2, -5),
            full_chunk: true,
            sections,
            ..Default::default()
        }
    }

    #[test]
    fn sections_zero_and_three_without_sky_light() {
        let codec = ChunkCodec::new(16, 13);
        let mut sections = vec![None; 16];
        sections[0] = Some(section(Palette::filled(1), false));
        sections[3] = Some(section(Palette::filled(2), false));
        let chunk = column(sections);

        let mut buf = BytesMut::new();
        codec.write(&mut buf, &chunk).unwrap();
        let decoded = codec.read(&mut buf.freeze(), false).unwrap();

        assert_eq!(decoded.bitmask(), 0b1001);
        assert_eq!(decoded.section_count(), 2);
        for (_, section) in decoded.present_sections() {
            assert_eq!(section.block_light.get(0), 0xC);
            assert!(section.sky_light.is_none());
        }
        assert!(decoded.biome_data.is_none());
        assert_eq!(decoded.leftover_bytes, 0);
    }

    #[test]
    fn small_palette_uses_four_bits() {
        let codec = ChunkCodec::new(16, 13);
        let chunk = column(vec![Some(section(Palette::filled(9), true))]);

        let mut buf = BytesMut::new();
        codec.write(&mut buf, &chunk).unwrap();
        let mut bytes = buf.freeze();
        // x, z, full, bitmask, size
        bytes.advance(4 + 4 + 1 + 1);
        read_len(&mut bytes).unwrap();
        assert_eq!(bytes.get_u8(), 4);
        assert_eq!(read_len(&mut bytes).unwrap(), 1);
    }

    #[test]
    fn size_prefix_counts_biomes() {
        let codec = ChunkCodec::new(16, 13);
        let mut chunk = column(vec![Some(section(Palette::filled(0), true))]);
        chunk.biome_data = Some(vec![7; BIOME_DATA_LENGTH]);

        let mut buf = BytesMut::new();
        codec.write(&mut buf, &chunk).unwrap();
        let mut bytes = buf.freeze();
        bytes.advance(4 + 4 + 1 + 1);
        let size = read_len(&mut bytes).unwrap();
        assert_eq!(size, bytes.remaining());

        let mut again = BytesMut::new();
        codec.write(&mut again, &chunk).unwrap();
        let decoded = codec.read(&mut again.freeze(), true).unwrap();
        assert_eq!(decoded.biome_data, chunk.biome_data);
    }

    #[test]
    fn large_palette_switches_to_global_ids() {
        let codec = ChunkCodec::new(16, 13);
        let palette = Palette::from_ids((0..CELLS as i32).map(|i| i % 300));
        let chunk = column(vec![Some(section(palette.clone(), false))]);

        let mut buf = BytesMut::new();
        codec.write(&mut buf, &chunk).unwrap();
        let mut bytes = buf.clone().freeze();
        bytes.advance(4 + 4 + 1 + 1);
        read_len(&mut bytes).unwrap();
        assert_eq!(bytes.get_u8(), 13);
        assert_eq!(read_len(&mut bytes).unwrap(), 0);

        let decoded = codec.read(&mut buf.freeze(), false).unwrap();
        let ids: Vec<i32> = decoded.sections[0].as_ref().unwrap().palette.ids().collect();
        assert!(ids.iter().copied().eq(palette.ids()));
    }

    #[test]
    fn global_id_too_wide_is_an_error() {
        let codec = ChunkCodec::new(16, 9);
        let palette = Palette::from_ids((0..CELLS as i32).map(|i| i % 600));
        let chunk = column(vec![Some(section(palette, false))]);
        assert!(matches!(
            codec.write(&mut BytesMut::new(), &chunk),
            Err(WorldError::BlockStateOutOfRange { id: 512, bits: 9 })
        ));
    }

    #[test]
    fn remapped_duplicates_shrink_the_palette() {
        let codec = ChunkCodec::new(16, 13);
        let mut palette = Palette::from_ids((0..CELLS as i32).map(|i| i % 20));
        palette.remap(|id| id % 2);
        let chunk = column(vec![Some(section(palette, false))]);

        let mut buf = BytesMut::new();
        codec.write(&mut buf, &chunk).unwrap();
        let decoded = codec.read(&mut buf.freeze(), false).unwrap();
        let palette = &decoded.sections[0].as_ref().unwrap().palette;
        assert_eq!(palette.entries(), &[0, 1]);
        assert_eq!(palette.get(cell_index(1, 0, 0)), 1);
    }

    #[test]
    fn only_present_sections_must_fit_the_column() {
        let codec = ChunkCodec::new(8, 13);
        let mut sections = vec![None; 16];
        sections[7] = Some(section(Palette::filled(1), false));
        let mut buf = BytesMut::new();
        codec.write(&mut buf, &column(sections.clone())).unwrap();

        sections[8] = Some(section(Palette::filled(1), false));
        assert!(matches!(
            codec.write(&mut BytesMut::new(), &column(sections)),
            Err(WorldError::TooManySections { got: 9, max: 8 })
        ));
    }

    #[test]
    fn unload_writes_coordinates_only() {
        let codec = ChunkCodec::new(16, 13);
        let mut buf = BytesMut::new();
        codec.write(&mut buf, &Chunk::unload(ChunkPos::new(-1, 4))).unwrap();
        assert_eq!(&buf[..], &[0xFF, 0xFF, 0xFF, 0xFF, 0, 0, 0, 4]);
    }

    #[test]
    fn block_entities_follow_section_data() {
        let codec = ChunkCodec::new(16, 13).with_block_entities(true);
        let mut chunk = column(vec![Some(section(Palette::filled(0), true))]);
        let mut tag = NbtCompound::new();
        tag.insert("id".into(), NbtTag::String("Chest".into()));
        chunk.block_entities.push(NbtRoot::from(tag));

        let mut buf = BytesMut::new();
        codec.write(&mut buf, &chunk).unwrap();
        let decoded = codec.read(&mut buf.freeze(), true).unwrap();
        assert_eq!(decoded.block_entities, chunk.block_entities);
    }

    #[test]
    fn rejects_bitmask_past_column_height() {
        let mut buf = BytesMut::new();
        buf.put_i32(0);
        buf.put_i32(0);
        buf.put_u8(1);
        VarInt(1 << 16).proto_encode(&mut buf);
        VarInt(0).proto_encode(&mut buf);
        assert!(matches!(
            ChunkCodec::new(16, 13).read(&mut buf.freeze(), true),
            Err(WorldError::BitmaskOutOfRange { section_count: 16, .. })
        ));
    }

    #[test]
    fn rejects_wrong_long_count() {
        let mut data = BytesMut::new();
        data.put_u8(4);
        VarInt(1).proto_encode(&mut data);
        VarInt(0).proto_encode(&mut data);
        VarInt(3).proto_encode(&mut data);

        let mut buf = BytesMut::new();
        buf.put_i32(0);
        buf.put_i32(0);
        buf.put_u8(0);
        VarInt(1).proto_encode(&mut buf);
        VarInt(data.len() as i32).proto_encode(&mut buf);
        buf.put_slice(&data);
        assert!(matches!(
            ChunkCodec::new(16, 13).read(&mut buf.freeze(), true),
            Err(WorldError::DataArrayLength { expected: 256, got: 3 })
        ));
    }

    proptest! {
        #[test]
        fn bitmask_survives_reencode(mask in 0u16..=u16::MAX, sky in any::<bool>()) {
            let codec = ChunkCodec::new(16, 13);
            let sections = (0..16)
                .map(|i| (mask & (1 << i) != 0).then(|| section(Palette::filled(i), sky)))
                .collect();
            let chunk = column(sections);

            let mut buf = BytesMut::new();
            codec.write(&mut buf, &chunk).unwrap();
            let decoded = codec.read(&mut buf.freeze(), sky).unwrap();

            prop_assert_eq!(decoded.bitmask(), mask as i32);
            prop_assert_eq!(decoded.section_count(), mask.count_ones() as usize);
            let indices: Vec<usize> = decoded.present_sections().map(|(i, _)| i).collect();
            prop_assert!(indices.windows(2).all(|w| w[0] < w[1]));
            for (i, section) in decoded.present_sections() {
                prop_assert_eq!(section.palette.get(0), i as i32);
                prop_assert_eq!(section.sky_light.is_some(), sky);
            }
        }
    }
}
