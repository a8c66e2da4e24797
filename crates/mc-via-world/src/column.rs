//! 1.18 column format, used through 1.20.1, and its 1.20.2 variant.
//!
//! ```text
//! i32 x | i32 z | heightmaps NBT | VarInt size | data
//! VarInt count | (u8 packed_xz | i16 y | VarInt type | NBT) * count
//! ```
//!
//! `data` holds every section of the world height, bottom to top:
//!
//! ```text
//! i16 non_air_blocks | block container | biome container
//! ```
//!
//! A container is `u8 bits`, then:
//! - `bits == 0`: `VarInt id | VarInt 0`, every cell holds `id`;
//! - up to the kind's palette limit: `VarInt len | VarInt id * len`, then
//!   `VarInt long_count | i64 * long_count` of palette indices;
//! - above it: `VarInt long_count | i64 * long_count` of global ids at the
//!   codec's global width, whatever width the sender announced.
//!
//! Values never span two longs. 1.20.2 only changes the root framing of the
//! heightmaps and block entity tags to nameless. Light data follows the
//! column in the same message and is not part of it.

use bytes::{Buf, BufMut, BytesMut};
use mc_via_data::IdMapping;
use mc_via_nbt::{read_nameless_nbt, read_nbt, write_nameless_nbt, write_nbt, NbtCompound, NbtRoot};
use mc_via_proto::codec::read_len;
use mc_via_proto::types::VarInt;
use mc_via_proto::{ProtoDecode, ProtoEncode};
use tracing::{trace, warn};

use crate::bits::{ceil_log2, pack_padded, padded_longs_needed, unpack_padded};
use crate::chunk::{Palette, CELLS};
use crate::error::WorldError;

/// Biome cells per section, 4x4x4.
pub const BIOME_CELLS: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Blocks,
    Biomes,
}

impl ContainerKind {
    pub fn cells(self) -> usize {
        match self {
            ContainerKind::Blocks => CELLS,
            ContainerKind::Biomes => BIOME_CELLS,
        }
    }

    /// Widest width still sent with a palette.
    pub fn max_palette_bits(self) -> u8 {
        match self {
            ContainerKind::Blocks => 8,
            ContainerKind::Biomes => 3,
        }
    }

    fn min_palette_bits(self) -> u8 {
        match self {
            ContainerKind::Blocks => 4,
            ContainerKind::Biomes => 1,
        }
    }
}

/// Root framing of heightmaps and block entity tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagFraming {
    Named,
    Nameless,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSection {
    pub non_air_blocks: i16,
    pub blocks: Palette,
    pub biomes: Palette,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnBlockEntity {
    /// `x << 4 | z`, local to the column.
    pub packed_xz: u8,
    pub y: i16,
    pub type_id: i32,
    pub tag: Option<NbtCompound>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Column {
    pub x: i32,
    pub z: i32,
    pub heightmaps: Option<NbtCompound>,
    /// One per section of the world height, bottom to top.
    pub sections: Vec<ColumnSection>,
    pub block_entities: Vec<ColumnBlockEntity>,
    /// Declared section bytes that no section accounted for on decode.
    pub leftover_bytes: usize,
}

impl Column {
    /// Apply a block state table to every block palette entry.
    pub fn remap_block_states(&mut self, table: &IdMapping) {
        for section in &mut self.sections {
            section.blocks.remap(|id| table.new_id(id));
        }
    }
}

/// Codec parameters for one world and version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnCodec {
    pub section_count: usize,
    /// `ceil_log2` of the block state id space.
    pub global_block_bits: u8,
    /// `ceil_log2` of the number of biomes the server announced.
    pub global_biome_bits: u8,
    pub framing: TagFraming,
}

impl ColumnCodec {
    pub fn new(section_count: usize, global_block_bits: u8, global_biome_bits: u8) -> Self {
        Self {
            section_count,
            global_block_bits,
            global_biome_bits,
            framing: TagFraming::Named,
        }
    }

    pub fn with_framing(mut self, framing: TagFraming) -> Self {
        self.framing = framing;
        self
    }

    fn global_bits(&self, kind: ContainerKind) -> u8 {
        match kind {
            ContainerKind::Blocks => self.global_block_bits,
            ContainerKind::Biomes => self.global_biome_bits,
        }
    }

    pub fn read(&self, buf: &mut impl Buf) -> Result<Column, WorldError> {
        let x = i32::proto_decode(buf)?;
        let z = i32::proto_decode(buf)?;
        let heightmaps = self.read_tag(buf)?;

        let declared = read_len(buf)?;
        if buf.remaining() < declared {
            return Err(WorldError::DeclaredLengthExceedsBuffer {
                declared,
                remaining: buf.remaining(),
            });
        }
        let mut data = buf.copy_to_bytes(declared);
        let mut sections = Vec::with_capacity(self.section_count);
        for _ in 0..self.section_count {
            let non_air_blocks = i16::proto_decode(&mut data)?;
            let blocks = self.read_container(&mut data, ContainerKind::Blocks)?;
            let biomes = self.read_container(&mut data, ContainerKind::Biomes)?;
            sections.push(ColumnSection {
                non_air_blocks,
                blocks,
                biomes,
            });
        }
        let leftover_bytes = data.remaining();
        if leftover_bytes > 0 {
            warn!(x, z, leftover_bytes, "bytes left after reading column sections");
        }

        let count = read_len(buf)?;
        let mut block_entities = Vec::with_capacity(count.min(buf.remaining()));
        for _ in 0..count {
            block_entities.push(ColumnBlockEntity {
                packed_xz: u8::proto_decode(buf)?,
                y: i16::proto_decode(buf)?,
                type_id: VarInt::proto_decode(buf)?.0,
                tag: self.read_tag(buf)?,
            });
        }

        Ok(Column {
            x,
            z,
            heightmaps,
            sections,
            block_entities,
            leftover_bytes,
        })
    }

    pub fn write(&self, buf: &mut impl BufMut, column: &Column) -> Result<(), WorldError> {
        if column.sections.len() != self.section_count {
            return Err(WorldError::SectionCount {
                expected: self.section_count,
                got: column.sections.len(),
            });
        }
        column.x.proto_encode(buf);
        column.z.proto_encode(buf);
        self.write_tag(buf, column.heightmaps.as_ref());

        let mut data = BytesMut::new();
        for section in &column.sections {
            section.non_air_blocks.proto_encode(&mut data);
            self.write_container(&mut data, ContainerKind::Blocks, &section.blocks)?;
            self.write_container(&mut data, ContainerKind::Biomes, &section.biomes)?;
        }
        VarInt(data.len() as i32).proto_encode(buf);
        buf.put_slice(&data);

        VarInt(column.block_entities.len() as i32).proto_encode(buf);
        for entity in &column.block_entities {
            entity.packed_xz.proto_encode(buf);
            entity.y.proto_encode(buf);
            VarInt(entity.type_id).proto_encode(buf);
            self.write_tag(buf, entity.tag.as_ref());
        }
        Ok(())
    }

    fn read_tag(&self, buf: &mut impl Buf) -> Result<Option<NbtCompound>, WorldError> {
        Ok(match self.framing {
            TagFraming::Named => read_nbt(buf)?.map(|root| root.compound),
            TagFraming::Nameless => read_nameless_nbt(buf)?,
        })
    }

    fn write_tag(&self, buf: &mut impl BufMut, tag: Option<&NbtCompound>) {
        match self.framing {
            TagFraming::Named => write_nbt(buf, tag.cloned().map(NbtRoot::from).as_ref()),
            TagFraming::Nameless => write_nameless_nbt(buf, tag),
        }
    }

    fn read_container(&self, buf: &mut impl Buf, kind: ContainerKind) -> Result<Palette, WorldError> {
        let cells = kind.cells();
        let sent = u8::proto_decode(buf)?;

        if sent == 0 {
            let id = VarInt::proto_decode(buf)?.0;
            let long_count = read_len(buf)?;
            if long_count != 0 {
                return Err(WorldError::DataArrayLength {
                    expected: 0,
                    got: long_count,
                });
            }
            return Ok(Palette::single(id, cells));
        }

        if sent <= kind.max_palette_bits() {
            let len = read_len(buf)?;
            let mut entries = Vec::with_capacity(len.min(cells));
            for _ in 0..len {
                entries.push(VarInt::proto_decode(buf)?.0);
            }
            let values = read_values(buf, sent, cells)?;
            return Palette::from_parts(entries, values);
        }

        let bits = self.global_bits(kind);
        if bits == 0 || bits > 32 {
            return Err(WorldError::InvalidBitsPerBlock(sent));
        }
        let values = read_values(buf, bits, cells)?;
        Ok(Palette::from_ids(values.into_iter().map(|v| v as i32)))
    }

    fn write_container(&self, buf: &mut BytesMut, kind: ContainerKind, palette: &Palette) -> Result<(), WorldError> {
        let palette = palette.compacted();
        if palette.len() == 1 {
            buf.put_u8(0);
            VarInt(palette.entries()[0]).proto_encode(buf);
            VarInt(0).proto_encode(buf);
            return Ok(());
        }

        let bits = ceil_log2(palette.len()).max(kind.min_palette_bits());
        if bits <= kind.max_palette_bits() {
            buf.put_u8(bits);
            VarInt(palette.len() as i32).proto_encode(buf);
            for &id in palette.entries() {
                VarInt(id).proto_encode(buf);
            }
            let values: Vec<u32> = palette.indices().iter().map(|&i| i as u32).collect();
            write_longs(buf, &pack_padded(&values, bits));
            return Ok(());
        }

        let bits = self.global_bits(kind);
        if bits <= kind.max_palette_bits() || bits > 32 {
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
        trace!(?kind, palette = palette.len(), bits, "container uses global ids");
        buf.put_u8(bits);
        write_longs(buf, &pack_padded(&values, bits));
        Ok(())
    }
}

fn read_values(buf: &mut impl Buf, bits: u8, cells: usize) -> Result<Vec<u32>, WorldError> {
    let long_count = read_len(buf)?;
    let expected = padded_longs_needed(cells, bits);
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
    Ok(unpack_padded(&longs, bits, cells))
}

fn write_longs(buf: &mut BytesMut, longs: &[i64]) {
    VarInt(longs.len() as i32).proto_encode(buf);
    for &long in longs {
        buf.put_i64(long);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use mc_via_nbt::NbtTag;

    /// 15-bit block states, 6-bit biomes (64 biomes announced).
    fn codec(section_count: usize) -> ColumnCodec {
        ColumnCodec::new(section_count, 15, 6)
    }

    fn single(buf: &mut BytesMut, id: i32) {
        buf.put_u8(0);
        VarInt(id).proto_encode(buf);
        VarInt(0).proto_encode(buf);
    }

    fn heightmaps() -> NbtCompound {
        let mut tag = NbtCompound::new();
        tag.insert("MOTION_BLOCKING".into(), NbtTag::LongArray(vec![0x0101; 37]));
        tag
    }

    /// Column header, the given section bytes and one chest block entity.
    fn column_bytes(framing: TagFraming, sections: &[u8]) -> Bytes {
        let mut chest = NbtCompound::new();
        chest.insert("Items".into(), NbtTag::List { element: mc_via_nbt::TagType::Compound, items: vec![] });

        let mut buf = BytesMut::new();
        buf.put_i32(2);
        buf.put_i32(-1);
        let codec = codec(0).with_framing(framing);
        codec.write_tag(&mut buf, Some(&heightmaps()));
        VarInt(sections.len() as i32).proto_encode(&mut buf);
        buf.put_slice(sections);
        VarInt(1).proto_encode(&mut buf);
        buf.put_u8(0x3A);
        buf.put_i16(-60);
        VarInt(2).proto_encode(&mut buf);
        codec.write_tag(&mut buf, Some(&chest));
        buf.freeze()
    }

    #[test]
    fn single_value_sections_round_trip() {
        let mut sections = BytesMut::new();
        for (blocks, biome) in [(0, 1), (9, 2)] {
            sections.put_i16(if blocks == 0 { 0 } else { 4096 });
            single(&mut sections, blocks);
            single(&mut sections, biome);
        }
        let bytes = column_bytes(TagFraming::Named, &sections);

        let column = codec(2).read(&mut bytes.clone()).unwrap();
        assert_eq!((column.x, column.z), (2, -1));
        assert_eq!(column.sections.len(), 2);
        assert_eq!(column.sections[1].non_air_blocks, 4096);
        assert_eq!(column.sections[1].blocks, Palette::single(9, CELLS));
        assert_eq!(column.sections[0].biomes, Palette::single(1, BIOME_CELLS));
        assert_eq!(column.block_entities[0].packed_xz, 0x3A);
        assert_eq!(column.block_entities[0].type_id, 2);
        assert_eq!(column.heightmaps, Some(heightmaps()));

        let mut out = BytesMut::new();
        codec(2).write(&mut out, &column).unwrap();
        assert_eq!(out.freeze(), bytes);
    }

    #[test]
    fn indirect_palette_uses_padded_longs() {
        // 17 entries need 5 bits, twelve indices per long.
        let indices: Vec<u32> = (0..CELLS as u32).map(|i| i % 17).collect();
        let mut sections = BytesMut::new();
        sections.put_i16(4096);
        sections.put_u8(5);
        VarInt(17).proto_encode(&mut sections);
        for id in 0..17 {
            VarInt(100 + id).proto_encode(&mut sections);
        }
        write_longs(&mut sections, &pack_padded(&indices, 5));
        sections.put_u8(1);
        VarInt(2).proto_encode(&mut sections);
        VarInt(3).proto_encode(&mut sections);
        VarInt(4).proto_encode(&mut sections);
        let biome_indices: Vec<u32> = (0..BIOME_CELLS as u32).map(|i| i % 2).collect();
        write_longs(&mut sections, &pack_padded(&biome_indices, 1));
        let bytes = column_bytes(TagFraming::Named, &sections);

        let column = codec(1).read(&mut bytes.clone()).unwrap();
        let blocks = &column.sections[0].blocks;
        assert_eq!(blocks.len(), 17);
        assert_eq!(blocks.get(18), 101);
        assert_eq!(column.sections[0].biomes.get(1), 4);
        assert_eq!(column.leftover_bytes, 0);

        let mut out = BytesMut::new();
        codec(1).write(&mut out, &column).unwrap();
        assert_eq!(out.freeze(), bytes);
    }

    #[test]
    fn wide_containers_use_global_width() {
        // The sender announces 14 bits for blocks; the codec's width is used.
        let ids: Vec<u32> = (0..CELLS as u32).map(|i| i % 300).collect();
        let biomes: Vec<u32> = (0..BIOME_CELLS as u32).collect();
        let mut sections = BytesMut::new();
        sections.put_i16(4096);
        sections.put_u8(14);
        write_longs(&mut sections, &pack_padded(&ids, 15));
        sections.put_u8(6);
        write_longs(&mut sections, &pack_padded(&biomes, 6));
        let bytes = column_bytes(TagFraming::Named, &sections);

        let column = codec(1).read(&mut bytes.clone()).unwrap();
        assert_eq!(column.sections[0].blocks.get(299), 299);
        assert_eq!(column.sections[0].blocks.len(), 300);
        assert_eq!(column.sections[0].biomes.get(63), 63);

        let mut out = BytesMut::new();
        codec(1).write(&mut out, &column).unwrap();
        let mut reread = out.freeze();
        assert_eq!(codec(1).read(&mut reread).unwrap(), column);
    }

    #[test]
    fn nameless_framing_for_newer_clients() {
        let mut sections = BytesMut::new();
        sections.put_i16(0);
        single(&mut sections, 0);
        single(&mut sections, 0);
        let named = column_bytes(TagFraming::Named, &sections);
        let nameless = column_bytes(TagFraming::Nameless, &sections);

        let column = codec(1).read(&mut named.clone()).unwrap();
        let mut out = BytesMut::new();
        codec(1).with_framing(TagFraming::Nameless).write(&mut out, &column).unwrap();
        assert_eq!(out.freeze(), nameless);
    }

    #[test]
    fn remap_merges_into_single_value() {
        let mut column = Column {
            sections: vec![ColumnSection {
                non_air_blocks: 4096,
                blocks: Palette::from_ids((0..CELLS).map(|i| (i % 2) as i32 + 1)),
                biomes: Palette::single(0, BIOME_CELLS),
            }],
            ..Default::default()
        };
        column.remap_block_states(&IdMapping::new(vec![0, 7, 7], 8));
        assert_eq!(column.sections[0].blocks.get(1), 7);

        let mut out = BytesMut::new();
        codec(1).write(&mut out, &column).unwrap();
        let mut bytes = out.freeze();
        let decoded = codec(1).read(&mut bytes).unwrap();
        assert_eq!(decoded.sections[0].blocks, Palette::single(7, CELLS));
    }

    #[test]
    fn long_count_must_match_width() {
        let mut sections = BytesMut::new();
        sections.put_i16(1);
        sections.put_u8(4);
        VarInt(2).proto_encode(&mut sections);
        VarInt(0).proto_encode(&mut sections);
        VarInt(1).proto_encode(&mut sections);
        write_longs(&mut sections, &[0; 10]);
        let bytes = column_bytes(TagFraming::Named, &sections);
        assert!(matches!(
            codec(1).read(&mut bytes.clone()),
            Err(WorldError::DataArrayLength { expected: 256, got: 10 })
        ));
    }

    #[test]
    fn section_count_must_match_world_height() {
        let column = Column::default();
        let mut out = BytesMut::new();
        assert!(matches!(
            codec(24).write(&mut out, &column),
            Err(WorldError::SectionCount { expected: 24, got: 0 })
        ));
    }

    #[test]
    fn declared_size_past_buffer_is_an_error() {
        let mut buf = BytesMut::new();
        buf.put_i32(0);
        buf.put_i32(0);
        buf.put_u8(0); // no heightmaps
        VarInt(100).proto_encode(&mut buf);
        buf.put_slice(&[0; 10]);
        assert!(matches!(
            codec(1).read(&mut buf.freeze()),
            Err(WorldError::DeclaredLengthExceedsBuffer { declared: 100, remaining: 10 })
        ));
    }
}
