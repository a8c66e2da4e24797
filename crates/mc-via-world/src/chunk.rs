//! Chunk column and section data structures.

use mc_via_data::IdMapping;
use mc_via_nbt::NbtRoot;
use mc_via_proto::types::ChunkPos;

use crate::error::WorldError;

/// Edge length of a section.
pub const SECTION_SIZE: usize = 16;

/// Cells per 16x16x16 section.
pub const CELLS: usize = SECTION_SIZE * SECTION_SIZE * SECTION_SIZE;

/// Bytes in one nibble light array (4 bits per cell).
pub const LIGHT_LENGTH: usize = CELLS / 2;

/// Bytes of the 2D biome array sent with full chunks.
pub const BIOME_DATA_LENGTH: usize = 256;

/// Cell index for local coordinates, `y << 8 | z << 4 | x`.
pub fn cell_index(x: usize, y: usize, z: usize) -> usize {
    debug_assert!(x < 16 && y < 16 && z < 16);
    (y << 8) | (z << 4) | x
}

/// Inverse of [`cell_index`]: `(x, y, z)`.
pub fn cell_coords(index: usize) -> (usize, usize, usize) {
    (index & 0xF, (index >> 8) & 0xF, (index >> 4) & 0xF)
}

// ---------------------------------------------------------------------------
// NibbleArray
// ---------------------------------------------------------------------------

/// 4 bits per cell. Even cells use the low nibble of their byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NibbleArray(Vec<u8>);

impl NibbleArray {
    pub fn new() -> Self {
        Self(vec![0; LIGHT_LENGTH])
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, WorldError> {
        if bytes.len() != LIGHT_LENGTH {
            return Err(WorldError::LightLength {
                expected: LIGHT_LENGTH,
                got: bytes.len(),
            });
        }
        Ok(Self(bytes))
    }

    pub fn get(&self, index: usize) -> u8 {
        let byte = self.0[index >> 1];
        if index & 1 == 0 {
            byte & 0xF
        } else {
            byte >> 4
        }
    }

    pub fn set(&mut self, index: usize, value: u8) {
        let byte = &mut self.0[index >> 1];
        if index & 1 == 0 {
            *byte = (*byte & 0xF0) | (value & 0xF);
        } else {
            *byte = (*byte & 0x0F) | (value << 4);
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl Default for NibbleArray {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Palette
// ---------------------------------------------------------------------------

/// Section block storage: distinct ids in first-seen order plus one palette
/// index per cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    entries: Vec<i32>,
    indices: Vec<u16>,
}

impl Palette {
    /// A section filled with a single id.
    pub fn filled(id: i32) -> Self {
        Self::single(id, CELLS)
    }

    /// `cells` cells all holding `id`.
    pub fn single(id: i32, cells: usize) -> Self {
        Self {
            entries: vec![id],
            indices: vec![0; cells],
        }
    }

    /// Build from wire data, one index per cell. Every index must address
    /// an entry.
    pub fn from_parts(entries: Vec<i32>, indices: Vec<u32>) -> Result<Self, WorldError> {
        let indices = indices
            .into_iter()
            .map(|index| {
                if (index as usize) < entries.len() {
                    Ok(index as u16)
                } else {
                    Err(WorldError::PaletteIndex {
                        index,
                        len: entries.len(),
                    })
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { entries, indices })
    }

    /// Build from one global id per cell.
    pub fn from_ids(ids: impl IntoIterator<Item = i32>) -> Self {
        let mut palette = Self {
            entries: Vec::new(),
            indices: Vec::with_capacity(CELLS),
        };
        for id in ids {
            let index = palette.entry_index(id);
            palette.indices.push(index);
        }
        palette
    }

    fn entry_index(&mut self, id: i32) -> u16 {
        match self.entries.iter().position(|&e| e == id) {
            Some(index) => index as u16,
            None => {
                self.entries.push(id);
                (self.entries.len() - 1) as u16
            }
        }
    }

    pub fn get(&self, cell: usize) -> i32 {
        self.entries[self.indices[cell] as usize]
    }

    /// Set a cell, adding `id` to the palette if it is new.
    pub fn set(&mut self, cell: usize, id: i32) {
        let index = self.entry_index(id);
        self.indices[cell] = index;
    }

    pub fn entries(&self) -> &[i32] {
        &self.entries
    }

    pub fn indices(&self) -> &[u16] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replace every entry in place. May leave duplicate entries.
    pub fn remap(&mut self, mut f: impl FnMut(i32) -> i32) {
        for entry in &mut self.entries {
            *entry = f(*entry);
        }
    }

    /// Palette holding only the distinct ids that cells actually use.
    pub fn compacted(&self) -> Self {
        Self::from_ids(self.indices.iter().map(|&i| self.entries[i as usize]))
    }

    /// Global id of every cell.
    pub fn ids(&self) -> impl Iterator<Item = i32> + '_ {
        self.indices.iter().map(|&i| self.entries[i as usize])
    }
}

// ---------------------------------------------------------------------------
// ChunkSection / Chunk
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkSection {
    pub palette: Palette,
    pub block_light: NibbleArray,
    /// `None` for dimensions without sky light, or when the sender omitted it.
    pub sky_light: Option<NibbleArray>,
}

impl ChunkSection {
    pub fn new(palette: Palette) -> Self {
        Self {
            palette,
            block_light: NibbleArray::new(),
            sky_light: None,
        }
    }
}

/// One chunk column as decoded from either wire format.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Chunk {
    pub pos: ChunkPos,
    /// Ground-up continuous: the column replaces the whole client chunk.
    pub full_chunk: bool,
    /// Bottom to top. Absent sections are `None`.
    pub sections: Vec<Option<ChunkSection>>,
    pub biome_data: Option<Vec<u8>>,
    pub block_entities: Vec<NbtRoot>,
    /// The message actually unloads the client chunk at `pos`.
    pub unload: bool,
    /// Declared bytes that no field accounted for on decode.
    pub leftover_bytes: usize,
}

impl Chunk {
    pub fn unload(pos: ChunkPos) -> Self {
        Self {
            pos,
            unload: true,
            ..Default::default()
        }
    }

    /// One bit per present section, derived from `sections`.
    pub fn bitmask(&self) -> i32 {
        self.sections
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_some())
            .fold(0, |mask, (i, _)| mask | (1 << i))
    }

    pub fn section_count(&self) -> usize {
        self.sections.iter().filter(|s| s.is_some()).count()
    }

    pub fn present_sections(&self) -> impl Iterator<Item = (usize, &ChunkSection)> {
        self.sections
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|s| (i, s)))
    }

    /// Apply a block state table to every palette entry.
    pub fn remap_block_states(&mut self, table: &IdMapping) {
        for section in self.sections.iter_mut().flatten() {
            section.palette.remap(|id| table.new_id(id));
        }
    }
}
