//! 1.9 client on a 1.8 server.
//!
//! Both sides use the legacy item layout. Chunks change from the 1.8 cell
//! grid to per-section palettes, and 1.9 clients expect the block entities
//! that 1.8 clients inferred from the grid.

use mc_via_data::block_entity::placeholder_block_entity;
use mc_via_nbt::{NbtCompound, NbtRoot, NbtTag};
use mc_via_proto::types::VarInt;
use mc_via_world::bits::ceil_log2;
use mc_via_world::chunk::{cell_coords, CELLS, SECTION_SIZE};
use mc_via_world::{legacy, Chunk, ChunkCodec};
use tracing::debug;

use crate::block_entity::rewrite_beacon_effects;
use crate::error::RewriteError;
use crate::field::FieldType;
use crate::item::{ArrayLength, ItemFormat};
use crate::registry::{Direction, PacketRegistry, Pipeline};
use crate::wrapper::PacketWrapper;

pub mod clientbound {
    /// `(1.8 id, 1.9 id)`
    pub const JOIN_GAME: (i32, i32) = (0x01, 0x23);
    pub const RESPAWN: (i32, i32) = (0x07, 0x33);
    pub const CHUNK_DATA: (i32, i32) = (0x21, 0x20);
    pub const BLOCK_CHANGE: (i32, i32) = (0x23, 0x0B);
    pub const SET_SLOT: (i32, i32) = (0x2F, 0x16);
    pub const WINDOW_ITEMS: (i32, i32) = (0x30, 0x14);
    /// 1.9 only; 1.8 sends an empty full chunk instead.
    pub const UNLOAD_CHUNK: i32 = 0x1D;
}

pub mod serverbound {
    /// `(1.9 id, 1.8 id)`
    pub const CLICK_WINDOW: (i32, i32) = (0x07, 0x0E);
    pub const CREATIVE_INVENTORY_ACTION: (i32, i32) = (0x18, 0x10);
}

const SECTION_HEIGHT: usize = 16;

pub fn register(registry: &mut PacketRegistry) {
    let (old, new) = clientbound::JOIN_GAME;
    registry.register_mapped(
        Direction::Clientbound,
        old,
        new,
        Pipeline::new()
            .map(FieldType::Int) // entity id
            .map(FieldType::UByte) // game mode
            .handler(|w| {
                let dimension = w.read::<i8>()? as i32;
                w.write(&dimension);
                let world = &mut w.connection().world;
                world.set_dimension(dimension);
                world.set_section_height(SECTION_HEIGHT);
                Ok(())
            }),
    );

    let (old, new) = clientbound::RESPAWN;
    registry.register_mapped(
        Direction::Clientbound,
        old,
        new,
        Pipeline::new().handler(|w| {
            let dimension = w.passthrough::<i32>()?;
            w.connection().world.set_dimension(dimension);
            Ok(())
        }),
    );

    let (old, new) = clientbound::CHUNK_DATA;
    registry.register_mapped(Direction::Clientbound, old, new, Pipeline::new().handler(chunk_data));

    let (old, new) = clientbound::BLOCK_CHANGE;
    registry.register_mapped(
        Direction::Clientbound,
        old,
        new,
        Pipeline::new().map(FieldType::LegacyPosition).handler(|w| {
            let id = w.read::<VarInt>()?.0;
            let id = w.new_block_state_id(id);
            w.write(&VarInt(id));
            Ok(())
        }),
    );

    let (old, new) = clientbound::SET_SLOT;
    registry.register_mapped(
        Direction::Clientbound,
        old,
        new,
        Pipeline::new()
            .map(FieldType::Byte) // window id
            .map(FieldType::Short) // slot
            .handler(rewrite_legacy_item),
    );

    let (old, new) = clientbound::WINDOW_ITEMS;
    registry.register_mapped(
        Direction::Clientbound,
        old,
        new,
        Pipeline::new()
            .map(FieldType::UByte)
            .handler(|w| w.rewrite_item_array(ItemFormat::Legacy, ItemFormat::Legacy, ArrayLength::Short)),
    );

    let (old, new) = serverbound::CLICK_WINDOW;
    registry.register_mapped(
        Direction::Serverbound,
        old,
        new,
        Pipeline::new()
            .map(FieldType::UByte) // window id
            .map(FieldType::Short) // slot
            .map(FieldType::Byte) // button
            .map(FieldType::Short) // action number
            .map_to(FieldType::VarInt, FieldType::Byte) // mode
            .handler(rewrite_legacy_item),
    );

    let (old, new) = serverbound::CREATIVE_INVENTORY_ACTION;
    registry.register_mapped(
        Direction::Serverbound,
        old,
        new,
        Pipeline::new().map(FieldType::Short).handler(rewrite_legacy_item),
    );
}

fn rewrite_legacy_item(w: &mut PacketWrapper<'_>) -> Result<(), RewriteError> {
    w.rewrite_item(ItemFormat::Legacy, ItemFormat::Legacy)?;
    Ok(())
}

fn chunk_data(w: &mut PacketWrapper<'_>) -> Result<(), RewriteError> {
    let mut chunk = {
        let (input, connection) = w.input_and_connection();
        legacy::read_chunk(input, &mut connection.chunks)?
    };

    if chunk.unload {
        w.set_packet_id(clientbound::UNLOAD_CHUNK);
        w.write(&chunk.pos.x);
        w.write(&chunk.pos.z);
        return Ok(());
    }

    if chunk.leftover_bytes > 0 {
        let message = format!(
            "chunk ({}, {}) left {} bytes unread",
            chunk.pos.x, chunk.pos.z, chunk.leftover_bytes
        );
        w.connection().diagnostics.record_anomaly(clientbound::CHUNK_DATA.0, message);
    }

    if w.connection().placeholder_block_entities {
        chunk.block_entities = placeholder_block_entities(&chunk);
        if !chunk.block_entities.is_empty() {
            debug!(
                x = chunk.pos.x,
                z = chunk.pos.z,
                count = chunk.block_entities.len(),
                "added placeholder block entities"
            );
        }
    }
    for root in &mut chunk.block_entities {
        root.compound = rewrite_beacon_effects(&root.compound);
    }

    let table = w.mappings().block_states();
    let misses: Vec<i32> = chunk
        .present_sections()
        .flat_map(|(_, section)| section.palette.entries().iter().copied())
        .filter(|&id| table.try_new_id(id).is_none())
        .collect();
    for id in misses {
        w.connection().diagnostics.record_unknown_id("block_states", id);
    }
    chunk.remap_block_states(table);

    let global_bits = ceil_log2(table.mapped_size());
    let codec = ChunkCodec::new(w.connection().world.section_height(), global_bits).with_block_entities(true);
    codec.write(w.output(), &chunk)?;
    Ok(())
}

/// One `{x, y, z, id}` entry per cell whose legacy block type needs a block
/// entity. Must run before block states are remapped.
fn placeholder_block_entities(chunk: &Chunk) -> Vec<NbtRoot> {
    let mut entities = Vec::new();
    for (section_y, section) in chunk.present_sections() {
        let palette = &section.palette;
        if !palette.entries().iter().any(|&id| block_entity_id(id).is_some()) {
            continue;
        }
        for cell in 0..CELLS {
            let Some(id) = block_entity_id(palette.get(cell)) else {
                continue;
            };
            let (x, y, z) = cell_coords(cell);
            let mut tag = NbtCompound::new();
            tag.insert("x".into(), NbtTag::Int(chunk.pos.block_x() + x as i32));
            tag.insert("y".into(), NbtTag::Int((section_y * SECTION_SIZE + y) as i32));
            tag.insert("z".into(), NbtTag::Int(chunk.pos.block_z() + z as i32));
            tag.insert("id".into(), NbtTag::String(id.into()));
            entities.push(NbtRoot::from(tag));
        }
    }
    entities
}

/// Legacy cells are `block_type << 4 | meta`.
fn block_entity_id(cell: i32) -> Option<&'static str> {
    u16::try_from(cell >> 4).ok().and_then(placeholder_block_entity)
}
