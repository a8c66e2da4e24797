//! 1.20.2 client on a 1.20 server.
//!
//! Items change from [`ItemFormat::Flat`] to [`ItemFormat::Revised`], block
//! entity tags and chunk heightmaps lose their root name and beacon effects
//! become keys. Packet ids are the same on both sides for every message
//! registered here.
//!
//! The join and respawn messages pass through unchanged. They are read for
//! the world height and biome count the chunk codec needs.

use mc_via_data::ParticleClass;
use mc_via_nbt::{read_nbt, write_nameless_nbt, write_nbt, NbtCompound, NbtTag};
use mc_via_proto::types::{ChunkPos, VarInt, VarLong};
use mc_via_world::bits::ceil_log2;
use mc_via_world::{ColumnCodec, TagFraming};
use tracing::debug;

use crate::block_entity::rewrite_beacon_effects;
use crate::context::WorldTracker;
use crate::error::RewriteError;
use crate::field::FieldType;
use crate::item::{ArrayLength, ItemFormat};
use crate::recipe::RecipeRewriter;
use crate::registry::{Direction, PacketRegistry, Pipeline};
use crate::wrapper::PacketWrapper;

pub mod clientbound {
    pub const BLOCK_ENTITY_DATA: i32 = 0x08;
    pub const BLOCK_ACTION: i32 = 0x09;
    pub const BLOCK_CHANGE: i32 = 0x0A;
    pub const WINDOW_ITEMS: i32 = 0x12;
    pub const SET_SLOT: i32 = 0x14;
    pub const UNLOAD_CHUNK: i32 = 0x1E;
    pub const CHUNK_DATA: i32 = 0x24;
    pub const EFFECT: i32 = 0x25;
    pub const SPAWN_PARTICLE: i32 = 0x26;
    pub const JOIN_GAME: i32 = 0x28;
    pub const TRADE_LIST: i32 = 0x2A;
    pub const RESPAWN: i32 = 0x41;
    pub const MULTI_BLOCK_CHANGE: i32 = 0x43;
    pub const ENTITY_EQUIPMENT: i32 = 0x55;
    pub const NBT_QUERY: i32 = 0x67;
    pub const ADVANCEMENTS: i32 = 0x69;
    pub const DECLARE_RECIPES: i32 = 0x6D;
}

pub mod serverbound {
    pub const CLICK_WINDOW: i32 = 0x0D;
    pub const SET_BEACON_EFFECT: i32 = 0x2C;
    pub const CREATIVE_INVENTORY_ACTION: i32 = 0x2E;
}

const FROM: ItemFormat = ItemFormat::Flat;
const TO: ItemFormat = ItemFormat::Revised;

/// Set in the equipment slot byte when another entry follows.
const EQUIPMENT_CONTINUES: u8 = 0x80;

/// Advancement display flag: a background texture follows.
const HAS_BACKGROUND: i32 = 0x01;

/// Effect whose data is an item id.
const EFFECT_PLAY_RECORD: i32 = 1010;
/// Effect whose data is a block state id.
const EFFECT_BLOCK_BREAK: i32 = 2001;

/// Low bits of a multi block change entry: the position in the section.
const LOCAL_POSITION_BITS: u32 = 12;

const DIMENSION_TYPE_REGISTRY: &str = "minecraft:dimension_type";
const BIOME_REGISTRY: &str = "minecraft:worldgen/biome";

pub fn register(registry: &mut PacketRegistry) {
    registry.register(
        Direction::Serverbound,
        serverbound::SET_BEACON_EFFECT,
        Pipeline::new().handler(|w| {
            // Primary, then secondary. Effect ids start at 1 before 1.20.2.
            for _ in 0..2 {
                if w.passthrough::<bool>()? {
                    let id = w.read::<VarInt>()?.0;
                    w.write(&VarInt(id + 1));
                }
            }
            Ok(())
        }),
    );

    registry.register(
        Direction::Clientbound,
        clientbound::UNLOAD_CHUNK,
        Pipeline::new().handler(|w| {
            let x = w.read::<i32>()?;
            let z = w.read::<i32>()?;
            w.write(&ChunkPos::new(x, z));
            Ok(())
        }),
    );

    registry.register(
        Direction::Clientbound,
        clientbound::NBT_QUERY,
        Pipeline::new()
            .map(FieldType::VarInt) // transaction id
            .handler(block_entity_tag),
    );

    registry.register(
        Direction::Clientbound,
        clientbound::BLOCK_ENTITY_DATA,
        Pipeline::new()
            .map(FieldType::Position)
            .map(FieldType::VarInt) // block entity type
            .handler(block_entity_tag),
    );

    registry.register(Direction::Clientbound, clientbound::JOIN_GAME, Pipeline::new().handler(join_game));

    registry.register(
        Direction::Clientbound,
        clientbound::RESPAWN,
        Pipeline::new().handler(|w| {
            let dimension_type = w.passthrough::<String>()?;
            enter_dimension(w, &dimension_type);
            Ok(())
        }),
    );

    registry.register(Direction::Clientbound, clientbound::CHUNK_DATA, Pipeline::new().handler(chunk_data));

    registry.register(
        Direction::Clientbound,
        clientbound::BLOCK_CHANGE,
        Pipeline::new().map(FieldType::Position).handler(|w| {
            let id = w.read::<VarInt>()?.0;
            let id = w.new_block_state_id(id);
            w.write(&VarInt(id));
            Ok(())
        }),
    );

    registry.register(
        Direction::Clientbound,
        clientbound::BLOCK_ACTION,
        Pipeline::new()
            .map(FieldType::Position)
            .map(FieldType::UByte) // action id
            .map(FieldType::UByte) // action parameter
            .handler(|w| {
                let id = w.read::<VarInt>()?.0;
                let id = w.new_block_id(id);
                w.write(&VarInt(id));
                Ok(())
            }),
    );

    registry.register(
        Direction::Clientbound,
        clientbound::MULTI_BLOCK_CHANGE,
        Pipeline::new()
            .map(FieldType::Long) // section position
            .handler(|w| {
                let count = w.passthrough::<VarInt>()?.0;
                for _ in 0..count {
                    let entry = w.read::<VarLong>()?.0;
                    let state = w.new_block_state_id((entry >> LOCAL_POSITION_BITS) as i32);
                    let local = entry & ((1 << LOCAL_POSITION_BITS) - 1);
                    w.write(&VarLong(((state as i64) << LOCAL_POSITION_BITS) | local));
                }
                Ok(())
            }),
    );

    registry.register(
        Direction::Clientbound,
        clientbound::EFFECT,
        Pipeline::new().handler(|w| {
            let effect = w.passthrough::<i32>()?;
            w.passthrough_field(FieldType::Position)?;
            let data = w.read::<i32>()?;
            let data = match effect {
                EFFECT_PLAY_RECORD => w.new_item_id(data),
                EFFECT_BLOCK_BREAK => w.new_block_state_id(data),
                _ => data,
            };
            w.write(&data);
            Ok(())
        }),
    );

    registry.register(
        Direction::Clientbound,
        clientbound::WINDOW_ITEMS,
        Pipeline::new()
            .map(FieldType::UByte) // window id
            .map(FieldType::VarInt) // state id
            .handler(|w| {
                w.rewrite_item_array(FROM, TO, ArrayLength::VarInt)?;
                w.rewrite_item(FROM, TO)?; // carried
                Ok(())
            }),
    );

    registry.register(
        Direction::Clientbound,
        clientbound::SET_SLOT,
        Pipeline::new()
            .map(FieldType::UByte)
            .map(FieldType::VarInt)
            .map(FieldType::Short)
            .handler(clientbound_item),
    );

    registry.register(Direction::Clientbound, clientbound::ADVANCEMENTS, Pipeline::new().handler(advancements));

    registry.register(
        Direction::Clientbound,
        clientbound::ENTITY_EQUIPMENT,
        Pipeline::new().map(FieldType::VarInt).handler(|w| {
            loop {
                let slot = w.passthrough::<i8>()?;
                w.rewrite_item(FROM, TO)?;
                if (slot as u8) & EQUIPMENT_CONTINUES == 0 {
                    return Ok(());
                }
            }
        }),
    );

    registry.register(
        Direction::Clientbound,
        clientbound::TRADE_LIST,
        Pipeline::new().map(FieldType::VarInt).handler(|w| {
            let count = w.passthrough::<VarInt>()?.0;
            for _ in 0..count {
                // input, output, second input
                for _ in 0..3 {
                    w.rewrite_item(FROM, TO)?;
                }
                w.passthrough::<bool>()?; // disabled
                w.passthrough::<i32>()?; // uses
                w.passthrough::<i32>()?; // max uses
                w.passthrough::<i32>()?; // xp
                w.passthrough::<i32>()?; // special price
                w.passthrough::<f32>()?; // price multiplier
                w.passthrough::<i32>()?; // demand
            }
            Ok(())
        }),
    );

    registry.register(
        Direction::Serverbound,
        serverbound::CLICK_WINDOW,
        Pipeline::new()
            .map(FieldType::UByte) // window id
            .map(FieldType::VarInt) // state id
            .map(FieldType::Short) // slot
            .map(FieldType::Byte) // button
            .map(FieldType::VarInt) // mode
            .handler(|w| {
                let changed = w.passthrough::<VarInt>()?.0;
                for _ in 0..changed {
                    w.passthrough::<i16>()?;
                    w.rewrite_item(TO, FROM)?;
                }
                w.rewrite_item(TO, FROM)?; // carried
                Ok(())
            }),
    );

    registry.register(
        Direction::Serverbound,
        serverbound::CREATIVE_INVENTORY_ACTION,
        Pipeline::new().map(FieldType::Short).handler(|w| {
            w.rewrite_item(TO, FROM)?;
            Ok(())
        }),
    );

    registry.register(Direction::Clientbound, clientbound::SPAWN_PARTICLE, Pipeline::new().handler(spawn_particle));

    let recipes = RecipeRewriter::new(FROM, TO);
    registry.register(
        Direction::Clientbound,
        clientbound::DECLARE_RECIPES,
        Pipeline::new().handler(move |w| recipes.rewrite_declare_recipes(w)),
    );
}

fn clientbound_item(w: &mut PacketWrapper<'_>) -> Result<(), RewriteError> {
    w.rewrite_item(FROM, TO)?;
    Ok(())
}

/// Named tag in, nameless tag out, with beacon effects keyed.
fn block_entity_tag(w: &mut PacketWrapper<'_>) -> Result<(), RewriteError> {
    let tag = read_nbt(w.input())?.map(|root| rewrite_beacon_effects(&root.compound));
    write_nameless_nbt(w.output(), tag.as_ref());
    Ok(())
}

fn join_game(w: &mut PacketWrapper<'_>) -> Result<(), RewriteError> {
    w.passthrough::<i32>()?; // entity id
    w.passthrough::<bool>()?; // hardcore
    w.passthrough::<u8>()?; // game mode
    w.passthrough::<i8>()?; // previous game mode
    w.passthrough_field(FieldType::StringArray)?; // world names

    let registry = read_nbt(w.input())?;
    if let Some(root) = &registry {
        track_registry(&root.compound, &mut w.connection().world);
    }
    write_nbt(w.output(), registry.as_ref());

    let dimension_type = w.passthrough::<String>()?;
    enter_dimension(w, &dimension_type);
    Ok(())
}

/// Record every dimension type's section height and the biome count.
fn track_registry(registry: &NbtCompound, world: &mut WorldTracker) {
    for entry in registry_entries(registry, DIMENSION_TYPE_REGISTRY) {
        let name = entry.get("name").and_then(NbtTag::as_string).and_then(|name| name.to_str().ok());
        let height = entry
            .get("element")
            .and_then(NbtTag::as_compound)
            .and_then(|element| element.get("height"))
            .and_then(NbtTag::as_i64)
            .and_then(|height| usize::try_from(height >> 4).ok());
        if let (Some(name), Some(sections)) = (name, height) {
            world.set_dimension_height(name, sections);
        }
    }
    let biomes = registry_entries(registry, BIOME_REGISTRY).count();
    world.set_biomes_sent(biomes);
    debug!(biomes, "tracked join registry");
}

fn registry_entries<'a>(registry: &'a NbtCompound, key: &str) -> impl Iterator<Item = &'a NbtCompound> {
    registry
        .get(key)
        .and_then(NbtTag::as_compound)
        .and_then(|registry| registry.get("value"))
        .and_then(NbtTag::as_list)
        .unwrap_or(&[])
        .iter()
        .filter_map(NbtTag::as_compound)
}

fn enter_dimension(w: &mut PacketWrapper<'_>, dimension_type: &str) {
    let packet_id = w.packet_id();
    let connection = w.connection();
    if !connection.world.enter_dimension(dimension_type) {
        let message = format!("dimension type {dimension_type} is not in the join registry");
        connection.diagnostics.record_anomaly(packet_id, message);
    }
}

/// 1.20 column in, 1.20.2 column out. Light data after it passes through.
fn chunk_data(w: &mut PacketWrapper<'_>) -> Result<(), RewriteError> {
    let table = w.mappings().block_states();
    let section_count = w.connection().world.section_height();
    let biome_bits = ceil_log2(w.connection().world.biomes_sent());

    let source = ColumnCodec::new(section_count, ceil_log2(table.size()), biome_bits);
    let mut column = source.read(w.input())?;
    if column.leftover_bytes > 0 {
        let message = format!("column ({}, {}) left {} bytes unread", column.x, column.z, column.leftover_bytes);
        w.connection().diagnostics.record_anomaly(clientbound::CHUNK_DATA, message);
    }

    let misses: Vec<i32> = column
        .sections
        .iter()
        .flat_map(|section| section.blocks.entries().iter().copied())
        .filter(|&id| table.try_new_id(id).is_none())
        .collect();
    for id in misses {
        w.connection().diagnostics.record_unknown_id("block_states", id);
    }
    column.remap_block_states(table);

    for entity in &mut column.block_entities {
        entity.tag = entity.tag.as_ref().map(rewrite_beacon_effects);
    }

    let target = ColumnCodec::new(section_count, ceil_log2(table.mapped_size()), biome_bits)
        .with_framing(TagFraming::Nameless);
    target.write(w.output(), &column)?;
    Ok(())
}

fn advancements(w: &mut PacketWrapper<'_>) -> Result<(), RewriteError> {
    w.passthrough::<bool>()?; // reset
    let count = w.passthrough::<VarInt>()?.0;
    for _ in 0..count {
        w.passthrough::<String>()?;
        if w.passthrough::<bool>()? {
            w.passthrough::<String>()?; // parent
        }

        if w.passthrough::<bool>()? {
            w.passthrough::<String>()?; // title
            w.passthrough::<String>()?; // description
            w.rewrite_item(FROM, TO)?; // icon
            w.passthrough::<VarInt>()?; // frame
            let flags = w.passthrough::<i32>()?;
            if flags & HAS_BACKGROUND != 0 {
                w.passthrough::<String>()?;
            }
            w.passthrough::<f32>()?;
            w.passthrough::<f32>()?;
        }

        // Criteria are gone in 1.20.2.
        w.read_field(FieldType::StringArray)?;

        let requirements = w.passthrough::<VarInt>()?.0;
        for _ in 0..requirements {
            w.passthrough_field(FieldType::StringArray)?;
        }
        w.passthrough::<bool>()?; // sends telemetry
    }
    Ok(())
}

fn spawn_particle(w: &mut PacketWrapper<'_>) -> Result<(), RewriteError> {
    let id = w.read::<VarInt>()?.0;
    let new_id = w.new_particle_id(id);
    w.write(&VarInt(new_id));

    w.passthrough::<bool>()?; // long distance
    for _ in 0..3 {
        w.passthrough::<f64>()?; // position
    }
    for _ in 0..4 {
        w.passthrough::<f32>()?; // offset, speed
    }
    w.passthrough::<i32>()?; // count

    match w.mappings().particles().class(id) {
        ParticleClass::Block => {
            let state = w.read::<VarInt>()?.0;
            let state = w.new_block_state_id(state);
            w.write(&VarInt(state));
        }
        ParticleClass::Item => {
            w.rewrite_item(FROM, TO)?;
        }
        ParticleClass::Plain => {}
    }
    Ok(())
}
