//! Legacy block types that need a block entity in the paletted chunk format.
//!
//! 1.8 clients infer these block entities from the block grid; 1.9.4+
//! clients expect them in the chunk packet. The ids are legacy block types
//! (the upper 12 bits of a legacy cell), the names are 1.8 entity ids.

/// `(legacy block type, entity id)`, sorted by block type.
const PLACEHOLDER_BLOCK_ENTITIES: &[(u16, &str)] = &[
    (23, "Trap"),
    (25, "Music"),
    (29, "Piston"),
    (33, "Piston"),
    (34, "Piston"),
    (36, "Piston"),
    (52, "MobSpawner"),
    (54, "Chest"),
    (61, "Furnace"),
    (62, "Furnace"),
    (63, "Sign"),
    (68, "Sign"),
    (84, "RecordPlayer"),
    (116, "EnchantTable"),
    (117, "Cauldron"),
    (119, "Airportal"),
    (120, "Airportal"),
    (130, "EnderChest"),
    (137, "Control"),
    (138, "Beacon"),
    (140, "FlowerPot"),
    (144, "Skull"),
    (146, "Chest"),
    (149, "Comparator"),
    (150, "Comparator"),
    (151, "DLDetector"),
    (154, "Hopper"),
    (158, "Dropper"),
    (176, "Banner"),
    (177, "Banner"),
    (178, "DLDetector"),
    (209, "EndGateway"),
];

/// Entity id for a legacy block type that requires a block entity.
pub fn placeholder_block_entity(block_type: u16) -> Option<&'static str> {
    PLACEHOLDER_BLOCK_ENTITIES
        .binary_search_by_key(&block_type, |&(ty, _)| ty)
        .ok()
        .map(|index| PLACEHOLDER_BLOCK_ENTITIES[index].1)
}
