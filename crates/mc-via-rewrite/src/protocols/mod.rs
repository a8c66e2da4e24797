//! Registered version pairs.
//!
//! Each module registers the pipelines that turn messages of the older
//! (or newer) version into the other one. Module names read
//! `v<client>_to_<server>`.

pub mod v1_20_2_to_1_20;
pub mod v1_9_to_1_8;

use std::sync::Arc;

use mc_via_data::MappingData;

use crate::registry::PacketRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VersionPair {
    /// 1.9 client on a 1.8 server.
    V1_9To1_8,
    /// 1.20.2 client on a 1.20 server.
    V1_20_2To1_20,
}

impl VersionPair {
    /// Build the registry for this pair over `mappings`.
    pub fn registry(self, mappings: Arc<MappingData>) -> PacketRegistry {
        let mut registry = PacketRegistry::new(mappings);
        match self {
            VersionPair::V1_9To1_8 => v1_9_to_1_8::register(&mut registry),
            VersionPair::V1_20_2To1_20 => v1_20_2_to_1_20::register(&mut registry),
        }
        registry
    }
}
