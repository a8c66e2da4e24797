//! Particle id table and payload classification.

use std::collections::HashSet;

use crate::mapping::IdMapping;

/// Which extra payload a particle carries after the common fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticleClass {
    /// Nothing that needs rewriting; any trailing bytes pass through.
    Plain,
    /// A VarInt block state id.
    Block,
    /// An item stack.
    Item,
}

#[derive(Debug, Clone)]
pub struct ParticleMappings {
    ids: IdMapping,
    block_particles: HashSet<i32>,
    item_particles: HashSet<i32>,
}

impl ParticleMappings {
    pub fn new(
        ids: IdMapping,
        block_particles: impl IntoIterator<Item = i32>,
        item_particles: impl IntoIterator<Item = i32>,
    ) -> Self {
        Self {
            ids,
            block_particles: block_particles.into_iter().collect(),
            item_particles: item_particles.into_iter().collect(),
        }
    }

    /// Classification of an old-format particle id. Unknown ids are plain.
    pub fn class(&self, id: i32) -> ParticleClass {
        if self.block_particles.contains(&id) {
            ParticleClass::Block
        } else if self.item_particles.contains(&id) {
            ParticleClass::Item
        } else {
            ParticleClass::Plain
        }
    }

    pub fn ids(&self) -> &IdMapping {
        &self.ids
    }

    pub fn new_id(&self, old: i32) -> i32 {
        self.ids.new_id(old)
    }
}
