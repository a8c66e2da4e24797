//! Host-supplied mapping input and the validated table set built from it.

use serde::Deserialize;
use tracing::debug;

use crate::error::MappingError;
use crate::mapping::{Fallback, IdMapping, UNMAPPED};
use crate::particle::ParticleMappings;

/// One id table as supplied by the host: `mappings[old] = new` (or -1).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IdTable {
    pub mappings: Vec<i32>,
    /// Size of the target id space. Defaults to one past the largest entry.
    #[serde(default)]
    pub mapped_size: Option<usize>,
    /// Id returned for unknown source ids. Unset = identity.
    #[serde(default)]
    pub fallback: Option<i32>,
}

impl IdTable {
    pub fn identity(size: usize) -> Self {
        Self {
            mappings: (0..size as i32).collect(),
            mapped_size: Some(size),
            fallback: None,
        }
    }

    fn build(self, table: &'static str) -> Result<IdMapping, MappingError> {
        let mapped_size = self.mapped_size.unwrap_or_else(|| {
            self.mappings
                .iter()
                .copied()
                .max()
                .map_or(0, |max| (max + 1).max(0) as usize)
        });
        for (index, &id) in self.mappings.iter().enumerate() {
            if id == UNMAPPED {
                continue;
            }
            if id < 0 || id as usize >= mapped_size {
                return Err(MappingError::OutOfRange {
                    table,
                    index,
                    id,
                    mapped_size,
                });
            }
        }
        let fallback = self.fallback.map_or(Fallback::Identity, Fallback::Sentinel);
        Ok(IdMapping::new(self.mappings, mapped_size).with_fallback(fallback))
    }
}

/// Particle table: ids plus which old ids carry a block or item payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParticleTable {
    #[serde(flatten)]
    pub ids: IdTable,
    #[serde(default)]
    pub block_particles: Vec<i32>,
    #[serde(default)]
    pub item_particles: Vec<i32>,
}

/// Everything a version pair needs, in the shape a host data file provides.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MappingSource {
    pub block_states: IdTable,
    /// Block (not block state) ids, sent by block actions. Absent = unchanged.
    #[serde(default)]
    pub blocks: Option<IdTable>,
    pub items: IdTable,
    #[serde(default)]
    pub particles: ParticleTable,
}

/// Immutable table set for one version pair.
#[derive(Debug, Clone)]
pub struct MappingData {
    block_states: IdMapping,
    blocks: Option<IdMapping>,
    items: IdMapping,
    items_inverse: IdMapping,
    particles: ParticleMappings,
}

impl MappingData {
    /// Validate a host-supplied source and build the lookup tables.
    pub fn from_source(source: MappingSource) -> Result<Self, MappingError> {
        let block_states = source.block_states.build("block_states")?;
        let blocks = source.blocks.map(|table| table.build("blocks")).transpose()?;
        let items = source.items.build("items")?;
        let particle_ids = source.particles.ids.build("particles")?;

        if let Some(&id) = source
            .particles
            .block_particles
            .iter()
            .find(|id| source.particles.item_particles.contains(*id))
        {
            return Err(MappingError::ConflictingParticleClass {
                table: "particles",
                id,
            });
        }

        debug!(
            block_states = block_states.size(),
            mapped_block_states = block_states.mapped_size(),
            items = items.size(),
            particles = particle_ids.size(),
            "built mapping tables"
        );

        Ok(Self {
            items_inverse: items.inverse(),
            block_states,
            blocks,
            items,
            particles: ParticleMappings::new(
                particle_ids,
                source.particles.block_particles,
                source.particles.item_particles,
            ),
        })
    }

    /// Tables that leave every id unchanged.
    pub fn identity(block_states: usize, items: usize, particles: usize) -> Self {
        let items = IdMapping::identity(items);
        Self {
            block_states: IdMapping::identity(block_states),
            blocks: None,
            items_inverse: items.inverse(),
            items,
            particles: ParticleMappings::new(IdMapping::identity(particles), [], []),
        }
    }

    pub fn block_states(&self) -> &IdMapping {
        &self.block_states
    }

    pub fn blocks(&self) -> Option<&IdMapping> {
        self.blocks.as_ref()
    }

    /// Old -> new item ids (clientbound direction).
    pub fn items(&self) -> &IdMapping {
        &self.items
    }

    /// New -> old item ids (serverbound direction).
    pub fn items_inverse(&self) -> &IdMapping {
        &self.items_inverse
    }

    pub fn particles(&self) -> &ParticleMappings {
        &self.particles
    }

    pub fn new_block_state_id(&self, old: i32) -> i32 {
        self.block_states.new_id(old)
    }

    pub fn new_item_id(&self, old: i32) -> i32 {
        self.items.new_id(old)
    }
}
