//! Id translation tables for one protocol version pair.
//!
//! Tables are built once from a host-supplied [`MappingSource`] and are
//! read-only afterwards, so a single [`MappingData`] can be shared by every
//! connection that negotiated the same pair.

pub mod block_entity;
pub mod error;
pub mod mapping;
pub mod particle;
pub mod potion;
pub mod source;

pub use error::MappingError;
pub use mapping::{Fallback, IdMapping};
pub use particle::{ParticleClass, ParticleMappings};
pub use source::{IdTable, MappingData, MappingSource, ParticleTable};
