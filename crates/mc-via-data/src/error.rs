//! Mapping table construction errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MappingError {
    #[error("{table}: entry {index} maps to {id}, outside target id space of {mapped_size}")]
    OutOfRange {
        table: &'static str,
        index: usize,
        id: i32,
        mapped_size: usize,
    },

    #[error("{table}: particle id {id} is classified as both block and item payload")]
    ConflictingParticleClass { table: &'static str, id: i32 },
}
