//! Packet rewrite errors.
//!
//! Every variant is fatal for the message being rewritten. The host is
//! expected to drop the connection.

use mc_via_data::MappingError;
use mc_via_nbt::NbtError;
use mc_via_proto::ProtoError;
use mc_via_world::WorldError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RewriteError {
    #[error(transparent)]
    Proto(#[from] ProtoError),

    #[error(transparent)]
    Nbt(#[from] NbtError),

    #[error(transparent)]
    World(#[from] WorldError),

    #[error(transparent)]
    Mapping(#[from] MappingError),

    #[error("cannot write {got} value as {expected}")]
    TypeMismatch {
        expected: &'static str,
        got: &'static str,
    },

    #[error("recipe {id}: {reason}")]
    InvalidRecipe { id: String, reason: String },
}
