//! Message rewriting between two protocol versions.
//!
//! A [`PacketRegistry`] maps `(direction, packet id)` to a [`Pipeline`] of
//! field operations and handlers. [`PacketRegistry::dispatch`] runs the
//! pipeline over one message with a cursor pair ([`PacketWrapper`]) and the
//! connection's [`ConnectionContext`]. Concrete version pairs live in
//! [`protocols`].

pub mod block_entity;
pub mod config;
pub mod context;
pub mod error;
pub mod field;
pub mod item;
pub mod protocols;
pub mod recipe;
pub mod registry;
pub mod wrapper;

pub use config::{ConfigError, ProtocolConfig};
pub use context::{ConnectionContext, Diagnostics, WorldTracker};
pub use error::RewriteError;
pub use field::{FieldType, Value};
pub use item::{ArrayLength, ItemFormat, ItemStack};
pub use protocols::VersionPair;
pub use recipe::{RecipeKind, RecipeRewriter};
pub use registry::{Direction, Message, PacketRegistry, Pipeline};
pub use wrapper::PacketWrapper;
