//! Minecraft Java Edition wire types and the buffer codec traits the
//! translation layer is built on.

pub mod codec;
pub mod error;
pub mod types;

pub use codec::{ProtoDecode, ProtoEncode};
pub use error::ProtoError;
