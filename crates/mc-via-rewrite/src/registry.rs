//! Message routing: (direction, packet id) -> pipeline.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use mc_via_data::MappingData;
use tracing::{debug, trace};

use crate::context::ConnectionContext;
use crate::error::RewriteError;
use crate::field::FieldType;
use crate::wrapper::PacketWrapper;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Server to client.
    Clientbound,
    /// Client to server.
    Serverbound,
}

/// One framed message, without its length prefix or packet id varint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub direction: Direction,
    pub packet_id: i32,
    pub payload: Bytes,
}

impl Message {
    pub fn new(direction: Direction, packet_id: i32, payload: impl Into<Bytes>) -> Self {
        Self {
            direction,
            packet_id,
            payload: payload.into(),
        }
    }
}

pub type HandlerFn = dyn Fn(&mut PacketWrapper<'_>) -> Result<(), RewriteError> + Send + Sync;

#[derive(Clone)]
pub enum Operation {
    /// Read and write a field unchanged.
    Passthrough(FieldType),
    /// Read with the first codec, write with the second.
    Transform(FieldType, FieldType),
    Handler(Arc<HandlerFn>),
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Passthrough(ty) => f.debug_tuple("Passthrough").field(ty).finish(),
            Operation::Transform(from, to) => f.debug_tuple("Transform").field(from).field(to).finish(),
            Operation::Handler(_) => f.write_str("Handler(..)"),
        }
    }
}

/// Ordered operations applied to one message type.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    operations: Vec<Operation>,
    output_id: Option<i32>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn map(mut self, ty: FieldType) -> Self {
        self.operations.push(Operation::Passthrough(ty));
        self
    }

    pub fn map_to(mut self, from: FieldType, to: FieldType) -> Self {
        self.operations.push(Operation::Transform(from, to));
        self
    }

    pub fn handler<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut PacketWrapper<'_>) -> Result<(), RewriteError> + Send + Sync + 'static,
    {
        self.operations.push(Operation::Handler(Arc::new(f)));
        self
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn output_id(&self) -> Option<i32> {
        self.output_id
    }

    /// Run every operation in order. The first error aborts the rest.
    pub fn apply(&self, wrapper: &mut PacketWrapper<'_>) -> Result<(), RewriteError> {
        for operation in &self.operations {
            match operation {
                Operation::Passthrough(ty) => {
                    wrapper.passthrough_field(*ty)?;
                }
                Operation::Transform(from, to) => {
                    wrapper.transform_field(*from, *to)?;
                }
                Operation::Handler(handler) => handler(wrapper)?,
            }
        }
        Ok(())
    }
}

/// Pipelines for one version pair plus the tables they share.
pub struct PacketRegistry {
    pipelines: HashMap<(Direction, i32), Pipeline>,
    mappings: Arc<MappingData>,
}

impl PacketRegistry {
    pub fn new(mappings: Arc<MappingData>) -> Self {
        Self {
            pipelines: HashMap::new(),
            mappings,
        }
    }

    pub fn mappings(&self) -> &Arc<MappingData> {
        &self.mappings
    }

    /// Register a pipeline that keeps the message's packet id.
    pub fn register(&mut self, direction: Direction, packet_id: i32, pipeline: Pipeline) {
        debug!(?direction, packet_id = format_args!("{packet_id:#04x}"), "registered pipeline");
        self.pipelines.insert((direction, packet_id), pipeline);
    }

    /// Register a pipeline whose output carries `new_id`.
    pub fn register_mapped(&mut self, direction: Direction, old_id: i32, new_id: i32, mut pipeline: Pipeline) {
        pipeline.output_id = Some(new_id);
        debug!(
            ?direction,
            old_id = format_args!("{old_id:#04x}"),
            new_id = format_args!("{new_id:#04x}"),
            "registered mapped pipeline"
        );
        self.pipelines.insert((direction, old_id), pipeline);
    }

    pub fn is_registered(&self, direction: Direction, packet_id: i32) -> bool {
        self.pipelines.contains_key(&(direction, packet_id))
    }

    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }

    /// Rewrite one message. Unregistered messages are returned unchanged.
    pub fn dispatch(&self, message: Message, connection: &mut ConnectionContext) -> Result<Message, RewriteError> {
        let Some(pipeline) = self.pipelines.get(&(message.direction, message.packet_id)) else {
            trace!(direction = ?message.direction, packet_id = message.packet_id, "no pipeline, passing through");
            return Ok(message);
        };

        trace!(
            direction = ?message.direction,
            packet_id = message.packet_id,
            len = message.payload.len(),
            "rewriting message"
        );
        let output_id = pipeline.output_id.unwrap_or(message.packet_id);
        let mut wrapper = PacketWrapper::new(message.direction, output_id, message.payload, connection, &self.mappings);
        pipeline.apply(&mut wrapper)?;
        Ok(wrapper.finish())
    }
}
