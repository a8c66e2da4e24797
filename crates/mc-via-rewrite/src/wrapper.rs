//! Cursor pair a pipeline rewrites one message through.

use bytes::{BufMut, Bytes, BytesMut};
use mc_via_data::MappingData;
use mc_via_proto::{ProtoDecode, ProtoEncode};

use crate::context::ConnectionContext;
use crate::error::RewriteError;
use crate::field::{FieldType, Value};
use crate::item::{read_item, read_item_array, write_item, write_item_array, ArrayLength, ItemFormat, ItemStack};
use crate::registry::{Direction, Message};

/// Reads the source payload field by field and collects the target payload.
///
/// Bytes left in the input when the pipeline ends are appended to the
/// output unchanged.
pub struct PacketWrapper<'a> {
    direction: Direction,
    packet_id: i32,
    input: Bytes,
    output: BytesMut,
    connection: &'a mut ConnectionContext,
    mappings: &'a MappingData,
}

impl<'a> PacketWrapper<'a> {
    pub fn new(
        direction: Direction,
        packet_id: i32,
        payload: Bytes,
        connection: &'a mut ConnectionContext,
        mappings: &'a MappingData,
    ) -> Self {
        Self {
            direction,
            packet_id,
            output: BytesMut::with_capacity(payload.len()),
            input: payload,
            connection,
            mappings,
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Id the output message will carry.
    pub fn packet_id(&self) -> i32 {
        self.packet_id
    }

    pub fn set_packet_id(&mut self, packet_id: i32) {
        self.packet_id = packet_id;
    }

    pub fn connection(&mut self) -> &mut ConnectionContext {
        &mut *self.connection
    }

    pub fn mappings(&self) -> &'a MappingData {
        self.mappings
    }

    /// Unread input together with the connection, for codecs that need both.
    pub fn input_and_connection(&mut self) -> (&mut Bytes, &mut ConnectionContext) {
        (&mut self.input, &mut *self.connection)
    }

    pub fn input(&mut self) -> &mut Bytes {
        &mut self.input
    }

    pub fn output(&mut self) -> &mut BytesMut {
        &mut self.output
    }

    // -----------------------------------------------------------------------
    // Typed access
    // -----------------------------------------------------------------------

    pub fn read<T: ProtoDecode>(&mut self) -> Result<T, RewriteError> {
        Ok(T::proto_decode(&mut self.input)?)
    }

    pub fn write<T: ProtoEncode + ?Sized>(&mut self, value: &T) {
        value.proto_encode(&mut self.output);
    }

    pub fn passthrough<T: ProtoDecode + ProtoEncode>(&mut self) -> Result<T, RewriteError> {
        let value = self.read::<T>()?;
        self.write(&value);
        Ok(value)
    }

    // -----------------------------------------------------------------------
    // Field-type access
    // -----------------------------------------------------------------------

    pub fn read_field(&mut self, ty: FieldType) -> Result<Value, RewriteError> {
        ty.read(&mut self.input)
    }

    pub fn write_field(&mut self, ty: FieldType, value: &Value) -> Result<(), RewriteError> {
        ty.write(&mut self.output, value)
    }

    pub fn passthrough_field(&mut self, ty: FieldType) -> Result<Value, RewriteError> {
        self.transform_field(ty, ty)
    }

    /// Read with `from`, write the same value with `to`.
    pub fn transform_field(&mut self, from: FieldType, to: FieldType) -> Result<Value, RewriteError> {
        let value = self.read_field(from)?;
        self.write_field(to, &value)?;
        Ok(value)
    }

    // -----------------------------------------------------------------------
    // Id lookups that count table misses
    // -----------------------------------------------------------------------

    pub fn new_block_state_id(&mut self, old: i32) -> i32 {
        let table = self.mappings().block_states();
        if table.try_new_id(old).is_none() {
            self.connection.diagnostics.record_unknown_id("block_states", old);
        }
        table.new_id(old)
    }

    /// Block id, as sent by block actions. Pairs without a block table keep
    /// the id.
    pub fn new_block_id(&mut self, old: i32) -> i32 {
        let Some(table) = self.mappings().blocks() else {
            return old;
        };
        if table.try_new_id(old).is_none() {
            self.connection.diagnostics.record_unknown_id("blocks", old);
        }
        table.new_id(old)
    }

    /// Item id for this message's direction. Serverbound messages use the
    /// inverse table.
    pub fn new_item_id(&mut self, old: i32) -> i32 {
        let mappings = self.mappings();
        let (table, name) = match self.direction {
            Direction::Clientbound => (mappings.items(), "items"),
            Direction::Serverbound => (mappings.items_inverse(), "items_inverse"),
        };
        if table.try_new_id(old).is_none() {
            self.connection.diagnostics.record_unknown_id(name, old);
        }
        table.new_id(old)
    }

    pub fn new_particle_id(&mut self, old: i32) -> i32 {
        let table = self.mappings().particles().ids();
        if table.try_new_id(old).is_none() {
            self.connection.diagnostics.record_unknown_id("particles", old);
        }
        table.new_id(old)
    }

    // -----------------------------------------------------------------------
    // Items
    // -----------------------------------------------------------------------

    pub fn remap_item(&mut self, item: &mut Option<ItemStack>) {
        if let Some(item) = item {
            item.id = self.new_item_id(item.id);
        }
    }

    /// Read an item in `from`, remap its id and write it in `to`.
    pub fn rewrite_item(&mut self, from: ItemFormat, to: ItemFormat) -> Result<Option<ItemStack>, RewriteError> {
        let mut item = read_item(&mut self.input, from)?;
        self.remap_item(&mut item);
        write_item(&mut self.output, to, item.as_ref())?;
        Ok(item)
    }

    pub fn rewrite_item_array(
        &mut self,
        from: ItemFormat,
        to: ItemFormat,
        length: ArrayLength,
    ) -> Result<(), RewriteError> {
        let mut items = read_item_array(&mut self.input, from, length)?;
        for item in &mut items {
            self.remap_item(item);
        }
        write_item_array(&mut self.output, to, length, &items)
    }

    // -----------------------------------------------------------------------
    // Completion
    // -----------------------------------------------------------------------

    /// Copy the unread input to the output as is.
    pub fn passthrough_remaining(&mut self) {
        let rest = std::mem::take(&mut self.input);
        self.output.put_slice(&rest);
    }

    pub fn remaining(&self) -> usize {
        self.input.len()
    }

    pub fn finish(mut self) -> Message {
        self.passthrough_remaining();
        Message {
            direction: self.direction,
            packet_id: self.packet_id,
            payload: self.output.freeze(),
        }
    }
}
