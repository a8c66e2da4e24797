//! Item stack codec across the three wire layouts.
//!
//! | format    | absent marker | id       | count    | damage | tag           | extra           |
//! |-----------|---------------|----------|----------|--------|---------------|-----------------|
//! | `Legacy`  | id = -1       | `i16`    | `i8`     | `i16`  | named NBT     |                 |
//! | `Flat`    | `bool` false  | `VarInt` | `i8`     |        | named NBT     |                 |
//! | `Revised` | `bool` false  | `VarInt` | `VarInt` |        | nameless NBT  | component patch |

use bytes::{Buf, BufMut, Bytes};
use mc_via_data::IdMapping;
use mc_via_nbt::{read_nameless_nbt, read_nbt, write_nameless_nbt, write_nbt, NbtCompound, NbtRoot, NbtTag};
use mc_via_proto::codec::{read_bytes, read_len};
use mc_via_proto::types::VarInt;
use mc_via_proto::{ProtoDecode, ProtoEncode, ProtoError};

use crate::error::RewriteError;

/// Tag key that carries item damage in formats without a damage field.
pub const DAMAGE_TAG: &str = "Damage";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemFormat {
    /// Up to 1.12.2.
    Legacy,
    /// 1.13 through 1.20.1.
    Flat,
    /// 1.20.2 onward.
    Revised,
}

/// A component carried opaquely through a [`ItemFormat::Revised`] patch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawComponent {
    pub type_id: i32,
    pub data: Bytes,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemComponents {
    pub added: Vec<RawComponent>,
    pub removed: Vec<i32>,
}

impl ItemComponents {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemStack {
    pub id: i32,
    pub count: i32,
    /// Only the legacy format has a field for this.
    pub damage: i16,
    pub tag: Option<NbtCompound>,
    pub components: ItemComponents,
}

impl ItemStack {
    pub fn new(id: i32, count: i32) -> Self {
        Self {
            id,
            count,
            damage: 0,
            tag: None,
            components: ItemComponents::default(),
        }
    }

    fn tag_with_damage(&self) -> Option<NbtCompound> {
        if self.damage == 0 {
            return self.tag.clone();
        }
        let mut tag = self.tag.clone().unwrap_or_default();
        tag.insert(DAMAGE_TAG.to_string(), NbtTag::Int(self.damage as i32));
        Some(tag)
    }

    /// Inverse of `tag_with_damage`: a tag damage value moves back into the
    /// damage field and an emptied tag becomes `None`.
    fn damage_from_tag(&self) -> (i16, Option<NbtCompound>) {
        if self.damage != 0 {
            return (self.damage, self.tag.clone());
        }
        let Some(damage) = self
            .tag
            .as_ref()
            .and_then(|tag| tag.get(DAMAGE_TAG))
            .and_then(NbtTag::as_int)
            .and_then(|damage| i16::try_from(damage).ok())
            .filter(|&damage| damage != 0)
        else {
            return (0, self.tag.clone());
        };
        let mut tag = self.tag.clone().unwrap_or_default();
        tag.shift_remove(DAMAGE_TAG);
        (damage, (!tag.is_empty()).then_some(tag))
    }
}

/// How an item array's element count is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrayLength {
    VarInt,
    Short,
    /// Not sent; both sides know it.
    Fixed(usize),
}

// ---------------------------------------------------------------------------
// Single items
// ---------------------------------------------------------------------------

pub fn read_item(buf: &mut impl Buf, format: ItemFormat) -> Result<Option<ItemStack>, RewriteError> {
    match format {
        ItemFormat::Legacy => {
            let id = i16::proto_decode(buf)?;
            if id < 0 {
                return Ok(None);
            }
            let count = i8::proto_decode(buf)?;
            let damage = i16::proto_decode(buf)?;
            let tag = read_nbt(buf)?.map(|root| root.compound);
            Ok(Some(ItemStack {
                id: id as i32,
                count: count as i32,
                damage,
                tag,
                components: ItemComponents::default(),
            }))
        }
        ItemFormat::Flat => {
            if !bool::proto_decode(buf)? {
                return Ok(None);
            }
            let id = VarInt::proto_decode(buf)?.0;
            let count = i8::proto_decode(buf)?;
            let tag = read_nbt(buf)?.map(|root| root.compound);
            Ok(Some(ItemStack {
                tag,
                ..ItemStack::new(id, count as i32)
            }))
        }
        ItemFormat::Revised => {
            if !bool::proto_decode(buf)? {
                return Ok(None);
            }
            let id = VarInt::proto_decode(buf)?.0;
            let count = VarInt::proto_decode(buf)?.0;
            let tag = read_nameless_nbt(buf)?;
            let components = read_components(buf)?;
            Ok(Some(ItemStack {
                tag,
                components,
                ..ItemStack::new(id, count)
            }))
        }
    }
}

/// Write an item. Damage is folded into the tag when the format has no
/// damage field and unfolded again for the legacy format. Counts saturate in
/// formats with an `i8` count.
pub fn write_item(
    buf: &mut impl BufMut,
    format: ItemFormat,
    item: Option<&ItemStack>,
) -> Result<(), RewriteError> {
    match (format, item) {
        (ItemFormat::Legacy, None) => (-1i16).proto_encode(buf),
        (ItemFormat::Legacy, Some(item)) => {
            let id = i16::try_from(item.id)
                .ok()
                .filter(|id| *id >= 0)
                .ok_or_else(|| ProtoError::InvalidData(format!("item id {} does not fit the legacy format", item.id)))?;
            id.proto_encode(buf);
            saturating_i8(item.count).proto_encode(buf);
            let (damage, tag) = item.damage_from_tag();
            damage.proto_encode(buf);
            write_nbt(buf, tag.map(NbtRoot::from).as_ref());
        }
        (ItemFormat::Flat | ItemFormat::Revised, None) => false.proto_encode(buf),
        (ItemFormat::Flat, Some(item)) => {
            true.proto_encode(buf);
            VarInt(item.id).proto_encode(buf);
            saturating_i8(item.count).proto_encode(buf);
            write_nbt(buf, item.tag_with_damage().map(NbtRoot::from).as_ref());
        }
        (ItemFormat::Revised, Some(item)) => {
            true.proto_encode(buf);
            VarInt(item.id).proto_encode(buf);
            VarInt(item.count).proto_encode(buf);
            write_nameless_nbt(buf, item.tag_with_damage().as_ref());
            write_components(buf, &item.components);
        }
    }
    Ok(())
}

fn saturating_i8(count: i32) -> i8 {
    count.clamp(i8::MIN as i32, i8::MAX as i32) as i8
}

fn read_components(buf: &mut impl Buf) -> Result<ItemComponents, RewriteError> {
    let added_count = read_len(buf)?;
    let removed_count = read_len(buf)?;
    let mut components = ItemComponents::default();
    for _ in 0..added_count {
        let type_id = VarInt::proto_decode(buf)?.0;
        let len = read_len(buf)?;
        let data = read_bytes(buf, len)?;
        components.added.push(RawComponent { type_id, data });
    }
    for _ in 0..removed_count {
        components.removed.push(VarInt::proto_decode(buf)?.0);
    }
    Ok(components)
}

fn write_components(buf: &mut impl BufMut, components: &ItemComponents) {
    VarInt(components.added.len() as i32).proto_encode(buf);
    VarInt(components.removed.len() as i32).proto_encode(buf);
    for component in &components.added {
        VarInt(component.type_id).proto_encode(buf);
        VarInt(component.data.len() as i32).proto_encode(buf);
        buf.put_slice(&component.data);
    }
    for &type_id in &components.removed {
        VarInt(type_id).proto_encode(buf);
    }
}

/// Apply an item id table. Absent stacks stay absent.
pub fn remap_item(item: &mut Option<ItemStack>, table: &IdMapping) {
    if let Some(item) = item {
        item.id = table.new_id(item.id);
    }
}

// ---------------------------------------------------------------------------
// Arrays
// ---------------------------------------------------------------------------

pub fn read_item_array(
    buf: &mut impl Buf,
    format: ItemFormat,
    length: ArrayLength,
) -> Result<Vec<Option<ItemStack>>, RewriteError> {
    let len = match length {
        ArrayLength::VarInt => read_len(buf)?,
        ArrayLength::Short => {
            let len = i16::proto_decode(buf)?;
            usize::try_from(len).map_err(|_| ProtoError::NegativeLength(len as i32))?
        }
        ArrayLength::Fixed(len) => len,
    };
    // Every item takes at least one byte.
    let mut items = Vec::with_capacity(len.min(buf.remaining()));
    for _ in 0..len {
        items.push(read_item(buf, format)?);
    }
    Ok(items)
}

pub fn write_item_array(
    buf: &mut impl BufMut,
    format: ItemFormat,
    length: ArrayLength,
    items: &[Option<ItemStack>],
) -> Result<(), RewriteError> {
    match length {
        ArrayLength::VarInt => VarInt(items.len() as i32).proto_encode(buf),
        ArrayLength::Short => {
            let len = i16::try_from(items.len())
                .map_err(|_| ProtoError::InvalidData(format!("{} items exceed a short length", items.len())))?;
            len.proto_encode(buf);
        }
        ArrayLength::Fixed(len) if len != items.len() => {
            return Err(ProtoError::InvalidData(format!("expected {len} items, have {}", items.len())).into());
        }
        ArrayLength::Fixed(_) => {}
    }
    for item in items {
        write_item(buf, format, item.as_ref())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;
    use proptest::prelude::*;

    fn encode(format: ItemFormat, item: Option<&ItemStack>) -> Bytes {
        let mut buf = BytesMut::new();
        write_item(&mut buf, format, item).unwrap();
        buf.freeze()
    }

    fn named_tag() -> NbtCompound {
        let mut tag = NbtCompound::new();
        tag.insert("display".into(), NbtTag::String("Lamp".into()));
        tag
    }

    #[test]
    fn legacy_layout() {
        let item = ItemStack {
            damage: 3,
            ..ItemStack::new(5, 1)
        };
        let bytes = encode(ItemFormat::Legacy, Some(&item));
        assert_eq!(&bytes[..], &[0x00, 0x05, 0x01, 0x00, 0x03, 0x00]);
        assert_eq!(read_item(&mut bytes.clone(), ItemFormat::Legacy).unwrap(), Some(item));
    }

    #[test]
    fn legacy_to_revised() {
        let mut legacy = read_item(&mut encode(ItemFormat::Legacy, Some(&ItemStack::new(5, 1))), ItemFormat::Legacy).unwrap();
        remap_item(&mut legacy, &IdMapping::new(vec![0, 1, 2, 3, 4, 42], 43));

        let bytes = encode(ItemFormat::Revised, legacy.as_ref());
        // present, id, count, no tag, empty patch
        assert_eq!(&bytes[..], &[0x01, 42, 0x01, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn absent_items() {
        assert_eq!(&encode(ItemFormat::Legacy, None)[..], &[0xFF, 0xFF]);
        assert_eq!(&encode(ItemFormat::Flat, None)[..], &[0x00]);
        assert_eq!(&encode(ItemFormat::Revised, None)[..], &[0x00]);

        let mut legacy_absent = Bytes::from_static(&[0xFF, 0xFF]);
        let item = read_item(&mut legacy_absent, ItemFormat::Legacy).unwrap();
        assert!(item.is_none());
        assert!(legacy_absent.is_empty());
    }

    #[test]
    fn flat_to_revised_keeps_tag() {
        let item = ItemStack {
            tag: Some(named_tag()),
            ..ItemStack::new(812, 16)
        };
        let flat = read_item(&mut encode(ItemFormat::Flat, Some(&item)), ItemFormat::Flat).unwrap();
        let revised = read_item(&mut encode(ItemFormat::Revised, flat.as_ref()), ItemFormat::Revised).unwrap();
        assert_eq!(revised, Some(item));
    }

    #[test]
    fn damage_is_folded_into_tag() {
        let item = ItemStack {
            damage: 7,
            tag: Some(named_tag()),
            ..ItemStack::new(261, 1)
        };
        let flat = read_item(&mut encode(ItemFormat::Flat, Some(&item)), ItemFormat::Flat)
            .unwrap()
            .unwrap();
        assert_eq!(flat.damage, 0);
        let tag = flat.tag.unwrap();
        assert_eq!(tag.get(DAMAGE_TAG), Some(&NbtTag::Int(7)));
        assert_eq!(tag.get_index(0).map(|(k, _)| k.as_str()), Some("display"));
    }

    #[test]
    fn tag_damage_returns_to_legacy_field() {
        let mut tag = named_tag();
        tag.insert(DAMAGE_TAG.into(), NbtTag::Int(9));
        let revised = ItemStack {
            tag: Some(tag),
            ..ItemStack::new(5, 1)
        };
        let legacy = read_item(&mut encode(ItemFormat::Legacy, Some(&revised)), ItemFormat::Legacy)
            .unwrap()
            .unwrap();
        assert_eq!(legacy.damage, 9);
        assert_eq!(legacy.tag, Some(named_tag()));

        let mut only_damage = NbtCompound::new();
        only_damage.insert(DAMAGE_TAG.into(), NbtTag::Int(2));
        let bytes = encode(
            ItemFormat::Legacy,
            Some(&ItemStack {
                tag: Some(only_damage),
                ..ItemStack::new(5, 1)
            }),
        );
        assert_eq!(&bytes[..], &[0x00, 0x05, 0x01, 0x00, 0x02, 0x00]);
    }

    #[test]
    fn zero_damage_adds_no_tag() {
        let bytes = encode(ItemFormat::Flat, Some(&ItemStack::new(1, 1)));
        assert_eq!(&bytes[..], &[0x01, 0x01, 0x01, 0x00]);
    }

    #[test]
    fn count_saturates_in_byte_slot() {
        let bytes = encode(ItemFormat::Flat, Some(&ItemStack::new(1, 300)));
        assert_eq!(bytes[2], 127);
    }

    #[test]
    fn revised_components_pass_through() {
        let item = ItemStack {
            components: ItemComponents {
                added: vec![RawComponent {
                    type_id: 4,
                    data: Bytes::from_static(&[9, 9, 9]),
                }],
                removed: vec![11, 12],
            },
            ..ItemStack::new(3, 64)
        };
        let bytes = encode(ItemFormat::Revised, Some(&item));
        assert_eq!(read_item(&mut bytes.clone(), ItemFormat::Revised).unwrap(), Some(item));
    }

    #[test]
    fn legacy_rejects_wide_ids() {
        let mut buf = BytesMut::new();
        assert!(matches!(
            write_item(&mut buf, ItemFormat::Legacy, Some(&ItemStack::new(40_000, 1))),
            Err(RewriteError::Proto(ProtoError::InvalidData(_)))
        ));
    }

    #[test]
    fn truncated_item_is_an_error() {
        let mut bytes = Bytes::from_static(&[0x01, 0x05]);
        assert!(matches!(
            read_item(&mut bytes, ItemFormat::Flat),
            Err(RewriteError::Proto(ProtoError::BufferTooShort { .. }))
        ));
    }

    #[test]
    fn short_prefixed_array() {
        let items = vec![Some(ItemStack::new(1, 1)), None, Some(ItemStack::new(2, 5))];
        let mut buf = BytesMut::new();
        write_item_array(&mut buf, ItemFormat::Legacy, ArrayLength::Short, &items).unwrap();
        assert_eq!(&buf[..2], &[0x00, 0x03]);
        let decoded = read_item_array(&mut buf.freeze(), ItemFormat::Legacy, ArrayLength::Short).unwrap();
        assert_eq!(decoded, items);
    }

    #[test]
    fn fixed_array_length_must_match() {
        let mut buf = BytesMut::new();
        let result = write_item_array(&mut buf, ItemFormat::Flat, ArrayLength::Fixed(2), &[None]);
        assert!(matches!(result, Err(RewriteError::Proto(ProtoError::InvalidData(_)))));

        write_item_array(&mut buf, ItemFormat::Flat, ArrayLength::Fixed(2), &[None, None]).unwrap();
        assert_eq!(&buf[..], &[0x00, 0x00]);
    }

    #[test]
    fn negative_short_length_is_an_error() {
        let mut bytes = Bytes::from_static(&[0xFF, 0xFE]);
        assert!(matches!(
            read_item_array(&mut bytes, ItemFormat::Legacy, ArrayLength::Short),
            Err(RewriteError::Proto(ProtoError::NegativeLength(-2)))
        ));
    }

    proptest! {
        #[test]
        fn flat_revised_round_trip(id in 0i32..100_000, count in 1i32..=64, has_tag in any::<bool>()) {
            let item = ItemStack {
                tag: has_tag.then(named_tag),
                ..ItemStack::new(id, count)
            };
            let table = IdMapping::identity(100_000);
            let mut flat = read_item(&mut encode(ItemFormat::Flat, Some(&item)), ItemFormat::Flat).unwrap();
            remap_item(&mut flat, &table);
            let revised = read_item(&mut encode(ItemFormat::Revised, flat.as_ref()), ItemFormat::Revised).unwrap();
            prop_assert_eq!(revised, Some(item));
        }

        #[test]
        fn legacy_revised_legacy_round_trip(
            id in 0i32..2000,
            count in 1i32..=64,
            damage in 1i16..=i16::MAX,
            has_tag in any::<bool>(),
        ) {
            let item = ItemStack {
                damage,
                tag: has_tag.then(named_tag),
                ..ItemStack::new(id, count)
            };
            let table = IdMapping::new((0..2000).map(|id| (id + 17) % 2000).collect(), 2000);

            let mut legacy = read_item(&mut encode(ItemFormat::Legacy, Some(&item)), ItemFormat::Legacy).unwrap();
            remap_item(&mut legacy, &table);
            let mut revised = read_item(&mut encode(ItemFormat::Revised, legacy.as_ref()), ItemFormat::Revised).unwrap();
            {
                let revised = revised.as_ref().unwrap();
                prop_assert_eq!(revised.id, (id + 17) % 2000);
                prop_assert_eq!(revised.damage, 0);
                let tag_damage = revised.tag.as_ref().and_then(|tag| tag.get(DAMAGE_TAG)).and_then(NbtTag::as_int);
                prop_assert_eq!(tag_damage, Some(damage as i32));
            }

            remap_item(&mut revised, &table.inverse());
            let back = read_item(&mut encode(ItemFormat::Legacy, revised.as_ref()), ItemFormat::Legacy).unwrap();
            prop_assert_eq!(back, Some(item));
        }
    }
}
