//! Declare-recipes rewrite.
//!
//! Every recipe is `string type`, `string id`, then a body whose layout
//! depends on the type. Only ingredients and results change between
//! versions; the remaining fields are copied.

use mc_via_proto::types::VarInt;

use crate::error::RewriteError;
use crate::item::{ArrayLength, ItemFormat};
use crate::wrapper::PacketWrapper;

const NAMESPACE: &str = "minecraft:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CookingKind {
    Smelting,
    Blasting,
    Smoking,
    CampfireCooking,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecipeKind {
    Shapeless,
    Shaped,
    Cooking(CookingKind),
    Stonecutting,
    Smithing,
    SmithingTransform,
    SmithingTrim,
    /// Built-in recipes whose body is only a category.
    Special,
}

impl RecipeKind {
    /// Parse a recipe type identifier. The `minecraft:` namespace is optional.
    pub fn from_identifier(identifier: &str) -> Option<Self> {
        let name = identifier.strip_prefix(NAMESPACE).unwrap_or(identifier);
        let kind = match name {
            "crafting_shapeless" => RecipeKind::Shapeless,
            "crafting_shaped" => RecipeKind::Shaped,
            "smelting" => RecipeKind::Cooking(CookingKind::Smelting),
            "blasting" => RecipeKind::Cooking(CookingKind::Blasting),
            "smoking" => RecipeKind::Cooking(CookingKind::Smoking),
            "campfire_cooking" => RecipeKind::Cooking(CookingKind::CampfireCooking),
            "stonecutting" => RecipeKind::Stonecutting,
            "smithing" => RecipeKind::Smithing,
            "smithing_transform" => RecipeKind::SmithingTransform,
            "smithing_trim" => RecipeKind::SmithingTrim,
            "crafting_decorated_pot" => RecipeKind::Special,
            _ if name.starts_with("crafting_special_") => RecipeKind::Special,
            _ => return None,
        };
        Some(kind)
    }
}

/// Rewrites recipe ingredients and results from one item format to another.
#[derive(Debug, Clone, Copy)]
pub struct RecipeRewriter {
    from: ItemFormat,
    to: ItemFormat,
}

impl RecipeRewriter {
    pub fn new(from: ItemFormat, to: ItemFormat) -> Self {
        Self { from, to }
    }

    pub fn rewrite_declare_recipes(&self, w: &mut PacketWrapper<'_>) -> Result<(), RewriteError> {
        let count = w.passthrough::<VarInt>()?.0;
        for _ in 0..count {
            let ty = w.passthrough::<String>()?;
            let id = w.passthrough::<String>()?;
            let kind = RecipeKind::from_identifier(&ty).ok_or_else(|| RewriteError::InvalidRecipe {
                id: id.clone(),
                reason: format!("unknown recipe type {ty}"),
            })?;
            self.rewrite_recipe(w, kind, &id)?;
        }
        Ok(())
    }

    pub fn rewrite_recipe(&self, w: &mut PacketWrapper<'_>, kind: RecipeKind, id: &str) -> Result<(), RewriteError> {
        match kind {
            RecipeKind::Shapeless => self.shapeless(w),
            RecipeKind::Shaped => self.shaped(w, id),
            RecipeKind::Cooking(_) => self.cooking(w),
            RecipeKind::Stonecutting => self.stonecutting(w),
            RecipeKind::Smithing => self.smithing(w),
            RecipeKind::SmithingTransform => self.smithing_transform(w),
            RecipeKind::SmithingTrim => self.smithing_trim(w),
            RecipeKind::Special => self.special(w),
        }
    }

    // -----------------------------------------------------------------------
    // Shared pieces
    // -----------------------------------------------------------------------

    /// One slot: any of several alternative items.
    fn ingredient(&self, w: &mut PacketWrapper<'_>) -> Result<(), RewriteError> {
        w.rewrite_item_array(self.from, self.to, ArrayLength::VarInt)
    }

    fn result(&self, w: &mut PacketWrapper<'_>) -> Result<(), RewriteError> {
        w.rewrite_item(self.from, self.to)?;
        Ok(())
    }

    fn group_and_category(&self, w: &mut PacketWrapper<'_>) -> Result<(), RewriteError> {
        w.passthrough::<String>()?;
        w.passthrough::<VarInt>()?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Per-kind bodies
    // -----------------------------------------------------------------------

    fn shapeless(&self, w: &mut PacketWrapper<'_>) -> Result<(), RewriteError> {
        self.group_and_category(w)?;
        let count = w.passthrough::<VarInt>()?.0;
        for _ in 0..count {
            self.ingredient(w)?;
        }
        self.result(w)
    }

    fn shaped(&self, w: &mut PacketWrapper<'_>, id: &str) -> Result<(), RewriteError> {
        let width = w.passthrough::<VarInt>()?.0;
        let height = w.passthrough::<VarInt>()?.0;
        let cells = usize::try_from(width)
            .ok()
            .zip(usize::try_from(height).ok())
            .and_then(|(width, height)| width.checked_mul(height))
            .ok_or_else(|| RewriteError::InvalidRecipe {
                id: id.to_string(),
                reason: format!("invalid grid {width}x{height}"),
            })?;
        self.group_and_category(w)?;
        // Row-major, before the result.
        for _ in 0..cells {
            self.ingredient(w)?;
        }
        self.result(w)?;
        w.passthrough::<bool>()?;
        Ok(())
    }

    fn cooking(&self, w: &mut PacketWrapper<'_>) -> Result<(), RewriteError> {
        self.group_and_category(w)?;
        self.ingredient(w)?;
        self.result(w)?;
        w.passthrough::<f32>()?;
        w.passthrough::<VarInt>()?;
        Ok(())
    }

    fn stonecutting(&self, w: &mut PacketWrapper<'_>) -> Result<(), RewriteError> {
        w.passthrough::<String>()?;
        self.ingredient(w)?;
        self.result(w)
    }

    fn smithing(&self, w: &mut PacketWrapper<'_>) -> Result<(), RewriteError> {
        self.ingredient(w)?;
        self.ingredient(w)?;
        self.result(w)
    }

    fn smithing_transform(&self, w: &mut PacketWrapper<'_>) -> Result<(), RewriteError> {
        self.ingredient(w)?;
        self.smithing(w)
    }

    fn smithing_trim(&self, w: &mut PacketWrapper<'_>) -> Result<(), RewriteError> {
        for _ in 0..3 {
            self.ingredient(w)?;
        }
        Ok(())
    }

    fn special(&self, w: &mut PacketWrapper<'_>) -> Result<(), RewriteError> {
        w.passthrough::<VarInt>()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ConnectionContext;
    use crate::item::{write_item, write_item_array, ItemStack};
    use crate::registry::Direction;
    use bytes::{Bytes, BytesMut};
    use mc_via_data::{IdTable, MappingData, MappingSource};
    use mc_via_proto::ProtoEncode;

    /// Items 0..4 map to 10..14.
    fn mappings() -> MappingData {
        MappingData::from_source(MappingSource {
            block_states: IdTable::identity(1),
            items: IdTable {
                mappings: vec![10, 11, 12, 13, 14],
                mapped_size: Some(15),
                fallback: None,
            },
            ..Default::default()
        })
        .unwrap()
    }

    struct Recipes {
        input: BytesMut,
        expected: BytesMut,
    }

    impl Recipes {
        fn new(count: i32) -> Self {
            let mut input = BytesMut::new();
            let mut expected = BytesMut::new();
            VarInt(count).proto_encode(&mut input);
            VarInt(count).proto_encode(&mut expected);
            Self { input, expected }
        }

        fn both<T: ProtoEncode + ?Sized>(&mut self, value: &T) -> &mut Self {
            value.proto_encode(&mut self.input);
            value.proto_encode(&mut self.expected);
            self
        }

        fn ingredient(&mut self, ids: &[i32]) -> &mut Self {
            let items: Vec<_> = ids.iter().map(|&id| Some(ItemStack::new(id, 1))).collect();
            let mapped: Vec<_> = ids.iter().map(|&id| Some(ItemStack::new(id + 10, 1))).collect();
            write_item_array(&mut self.input, ItemFormat::Flat, ArrayLength::VarInt, &items).unwrap();
            write_item_array(&mut self.expected, ItemFormat::Revised, ArrayLength::VarInt, &mapped).unwrap();
            self
        }

        fn result(&mut self, id: i32, count: i32) -> &mut Self {
            write_item(&mut self.input, ItemFormat::Flat, Some(&ItemStack::new(id, count))).unwrap();
            write_item(&mut self.expected, ItemFormat::Revised, Some(&ItemStack::new(id + 10, count))).unwrap();
            self
        }

        fn rewrite(&self) -> Result<Bytes, RewriteError> {
            let mappings = mappings();
            let mut connection = ConnectionContext::default();
            let mut w = PacketWrapper::new(
                Direction::Clientbound,
                0x6D,
                self.input.clone().freeze(),
                &mut connection,
                &mappings,
            );
            RecipeRewriter::new(ItemFormat::Flat, ItemFormat::Revised).rewrite_declare_recipes(&mut w)?;
            Ok(w.finish().payload)
        }
    }

    #[test]
    fn identifiers() {
        assert_eq!(RecipeKind::from_identifier("minecraft:crafting_shaped"), Some(RecipeKind::Shaped));
        assert_eq!(RecipeKind::from_identifier("smoking"), Some(RecipeKind::Cooking(CookingKind::Smoking)));
        assert_eq!(
            RecipeKind::from_identifier("minecraft:crafting_special_bannerduplicate"),
            Some(RecipeKind::Special)
        );
        assert_eq!(RecipeKind::from_identifier("minecraft:brewing"), None);
    }

    #[test]
    fn shaped_grid_is_read_before_result() {
        let mut recipes = Recipes::new(1);
        recipes
            .both("minecraft:crafting_shaped")
            .both("minecraft:torch")
            .both(&VarInt(1))
            .both(&VarInt(2))
            .both("")
            .both(&VarInt(0))
            .ingredient(&[0])
            .ingredient(&[1, 2])
            .result(3, 4)
            .both(&true);
        assert_eq!(recipes.rewrite().unwrap(), recipes.expected.clone().freeze());
    }

    #[test]
    fn mixed_kinds() {
        let mut recipes = Recipes::new(4);
        recipes
            .both("minecraft:crafting_shapeless")
            .both("a")
            .both("dye")
            .both(&VarInt(2))
            .both(&VarInt(2))
            .ingredient(&[1])
            .ingredient(&[2])
            .result(4, 2);
        recipes
            .both("minecraft:blasting")
            .both("b")
            .both("")
            .both(&VarInt(1))
            .ingredient(&[0])
            .result(1, 1)
            .both(&0.7f32)
            .both(&VarInt(100));
        recipes.both("minecraft:smithing_trim").both("c").ingredient(&[0]).ingredient(&[1]).ingredient(&[2]);
        recipes.both("minecraft:crafting_special_firework_rocket").both("d").both(&VarInt(3));
        assert_eq!(recipes.rewrite().unwrap(), recipes.expected.clone().freeze());
    }

    #[test]
    fn smithing_transform_and_stonecutting() {
        let mut recipes = Recipes::new(2);
        recipes
            .both("minecraft:smithing_transform")
            .both("e")
            .ingredient(&[0])
            .ingredient(&[1])
            .ingredient(&[2])
            .result(3, 1);
        recipes.both("stonecutting").both("f").both("").ingredient(&[4]).result(0, 2);
        assert_eq!(recipes.rewrite().unwrap(), recipes.expected.clone().freeze());
    }

    #[test]
    fn unknown_type_is_rejected() {
        let mut recipes = Recipes::new(1);
        recipes.both("minecraft:brewing").both("g");
        assert!(matches!(
            recipes.rewrite(),
            Err(RewriteError::InvalidRecipe { id, .. }) if id == "g"
        ));
    }

    #[test]
    fn negative_grid_is_rejected() {
        let mut recipes = Recipes::new(1);
        recipes.both("crafting_shaped").both("h").both(&VarInt(-1)).both(&VarInt(3));
        assert!(matches!(recipes.rewrite(), Err(RewriteError::InvalidRecipe { .. })));
    }

    #[test]
    fn truncated_body_fails() {
        let mut recipes = Recipes::new(1);
        recipes.both("smelting").both("i").both("");
        assert!(matches!(recipes.rewrite(), Err(RewriteError::Proto(_))));
    }
}
