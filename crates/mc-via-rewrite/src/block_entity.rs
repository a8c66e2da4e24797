//! Block entity tag rewrites.

use mc_via_data::potion::potion_effect_key;
use mc_via_nbt::{NbtCompound, NbtTag};

const BEACON_EFFECT_FIELDS: [(&str, &str); 2] = [
    ("Primary", "primary_effect"),
    ("Secondary", "secondary_effect"),
];

/// Replace numeric beacon effects with namespaced effect keys.
///
/// A non-zero integral `Primary`/`Secondary` is removed and its key is
/// appended as `primary_effect`/`secondary_effect`. Absent or zero fields
/// leave the tree as it was.
pub fn rewrite_beacon_effects(tag: &NbtCompound) -> NbtCompound {
    let mut out = tag.clone();
    for (numeric, keyed) in BEACON_EFFECT_FIELDS {
        let id = match out.get(numeric).and_then(NbtTag::as_i64) {
            Some(id) if id != 0 => id,
            _ => continue,
        };
        out.shift_remove(numeric);
        let id = i32::try_from(id).unwrap_or(-1);
        out.insert(keyed.to_string(), NbtTag::String(potion_effect_key(id).into()));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn beacon(primary: Option<NbtTag>, secondary: Option<NbtTag>) -> NbtCompound {
        let mut tag = NbtCompound::new();
        tag.insert("id".into(), NbtTag::String("minecraft:beacon".into()));
        if let Some(primary) = primary {
            tag.insert("Primary".into(), primary);
        }
        tag.insert("Levels".into(), NbtTag::Int(4));
        if let Some(secondary) = secondary {
            tag.insert("Secondary".into(), secondary);
        }
        tag
    }

    #[test]
    fn both_effects() {
        let out = rewrite_beacon_effects(&beacon(Some(NbtTag::Int(1)), Some(NbtTag::Int(10))));
        let keys: Vec<&str> = out.keys().map(String::as_str).collect();
        assert_eq!(keys, ["id", "Levels", "primary_effect", "secondary_effect"]);
        assert_eq!(out["primary_effect"], NbtTag::String("minecraft:speed".into()));
        assert_eq!(out["secondary_effect"], NbtTag::String("minecraft:regeneration".into()));
    }

    #[test]
    fn zero_effect_is_left_alone() {
        let tag = beacon(Some(NbtTag::Int(0)), None);
        assert_eq!(rewrite_beacon_effects(&tag), tag);
    }

    #[test]
    fn unknown_effect_falls_back() {
        let out = rewrite_beacon_effects(&beacon(Some(NbtTag::Int(99)), None));
        assert_eq!(out["primary_effect"], NbtTag::String("minecraft:luck".into()));
    }

    #[test]
    fn other_numeric_widths_are_accepted() {
        let out = rewrite_beacon_effects(&beacon(None, Some(NbtTag::Byte(3))));
        assert_eq!(out["secondary_effect"], NbtTag::String("minecraft:haste".into()));
        assert!(!out.contains_key("Secondary"));
    }

    #[test]
    fn non_beacon_tag_is_untouched() {
        let mut tag = NbtCompound::new();
        tag.insert("Items".into(), NbtTag::list(vec![]));
        tag.insert("Primary".into(), NbtTag::String("not a number".into()));
        assert_eq!(rewrite_beacon_effects(&tag), tag);
    }
}
