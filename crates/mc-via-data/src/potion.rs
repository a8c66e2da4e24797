//! Numeric potion effect ids to namespaced keys.

/// Effect names indexed by their pre-1.20.2 numeric id. Index 0 is "no effect".
pub const POTION_EFFECTS: [&str; 34] = [
    "",
    "speed",
    "slowness",
    "haste",
    "mining_fatigue",
    "strength",
    "instant_health",
    "instant_damage",
    "jump_boost",
    "nausea",
    "regeneration",
    "resistance",
    "fire_resistance",
    "water_breathing",
    "invisibility",
    "blindness",
    "night_vision",
    "hunger",
    "weakness",
    "poison",
    "wither",
    "health_boost",
    "absorption",
    "saturation",
    "glowing",
    "levitation",
    "luck",
    "unluck",
    "slow_falling",
    "conduit_power",
    "dolphins_grace",
    "bad_omen",
    "hero_of_the_village",
    "darkness",
];

/// Key used for ids that have no entry.
pub const FALLBACK_EFFECT: &str = "minecraft:luck";

/// Namespaced key for a numeric effect id, e.g. `1` -> `minecraft:speed`.
pub fn potion_effect_key(id: i32) -> String {
    match usize::try_from(id) {
        Ok(index) if index >= 1 && index < POTION_EFFECTS.len() => {
            format!("minecraft:{}", POTION_EFFECTS[index])
        }
        _ => FALLBACK_EFFECT.to_string(),
    }
}
