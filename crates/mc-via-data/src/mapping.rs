//! Dense old-id -> new-id lookup table.

use tracing::trace;

/// What a lookup resolves to when the old id has no entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fallback {
    /// Return the old id unchanged.
    #[default]
    Identity,
    /// Return a fixed id (usually the target's "unknown"/air state).
    Sentinel(i32),
}

/// Marks a table slot with no mapping.
pub const UNMAPPED: i32 = -1;

/// Dense id table. Index = old id, value = new id or [`UNMAPPED`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdMapping {
    mappings: Vec<i32>,
    mapped_size: usize,
    fallback: Fallback,
}

impl IdMapping {
    /// Build from a raw table. Entries are trusted; use
    /// [`crate::MappingData::from_source`] for validated construction.
    pub fn new(mappings: Vec<i32>, mapped_size: usize) -> Self {
        Self {
            mappings,
            mapped_size,
            fallback: Fallback::Identity,
        }
    }

    /// Table mapping every id in `0..size` to itself.
    pub fn identity(size: usize) -> Self {
        Self::new((0..size as i32).collect(), size)
    }

    pub fn with_fallback(mut self, fallback: Fallback) -> Self {
        self.fallback = fallback;
        self
    }

    /// Size of the source id space.
    pub fn size(&self) -> usize {
        self.mappings.len()
    }

    /// Size of the target id space. Drives global palette bit widths.
    pub fn mapped_size(&self) -> usize {
        self.mapped_size
    }

    pub fn fallback(&self) -> Fallback {
        self.fallback
    }

    /// Mapped id, or `None` if `old` is outside the table or unmapped.
    pub fn try_new_id(&self, old: i32) -> Option<i32> {
        let index = usize::try_from(old).ok()?;
        match self.mappings.get(index) {
            Some(&new) if new != UNMAPPED => Some(new),
            _ => None,
        }
    }

    /// Mapped id with the table's fallback applied. Never fails.
    pub fn new_id(&self, old: i32) -> i32 {
        match self.try_new_id(old) {
            Some(new) => new,
            None => {
                trace!(old, fallback = ?self.fallback, "id outside mapping table");
                match self.fallback {
                    Fallback::Identity => old,
                    Fallback::Sentinel(id) => id,
                }
            }
        }
    }

    /// Reverse table for the opposite direction. When several old ids map
    /// to the same new id the lowest old id wins.
    pub fn inverse(&self) -> Self {
        let mut reversed = vec![UNMAPPED; self.mapped_size];
        for (old, &new) in self.mappings.iter().enumerate() {
            if let Some(slot) = usize::try_from(new).ok().and_then(|i| reversed.get_mut(i)) {
                if *slot == UNMAPPED {
                    *slot = old as i32;
                }
            }
        }
        Self {
            mappings: reversed,
            mapped_size: self.mappings.len(),
            fallback: self.fallback,
        }
    }
}
