//! Per-connection record of which chunks the client holds.

use std::collections::HashSet;

use mc_via_proto::types::ChunkPos;

/// Loaded chunks plus chunks the host split out of a bulk packet.
///
/// The legacy format has no dedicated unload message: an empty full chunk
/// for a loaded position means "unload". Chunks from a bulk packet are
/// never unloads, so the host marks them before dispatching.
#[derive(Debug, Default, Clone)]
pub struct ClientChunks {
    loaded: HashSet<ChunkPos>,
    bulk: HashSet<ChunkPos>,
}

impl ClientChunks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_bulk(&mut self, pos: ChunkPos) {
        self.bulk.insert(pos);
    }

    /// Remove and report the bulk mark for `pos`.
    pub fn take_bulk(&mut self, pos: ChunkPos) -> bool {
        self.bulk.remove(&pos)
    }

    pub fn mark_loaded(&mut self, pos: ChunkPos) {
        self.loaded.insert(pos);
    }

    pub fn is_loaded(&self, pos: ChunkPos) -> bool {
        self.loaded.contains(&pos)
    }

    /// Forget `pos`. Returns whether it was loaded.
    pub fn unload(&mut self, pos: ChunkPos) -> bool {
        self.loaded.remove(&pos)
    }

    pub fn loaded_count(&self) -> usize {
        self.loaded.len()
    }
}
