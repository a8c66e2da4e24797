//! Per-connection state mutated by pipelines.

use std::collections::HashMap;

use mc_via_world::ClientChunks;
use tracing::{trace, warn};

use crate::config::ProtocolConfig;

/// Legacy dimension ids.
pub const DIMENSION_NETHER: i32 = -1;
pub const DIMENSION_OVERWORLD: i32 = 0;
pub const DIMENSION_END: i32 = 1;

/// What the connection knows about the world the client is in.
#[derive(Debug, Clone)]
pub struct WorldTracker {
    section_height: usize,
    dimension: i32,
    /// Biomes in the registry the server sent at join.
    biomes_sent: usize,
    /// Section heights by dimension type key, from the join registry.
    dimension_heights: HashMap<String, usize>,
}

impl WorldTracker {
    pub fn new(section_height: usize) -> Self {
        Self {
            section_height,
            dimension: DIMENSION_OVERWORLD,
            biomes_sent: 0,
            dimension_heights: HashMap::new(),
        }
    }

    pub fn section_height(&self) -> usize {
        self.section_height
    }

    pub fn set_section_height(&mut self, height: usize) {
        self.section_height = height;
    }

    pub fn dimension(&self) -> i32 {
        self.dimension
    }

    pub fn set_dimension(&mut self, dimension: i32) {
        self.dimension = dimension;
    }

    pub fn biomes_sent(&self) -> usize {
        self.biomes_sent
    }

    pub fn set_biomes_sent(&mut self, count: usize) {
        self.biomes_sent = count;
    }

    pub fn set_dimension_height(&mut self, dimension_type: impl Into<String>, sections: usize) {
        self.dimension_heights.insert(dimension_type.into(), sections);
    }

    /// Switch to the height of a registered dimension type. Returns `false`
    /// and keeps the current height for an unknown key.
    pub fn enter_dimension(&mut self, dimension_type: &str) -> bool {
        match self.dimension_heights.get(dimension_type) {
            Some(&sections) => {
                self.section_height = sections;
                true
            }
            None => false,
        }
    }

    /// Only the overworld sends sky light in chunk sections.
    pub fn has_sky_light(&self) -> bool {
        self.dimension == DIMENSION_OVERWORLD
    }
}

/// A non-fatal structural problem seen while rewriting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anomaly {
    pub packet_id: i32,
    pub message: String,
}

/// Counters and a bounded anomaly log for one connection.
#[derive(Debug, Clone)]
pub struct Diagnostics {
    unknown_ids: u64,
    anomalies: Vec<Anomaly>,
    dropped_anomalies: u64,
    max_recorded: usize,
}

impl Diagnostics {
    pub fn new(max_recorded: usize) -> Self {
        Self {
            unknown_ids: 0,
            anomalies: Vec::new(),
            dropped_anomalies: 0,
            max_recorded,
        }
    }

    pub fn record_unknown_id(&mut self, table: &'static str, id: i32) {
        self.unknown_ids += 1;
        trace!(table, id, "id missing from mapping table");
    }

    pub fn record_anomaly(&mut self, packet_id: i32, message: impl Into<String>) {
        let message = message.into();
        warn!(packet_id, %message, "structural anomaly");
        if self.anomalies.len() < self.max_recorded {
            self.anomalies.push(Anomaly { packet_id, message });
        } else {
            self.dropped_anomalies += 1;
        }
    }

    pub fn unknown_ids(&self) -> u64 {
        self.unknown_ids
    }

    pub fn anomalies(&self) -> &[Anomaly] {
        &self.anomalies
    }

    /// Anomalies seen after the log filled up.
    pub fn dropped_anomalies(&self) -> u64 {
        self.dropped_anomalies
    }
}

/// Everything a connection's pipelines may read or update.
#[derive(Debug, Clone)]
pub struct ConnectionContext {
    pub world: WorldTracker,
    pub chunks: ClientChunks,
    pub diagnostics: Diagnostics,
    pub placeholder_block_entities: bool,
}

impl ConnectionContext {
    pub fn new(config: &ProtocolConfig) -> Self {
        Self {
            world: WorldTracker::new(config.chunks.default_section_height),
            chunks: ClientChunks::new(),
            diagnostics: Diagnostics::new(config.diagnostics.max_recorded_anomalies),
            placeholder_block_entities: config.chunks.placeholder_block_entities,
        }
    }
}

impl Default for ConnectionContext {
    fn default() -> Self {
        Self::new(&ProtocolConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_from_config() {
        let config = ProtocolConfig::from_toml_str(
            "[chunks]\ndefault_section_height = 24\n[diagnostics]\nmax_recorded_anomalies = 2\n",
        )
        .unwrap();
        let ctx = ConnectionContext::new(&config);
        assert_eq!(ctx.world.section_height(), 24);
        assert!(ctx.world.has_sky_light());
        assert!(ctx.placeholder_block_entities);
    }

    #[test]
    fn sky_light_follows_dimension() {
        let mut world = WorldTracker::new(16);
        world.set_dimension(DIMENSION_NETHER);
        assert!(!world.has_sky_light());
        world.set_dimension(DIMENSION_END);
        assert!(!world.has_sky_light());
        world.set_dimension(DIMENSION_OVERWORLD);
        assert!(world.has_sky_light());
    }

    #[test]
    fn dimension_heights_by_key() {
        let mut world = WorldTracker::new(16);
        world.set_dimension_height("minecraft:overworld", 24);
        world.set_dimension_height("minecraft:the_nether", 16);
        assert!(world.enter_dimension("minecraft:overworld"));
        assert_eq!(world.section_height(), 24);
        assert!(!world.enter_dimension("custom:void"));
        assert_eq!(world.section_height(), 24);
        assert!(world.enter_dimension("minecraft:the_nether"));
        assert_eq!(world.section_height(), 16);
    }

    #[test]
    fn anomaly_log_is_bounded() {
        let mut diagnostics = Diagnostics::new(2);
        for i in 0..5 {
            diagnostics.record_anomaly(0x21, format!("leftover {i}"));
        }
        assert_eq!(diagnostics.anomalies().len(), 2);
        assert_eq!(diagnostics.anomalies()[1].message, "leftover 1");
        assert_eq!(diagnostics.dropped_anomalies(), 3);
    }

    #[test]
    fn unknown_ids_are_counted() {
        let mut diagnostics = Diagnostics::new(0);
        diagnostics.record_unknown_id("items", 9_000);
        diagnostics.record_unknown_id("items", 9_001);
        assert_eq!(diagnostics.unknown_ids(), 2);
    }
}
