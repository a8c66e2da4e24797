use serde::Deserialize;
use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Per-host translation settings. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProtocolConfig {
    #[serde(default)]
    pub chunks: ChunksSection,
    #[serde(default)]
    pub diagnostics: DiagnosticsSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChunksSection {
    /// Sections per column until a join message says otherwise.
    #[serde(default = "default_section_height")]
    pub default_section_height: usize,
    /// Synthesize block entities that newer clients expect in chunk data.
    #[serde(default = "default_true")]
    pub placeholder_block_entities: bool,
}

fn default_section_height() -> usize {
    16
}

fn default_true() -> bool {
    true
}

impl Default for ChunksSection {
    fn default() -> Self {
        Self {
            default_section_height: default_section_height(),
            placeholder_block_entities: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiagnosticsSection {
    /// Anomalies kept per connection. Later ones are only counted.
    #[serde(default = "default_max_recorded_anomalies")]
    pub max_recorded_anomalies: usize,
}

fn default_max_recorded_anomalies() -> usize {
    64
}

impl Default for DiagnosticsSection {
    fn default() -> Self {
        Self {
            max_recorded_anomalies: default_max_recorded_anomalies(),
        }
    }
}

impl ProtocolConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }
}
