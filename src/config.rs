//! Server Configuration
//!
//! Loaded from TOML. Every field has a default so a missing file still
//! boots an (empty) server.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::zone::spawn::SpawnPoolEntry;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Simulation tick interval
    #[serde(default = "default_tick_rate_ms")]
    pub tick_rate_ms: u64,
    /// Watch script directories and reload changed scripts
    #[serde(default)]
    pub hot_reload: bool,
    /// Idle event records kept per zone instance
    #[serde(default = "default_event_pool_size")]
    pub event_pool_size: usize,
    #[serde(default)]
    pub zones: Vec<ZoneConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ZoneConfig {
    pub zone_id: u32,
    #[serde(default)]
    pub instance_id: u32,
    pub short_name: String,
    #[serde(default)]
    pub long_name: String,
    /// Directory of Lua content scripts for this zone
    #[serde(default)]
    pub scripts_dir: Option<PathBuf>,
    /// Script id receiving zone-wide events
    #[serde(default = "default_zone_script")]
    pub zone_script: String,
    #[serde(default)]
    pub spawns: Vec<SpawnPoolEntry>,
}

fn default_tick_rate_ms() -> u64 {
    50 // 20 Hz
}

fn default_event_pool_size() -> usize {
    64
}

fn default_zone_script() -> String {
    "zone".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            tick_rate_ms: default_tick_rate_ms(),
            hot_reload: false,
            event_pool_size: default_event_pool_size(),
            zones: Vec::new(),
        }
    }
}

impl ServerConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: ServerConfig = content.parse()?;
        info!("Loaded config from {:?} ({} zones)", path, config.zones.len());
        Ok(config)
    }

    /// Load the file if it exists, otherwise fall back to defaults
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            warn!("Config file {:?} not found, using defaults", path);
            return Ok(Self::default());
        }
        Self::load(path)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_rate_ms == 0 {
            return Err(ConfigError::Invalid("tick_rate_ms must be positive".to_string()));
        }

        let mut instances = HashSet::new();
        for zone in &self.zones {
            if !instances.insert((zone.zone_id, zone.instance_id)) {
                return Err(ConfigError::Invalid(format!(
                    "zone {} instance {} is configured twice",
                    zone.zone_id, zone.instance_id
                )));
            }

            let mut spawn_points = HashSet::new();
            for spawn in &zone.spawns {
                if !spawn_points.insert(spawn.spawn2_id) {
                    return Err(ConfigError::Invalid(format!(
                        "zone '{}' has duplicate spawn2 id {}",
                        zone.short_name, spawn.spawn2_id
                    )));
                }
            }
        }

        Ok(())
    }
}

impl std::str::FromStr for ServerConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let config: ServerConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}

impl ZoneConfig {
    pub fn display_name(&self) -> &str {
        if self.long_name.is_empty() {
            &self.short_name
        } else {
            &self.long_name
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
tick_rate_ms = 100
hot_reload = true

[[zones]]
zone_id = 4
short_name = "qeytoqrg"
long_name = "Qeynos Hills"
scripts_dir = "scripts/qeytoqrg"

[[zones.spawns]]
spawn2_id = 1
npc_type = "a_large_rat"
x = 10.0
y = 20.0

[[zones.spawns]]
spawn2_id = 2
npc_type = "fippy_darkpaw"
name = "Fippy Darkpaw"
level = 6
respawn_secs = 600
"#;

    #[test]
    fn test_parse_sample() {
        let config: ServerConfig = SAMPLE.parse().unwrap();
        assert_eq!(config.tick_rate_ms, 100);
        assert!(config.hot_reload);
        assert_eq!(config.event_pool_size, 64);

        let zone = &config.zones[0];
        assert_eq!(zone.instance_id, 0);
        assert_eq!(zone.zone_script, "zone");
        assert_eq!(zone.display_name(), "Qeynos Hills");
        assert_eq!(zone.spawns.len(), 2);
        assert_eq!(zone.spawns[1].display_name(), "Fippy Darkpaw");
        assert_eq!(zone.spawns[1].respawn_secs, 600);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: ServerConfig = "".parse().unwrap();
        assert_eq!(config.tick_rate_ms, 50);
        assert!(!config.hot_reload);
        assert!(config.zones.is_empty());
    }

    #[test]
    fn test_duplicate_spawn_points_rejected() {
        let toml = r#"
[[zones]]
zone_id = 1
short_name = "a"

[[zones.spawns]]
spawn2_id = 7
npc_type = "rat"

[[zones.spawns]]
spawn2_id = 7
npc_type = "snake"
"#;
        let err = toml.parse::<ServerConfig>().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_duplicate_instances_rejected() {
        let toml = r#"
[[zones]]
zone_id = 1
short_name = "a"

[[zones]]
zone_id = 1
short_name = "a"
"#;
        assert!(toml.parse::<ServerConfig>().is_err());
    }

    #[test]
    fn test_bundled_config() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/server.toml");
        let config = ServerConfig::load(&path).unwrap();
        assert_eq!(config.zones.len(), 1);
        assert_eq!(config.zones[0].spawns.len(), 3);
    }

    #[test]
    fn test_load_or_default() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("server.toml");
        assert!(ServerConfig::load_or_default(&missing).unwrap().zones.is_empty());

        std::fs::write(&missing, SAMPLE).unwrap();
        let config = ServerConfig::load_or_default(&missing).unwrap();
        assert_eq!(config.zones.len(), 1);

        std::fs::write(&missing, "tick_rate_ms = \"fast\"").unwrap();
        assert!(matches!(
            ServerConfig::load(&missing),
            Err(ConfigError::Parse(_))
        ));
    }
}
