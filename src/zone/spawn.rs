use chrono::Duration;
use rand::Rng;
use serde::Deserialize;

/// One spawn point in a zone's spawn pool, as configured in TOML
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SpawnPoolEntry {
    pub spawn2_id: i64,
    /// NPC type spawned here (e.g. "a_large_rat")
    pub npc_type: String,
    /// Display name, defaults to the NPC type
    #[serde(default)]
    pub name: Option<String>,
    /// Script id, defaults to the NPC type
    #[serde(default)]
    pub script: Option<String>,
    #[serde(default = "default_level")]
    pub level: i32,
    #[serde(default = "default_max_hp")]
    pub max_hp: i32,
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    #[serde(default)]
    pub z: f32,
    #[serde(default = "default_respawn_secs")]
    pub respawn_secs: u32,
    /// Up to this many extra seconds are added to each respawn
    #[serde(default)]
    pub variance_secs: u32,
}

fn default_level() -> i32 {
    1
}

fn default_max_hp() -> i32 {
    100
}

fn default_respawn_secs() -> u32 {
    60
}

impl SpawnPoolEntry {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.npc_type)
    }

    pub fn script_id(&self) -> &str {
        self.script.as_deref().unwrap_or(&self.npc_type)
    }

    /// Time until this spawn point repopulates
    pub fn respawn_delay(&self) -> Duration {
        let variance = if self.variance_secs > 0 {
            rand::thread_rng().gen_range(0..=self.variance_secs)
        } else {
            0
        };
        Duration::seconds(i64::from(self.respawn_secs) + i64::from(variance))
    }
}
