//! Zone Access
//!
//! What quest handlers are allowed to see and do in their zone. The
//! implementation synchronises its own state: handlers may run on several
//! threads at once.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::spawn::SpawnPoolEntry;
use crate::entity::Npc;

/// Chat channel numbers understood by clients
pub mod channel {
    pub const GUILD: u8 = 0;
    pub const GROUP: u8 = 2;
    pub const SHOUT: u8 = 3;
    pub const AUCTION: u8 = 4;
    pub const OOC: u8 = 5;
    pub const BROADCAST: u8 = 6;
    pub const TELL: u8 = 7;
    pub const SAY: u8 = 8;
}

/// Identity of a running zone instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneInfo {
    pub zone_id: u32,
    pub instance_id: u32,
    pub short_name: String,
    pub long_name: String,
}

impl ZoneInfo {
    pub fn new(zone_id: u32, instance_id: u32, short_name: &str, long_name: &str) -> Self {
        Self {
            zone_id,
            instance_id,
            short_name: short_name.to_string(),
            long_name: long_name.to_string(),
        }
    }
}

/// A chat line broadcast to everyone in the zone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub zone_id: u32,
    pub instance_id: u32,
    pub sender: String,
    pub message: String,
    pub channel: u8,
}

pub trait ZoneAccess: Send + Sync {
    fn zone(&self) -> &ZoneInfo;

    fn zone_id(&self) -> u32 {
        self.zone().zone_id
    }

    fn instance_id(&self) -> u32 {
        self.zone().instance_id
    }

    /// Snapshot of the live NPCs, keyed by entity id
    fn npcs(&self) -> HashMap<u32, Arc<Npc>>;

    fn npc_by_id(&self, npc_id: u32) -> Option<Arc<Npc>>;

    /// Spawn pool entries, keyed by spawn2 id
    fn zone_pool(&self) -> HashMap<i64, SpawnPoolEntry>;

    /// Pending respawns: spawn2 id to the time it comes back
    fn spawn_timers(&self) -> HashMap<i64, DateTime<Utc>>;

    /// Spawn2 id to the entity id currently occupying it
    fn spawn2_to_npc(&self) -> HashMap<i64, u32>;

    fn broadcast_channel_message(&self, sender_name: &str, message: &str, channel: u8);
}
