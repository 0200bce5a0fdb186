use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::{debug, info};

use super::access::{ChatMessage, ZoneAccess, ZoneInfo};
use super::spawn::SpawnPoolEntry;
use crate::entity::Npc;

const CHAT_CHANNEL_CAPACITY: usize = 256;

/// Live state of one zone instance: NPCs and spawn bookkeeping
pub struct ZoneState {
    info: ZoneInfo,
    npcs: RwLock<HashMap<u32, Arc<Npc>>>,
    zone_pool: RwLock<HashMap<i64, SpawnPoolEntry>>,
    spawn_timers: RwLock<HashMap<i64, DateTime<Utc>>>,
    spawn2_to_npc: RwLock<HashMap<i64, u32>>,
    next_entity_id: AtomicU32,
    chat_tx: broadcast::Sender<ChatMessage>,
}

impl ZoneState {
    pub fn new(info: ZoneInfo, spawns: Vec<SpawnPoolEntry>) -> Self {
        let (chat_tx, _) = broadcast::channel(CHAT_CHANNEL_CAPACITY);
        let zone_pool = spawns.into_iter().map(|s| (s.spawn2_id, s)).collect();

        Self {
            info,
            npcs: RwLock::new(HashMap::new()),
            zone_pool: RwLock::new(zone_pool),
            spawn_timers: RwLock::new(HashMap::new()),
            spawn2_to_npc: RwLock::new(HashMap::new()),
            next_entity_id: AtomicU32::new(1),
            chat_tx,
        }
    }

    pub fn subscribe_chat(&self) -> broadcast::Receiver<ChatMessage> {
        self.chat_tx.subscribe()
    }

    pub fn next_entity_id(&self) -> u32 {
        self.next_entity_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn pool_entry(&self, spawn2_id: i64) -> Option<SpawnPoolEntry> {
        self.zone_pool.read().get(&spawn2_id).cloned()
    }

    /// Spawn2 ids with no NPC up and no respawn pending
    pub fn idle_spawn_points(&self) -> Vec<i64> {
        let occupied = self.spawn2_to_npc.read();
        let pending = self.spawn_timers.read();
        let mut idle: Vec<i64> = self
            .zone_pool
            .read()
            .keys()
            .filter(|id| !occupied.contains_key(id) && !pending.contains_key(id))
            .copied()
            .collect();
        idle.sort();
        idle
    }

    /// Bring an NPC up at a spawn point. Returns None if the spawn point
    /// already has an NPC up.
    ///
    /// Lock order: spawn2_to_npc, then npcs, then spawn_timers.
    pub fn spawn(&self, entry: &SpawnPoolEntry) -> Option<Arc<Npc>> {
        let mut occupied = self.spawn2_to_npc.write();
        if occupied.contains_key(&entry.spawn2_id) {
            debug!(
                "Spawn2 {} in {} is occupied, not spawning",
                entry.spawn2_id, self.info.short_name
            );
            return None;
        }

        let npc = Arc::new(Npc::from_spawn(self.next_entity_id(), entry));
        self.npcs.write().insert(npc.id, Arc::clone(&npc));
        occupied.insert(entry.spawn2_id, npc.id);
        self.spawn_timers.write().remove(&entry.spawn2_id);
        drop(occupied);

        debug!(
            "Spawned {} ({}) at spawn2 {} in {}",
            npc.display_name, npc.id, entry.spawn2_id, self.info.short_name
        );
        Some(npc)
    }

    /// Remove an NPC from the zone, freeing its spawn point
    pub fn despawn(&self, npc_id: u32) -> Option<Arc<Npc>> {
        let npc = self.npcs.write().remove(&npc_id)?;
        if let Some(spawn2_id) = npc.spawn2_id {
            let mut occupied = self.spawn2_to_npc.write();
            if occupied.get(&spawn2_id) == Some(&npc_id) {
                occupied.remove(&spawn2_id);
            }
        }
        Some(npc)
    }

    /// Mutate an NPC in place. Snapshots already handed out are unaffected.
    pub fn update_npc<R>(&self, npc_id: u32, f: impl FnOnce(&mut Npc) -> R) -> Option<R> {
        let mut npcs = self.npcs.write();
        let npc = npcs.get_mut(&npc_id)?;
        Some(f(Arc::make_mut(npc)))
    }

    pub fn schedule_respawn(&self, spawn2_id: i64, at: DateTime<Utc>) {
        self.spawn_timers.write().insert(spawn2_id, at);
    }

    /// Remove and return the spawn points due to repopulate at `now`
    pub fn take_due_respawns(&self, now: DateTime<Utc>) -> Vec<i64> {
        let mut timers = self.spawn_timers.write();
        let mut due: Vec<i64> = timers
            .iter()
            .filter(|(_, at)| **at <= now)
            .map(|(id, _)| *id)
            .collect();
        for id in &due {
            timers.remove(id);
        }
        due.sort();
        due
    }

    pub fn npc_count(&self) -> usize {
        self.npcs.read().len()
    }
}

impl ZoneAccess for ZoneState {
    fn zone(&self) -> &ZoneInfo {
        &self.info
    }

    fn npcs(&self) -> HashMap<u32, Arc<Npc>> {
        self.npcs.read().clone()
    }

    fn npc_by_id(&self, npc_id: u32) -> Option<Arc<Npc>> {
        self.npcs.read().get(&npc_id).cloned()
    }

    fn zone_pool(&self) -> HashMap<i64, SpawnPoolEntry> {
        self.zone_pool.read().clone()
    }

    fn spawn_timers(&self) -> HashMap<i64, DateTime<Utc>> {
        self.spawn_timers.read().clone()
    }

    fn spawn2_to_npc(&self) -> HashMap<i64, u32> {
        self.spawn2_to_npc.read().clone()
    }

    fn broadcast_channel_message(&self, sender_name: &str, message: &str, channel: u8) {
        info!("[{}] {}: {}", self.info.short_name, sender_name, message);
        // No subscribers is fine, the zone may be empty
        let _ = self.chat_tx.send(ChatMessage {
            zone_id: self.info.zone_id,
            instance_id: self.info.instance_id,
            sender: sender_name.to_string(),
            message: message.to_string(),
            channel,
        });
    }
}
