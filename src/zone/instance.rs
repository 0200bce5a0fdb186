//! Zone Instance
//!
//! Glues a zone's live state to its quest interface. The simulation calls
//! the trigger methods here; each one fills a pooled event record and
//! dispatches it to the NPC's script and, for zone-wide kinds, to the zone
//! script.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::access::{ZoneAccess, ZoneInfo};
use super::spawn::SpawnPoolEntry;
use super::state::ZoneState;
use super::timers::{QuestTimers, TimerError, TimerKey};
use crate::config::ZoneConfig;
use crate::entity::{ItemInstance, Npc, NpcState, Player};
use crate::quest::{EventKind, EventPool, QuestEvent, ZoneQuestInterface};
use crate::script::{HotReloadEvent, ScriptError, ScriptLoader, ScriptWatcher};

/// What one simulation tick did
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickSummary {
    pub respawned: usize,
    pub timers_fired: usize,
}

pub struct ZoneInstance {
    state: Arc<ZoneState>,
    quests: Arc<ZoneQuestInterface>,
    pool: EventPool,
    timers: QuestTimers,
    players: RwLock<HashMap<u32, Arc<Player>>>,
    /// Script id receiving zone-wide events
    zone_script: String,
    loader: Option<Arc<ScriptLoader>>,
}

impl ZoneInstance {
    pub fn new(config: &ZoneConfig, pool_size: usize) -> Self {
        let info = ZoneInfo::new(
            config.zone_id,
            config.instance_id,
            &config.short_name,
            config.display_name(),
        );
        let state = Arc::new(ZoneState::new(info, config.spawns.clone()));
        let quests = Arc::new(ZoneQuestInterface::new(
            Arc::clone(&state) as Arc<dyn ZoneAccess>
        ));

        Self {
            state,
            quests,
            pool: EventPool::new(pool_size),
            timers: QuestTimers::new(),
            players: RwLock::new(HashMap::new()),
            zone_script: config.zone_script.clone(),
            loader: config
                .scripts_dir
                .as_deref()
                .map(|dir| Arc::new(ScriptLoader::new(dir))),
        }
    }

    pub fn info(&self) -> &ZoneInfo {
        self.state.zone()
    }

    pub fn state(&self) -> &Arc<ZoneState> {
        &self.state
    }

    pub fn quests(&self) -> &Arc<ZoneQuestInterface> {
        &self.quests
    }

    pub fn zone_script(&self) -> &str {
        &self.zone_script
    }

    pub fn timers(&self) -> &QuestTimers {
        &self.timers
    }

    /// Load the zone's script directory, if it has one
    pub fn load_scripts(&self) -> Result<usize, ScriptError> {
        match &self.loader {
            Some(loader) => loader.load_all(&self.quests),
            None => Ok(0),
        }
    }

    /// Start hot reload for the zone's script directory
    pub fn watch_scripts(&self) -> Result<Option<mpsc::Receiver<HotReloadEvent>>, ScriptError> {
        let Some(loader) = &self.loader else {
            return Ok(None);
        };
        ScriptWatcher::new(Arc::clone(loader), Arc::clone(&self.quests))
            .start()
            .map(Some)
    }

    /// Drop what a removed script left behind
    pub fn forget_script(&self, script_id: &str) {
        let cleared = self.timers.clear_script(script_id);
        if cleared > 0 {
            debug!("Cleared {} timers of removed script {}", cleared, script_id);
        }
    }

    /// Check out a record, fill it in and dispatch it to one script
    fn fire(&self, script_id: &str, kind: EventKind, populate: impl FnOnce(&mut QuestEvent)) -> bool {
        let mut event = self.pool.checkout();
        event.kind(kind);
        populate(&mut event);
        self.quests.invoke(script_id, &mut event)
    }

    // ========================================================================
    // Spawning
    // ========================================================================

    /// Populate every idle spawn point. Returns the number of NPCs spawned.
    pub fn spawn_all(&self) -> usize {
        let mut count = 0;
        for spawn2_id in self.state.idle_spawn_points() {
            if let Some(entry) = self.state.pool_entry(spawn2_id) {
                if self.spawn_from(&entry).is_some() {
                    count += 1;
                }
            }
        }
        info!("Spawned {} NPCs in {}", count, self.info().short_name);
        count
    }

    /// Spawn at a pool entry and fire the spawn events. Nothing happens if
    /// the spawn point is already occupied.
    fn spawn_from(&self, entry: &SpawnPoolEntry) -> Option<Arc<Npc>> {
        let npc = self.state.spawn(entry)?;
        self.fire(&npc.script, EventKind::Spawn, |e| {
            e.receiver(npc.clone());
        });
        self.fire(&self.zone_script, EventKind::SpawnZone, |e| {
            e.receiver(npc.clone()).extra(npc.id);
        });
        Some(npc)
    }

    // ========================================================================
    // Players
    // ========================================================================

    pub fn player(&self, player_id: u32) -> Option<Arc<Player>> {
        self.players.read().get(&player_id).cloned()
    }

    pub fn player_ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.players.read().keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn player_count(&self) -> usize {
        self.players.read().len()
    }

    pub fn player_enter(&self, player: Player) -> Arc<Player> {
        let player = Arc::new(player);
        self.players.write().insert(player.id, Arc::clone(&player));
        info!("{} entered {}", player.name, self.info().short_name);

        self.fire(&self.zone_script, EventKind::EnterZone, |e| {
            e.actor(player.clone());
        });
        player
    }

    pub fn player_leave(&self, player_id: u32) -> Option<Arc<Player>> {
        let player = self.players.write().remove(&player_id)?;
        info!("{} left {}", player.name, self.info().short_name);

        self.fire(&self.zone_script, EventKind::Disconnect, |e| {
            e.actor(player.clone());
        });
        Some(player)
    }

    // ========================================================================
    // Interaction
    // ========================================================================

    /// A player says something to an NPC. Returns true if the NPC's script
    /// handled it.
    pub fn say(&self, player_id: u32, npc_id: u32, message: &str) -> bool {
        let (Some(player), Some(npc)) = (self.player(player_id), self.state.npc_by_id(npc_id)) else {
            return false;
        };
        self.fire(&npc.script, EventKind::Say, |e| {
            e.actor(player).receiver(npc.clone()).strings([message]);
        })
    }

    /// A player hands items to an NPC
    pub fn trade(&self, player_id: u32, npc_id: u32, items: Vec<ItemInstance>) -> bool {
        let (Some(player), Some(npc)) = (self.player(player_id), self.state.npc_by_id(npc_id)) else {
            return false;
        };
        self.fire(&npc.script, EventKind::Trade, |e| {
            e.actor(player).receiver(npc.clone()).items(items);
        })
    }

    /// Deliver a numeric signal to a script
    pub fn signal(&self, script_id: &str, signal_id: u32) -> bool {
        self.fire(script_id, EventKind::Signal, |e| {
            e.extra(signal_id);
        })
    }

    // ========================================================================
    // Combat
    // ========================================================================

    /// Apply damage from a player. Returns true if the NPC died.
    pub fn damage_npc(&self, attacker_id: u32, npc_id: u32, damage: i32) -> bool {
        let Some(fatal) = self.state.update_npc(npc_id, |npc| npc.take_damage(damage)) else {
            return false;
        };
        let Some(npc) = self.state.npc_by_id(npc_id) else {
            return false;
        };
        let attacker = self.player(attacker_id);

        self.fire(&npc.script, EventKind::DamageTaken, |e| {
            if let Some(attacker) = attacker.clone() {
                e.actor(attacker);
            }
            e.receiver(npc.clone()).extra(damage.max(0) as u32);
        });

        if fatal {
            self.kill_npc(attacker.map(|p| p.id), npc_id)
        } else {
            false
        }
    }

    /// Kill an NPC. A `death` handler returning true cancels the death and
    /// leaves the NPC up with one hit point. Returns true if the NPC died.
    pub fn kill_npc(&self, killer_id: Option<u32>, npc_id: u32) -> bool {
        let Some(npc) = self.state.npc_by_id(npc_id) else {
            return false;
        };
        let killer = killer_id.and_then(|id| self.player(id));

        let prevented = self.fire(&npc.script, EventKind::Death, |e| {
            if let Some(killer) = killer.clone() {
                e.actor(killer);
            }
            e.receiver(npc.clone());
        });
        if prevented {
            debug!("Death of {} ({}) prevented by script", npc.display_name, npc.id);
            self.state.update_npc(npc_id, |npc| {
                npc.hp = npc.hp.max(1);
                npc.state = NpcState::Engaged;
            });
            return false;
        }

        let Some(npc) = self.state.despawn(npc_id) else {
            return false;
        };
        if let Some(spawn2_id) = npc.spawn2_id {
            if let Some(entry) = self.state.pool_entry(spawn2_id) {
                self.state
                    .schedule_respawn(spawn2_id, Utc::now() + entry.respawn_delay());
            }
        }

        self.fire(&npc.script, EventKind::DeathComplete, |e| {
            if let Some(killer) = killer.clone() {
                e.actor(killer);
            }
            e.receiver(npc.clone());
        });
        self.fire(&self.zone_script, EventKind::DeathZone, |e| {
            if let Some(killer) = killer.clone() {
                e.actor(killer);
            }
            e.receiver(npc.clone()).extra(npc.id);
        });
        true
    }

    // ========================================================================
    // Timers
    // ========================================================================

    /// Start a named timer for a script. A non-positive interval is refused
    /// and fires nothing.
    pub fn start_timer(
        &self,
        script_id: &str,
        name: &str,
        interval: Duration,
    ) -> Result<(), TimerError> {
        self.timers
            .start(TimerKey::new(script_id, name), interval, Utc::now())?;
        self.fire(script_id, EventKind::TimerStart, |e| {
            e.strings([name])
                .extra(interval.num_milliseconds().clamp(0, u32::MAX as i64) as u32);
        });
        Ok(())
    }

    pub fn stop_timer(&self, script_id: &str, name: &str) -> bool {
        if !self.timers.stop(&TimerKey::new(script_id, name)) {
            return false;
        }
        self.fire(script_id, EventKind::TimerStop, |e| {
            e.strings([name]);
        });
        true
    }

    pub fn pause_timer(&self, script_id: &str, name: &str) -> bool {
        if !self.timers.pause(&TimerKey::new(script_id, name), Utc::now()) {
            return false;
        }
        self.fire(script_id, EventKind::TimerPause, |e| {
            e.strings([name]);
        });
        true
    }

    pub fn resume_timer(&self, script_id: &str, name: &str) -> bool {
        if !self.timers.resume(&TimerKey::new(script_id, name), Utc::now()) {
            return false;
        }
        self.fire(script_id, EventKind::TimerResume, |e| {
            e.strings([name]);
        });
        true
    }

    // ========================================================================
    // Simulation
    // ========================================================================

    pub fn tick(&self) -> TickSummary {
        self.tick_at(Utc::now())
    }

    /// Repopulate due spawn points, fire due timers, then tick the zone script
    pub fn tick_at(&self, now: DateTime<Utc>) -> TickSummary {
        let mut summary = TickSummary::default();

        for spawn2_id in self.state.take_due_respawns(now) {
            if let Some(entry) = self.state.pool_entry(spawn2_id) {
                if self.spawn_from(&entry).is_some() {
                    summary.respawned += 1;
                }
            }
        }

        for key in self.timers.take_due(now) {
            self.fire(&key.script, EventKind::Timer, |e| {
                e.strings([key.name.as_str()]);
            });
            summary.timers_fired += 1;
        }

        self.fire(&self.zone_script, EventKind::Tick, |_| {});
        summary
    }
}
