use crate::zone::spawn::SpawnPoolEntry;

use super::moblike::{MobKind, Moblike, Position};

// ============================================================================
// NPC State
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NpcState {
    Idle,
    Engaged,
    Dead,
}

// ============================================================================
// NPC Entity
// ============================================================================

#[derive(Debug, Clone)]
pub struct Npc {
    pub id: u32,
    /// NPC type from the spawn pool (e.g. "a_large_rat")
    pub npc_type: String,
    pub display_name: String,
    /// Content script bound to this NPC
    pub script: String,
    /// Spawn point this NPC came from, if any
    pub spawn2_id: Option<i64>,
    pub position: Position,
    pub spawn_position: Position,
    pub hp: i32,
    pub max_hp: i32,
    pub level: i32,
    pub state: NpcState,
    pub target_id: Option<u32>,
}

impl Npc {
    /// Create an NPC from a spawn pool entry
    pub fn from_spawn(id: u32, entry: &SpawnPoolEntry) -> Self {
        let position = Position::new(entry.x, entry.y, entry.z);
        Self {
            id,
            npc_type: entry.npc_type.clone(),
            display_name: entry.display_name().to_string(),
            script: entry.script_id().to_string(),
            spawn2_id: Some(entry.spawn2_id),
            position,
            spawn_position: position,
            hp: entry.max_hp,
            max_hp: entry.max_hp,
            level: entry.level,
            state: NpcState::Idle,
            target_id: None,
        }
    }

    pub fn is_dead(&self) -> bool {
        self.state == NpcState::Dead
    }

    /// Take damage and return true if the NPC died. Negative damage counts
    /// as none; healing is not done through here.
    pub fn take_damage(&mut self, damage: i32) -> bool {
        if self.is_dead() {
            return false;
        }
        self.hp = self.hp.saturating_sub(damage.max(0)).max(0);
        if self.hp <= 0 {
            self.state = NpcState::Dead;
            self.target_id = None;
            true
        } else {
            self.state = NpcState::Engaged;
            false
        }
    }

    /// Respawn the NPC at its spawn point
    pub fn respawn(&mut self) {
        self.position = self.spawn_position;
        self.hp = self.max_hp;
        self.state = NpcState::Idle;
        self.target_id = None;
    }
}

impl Moblike for Npc {
    fn entity_id(&self) -> u32 {
        self.id
    }

    fn name(&self) -> &str {
        &self.display_name
    }

    fn mob_kind(&self) -> MobKind {
        MobKind::Npc
    }

    fn level(&self) -> i32 {
        self.level
    }

    fn hp(&self) -> i32 {
        self.hp
    }

    fn max_hp(&self) -> i32 {
        self.max_hp
    }

    fn position(&self) -> Position {
        self.position
    }

    fn is_alive(&self) -> bool {
        !self.is_dead()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rat_spawn() -> SpawnPoolEntry {
        SpawnPoolEntry {
            spawn2_id: 11,
            npc_type: "a_large_rat".to_string(),
            name: None,
            script: None,
            level: 2,
            max_hp: 20,
            x: 10.0,
            y: -4.0,
            z: 0.0,
            respawn_secs: 30,
            variance_secs: 0,
        }
    }

    #[test]
    fn test_take_damage_and_respawn() {
        let mut npc = Npc::from_spawn(1, &rat_spawn());
        assert_eq!(npc.script, "a_large_rat");
        assert!(!npc.take_damage(5));
        assert_eq!(npc.state, NpcState::Engaged);
        npc.position = Position::new(0.0, 0.0, 0.0);

        assert!(npc.take_damage(50));
        assert!(npc.is_dead());
        assert_eq!(npc.hp, 0);
        // Already dead, no second death
        assert!(!npc.take_damage(5));

        npc.respawn();
        assert_eq!(npc.hp, 20);
        assert_eq!(npc.position, Position::new(10.0, -4.0, 0.0));
        assert!(npc.is_alive());
    }

    #[test]
    fn test_negative_damage_does_not_heal() {
        let mut npc = Npc::from_spawn(1, &rat_spawn());
        assert!(!npc.take_damage(-500));
        assert_eq!(npc.hp, 20);
        assert!(!npc.take_damage(i32::MIN));
        assert_eq!(npc.hp, 20);

        assert!(npc.take_damage(i32::MAX));
        assert_eq!(npc.hp, 0);
    }
}
