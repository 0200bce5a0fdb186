use std::fmt;

/// Grid position of a participant in the zone
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Position {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn distance_to(&self, other: &Position) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MobKind {
    Npc,
    Player,
    Mob,
}

impl MobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MobKind::Npc => "npc",
            MobKind::Player => "player",
            MobKind::Mob => "mob",
        }
    }
}

/// Anything that can act in, or be acted on by, a quest event.
///
/// Quest events carry actors and receivers as `Arc<dyn Moblike>`; the
/// dispatcher forwards them without looking at the concrete type.
pub trait Moblike: Send + Sync + fmt::Debug {
    fn entity_id(&self) -> u32;
    fn name(&self) -> &str;
    fn mob_kind(&self) -> MobKind;
    fn level(&self) -> i32;
    fn hp(&self) -> i32;
    fn max_hp(&self) -> i32;
    fn position(&self) -> Position;

    fn is_alive(&self) -> bool {
        self.hp() > 0
    }

    fn hp_percent(&self) -> f32 {
        if self.max_hp() <= 0 {
            return 0.0;
        }
        self.hp() as f32 * 100.0 / self.max_hp() as f32
    }
}

/// A generic combatant that is neither a scripted NPC nor a connected
/// player (pets, summoned adds, corpses raised by scripts)
#[derive(Debug, Clone)]
pub struct Mob {
    pub id: u32,
    pub name: String,
    pub level: i32,
    pub hp: i32,
    pub max_hp: i32,
    pub position: Position,
}

impl Mob {
    pub fn new(id: u32, name: &str, level: i32, max_hp: i32, position: Position) -> Self {
        Self {
            id,
            name: name.to_string(),
            level,
            hp: max_hp,
            max_hp,
            position,
        }
    }
}

impl Moblike for Mob {
    fn entity_id(&self) -> u32 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn mob_kind(&self) -> MobKind {
        MobKind::Mob
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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hp_percent() {
        let mut mob = Mob::new(7, "a_skeleton", 3, 40, Position::default());
        assert_eq!(mob.hp_percent(), 100.0);
        mob.hp = 10;
        assert_eq!(mob.hp_percent(), 25.0);
        mob.hp = 0;
        assert!(!mob.is_alive());
    }

    #[test]
    fn test_distance() {
        let a = Position::new(0.0, 0.0, 0.0);
        let b = Position::new(3.0, 4.0, 0.0);
        assert_eq!(a.distance_to(&b), 5.0);
    }
}
