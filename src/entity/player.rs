use super::moblike::{MobKind, Moblike, Position};

/// A connected player character as seen by quest handlers
#[derive(Debug, Clone)]
pub struct Player {
    pub id: u32,
    pub name: String,
    pub level: i32,
    pub hp: i32,
    pub max_hp: i32,
    pub position: Position,
    /// Guild or group label for chat routing, if any
    pub group: Option<String>,
}

impl Player {
    pub fn new(id: u32, name: &str, level: i32) -> Self {
        let max_hp = 50 + level * 10;
        Self {
            id,
            name: name.to_string(),
            level,
            hp: max_hp,
            max_hp,
            position: Position::default(),
            group: None,
        }
    }

    pub fn at(mut self, position: Position) -> Self {
        self.position = position;
        self
    }
}

impl Moblike for Player {
    fn entity_id(&self) -> u32 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn mob_kind(&self) -> MobKind {
        MobKind::Player
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
