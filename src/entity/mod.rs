pub mod item;
pub mod moblike;
pub mod npc;
pub mod player;

pub use item::ItemInstance;
pub use moblike::{Mob, MobKind, Moblike, Position};
pub use npc::{Npc, NpcState};
pub use player::Player;
