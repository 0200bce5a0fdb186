//! Zone Module
//!
//! The zone side of the quest system: the access facade handlers see, a
//! concrete zone state behind it, quest timers, and the instances that turn
//! simulation happenings into quest events.

pub mod access;
pub mod instance;
pub mod manager;
pub mod spawn;
pub mod state;
pub mod timers;

pub use access::{ChatMessage, ZoneAccess, ZoneInfo};
pub use instance::{TickSummary, ZoneInstance};
pub use manager::ZoneManager;
pub use spawn::SpawnPoolEntry;
pub use state::ZoneState;
pub use timers::{QuestTimers, TimerError, TimerKey};
