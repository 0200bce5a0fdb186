//! Quest System Module
//!
//! Per-zone quest event dispatch. Content scripts register handlers for
//! event kinds; the zone invokes a script's handler with a populated event
//! record whenever something happens.

pub mod dispatcher;
pub mod events;
pub mod record;
pub mod registry;

pub use dispatcher::ZoneQuestInterface;
pub use events::{EventKind, UnknownEventKind};
pub use record::{EventPool, PooledEvent, QuestEvent};
pub use registry::{handler, HandlerRegistry, QuestHandler, RegisterArg, RegistrationError};
