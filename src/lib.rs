pub mod config;
pub mod entity;
pub mod quest;
pub mod script;
pub mod zone;
