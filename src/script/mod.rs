//! Quest Script Module
//!
//! Lua content scripts for a zone: compiling them into quest handlers,
//! loading a zone's script directory, and reloading scripts as they change.

use std::path::PathBuf;

pub mod loader;
pub mod lua;
pub mod watcher;

pub use loader::ScriptLoader;
pub use lua::LuaScript;
pub use watcher::{HotReloadEvent, ScriptWatcher};

use crate::quest::RegistrationError;

#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("script directory does not exist: {0:?}")]
    MissingDirectory(PathBuf),

    #[error("not a script file: {0:?}")]
    NotAScript(PathBuf),

    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("script '{script}' failed to load: {source}")]
    Lua {
        script: String,
        #[source]
        source: mlua::Error,
    },

    #[error(transparent)]
    Registration(#[from] RegistrationError),

    #[error("failed to watch scripts: {0}")]
    Watch(#[from] notify::Error),
}
